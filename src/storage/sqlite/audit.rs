//! SQLite AuditLog implementation.

use async_trait::async_trait;
use sea_query::{Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use crate::interfaces::{AuditLog as AuditLogReader, AuditRecord, Result};
use crate::storage::schema::AuditLog;

use super::parse_ts;

pub struct SqliteAuditLog {
    pool: SqlitePool,
}

impl SqliteAuditLog {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditLogReader for SqliteAuditLog {
    async fn recent(&self, limit: u32) -> Result<Vec<AuditRecord>> {
        let query = Query::select()
            .columns([
                AuditLog::Actor,
                AuditLog::Action,
                AuditLog::Subject,
                AuditLog::Detail,
                AuditLog::At,
            ])
            .from(AuditLog::Table)
            .order_by(AuditLog::Id, Order::Desc)
            .limit(u64::from(limit))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<AuditRecord> {
                let at: String = row.try_get("at")?;
                Ok(AuditRecord {
                    actor: row.try_get("actor")?,
                    action: row.try_get("action")?,
                    subject: row.try_get("subject")?,
                    detail: row.try_get("detail")?,
                    at: parse_ts(&at)?,
                })
            })
            .collect()
    }
}
