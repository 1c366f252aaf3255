//! SQLite ModeStore implementation.

use async_trait::async_trait;
use chrono::Utc;
use rentsync_policy::OperationMode;
use sea_query::{Expr, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Acquire, Row, SqlitePool};

use crate::domain::{Brand, ParseEnumError};
use crate::interfaces::{AuditRecord, ModeStore, Result};
use crate::storage::schema::BrandModes;

use super::{audit_insert, fmt_ts};

/// Brand modes in the shared database.
pub struct SqliteModeStore {
    pool: SqlitePool,
}

impl SqliteModeStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_mode(value: &str) -> Result<OperationMode> {
    value
        .parse::<OperationMode>()
        .map_err(|_| ParseEnumError::new("operation_mode", value).into())
}

#[async_trait]
impl ModeStore for SqliteModeStore {
    async fn get_mode(&self, brand: &Brand) -> Result<Option<OperationMode>> {
        let query = Query::select()
            .column(BrandModes::Mode)
            .from(BrandModes::Table)
            .and_where(Expr::col(BrandModes::Brand).eq(brand.as_str()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        match row {
            Some(row) => {
                let mode: String = row.try_get("mode")?;
                Ok(Some(parse_mode(&mode)?))
            }
            None => Ok(None),
        }
    }

    async fn set_mode(&self, brand: &Brand, mode: OperationMode, audit: AuditRecord) -> Result<()> {
        let upsert = Query::insert()
            .into_table(BrandModes::Table)
            .columns([BrandModes::Brand, BrandModes::Mode, BrandModes::UpdatedAt])
            .values_panic([
                brand.as_str().into(),
                mode.as_str().into(),
                fmt_ts(Utc::now()).into(),
            ])
            .on_conflict(
                OnConflict::column(BrandModes::Brand)
                    .update_columns([BrandModes::Mode, BrandModes::UpdatedAt])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        sqlx::query(&upsert).execute(&mut *tx).await?;
        sqlx::query(&audit_insert(&audit)).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_modes(&self) -> Result<Vec<(Brand, OperationMode)>> {
        let query = Query::select()
            .columns([BrandModes::Brand, BrandModes::Mode])
            .from(BrandModes::Table)
            .order_by(BrandModes::Brand, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<(Brand, OperationMode)> {
                let brand: String = row.try_get("brand")?;
                let mode: String = row.try_get("mode")?;
                Ok((Brand::new(brand), parse_mode(&mode)?))
            })
            .collect()
    }
}
