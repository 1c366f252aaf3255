//! SQLite implementations of the storage interfaces.
//!
//! Adapter and hub open the same database file, so brand modes and unit
//! mappings have exactly one durable home.

use std::time::Duration;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sea_query::{Query, SqliteQueryBuilder};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;

use crate::config::StorageConfig;
use crate::interfaces::{AuditRecord, Result, StoreError};

use super::schema::{AuditLog, CREATE_TABLES};

mod audit;
mod booking_store;
mod directory;
mod mapping_store;
mod mode_store;
mod status_store;
mod webhook_store;


pub use audit::SqliteAuditLog;
pub use booking_store::SqliteBookingStore;
pub use directory::{SqliteLedgerReader, SqliteUnitDirectory};
pub use mapping_store::SqliteMappingStore;
pub use mode_store::SqliteModeStore;
pub use status_store::{SqliteExternalStatusStore, SqliteSnapshotStore};
pub use webhook_store::SqliteWebhookEventStore;

const IN_MEMORY: &str = ":memory:";

/// Open a pool for the configured database path.
///
/// `:memory:` yields a single-connection pool that never recycles its
/// connection, otherwise the database would vanish between queries.
pub async fn connect(config: &StorageConfig) -> Result<SqlitePool> {
    if config.path == IN_MEMORY {
        let opts = SqliteConnectOptions::new()
            .filename(IN_MEMORY)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?;
        return Ok(pool);
    }

    if let Some(parent) = std::path::Path::new(&config.path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Database(format!("{}: {}", parent.display(), e)))?;
        }
    }

    let opts = SqliteConnectOptions::new()
        .filename(&config.path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(config.busy_timeout_ms))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(opts)
        .await?;
    Ok(pool)
}

/// Create every table and index if missing.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    for statement in CREATE_TABLES {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

pub(crate) fn fmt_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| StoreError::InvalidTimestamp(format!("{}: {}", value, e)))
}

/// Fixed-width UTC timestamps so that text comparison orders correctly.
pub(crate) fn fmt_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidTimestamp(format!("{}: {}", value, e)))
}

/// INSERT statement for one audit row, run inside the caller's transaction.
pub(crate) fn audit_insert(record: &AuditRecord) -> String {
    Query::insert()
        .into_table(AuditLog::Table)
        .columns([
            AuditLog::Actor,
            AuditLog::Action,
            AuditLog::Subject,
            AuditLog::Detail,
            AuditLog::At,
        ])
        .values_panic([
            record.actor.as_str().into(),
            record.action.as_str().into(),
            record.subject.as_str().into(),
            record.detail.as_str().into(),
            fmt_ts(record.at).into(),
        ])
        .to_string(SqliteQueryBuilder)
}
