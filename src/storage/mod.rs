//! Storage implementations.

use std::sync::Arc;

#[cfg(feature = "sqlite")]
use tracing::info;

#[cfg(feature = "sqlite")]
use crate::config::StorageConfig;
use crate::interfaces::{
    AuditLog, BookingStore, ExternalStatusStore, LedgerReader, MappingStore, ModeStore,
    SnapshotStore, UnitDirectory, WebhookEventStore,
};

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

/// Every store a service needs, backed by one shared database.
#[derive(Clone)]
pub struct Stores {
    pub modes: Arc<dyn ModeStore>,
    pub mappings: Arc<dyn MappingStore>,
    pub webhooks: Arc<dyn WebhookEventStore>,
    pub bookings: Arc<dyn BookingStore>,
    pub external_status: Arc<dyn ExternalStatusStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub units: Arc<dyn UnitDirectory>,
    pub ledger: Arc<dyn LedgerReader>,
    pub audit: Arc<dyn AuditLog>,
}

#[cfg(feature = "sqlite")]
impl Stores {
    /// Build every store over one pool.
    pub fn sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            modes: Arc::new(sqlite::SqliteModeStore::new(pool.clone())),
            mappings: Arc::new(sqlite::SqliteMappingStore::new(pool.clone())),
            webhooks: Arc::new(sqlite::SqliteWebhookEventStore::new(pool.clone())),
            bookings: Arc::new(sqlite::SqliteBookingStore::new(pool.clone())),
            external_status: Arc::new(sqlite::SqliteExternalStatusStore::new(pool.clone())),
            snapshots: Arc::new(sqlite::SqliteSnapshotStore::new(pool.clone())),
            units: Arc::new(sqlite::SqliteUnitDirectory::new(pool.clone())),
            ledger: Arc::new(sqlite::SqliteLedgerReader::new(pool.clone())),
            audit: Arc::new(sqlite::SqliteAuditLog::new(pool)),
        }
    }
}

/// Initialize storage based on configuration.
///
/// Opens the shared database, creates missing tables and returns the store
/// bundle together with the pool (tests seed consumed tables through it).
#[cfg(feature = "sqlite")]
pub async fn init_storage(
    config: &StorageConfig,
) -> Result<(Stores, sqlx::SqlitePool), Box<dyn std::error::Error>> {
    info!(path = %config.path, "opening storage");

    let pool = sqlite::connect(config).await?;
    sqlite::init_schema(&pool).await?;
    Ok((Stores::sqlite(pool.clone()), pool))
}
