//! Abstract interfaces for rentsync components.
//!
//! These traits define the contracts for:
//! - Unit control mappings and per-brand operation modes (shared config truth)
//! - Webhook event persistence (dedup + status lifecycle)
//! - Local bookings, ingested external status and daily snapshots
//! - Consumed collaborators: unit directory and payment ledger (read-only)
//! - Audit trail for privileged admin mutations

pub mod audit;
pub mod booking_store;
pub mod directory;
pub mod mapping_store;
pub mod mode_store;
pub mod status_store;
pub mod webhook_store;

pub use audit::{AuditLog, AuditRecord};
pub use booking_store::BookingStore;
pub use directory::{LedgerReader, UnitDirectory};
pub use mapping_store::MappingStore;
pub use mode_store::ModeStore;
pub use status_store::{ExternalStatusStore, SnapshotStore};
pub use webhook_store::{InsertOutcome, WebhookEventStore};

use crate::domain::ParseEnumError;

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflicting write: {0}")]
    Conflict(String),

    #[error("Invalid stored value: {0}")]
    InvalidValue(#[from] ParseEnumError),

    #[error("Invalid stored timestamp or date: {0}")]
    InvalidTimestamp(String),

    #[error("Store unavailable")]
    Unavailable,
}

#[cfg(feature = "sqlite")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}
