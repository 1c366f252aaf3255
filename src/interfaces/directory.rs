//! Consumed read-only collaborators: property CRUD and the payment ledger.

use async_trait::async_trait;

use super::Result;
use crate::domain::{BuildingId, LedgerEntry, LedgerFilter, UnitId, UnitRecord};

/// Unit attributes owned by property CRUD.
#[async_trait]
pub trait UnitDirectory: Send + Sync {
    /// All units, optionally restricted to one building.
    async fn units(&self, building: Option<&BuildingId>) -> Result<Vec<UnitRecord>>;

    async fn unit(&self, unit_id: &UnitId) -> Result<Option<UnitRecord>>;
}

/// Read access to the payment ledger. There is no write path from this crate.
#[async_trait]
pub trait LedgerReader: Send + Sync {
    async fn entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>>;
}
