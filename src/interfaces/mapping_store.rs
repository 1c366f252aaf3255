//! Unit control mapping storage interface.

use std::collections::HashSet;

use async_trait::async_trait;

use super::{AuditRecord, Result};
use crate::domain::{UnitControlMapping, UnitId};

/// Read-mostly store of unit ↔ channel-manager bindings.
///
/// Reads happen on every guarded write and every reconciliation run.
/// Writes only come from audited admin operations; each write carries the
/// audit record that must be persisted with it.
#[async_trait]
pub trait MappingStore: Send + Sync {
    async fn get(&self, unit_id: &UnitId) -> Result<Option<UnitControlMapping>>;

    /// Resolve a mapping from channel-manager identifiers.
    ///
    /// A mapping with a room id matches only that room; a mapping without
    /// one matches any room of the property.
    async fn find_by_external(
        &self,
        property_id: &str,
        room_id: Option<&str>,
    ) -> Result<Option<UnitControlMapping>>;

    async fn list(&self) -> Result<Vec<UnitControlMapping>>;

    /// Units whose source of truth is `EXTERNAL`.
    async fn controlled_unit_ids(&self) -> Result<HashSet<UnitId>>;

    /// Create or replace the mapping for `mapping.unit_id`.
    async fn upsert(&self, mapping: UnitControlMapping, audit: AuditRecord) -> Result<()>;

    /// Remove a mapping. Returns false when none existed.
    async fn delete(&self, unit_id: &UnitId, audit: AuditRecord) -> Result<bool>;
}
