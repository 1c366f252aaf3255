//! Per-brand operation mode storage interface.

use async_trait::async_trait;
use rentsync_policy::OperationMode;

use super::{AuditRecord, Result};
use crate::domain::Brand;

/// Shared durable source of the operation mode for every brand.
///
/// Adapter and hub point at the same store so they cannot be configured
/// independently. A mode change is a single-row upsert.
#[async_trait]
pub trait ModeStore: Send + Sync {
    async fn get_mode(&self, brand: &Brand) -> Result<Option<OperationMode>>;

    async fn set_mode(&self, brand: &Brand, mode: OperationMode, audit: AuditRecord) -> Result<()>;

    async fn list_modes(&self) -> Result<Vec<(Brand, OperationMode)>>;
}
