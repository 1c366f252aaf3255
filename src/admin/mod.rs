//! Audited administrative mutations of shared configuration.
//!
//! These are the only writers of brand modes and unit control mappings.
//! Every change is persisted together with its audit row and mirrored as an
//! `info` event on the `rentsync::audit` tracing target.

use std::sync::Arc;

use chrono::Utc;
use rentsync_policy::OperationMode;
use serde_json::json;
use tracing::info;

use crate::domain::{Brand, SourceOfTruth, UnitControlMapping, UnitId};
use crate::interfaces::{AuditLog, AuditRecord, MappingStore, ModeStore, StoreError};
use crate::writer_lock::CachedModeSource;

/// Tracing target for audit events.
pub const AUDIT_TARGET: &str = "rentsync::audit";

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("unit {0} is not linked")]
    NotLinked(UnitId),

    #[error("invalid request: {0}")]
    Invalid(String),
}

pub struct AdminService {
    modes: Arc<dyn ModeStore>,
    mappings: Arc<dyn MappingStore>,
    audit: Arc<dyn AuditLog>,
    mode_cache: Option<Arc<CachedModeSource>>,
}

impl AdminService {
    pub fn new(
        modes: Arc<dyn ModeStore>,
        mappings: Arc<dyn MappingStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            modes,
            mappings,
            audit,
            mode_cache: None,
        }
    }

    /// Drop this service's cached mode when a brand's mode changes.
    pub fn with_mode_cache(mut self, cache: Arc<CachedModeSource>) -> Self {
        self.mode_cache = Some(cache);
        self
    }

    pub async fn set_brand_mode(
        &self,
        brand: &Brand,
        mode: OperationMode,
        actor: &str,
    ) -> Result<(), AdminError> {
        let previous = self.modes.get_mode(brand).await?;
        let record = AuditRecord::new(
            actor,
            "set_brand_mode",
            brand.as_str(),
            json!({ "mode": mode, "previous": previous }).to_string(),
        );
        self.modes.set_mode(brand, mode, record).await?;
        if let Some(cache) = &self.mode_cache {
            cache.invalidate(brand).await;
        }

        info!(
            target: AUDIT_TARGET,
            actor,
            action = "set_brand_mode",
            brand = %brand,
            mode = %mode,
            previous = ?previous,
            "brand operation mode changed"
        );
        Ok(())
    }

    pub async fn link_unit(
        &self,
        mut mapping: UnitControlMapping,
        actor: &str,
    ) -> Result<UnitControlMapping, AdminError> {
        if mapping.unit_id.as_str().trim().is_empty() {
            return Err(AdminError::Invalid("unitId is required".to_string()));
        }
        if mapping.external_property_id.trim().is_empty() {
            return Err(AdminError::Invalid(
                "externalPropertyId is required".to_string(),
            ));
        }
        mapping.updated_at = Utc::now();

        let record = AuditRecord::new(
            actor,
            "link_unit",
            mapping.unit_id.as_str(),
            json!(mapping).to_string(),
        );
        self.mappings.upsert(mapping.clone(), record).await?;

        info!(
            target: AUDIT_TARGET,
            actor,
            action = "link_unit",
            unit_id = %mapping.unit_id,
            external_property_id = %mapping.external_property_id,
            source_of_truth = mapping.source_of_truth.as_str(),
            "unit linked to channel manager"
        );
        Ok(mapping)
    }

    pub async fn set_source_of_truth(
        &self,
        unit_id: &UnitId,
        source_of_truth: SourceOfTruth,
        actor: &str,
    ) -> Result<UnitControlMapping, AdminError> {
        let Some(mut mapping) = self.mappings.get(unit_id).await? else {
            return Err(AdminError::NotLinked(unit_id.clone()));
        };
        let previous = mapping.source_of_truth;
        mapping.source_of_truth = source_of_truth;
        mapping.updated_at = Utc::now();

        let record = AuditRecord::new(
            actor,
            "set_source_of_truth",
            unit_id.as_str(),
            json!({ "sourceOfTruth": source_of_truth, "previous": previous }).to_string(),
        );
        self.mappings.upsert(mapping.clone(), record).await?;

        info!(
            target: AUDIT_TARGET,
            actor,
            action = "set_source_of_truth",
            unit_id = %unit_id,
            source_of_truth = source_of_truth.as_str(),
            previous = previous.as_str(),
            "unit source of truth changed"
        );
        Ok(mapping)
    }

    pub async fn unlink_unit(&self, unit_id: &UnitId, actor: &str) -> Result<(), AdminError> {
        let record = AuditRecord::new(actor, "unlink_unit", unit_id.as_str(), "{}");
        if !self.mappings.delete(unit_id, record).await? {
            return Err(AdminError::NotLinked(unit_id.clone()));
        }

        info!(
            target: AUDIT_TARGET,
            actor,
            action = "unlink_unit",
            unit_id = %unit_id,
            "unit unlinked from channel manager"
        );
        Ok(())
    }

    pub async fn modes(&self) -> Result<Vec<(Brand, OperationMode)>, AdminError> {
        Ok(self.modes.list_modes().await?)
    }

    pub async fn mappings(&self) -> Result<Vec<UnitControlMapping>, AdminError> {
        Ok(self.mappings.list().await?)
    }

    pub async fn recent_audit(&self, limit: u32) -> Result<Vec<AuditRecord>, AdminError> {
        Ok(self.audit.recent(limit).await?)
    }
}
