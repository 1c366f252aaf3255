//! Mock storage implementations for testing.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use rentsync_policy::OperationMode;
use tokio::sync::RwLock;

use crate::domain::{Brand, UnitControlMapping, UnitId};
use crate::interfaces::{AuditRecord, MappingStore, ModeStore, Result, StoreError};

/// Mock mode store that stores brand modes in memory.
#[derive(Default)]
pub struct MockModeStore {
    modes: RwLock<HashMap<Brand, OperationMode>>,
    audit: RwLock<Vec<AuditRecord>>,
    fail_on_get: RwLock<bool>,
    reads: AtomicUsize,
}

impl MockModeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_mode(brand: &str, mode: OperationMode) -> Self {
        let store = Self::new();
        store.modes.write().await.insert(Brand::new(brand), mode);
        store
    }

    pub async fn set_fail_on_get(&self, fail: bool) {
        *self.fail_on_get.write().await = fail;
    }

    /// Number of `get_mode` calls that reached the store.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.read().await.clone()
    }
}

#[async_trait]
impl ModeStore for MockModeStore {
    async fn get_mode(&self, brand: &Brand) -> Result<Option<OperationMode>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if *self.fail_on_get.read().await {
            return Err(StoreError::Unavailable);
        }
        Ok(self.modes.read().await.get(brand).copied())
    }

    async fn set_mode(&self, brand: &Brand, mode: OperationMode, audit: AuditRecord) -> Result<()> {
        self.modes.write().await.insert(brand.clone(), mode);
        self.audit.write().await.push(audit);
        Ok(())
    }

    async fn list_modes(&self) -> Result<Vec<(Brand, OperationMode)>> {
        let mut modes: Vec<_> = self
            .modes
            .read()
            .await
            .iter()
            .map(|(b, m)| (b.clone(), *m))
            .collect();
        modes.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(modes)
    }
}

/// Mock mapping store that stores unit mappings in memory.
#[derive(Default)]
pub struct MockMappingStore {
    mappings: RwLock<HashMap<UnitId, UnitControlMapping>>,
    audit: RwLock<Vec<AuditRecord>>,
    fail_on_read: RwLock<bool>,
}

impl MockMappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, mapping: UnitControlMapping) {
        self.mappings
            .write()
            .await
            .insert(mapping.unit_id.clone(), mapping);
    }

    pub async fn set_fail_on_read(&self, fail: bool) {
        *self.fail_on_read.write().await = fail;
    }

    pub async fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit.read().await.clone()
    }

    async fn check_read(&self) -> Result<()> {
        if *self.fail_on_read.read().await {
            return Err(StoreError::Unavailable);
        }
        Ok(())
    }
}

#[async_trait]
impl MappingStore for MockMappingStore {
    async fn get(&self, unit_id: &UnitId) -> Result<Option<UnitControlMapping>> {
        self.check_read().await?;
        Ok(self.mappings.read().await.get(unit_id).cloned())
    }

    async fn find_by_external(
        &self,
        property_id: &str,
        room_id: Option<&str>,
    ) -> Result<Option<UnitControlMapping>> {
        self.check_read().await?;
        let mappings = self.mappings.read().await;
        let candidates: Vec<_> = mappings
            .values()
            .filter(|m| m.external_property_id == property_id)
            .collect();
        let exact = room_id.and_then(|room| {
            candidates
                .iter()
                .find(|m| m.external_room_id.as_deref() == Some(room))
        });
        let found = exact.or_else(|| candidates.iter().find(|m| m.external_room_id.is_none()));
        Ok(found.map(|m| (*m).clone()))
    }

    async fn list(&self) -> Result<Vec<UnitControlMapping>> {
        self.check_read().await?;
        let mut all: Vec<_> = self.mappings.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.unit_id.cmp(&b.unit_id));
        Ok(all)
    }

    async fn controlled_unit_ids(&self) -> Result<HashSet<UnitId>> {
        self.check_read().await?;
        Ok(self
            .mappings
            .read()
            .await
            .values()
            .filter(|m| m.is_external())
            .map(|m| m.unit_id.clone())
            .collect())
    }

    async fn upsert(&self, mapping: UnitControlMapping, audit: AuditRecord) -> Result<()> {
        self.insert(mapping).await;
        self.audit.write().await.push(audit);
        Ok(())
    }

    async fn delete(&self, unit_id: &UnitId, audit: AuditRecord) -> Result<bool> {
        let removed = self.mappings.write().await.remove(unit_id).is_some();
        if removed {
            self.audit.write().await.push(audit);
        }
        Ok(removed)
    }
}
