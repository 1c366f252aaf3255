//! Where the writer lock reads a brand's operation mode from.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use rentsync_policy::OperationMode;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::Brand;
use crate::interfaces::{ModeStore, Result};

/// Resolves the current operation mode of a brand.
#[async_trait]
pub trait ModeSource: Send + Sync {
    async fn mode_for(&self, brand: &Brand) -> Result<OperationMode>;
}

/// Reads the shared mode table, falling back to a default for brands with
/// no row.
pub struct StoreModeSource {
    store: Arc<dyn ModeStore>,
    default_mode: OperationMode,
}

impl StoreModeSource {
    pub fn new(store: Arc<dyn ModeStore>, default_mode: OperationMode) -> Self {
        Self {
            store,
            default_mode,
        }
    }
}

#[async_trait]
impl ModeSource for StoreModeSource {
    async fn mode_for(&self, brand: &Brand) -> Result<OperationMode> {
        Ok(self
            .store
            .get_mode(brand)
            .await?
            .unwrap_or(self.default_mode))
    }
}

/// Caches modes for at most `ttl`.
///
/// The TTL bounds how long a mode change in the shared store can take to
/// reach this process. Failed lookups are not cached.
pub struct CachedModeSource {
    inner: Arc<dyn ModeSource>,
    ttl: Duration,
    cache: RwLock<HashMap<Brand, (OperationMode, Instant)>>,
}

impl CachedModeSource {
    pub fn new(inner: Arc<dyn ModeSource>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Drop a cached entry so the next lookup reads through.
    pub async fn invalidate(&self, brand: &Brand) {
        self.cache.write().await.remove(brand);
    }
}

#[async_trait]
impl ModeSource for CachedModeSource {
    async fn mode_for(&self, brand: &Brand) -> Result<OperationMode> {
        if let Some((mode, fetched_at)) = self.cache.read().await.get(brand) {
            if fetched_at.elapsed() < self.ttl {
                return Ok(*mode);
            }
        }

        let mode = self.inner.mode_for(brand).await?;
        debug!(brand = %brand, mode = %mode, "brand mode refreshed");
        self.cache
            .write()
            .await
            .insert(brand.clone(), (mode, Instant::now()));
        Ok(mode)
    }
}
