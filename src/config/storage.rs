//! Storage configuration types.

use serde::Deserialize;

/// SQLite database shared by adapter and hub.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Database file path, or `:memory:`.
    pub path: String,
    /// Maximum pooled connections (file databases only).
    pub max_connections: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "data/rentsync.db".to_string(),
            max_connections: 5,
            busy_timeout_ms: 30_000,
        }
    }
}

impl StorageConfig {
    /// Config for an isolated in-memory database.
    pub fn in_memory() -> Self {
        Self {
            path: ":memory:".to_string(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_config_default() {
        let storage = StorageConfig::default();
        assert_eq!(storage.path, "data/rentsync.db");
        assert_eq!(storage.max_connections, 5);
        assert_eq!(StorageConfig::in_memory().path, ":memory:");
    }
}
