//! Application configuration.
//!
//! Aggregates configuration from all modules into a single Config struct
//! that can be loaded from YAML files or environment variables.

mod brands;
mod server;
mod storage;
mod webhook;

pub use brands::{validate_brand_rules, BrandRule, WriterLockConfig};
pub use server::{AdminConfig, ChannelManagerConfig, ConfigError, ServerConfig, ServiceConfig};
pub use storage::StorageConfig;
pub use webhook::{QueueConfig, QueueType, WebhookConfig};

use rentsync_policy::WriterRole;
use serde::Deserialize;

use crate::domain::Brand;
use crate::webhook::IpAllowlist;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";
/// Environment variable for configuration file path.
pub const CONFIG_ENV_VAR: &str = "RENTSYNC_CONFIG";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "RENTSYNC";
/// Environment variable for logging configuration.
pub const LOG_ENV_VAR: &str = "RENTSYNC_LOG";

/// Daily snapshot scheduling (hub only).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    /// Seconds between snapshot passes. Zero disables the scheduler.
    pub snapshot_interval_secs: u64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            snapshot_interval_secs: 3_600,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub service: ServiceConfig,
    pub writer_lock: WriterLockConfig,
    /// Per-brand night-length rules.
    pub brands: Vec<BrandRule>,
    pub webhook: WebhookConfig,
    pub channel_manager: ChannelManagerConfig,
    pub admin: AdminConfig,
    pub reconciliation: ReconciliationConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// Configuration sources (in order of priority, later overrides earlier):
    /// 1. `config.yaml` in current directory (if exists)
    /// 2. File specified by `path` argument (if provided)
    /// 3. File specified by `CONFIG_ENV_VAR` environment variable (if set)
    /// 4. Environment variables with `CONFIG_ENV_PREFIX` prefix
    pub fn load(path: Option<&str>) -> Result<Self, Box<dyn std::error::Error>> {
        use ::config::{Config as ConfigLib, Environment, File, FileFormat};

        let mut builder = ConfigLib::builder()
            .add_source(File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false));

        if let Some(config_path) = path {
            builder = builder.add_source(File::new(config_path, FileFormat::Yaml).required(true));
        }

        if let Ok(config_path) = std::env::var(CONFIG_ENV_VAR) {
            builder = builder.add_source(File::new(&config_path, FileFormat::Yaml).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field rules that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_brand_rules(&self.brands)?;
        IpAllowlist::parse(&self.webhook.ip_allowlist)
            .map_err(|e| ConfigError::InvalidAllowlistEntry(e.to_string()))?;
        if self.writer_lock.mode_cache_ttl_ms > 60_000 {
            return Err(ConfigError::Invalid(
                "writer_lock.mode_cache_ttl_ms must not exceed 60000".to_string(),
            ));
        }
        Ok(())
    }

    /// Confirm a configured role assertion matches the running binary.
    pub fn check_role(&self, actual: WriterRole) -> Result<(), ConfigError> {
        match self.service.role {
            Some(configured) if configured != actual => {
                Err(ConfigError::RoleMismatch { configured, actual })
            }
            _ => Ok(()),
        }
    }

    /// Night rule for a brand, if one is configured.
    pub fn brand_rule(&self, brand: &Brand) -> Option<&BrandRule> {
        self.brands.iter().find(|r| &r.name == brand)
    }

    /// Create config for testing.
    pub fn for_test() -> Self {
        Self {
            storage: StorageConfig::in_memory(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert!(config.brands.is_empty());
        assert!(!config.webhook.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_for_test_uses_memory() {
        let config = Config::for_test();
        assert_eq!(config.storage.path, ":memory:");
    }

    #[test]
    fn test_role_mismatch_detected() {
        let mut config = Config::for_test();
        assert!(config.check_role(WriterRole::Hub).is_ok());
        config.service.role = Some(WriterRole::Adapter);
        assert!(config.check_role(WriterRole::Adapter).is_ok());
        assert!(matches!(
            config.check_role(WriterRole::Hub),
            Err(ConfigError::RoleMismatch { .. })
        ));
    }

    #[test]
    fn test_invalid_allowlist_rejected() {
        let mut config = Config::for_test();
        config.webhook.ip_allowlist = vec!["10.0.0.0/99".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidAllowlistEntry(_))
        ));
    }

    #[test]
    fn test_brand_rule_lookup_normalizes() {
        let mut config = Config::for_test();
        config.brands = vec![BrandRule {
            name: Brand::new("Monthly"),
            min_nights: 28,
            max_nights: 365,
        }];
        assert!(config.brand_rule(&Brand::new("MONTHLY")).is_some());
        assert!(config.brand_rule(&Brand::new("shortstay")).is_none());
    }
}
