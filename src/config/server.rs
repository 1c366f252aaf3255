//! Server, service identity and outbound endpoint configuration.

use rentsync_policy::WriterRole;
use serde::Deserialize;

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to.
    pub host: String,
    /// Port for the HTTP API.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Identity of the running service.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Optional role assertion. Each binary has a fixed role; if this is
    /// set it must agree, which catches a config file deployed to the
    /// wrong service.
    pub role: Option<WriterRole>,
}

/// Channel manager API used by the adapter.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelManagerConfig {
    /// Base URL of the channel manager API.
    pub base_url: Option<String>,
    /// API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ChannelManagerConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_ms: 10_000,
        }
    }
}

/// Privileged admin routes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Header carrying the admin token.
    pub token_header: String,
    /// Admin token. Admin routes are not mounted when unset.
    pub token: Option<String>,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            token_header: "x-admin-token".to_string(),
            token: None,
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Brand '{brand}' has an invalid night range {min}..={max}")]
    InvalidNightRange { brand: String, min: u32, max: u32 },

    #[error("Brand '{0}' is configured more than once")]
    DuplicateBrand(String),

    #[error("Night ranges of '{previous}' and '{next}' overlap")]
    OverlappingNightRanges { previous: String, next: String },

    #[error("Night ranges of '{previous}' and '{next}' leave a gap")]
    NightRangeGap { previous: String, next: String },

    #[error("Invalid IP allowlist entry: {0}")]
    InvalidAllowlistEntry(String),

    #[error("Configured role '{configured}' does not match this service ({actual})")]
    RoleMismatch {
        configured: WriterRole,
        actual: WriterRole,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
