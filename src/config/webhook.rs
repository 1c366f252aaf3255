//! Webhook ingestion configuration.

use serde::Deserialize;

/// Queue implementation handing persisted events to the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    /// In-process tokio channel.
    #[default]
    Channel,
    /// No queue. Events stay `PENDING` until a backfill picks them up.
    None,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    #[serde(rename = "type")]
    pub queue_type: QueueType,
    /// Channel capacity.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            queue_type: QueueType::Channel,
            capacity: 1024,
        }
    }
}

/// Inbound channel-manager webhook settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Feature gate. When false the endpoint answers 204 and reads nothing.
    pub enabled: bool,
    /// Route the endpoint is mounted at. The status route is `{path}/status`.
    pub path: String,
    /// Header carrying the shared secret.
    pub secret_header: String,
    /// Shared secret. Requests are rejected while unset.
    pub secret: Option<String>,
    /// Exact IPs or CIDR blocks. Empty means no restriction.
    pub ip_allowlist: Vec<String>,
    /// Processing attempts before an event is marked `FAILED`.
    pub max_retries: u32,
    /// `PROCESSING` rows older than this are reset by the backfill.
    pub stale_after_secs: u64,
    /// Seconds between backfill sweeps. 0 runs the sweep at startup only.
    pub backfill_interval_secs: u64,
    /// Jobs processed concurrently by the worker.
    pub workers: usize,
    pub queue: QueueConfig,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: "/webhooks/channel-manager".to_string(),
            secret_header: "x-webhook-secret".to_string(),
            secret: None,
            ip_allowlist: Vec::new(),
            max_retries: 5,
            stale_after_secs: 300,
            backfill_interval_secs: 60,
            workers: 4,
            queue: QueueConfig::default(),
        }
    }
}

impl WebhookConfig {
    pub fn status_path(&self) -> String {
        format!("{}/status", self.path.trim_end_matches('/'))
    }

    pub fn authentication_configured(&self) -> bool {
        self.secret.as_deref().is_some_and(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webhook_disabled_by_default() {
        let config = WebhookConfig::default();
        assert!(!config.enabled);
        assert!(!config.authentication_configured());
        assert_eq!(config.status_path(), "/webhooks/channel-manager/status");
        assert_eq!(config.queue.queue_type, QueueType::Channel);
    }

    #[test]
    fn test_empty_secret_is_not_configured() {
        let config = WebhookConfig {
            secret: Some(String::new()),
            ..Default::default()
        };
        assert!(!config.authentication_configured());
    }
}
