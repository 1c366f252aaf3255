//! Persisted inbound webhook events.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ParseEnumError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl WebhookStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookStatus::Pending => "PENDING",
            WebhookStatus::Processing => "PROCESSING",
            WebhookStatus::Done => "DONE",
            WebhookStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WebhookStatus::Done | WebhookStatus::Failed)
    }
}

impl FromStr for WebhookStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(WebhookStatus::Pending),
            "PROCESSING" => Ok(WebhookStatus::Processing),
            "DONE" => Ok(WebhookStatus::Done),
            "FAILED" => Ok(WebhookStatus::Failed),
            other => Err(ParseEnumError::new("webhook_status", other)),
        }
    }
}

/// Insert request for a freshly validated event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewWebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    /// Raw JSON body as received.
    pub payload: String,
    pub max_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    pub payload: String,
    pub status: WebhookStatus,
    pub attempts: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WebhookEvent {
    pub fn retries_exhausted(&self) -> bool {
        self.attempts >= self.max_retries
    }
}
