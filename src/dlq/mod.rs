//! Dead Letter Queue (DLQ) infrastructure.
//!
//! Webhook events that exhaust their retries are marked `FAILED` in the
//! event table and a dead letter is published here for manual review and
//! replay. The event row remains the durable record; the DLQ is the alert.
//!
//! ## Topic Naming
//!
//! DLQ topics follow the pattern: `rentsync.dlq.{source}`

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::domain::WebhookEvent;

/// DLQ topic prefix. Full topic: `{prefix}.{source}`
pub const DLQ_TOPIC_PREFIX: &str = "rentsync.dlq";

/// Build the DLQ topic name for an event source.
pub fn dlq_topic_for_source(source: &str) -> String {
    format!("{}.{}", DLQ_TOPIC_PREFIX, source)
}

/// Errors that can occur during DLQ operations.
#[derive(Debug, thiserror::Error)]
pub enum DlqError {
    #[error("Failed to publish to DLQ: {0}")]
    PublishFailed(String),
}

/// Dead letter for a webhook event that could not be processed.
#[derive(Debug, Clone)]
pub struct WebhookDeadLetter {
    pub event_id: String,
    pub event_type: String,
    pub source: String,
    /// Raw payload as received.
    pub payload: String,
    /// Human-readable reason for rejection.
    pub rejection_reason: String,
    pub attempts: u32,
    /// Whether the last failure looked transient (retry might succeed).
    pub is_transient: bool,
    pub occurred_at: DateTime<Utc>,
    /// Additional context.
    pub metadata: HashMap<String, String>,
}

impl WebhookDeadLetter {
    /// Create a dead letter from a failed event.
    pub fn from_processing_failure(event: &WebhookEvent, error: &str, is_transient: bool) -> Self {
        Self {
            event_id: event.event_id.clone(),
            event_type: event.event_type.clone(),
            source: event.source.clone(),
            payload: event.payload.clone(),
            rejection_reason: format!(
                "Webhook processing failed after {} attempts: {}",
                event.attempts, error
            ),
            attempts: event.attempts,
            is_transient,
            occurred_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Add metadata to the dead letter.
    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// Get the DLQ topic for this dead letter.
    pub fn topic(&self) -> String {
        dlq_topic_for_source(&self.source)
    }
}

/// Trait for publishing messages to a dead letter queue.
#[async_trait]
pub trait DeadLetterPublisher: Send + Sync {
    async fn publish(&self, dead_letter: WebhookDeadLetter) -> Result<(), DlqError>;
}

/// No-op DLQ publisher that logs but doesn't actually send anywhere.
pub struct NoopDeadLetterPublisher;

#[async_trait]
impl DeadLetterPublisher for NoopDeadLetterPublisher {
    async fn publish(&self, dead_letter: WebhookDeadLetter) -> Result<(), DlqError> {
        warn!(
            topic = %dead_letter.topic(),
            event_id = %dead_letter.event_id,
            reason = %dead_letter.rejection_reason,
            "DLQ not configured, logging dead letter"
        );
        Ok(())
    }
}

/// In-memory DLQ publisher using a channel.
pub struct ChannelDeadLetterPublisher {
    sender: mpsc::UnboundedSender<WebhookDeadLetter>,
}

impl ChannelDeadLetterPublisher {
    /// Returns the publisher and a receiver for consuming dead letters.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<WebhookDeadLetter>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

#[async_trait]
impl DeadLetterPublisher for ChannelDeadLetterPublisher {
    async fn publish(&self, dead_letter: WebhookDeadLetter) -> Result<(), DlqError> {
        info!(
            topic = %dead_letter.topic(),
            event_id = %dead_letter.event_id,
            reason = %dead_letter.rejection_reason,
            "Publishing to channel DLQ"
        );
        self.sender
            .send(dead_letter)
            .map_err(|e| DlqError::PublishFailed(e.to_string()))
    }
}
