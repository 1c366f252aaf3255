//! Webhook event storage interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Result;
use crate::domain::{NewWebhookEvent, WebhookEvent, WebhookStatus};

/// Outcome of inserting an event keyed by its external id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// A row with this event id already exists. Not an error.
    Duplicate,
}

/// Durable record of every inbound event. Rows are never deleted.
#[async_trait]
pub trait WebhookEventStore: Send + Sync {
    /// Insert a new `PENDING` row. The event id uniqueness constraint is the
    /// only dedup mechanism; a violation is reported as `Duplicate`.
    async fn insert(&self, event: NewWebhookEvent) -> Result<InsertOutcome>;

    async fn get(&self, event_id: &str) -> Result<Option<WebhookEvent>>;

    /// Atomically move a `PENDING` event to `PROCESSING` and count the
    /// attempt. Returns `None` if the event is not claimable.
    async fn claim(&self, event_id: &str) -> Result<Option<WebhookEvent>>;

    async fn mark_done(&self, event_id: &str) -> Result<()>;

    /// Return a `PROCESSING` event to `PENDING` after a failed attempt.
    async fn mark_retry(&self, event_id: &str, error: &str) -> Result<()>;

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<()>;

    async fn list_by_status(&self, status: WebhookStatus, limit: u32) -> Result<Vec<WebhookEvent>>;

    /// Reset `PROCESSING` rows not updated since `older_than` to `PENDING`.
    /// Returns the number of rows reset.
    async fn reset_stale(&self, older_than: DateTime<Utc>) -> Result<u64>;
}
