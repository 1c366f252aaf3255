//! Job queue between webhook ingestion and the worker.
//!
//! This module contains:
//! - `WebhookQueue` trait: hand a persisted event to the worker
//! - `WebhookJob`: the queued unit of work, keyed by `webhook:{event_id}`
//! - Implementations: in-process channel, none, mock
//!
//! The queue is a delivery hint. The event table is the durable record, so
//! a lost or refused job only delays processing until the next backfill.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{QueueConfig, QueueType};

pub mod channel;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use channel::{ChannelWebhookQueue, JobReceiver};
#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockWebhookQueue;

/// Job id prefix. The queue dedups on the full job id.
pub const JOB_ID_PREFIX: &str = "webhook:";

/// Result type for queue operations.
pub type Result<T> = std::result::Result<T, QueueError>;

/// Errors that can occur during queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("Queue unavailable")]
    Unavailable,

    #[error("Queue full")]
    Full,

    #[error("Queue closed")]
    Closed,
}

/// One unit of work: process the stored event with this id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookJob {
    pub job_id: String,
    pub event_id: String,
}

impl WebhookJob {
    pub fn for_event(event_id: &str) -> Self {
        Self {
            job_id: format!("{}{}", JOB_ID_PREFIX, event_id),
            event_id: event_id.to_string(),
        }
    }
}

/// Outcome of enqueueing a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    /// A job with the same id is already waiting or running.
    AlreadyQueued,
}

/// Interface for handing webhook jobs to a worker.
#[async_trait]
pub trait WebhookQueue: Send + Sync {
    async fn enqueue(&self, job: WebhookJob) -> Result<EnqueueOutcome>;

    /// Release the job id once the worker is done with it.
    async fn complete(&self, job_id: &str);

    /// Whether jobs can currently be accepted.
    fn is_available(&self) -> bool;
}

/// Queue that accepts nothing. Events wait for the backfill.
pub struct NoopWebhookQueue;

#[async_trait]
impl WebhookQueue for NoopWebhookQueue {
    async fn enqueue(&self, _job: WebhookJob) -> Result<EnqueueOutcome> {
        Err(QueueError::Unavailable)
    }

    async fn complete(&self, _job_id: &str) {}

    fn is_available(&self) -> bool {
        false
    }
}

/// Initialize the queue based on configuration.
///
/// Returns the queue handle and, for in-process queues, the receiver the
/// worker consumes.
pub fn init_queue(config: &QueueConfig) -> (Arc<dyn WebhookQueue>, Option<JobReceiver>) {
    match config.queue_type {
        QueueType::Channel => {
            info!(capacity = config.capacity, "Webhook queue: channel");
            let (queue, receiver) = ChannelWebhookQueue::new(config.capacity);
            (Arc::new(queue), Some(receiver))
        }
        QueueType::None => {
            info!("Webhook queue: none, events are processed by backfill only");
            (Arc::new(NoopWebhookQueue), None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_id_format() {
        let job = WebhookJob::for_event("evt-42");
        assert_eq!(job.job_id, "webhook:evt-42");
        assert_eq!(job.event_id, "evt-42");
    }

    #[tokio::test]
    async fn test_noop_queue_is_unavailable() {
        let queue = NoopWebhookQueue;
        assert!(!queue.is_available());
        assert!(matches!(
            queue.enqueue(WebhookJob::for_event("evt-1")).await,
            Err(QueueError::Unavailable)
        ));
    }

    #[test]
    fn test_init_queue_none_has_no_receiver() {
        let config = QueueConfig {
            queue_type: QueueType::None,
            capacity: 8,
        };
        let (queue, receiver) = init_queue(&config);
        assert!(!queue.is_available());
        assert!(receiver.is_none());
    }
}
