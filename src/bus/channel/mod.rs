//! In-memory channel-based webhook queue.
//!
//! Uses a bounded tokio mpsc channel within a single process. Job ids are
//! tracked from enqueue until `complete`, so a job already waiting or
//! running is not queued twice.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::debug;

use super::{EnqueueOutcome, QueueError, Result, WebhookJob, WebhookQueue};

/// Receiving half handed to the worker.
pub type JobReceiver = mpsc::Receiver<WebhookJob>;

pub struct ChannelWebhookQueue {
    sender: mpsc::Sender<WebhookJob>,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl ChannelWebhookQueue {
    pub fn new(capacity: usize) -> (Self, JobReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender,
                in_flight: Arc::new(Mutex::new(HashSet::new())),
            },
            receiver,
        )
    }

    pub async fn in_flight_count(&self) -> usize {
        self.in_flight.lock().await.len()
    }
}

#[async_trait]
impl WebhookQueue for ChannelWebhookQueue {
    async fn enqueue(&self, job: WebhookJob) -> Result<EnqueueOutcome> {
        let mut in_flight = self.in_flight.lock().await;
        if in_flight.contains(&job.job_id) {
            debug!(job_id = %job.job_id, "job already queued");
            return Ok(EnqueueOutcome::AlreadyQueued);
        }

        let job_id = job.job_id.clone();
        self.sender.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })?;
        in_flight.insert(job_id);
        Ok(EnqueueOutcome::Enqueued)
    }

    async fn complete(&self, job_id: &str) {
        self.in_flight.lock().await.remove(job_id);
    }

    fn is_available(&self) -> bool {
        !self.sender.is_closed()
    }
}

#[cfg(test)]
mod tests;
