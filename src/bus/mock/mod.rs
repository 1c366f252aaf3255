//! Mock webhook queue for testing.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{EnqueueOutcome, QueueError, Result, WebhookJob, WebhookQueue};

/// Records enqueued jobs; can be told to fail.
#[derive(Default)]
pub struct MockWebhookQueue {
    jobs: RwLock<Vec<WebhookJob>>,
    completed: RwLock<Vec<String>>,
    fail_on_enqueue: RwLock<bool>,
}

impl MockWebhookQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_fail_on_enqueue(&self, fail: bool) {
        *self.fail_on_enqueue.write().await = fail;
    }

    pub async fn enqueued(&self) -> Vec<WebhookJob> {
        self.jobs.read().await.clone()
    }

    pub async fn completed(&self) -> Vec<String> {
        self.completed.read().await.clone()
    }
}

#[async_trait]
impl WebhookQueue for MockWebhookQueue {
    async fn enqueue(&self, job: WebhookJob) -> Result<EnqueueOutcome> {
        if *self.fail_on_enqueue.read().await {
            return Err(QueueError::Unavailable);
        }
        let mut jobs = self.jobs.write().await;
        if jobs.iter().any(|j| j.job_id == job.job_id) {
            return Ok(EnqueueOutcome::AlreadyQueued);
        }
        jobs.push(job);
        Ok(EnqueueOutcome::Enqueued)
    }

    async fn complete(&self, job_id: &str) {
        self.completed.write().await.push(job_id.to_string());
    }

    fn is_available(&self) -> bool {
        true
    }
}
