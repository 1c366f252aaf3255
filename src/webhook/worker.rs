//! Asynchronous processing of persisted webhook events.
//!
//! Every persisted event ends `DONE` or `FAILED`. The worker claims an
//! event (`PENDING → PROCESSING`), runs the handler and retries transient
//! failures with backoff up to the event's `max_retries`. Events that fail
//! for good are marked `FAILED` and published to the DLQ. The backfill
//! sweep covers jobs the queue never delivered and workers that died
//! mid-event.

use std::sync::Arc;
use std::time::Duration;

use backon::{BackoffBuilder, ExponentialBuilder};
use chrono::Utc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, error, info, warn};

use super::handler::WebhookEventHandler;
use crate::bus::{JobReceiver, QueueError, WebhookJob, WebhookQueue};
use crate::config::WebhookConfig;
use crate::dlq::{DeadLetterPublisher, WebhookDeadLetter};
use crate::domain::{WebhookEvent, WebhookStatus};
use crate::interfaces::{StoreError, WebhookEventStore};
use crate::utils::retry::webhook_backoff;

/// Events picked up per backfill sweep.
const BACKFILL_BATCH: u32 = 500;

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Final state reached by one `process` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    Done,
    Failed,
    /// Not claimable: already terminal, or another worker holds it.
    Skipped,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub reset_stale: u64,
    pub enqueued: usize,
    pub processed_inline: usize,
}

pub struct WebhookWorker {
    store: Arc<dyn WebhookEventStore>,
    queue: Arc<dyn WebhookQueue>,
    handler: Arc<dyn WebhookEventHandler>,
    dlq: Arc<dyn DeadLetterPublisher>,
    backoff: ExponentialBuilder,
    stale_after: chrono::Duration,
    concurrency: usize,
}

impl WebhookWorker {
    pub fn new(
        config: &WebhookConfig,
        store: Arc<dyn WebhookEventStore>,
        queue: Arc<dyn WebhookQueue>,
        handler: Arc<dyn WebhookEventHandler>,
        dlq: Arc<dyn DeadLetterPublisher>,
    ) -> Self {
        Self {
            store,
            queue,
            handler,
            dlq,
            backoff: webhook_backoff(config.max_retries),
            stale_after: chrono::Duration::seconds(config.stale_after_secs as i64),
            concurrency: config.workers.max(1),
        }
    }

    /// Replace the retry backoff.
    pub fn with_backoff(mut self, backoff: ExponentialBuilder) -> Self {
        self.backoff = backoff;
        self
    }

    /// Process one event to a terminal state.
    #[tracing::instrument(skip(self))]
    pub async fn process(&self, event_id: &str) -> Result<ProcessOutcome, WorkerError> {
        let mut delays = self.backoff.build();

        loop {
            let Some(event) = self.store.claim(event_id).await? else {
                debug!("event not claimable, skipping");
                return Ok(ProcessOutcome::Skipped);
            };

            let err = match self.handler.handle(&event).await {
                Ok(()) => {
                    self.store.mark_done(event_id).await?;
                    info!(attempts = event.attempts, "webhook event processed");
                    return Ok(ProcessOutcome::Done);
                }
                Err(e) => e,
            };

            let message = err.to_string();
            let retryable = err.is_retryable();
            let delay = if retryable && !event.retries_exhausted() {
                delays.next()
            } else {
                None
            };

            let Some(delay) = delay else {
                self.store.mark_failed(event_id, &message).await?;
                error!(
                    attempts = event.attempts,
                    error = %message,
                    "webhook event failed permanently"
                );
                self.dead_letter(&event, &message, retryable).await;
                return Ok(ProcessOutcome::Failed);
            };

            self.store.mark_retry(event_id, &message).await?;
            warn!(
                attempts = event.attempts,
                max_retries = event.max_retries,
                delay = ?delay,
                error = %message,
                "webhook event failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn dead_letter(&self, event: &WebhookEvent, message: &str, transient: bool) {
        let letter = WebhookDeadLetter::from_processing_failure(event, message, transient)
            .with_metadata("status", WebhookStatus::Failed.as_str());
        if let Err(e) = self.dlq.publish(letter).await {
            error!(event_id = %event.event_id, error = %e, "failed to publish dead letter");
        }
    }

    async fn run_job(&self, job: WebhookJob) {
        match self.process(&job.event_id).await {
            Ok(outcome) => debug!(job_id = %job.job_id, outcome = ?outcome, "job finished"),
            Err(e) => error!(
                job_id = %job.job_id,
                error = %e,
                "job aborted, event left for backfill"
            ),
        }
        self.queue.complete(&job.job_id).await;
    }

    /// Consume jobs until the channel closes.
    pub async fn run(self: Arc<Self>, mut jobs: JobReceiver) {
        info!(concurrency = self.concurrency, "webhook worker started");
        let permits = Arc::new(Semaphore::new(self.concurrency));

        while let Some(job) = jobs.recv().await {
            let Ok(permit) = permits.clone().acquire_owned().await else {
                break;
            };
            let worker = self.clone();
            tokio::spawn(async move {
                worker.run_job(job).await;
                drop(permit);
            });
        }
        info!("webhook job channel closed, worker stopping");
    }

    /// Reset stale claims and hand every `PENDING` event to the queue.
    ///
    /// When the queue refuses a job as unavailable the event is processed
    /// inline instead.
    pub async fn requeue_pending(&self) -> Result<BackfillReport, WorkerError> {
        let mut report = BackfillReport {
            reset_stale: self.store.reset_stale(Utc::now() - self.stale_after).await?,
            ..Default::default()
        };
        if report.reset_stale > 0 {
            warn!(count = report.reset_stale, "reset stale PROCESSING events");
        }

        let pending = self
            .store
            .list_by_status(WebhookStatus::Pending, BACKFILL_BATCH)
            .await?;
        for event in pending {
            match self.queue.enqueue(WebhookJob::for_event(&event.event_id)).await {
                Ok(_) => report.enqueued += 1,
                Err(QueueError::Unavailable) => {
                    if let Err(e) = self.process(&event.event_id).await {
                        error!(event_id = %event.event_id, error = %e, "inline processing failed");
                    }
                    report.processed_inline += 1;
                }
                Err(e) => {
                    warn!(error = %e, "queue refused backfill job, stopping sweep");
                    break;
                }
            }
        }

        if report.enqueued + report.processed_inline > 0 {
            info!(
                enqueued = report.enqueued,
                processed_inline = report.processed_inline,
                "webhook backfill sweep"
            );
        }
        Ok(report)
    }

    /// Run `requeue_pending` now and then every `every`. A zero period runs
    /// the sweep once.
    pub fn spawn_backfill(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            if every.is_zero() {
                if let Err(e) = self.requeue_pending().await {
                    error!(error = %e, "webhook backfill failed");
                }
                return;
            }

            let mut ticker = interval(every);
            loop {
                ticker.tick().await;
                if let Err(e) = self.requeue_pending().await {
                    warn!(error = %e, "webhook backfill failed");
                }
            }
        })
    }
}
