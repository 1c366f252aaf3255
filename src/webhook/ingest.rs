//! Inbound pipeline: authenticate, validate, dedup, persist, enqueue.
//!
//! The event row is written before the job is handed to the queue, so a
//! queue failure only delays processing. Once the body has been read the
//! sender always gets a 2xx; retries from the channel manager are absorbed
//! by the event-id dedup.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::http::HeaderMap;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::allowlist::{client_ip, AllowlistError, IpAllowlist};
use super::auth::{verify_secret, AuthFailure};
use super::payload::ChannelManagerEvent;
use crate::bus::{EnqueueOutcome, QueueError, WebhookJob, WebhookQueue};
use crate::config::WebhookConfig;
use crate::domain::{NewWebhookEvent, WebhookStatus};
use crate::interfaces::{InsertOutcome, WebhookEventStore};

/// Source recorded on every event received through this endpoint.
pub const CHANNEL_MANAGER_SOURCE: &str = "channel-manager";

/// Result of running one request through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Feature gate off; nothing was read.
    Disabled,
    Unauthorized(AuthFailure),
    Forbidden(Option<IpAddr>),
    Invalid(String),
    Accepted(Acknowledgement),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Acknowledgement {
    pub received: bool,
    pub deduplicated: bool,
    pub event_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub internal_error: bool,
}

impl Acknowledgement {
    fn new(event_id: &str, deduplicated: bool) -> Self {
        Self {
            received: true,
            deduplicated,
            event_id: event_id.to_string(),
            internal_error: false,
        }
    }

    fn internal_error(event_id: &str) -> Self {
        Self {
            internal_error: true,
            ..Self::new(event_id, false)
        }
    }
}

/// Endpoint health, safe to expose: no secrets, no addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookStatusReport {
    pub enabled: bool,
    pub authentication_configured: bool,
    pub allowlist_entries: usize,
    pub queue_available: bool,
}

pub struct WebhookIngestor {
    config: WebhookConfig,
    allowlist: IpAllowlist,
    store: Arc<dyn WebhookEventStore>,
    queue: Arc<dyn WebhookQueue>,
}

impl WebhookIngestor {
    pub fn new(
        config: WebhookConfig,
        store: Arc<dyn WebhookEventStore>,
        queue: Arc<dyn WebhookQueue>,
    ) -> Result<Self, AllowlistError> {
        let allowlist = IpAllowlist::parse(&config.ip_allowlist)?;
        Ok(Self {
            config,
            allowlist,
            store,
            queue,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn status(&self) -> WebhookStatusReport {
        WebhookStatusReport {
            enabled: self.config.enabled,
            authentication_configured: self.config.authentication_configured(),
            allowlist_entries: self.allowlist.len(),
            queue_available: self.queue.is_available(),
        }
    }

    /// Run one request through the pipeline.
    #[tracing::instrument(skip_all, fields(event_id))]
    pub async fn ingest(
        &self,
        headers: &HeaderMap,
        peer: Option<SocketAddr>,
        body: &[u8],
    ) -> IngestOutcome {
        if !self.config.enabled {
            return IngestOutcome::Disabled;
        }

        if let Err(failure) = verify_secret(
            headers,
            &self.config.secret_header,
            self.config.secret.as_deref(),
        ) {
            warn!(reason = failure.reason(), "webhook authentication failed");
            return IngestOutcome::Unauthorized(failure);
        }

        let caller = client_ip(headers, peer);
        if !self.allowlist.permits(caller) {
            warn!(ip = ?caller, "webhook caller not in allowlist");
            return IngestOutcome::Forbidden(caller);
        }

        let event = match ChannelManagerEvent::parse(body) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "rejected malformed webhook");
                return IngestOutcome::Invalid(e.to_string());
            }
        };
        tracing::Span::current().record("event_id", event.id.as_str());

        IngestOutcome::Accepted(self.accept(&event, body).await)
    }

    async fn accept(&self, event: &ChannelManagerEvent, body: &[u8]) -> Acknowledgement {
        let record = NewWebhookEvent {
            event_id: event.id.clone(),
            event_type: event.event_type.clone(),
            source: CHANNEL_MANAGER_SOURCE.to_string(),
            payload: String::from_utf8_lossy(body).into_owned(),
            max_retries: self.config.max_retries,
        };

        match self.store.insert(record).await {
            Ok(InsertOutcome::Inserted) => {
                info!(event_type = %event.event_type, "webhook event persisted");
                self.enqueue(&event.id).await;
                Acknowledgement::new(&event.id, false)
            }
            Ok(InsertOutcome::Duplicate) => {
                debug!("duplicate webhook event");
                self.requeue_if_pending(&event.id).await;
                Acknowledgement::new(&event.id, true)
            }
            Err(e) => {
                error!(
                    error = %e,
                    event_type = %event.event_type,
                    payload = %String::from_utf8_lossy(body),
                    "LOST WEBHOOK EVENT: persist failed, manual recovery required"
                );
                Acknowledgement::internal_error(&event.id)
            }
        }
    }

    async fn enqueue(&self, event_id: &str) {
        match self.queue.enqueue(WebhookJob::for_event(event_id)).await {
            Ok(EnqueueOutcome::Enqueued) => debug!("webhook job enqueued"),
            Ok(EnqueueOutcome::AlreadyQueued) => debug!("webhook job already queued"),
            Err(QueueError::Unavailable) => {
                info!("queue unavailable, event left PENDING for backfill")
            }
            Err(e) => warn!(error = %e, "enqueue failed, event left PENDING for backfill"),
        }
    }

    /// A retried delivery of an event that never left `PENDING` gets
    /// another job; the queue drops it if one is already in flight.
    async fn requeue_if_pending(&self, event_id: &str) {
        match self.store.get(event_id).await {
            Ok(Some(existing)) if existing.status == WebhookStatus::Pending => {
                self.enqueue(event_id).await
            }
            Ok(_) => {}
            Err(e) => debug!(error = %e, "could not inspect duplicate event"),
        }
    }
}
