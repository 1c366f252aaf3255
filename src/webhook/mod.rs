//! Channel-manager webhook ingestion.
//!
//! `Received → Authenticated → Validated → Deduplicated-or-New →
//! Persisted(PENDING) → Enqueued → Acknowledged`, then asynchronously
//! `PROCESSING → DONE | FAILED` in the worker.

pub mod allowlist;
pub mod auth;
pub mod handler;
pub mod ingest;
pub mod payload;
pub mod rest;
pub mod worker;

pub use allowlist::{client_ip, AllowlistError, IpAllowlist};
pub use auth::{verify_secret, AuthFailure};
pub use handler::{EventEffect, ExternalStatusHandler, HandlerError, WebhookEventHandler};
pub use ingest::{
    Acknowledgement, IngestOutcome, WebhookIngestor, WebhookStatusReport, CHANNEL_MANAGER_SOURCE,
};
pub use payload::{ChannelManagerEvent, PayloadError};
pub use rest::router;
pub use worker::{BackfillReport, ProcessOutcome, WebhookWorker, WorkerError};
