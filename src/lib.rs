//! rentsync - channel manager consistency core
//!
//! Keeps a rental platform's bookings and occupancy consistent with an
//! external channel manager across two services: the brand **adapter**
//! and the central **hub**. Provides the writer lock, the per-unit
//! source-of-truth guard, webhook ingestion and occupancy/finance
//! reconciliation.

pub mod admin;
pub mod api;
pub mod bookings;
pub mod bus;
pub mod channel_manager;
pub mod config;
pub mod dlq;
pub mod domain;
pub mod guard;
pub mod interfaces;
pub mod reconciliation;
pub mod runtime;
pub mod storage;
pub mod utils;
pub mod webhook;
pub mod writer_lock;

pub use rentsync_policy as policy;
