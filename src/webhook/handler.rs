//! Event handlers run by the webhook worker.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::payload::{ChannelManagerEvent, PayloadError};
use crate::domain::{ExternalStay, StatusStamp, WebhookEvent};
use crate::interfaces::{ExternalStatusStore, MappingStore, StoreError};
use crate::utils::retry::is_retryable_store_error;

#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    /// The stored payload cannot be processed. Retrying will not help.
    #[error("invalid event payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Rejected(String),
}

impl HandlerError {
    pub fn is_retryable(&self) -> bool {
        match self {
            HandlerError::Store(e) => is_retryable_store_error(e),
            HandlerError::Payload(_) | HandlerError::Rejected(_) => false,
        }
    }
}

/// Applies one stored webhook event. Must be idempotent: an event may be
/// handled again after a crash between handling and `DONE`.
#[async_trait]
pub trait WebhookEventHandler: Send + Sync {
    async fn handle(&self, event: &WebhookEvent) -> Result<(), HandlerError>;
}

/// How an event type affects unit-night status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventEffect {
    Occupy,
    Vacate,
    Availability,
    Ignore,
}

impl EventEffect {
    pub fn for_type(event_type: &str) -> Self {
        match event_type {
            "booking.created" | "booking.modified" => EventEffect::Occupy,
            "booking.cancelled" | "booking.canceled" => EventEffect::Vacate,
            "availability.updated" => EventEffect::Availability,
            t if t.starts_with("reservation.") => EventEffect::Occupy,
            _ => EventEffect::Ignore,
        }
    }
}

/// Records channel-manager truth for externally controlled units.
///
/// Events for unmapped or `LOCAL` units are acknowledged and dropped;
/// local data stays authoritative for those.
pub struct ExternalStatusHandler {
    mappings: Arc<dyn MappingStore>,
    statuses: Arc<dyn ExternalStatusStore>,
}

impl ExternalStatusHandler {
    pub fn new(mappings: Arc<dyn MappingStore>, statuses: Arc<dyn ExternalStatusStore>) -> Self {
        Self { mappings, statuses }
    }
}

#[async_trait]
impl WebhookEventHandler for ExternalStatusHandler {
    async fn handle(&self, event: &WebhookEvent) -> Result<(), HandlerError> {
        let payload = ChannelManagerEvent::parse(event.payload.as_bytes())?;

        let effect = EventEffect::for_type(&payload.event_type);
        if effect == EventEffect::Ignore {
            debug!(event_id = %event.event_id, event_type = %payload.event_type, "event type not tracked");
            return Ok(());
        }

        let Some(property_id) = payload.property_id.as_deref() else {
            debug!(event_id = %event.event_id, "event has no property id, ignoring");
            return Ok(());
        };
        let mapping = self
            .mappings
            .find_by_external(property_id, payload.room_id.as_deref())
            .await?;
        let Some(mapping) = mapping.filter(|m| m.is_external()) else {
            debug!(
                event_id = %event.event_id,
                property_id,
                "property not externally controlled, ignoring"
            );
            return Ok(());
        };

        let nights = payload.nights();
        if nights.is_empty() {
            return Err(HandlerError::Rejected(format!(
                "{} for externally controlled unit {} carries no stay dates",
                payload.event_type, mapping.unit_id
            )));
        }

        let stamp = StatusStamp::now(event.event_id.clone());
        match effect {
            EventEffect::Occupy => {
                let booking_id = payload
                    .booking_id
                    .clone()
                    .unwrap_or_else(|| format!("event:{}", event.event_id));
                let stay = ExternalStay {
                    booking_id,
                    unit_id: mapping.unit_id.clone(),
                    nights: nights.clone(),
                };
                self.statuses.record_stay(stay, &stamp).await?;
            }
            EventEffect::Vacate => match payload.booking_id.as_deref() {
                Some(booking_id) => {
                    self.statuses
                        .release_stay(booking_id, &mapping.unit_id, &nights, &stamp)
                        .await?
                }
                None => {
                    self.statuses
                        .release_nights(&mapping.unit_id, &nights, &stamp)
                        .await?
                }
            },
            EventEffect::Availability => {
                self.statuses
                    .record_availability(
                        &mapping.unit_id,
                        &nights,
                        payload.available.unwrap_or(false),
                        &stamp,
                    )
                    .await?
            }
            EventEffect::Ignore => return Ok(()),
        }

        info!(
            event_id = %event.event_id,
            unit_id = %mapping.unit_id,
            booking_id = payload.booking_id.as_deref().unwrap_or("-"),
            nights = nights.len(),
            effect = ?effect,
            "recorded external status"
        );
        Ok(())
    }
}
