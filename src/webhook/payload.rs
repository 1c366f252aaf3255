//! Channel-manager notification schema.
//!
//! Channel managers disagree on identifier types, so ids are accepted as
//! JSON strings or numbers and normalized to strings. Field names are
//! camelCase with snake_case aliases.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer};

/// Validated inbound event.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelManagerEvent {
    #[serde(alias = "eventId", alias = "event_id", deserialize_with = "id_string")]
    pub id: String,
    #[serde(rename = "type", alias = "eventType", alias = "event_type")]
    pub event_type: String,
    #[serde(default, alias = "booking_id", deserialize_with = "opt_id_string")]
    pub booking_id: Option<String>,
    #[serde(default, alias = "property_id", deserialize_with = "opt_id_string")]
    pub property_id: Option<String>,
    #[serde(default, alias = "room_id", deserialize_with = "opt_id_string")]
    pub room_id: Option<String>,
    #[serde(default)]
    pub arrival: Option<NaiveDate>,
    #[serde(default)]
    pub departure: Option<NaiveDate>,
    #[serde(default, alias = "occurred_at")]
    pub occurred_at: Option<DateTime<Utc>>,
    /// Availability flag carried by `availability.updated` events.
    #[serde(default)]
    pub available: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PayloadError {
    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("event id is empty")]
    EmptyId,

    #[error("event type is empty")]
    EmptyType,

    #[error("departure {departure} is not after arrival {arrival}")]
    InvertedStay {
        arrival: NaiveDate,
        departure: NaiveDate,
    },
}

impl ChannelManagerEvent {
    pub fn parse(body: &[u8]) -> Result<Self, PayloadError> {
        let event: ChannelManagerEvent =
            serde_json::from_slice(body).map_err(|e| PayloadError::Malformed(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    fn validate(&self) -> Result<(), PayloadError> {
        if self.id.trim().is_empty() {
            return Err(PayloadError::EmptyId);
        }
        if self.event_type.trim().is_empty() {
            return Err(PayloadError::EmptyType);
        }
        if let (Some(arrival), Some(departure)) = (self.arrival, self.departure) {
            if departure <= arrival {
                return Err(PayloadError::InvertedStay { arrival, departure });
            }
        }
        Ok(())
    }

    /// Nights covered, `[arrival, departure)`. Empty when either date is absent.
    pub fn nights(&self) -> Vec<NaiveDate> {
        match (self.arrival, self.departure) {
            (Some(arrival), Some(departure)) => arrival
                .iter_days()
                .take_while(|d| *d < departure)
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Str(String),
    Int(i64),
    UInt(u64),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Str(s) => s,
            RawId::Int(n) => n.to_string(),
            RawId::UInt(n) => n.to_string(),
        }
    }
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn opt_id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}
