//! Core domain types shared by the guard, writer lock, webhook pipeline and
//! reconciliation engine.

mod booking;
mod ledger;
mod mapping;
mod occupancy;
mod webhook;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use booking::{Booking, BookingStatus, NewBooking};
pub use ledger::{LedgerEntry, LedgerFilter, LedgerKind, LedgerStatus};
pub use mapping::{ConnectionType, SourceOfTruth, UnitControlMapping};
pub use occupancy::{
    DailyUnitStatus, ExternalDailyStatus, ExternalStay, Occupancy, StatusSource, StatusStamp,
    UnitRecord, UnitStatus,
};
pub use webhook::{NewWebhookEvent, WebhookEvent, WebhookStatus};

/// Tenant brand. The set of brands is open; names are normalized to
/// lowercase so `"Monthly"` and `"monthly"` address the same brand.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Brand(String);

impl Brand {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Brand {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Brand {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Brand> for String {
    fn from(value: Brand) -> Self {
        value.0
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Local rental unit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub String);

impl UnitId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UnitId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Building (property) identifier grouping units for KPI scopes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildingId(pub String);

impl BuildingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BuildingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error converting a stored text column back into a domain enum.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
