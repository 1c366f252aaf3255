//! Occupancy facts: unit attributes, ingested external status, and the
//! persisted daily snapshot.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::{BuildingId, ParseEnumError, UnitId};

/// Operational status of a unit, owned by property CRUD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Active,
    Blocked,
    Maintenance,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Active => "ACTIVE",
            UnitStatus::Blocked => "BLOCKED",
            UnitStatus::Maintenance => "MAINTENANCE",
        }
    }
}

impl FromStr for UnitStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(UnitStatus::Active),
            "BLOCKED" => Ok(UnitStatus::Blocked),
            "MAINTENANCE" => Ok(UnitStatus::Maintenance),
            other => Err(ParseEnumError::new("unit_status", other)),
        }
    }
}

/// Unit attributes needed for KPI computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitRecord {
    pub unit_id: UnitId,
    pub building_id: BuildingId,
    pub status: UnitStatus,
    pub monthly_rent_cents: i64,
}

/// Which system produced an occupancy determination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusSource {
    /// Channel-manager data ingested through webhooks.
    External,
    /// Local bookings.
    Local,
    /// No authoritative data (unknown, blocked, maintenance).
    None,
}

impl StatusSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusSource::External => "EXTERNAL",
            StatusSource::Local => "LOCAL",
            StatusSource::None => "NONE",
        }
    }
}

impl FromStr for StatusSource {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXTERNAL" => Ok(StatusSource::External),
            "LOCAL" => Ok(StatusSource::Local),
            "NONE" => Ok(StatusSource::None),
            other => Err(ParseEnumError::new("status_source", other)),
        }
    }
}

/// Resolved occupancy of one unit on one night.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Occupancy {
    Occupied,
    Vacant,
    /// Externally controlled with no ingested data for the date.
    Unknown,
    Blocked,
    Maintenance,
}

impl Occupancy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Occupancy::Occupied => "OCCUPIED",
            Occupancy::Vacant => "VACANT",
            Occupancy::Unknown => "UNKNOWN",
            Occupancy::Blocked => "BLOCKED",
            Occupancy::Maintenance => "MAINTENANCE",
        }
    }

    pub fn is_occupied(&self) -> bool {
        matches!(self, Occupancy::Occupied)
    }

    /// Rentable and free. Unknown is neither available nor occupied.
    pub fn is_available(&self) -> bool {
        matches!(self, Occupancy::Vacant)
    }

    /// Counts toward rentable stock: everything but blocked and maintenance.
    pub fn is_rentable(&self) -> bool {
        !matches!(self, Occupancy::Blocked | Occupancy::Maintenance)
    }
}

impl FromStr for Occupancy {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OCCUPIED" => Ok(Occupancy::Occupied),
            "VACANT" => Ok(Occupancy::Vacant),
            "UNKNOWN" => Ok(Occupancy::Unknown),
            "BLOCKED" => Ok(Occupancy::Blocked),
            "MAINTENANCE" => Ok(Occupancy::Maintenance),
            other => Err(ParseEnumError::new("occupancy", other)),
        }
    }
}

/// Channel-manager truth for one unit-night, as read back from the
/// ingested stays and availability flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalDailyStatus {
    pub unit_id: UnitId,
    pub date: NaiveDate,
    pub occupied: bool,
    pub available: bool,
    /// Channel-manager booking holding the night, if any.
    pub booking_id: Option<String>,
    /// Latest event that touched this night.
    pub event_id: String,
    pub recorded_at: DateTime<Utc>,
}

/// Nights one channel-manager booking holds on a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalStay {
    pub booking_id: String,
    pub unit_id: UnitId,
    pub nights: Vec<NaiveDate>,
}

/// Provenance of an external status write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusStamp {
    pub event_id: String,
    pub recorded_at: DateTime<Utc>,
}

impl StatusStamp {
    pub fn now(event_id: impl Into<String>) -> Self {
        Self {
            event_id: event_id.into(),
            recorded_at: Utc::now(),
        }
    }
}

/// Persisted daily snapshot row. History is never rewritten implicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyUnitStatus {
    pub unit_id: UnitId,
    pub building_id: BuildingId,
    pub date: NaiveDate,
    pub occupancy: Occupancy,
    pub occupied: bool,
    pub available: bool,
    pub source: StatusSource,
    pub monthly_rent_cents: i64,
}
