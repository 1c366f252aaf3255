//! Unit ↔ channel-manager control mappings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ParseEnumError, UnitId};

/// Which system is authoritative for a unit's bookings and inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceOfTruth {
    External,
    Local,
}

impl SourceOfTruth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceOfTruth::External => "EXTERNAL",
            SourceOfTruth::Local => "LOCAL",
        }
    }
}

impl FromStr for SourceOfTruth {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EXTERNAL" => Ok(SourceOfTruth::External),
            "LOCAL" => Ok(SourceOfTruth::Local),
            other => Err(ParseEnumError::new("source_of_truth", other)),
        }
    }
}

/// How the channel manager is connected for a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionType {
    Api,
    Ical,
}

impl ConnectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionType::Api => "API",
            ConnectionType::Ical => "ICAL",
        }
    }
}

impl FromStr for ConnectionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "API" => Ok(ConnectionType::Api),
            "ICAL" => Ok(ConnectionType::Ical),
            other => Err(ParseEnumError::new("connection_type", other)),
        }
    }
}

/// Binding between a local unit and its channel-manager property/room.
///
/// Only the audited admin operations create, change or delete mappings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitControlMapping {
    pub unit_id: UnitId,
    pub external_property_id: String,
    #[serde(default)]
    pub external_room_id: Option<String>,
    pub source_of_truth: SourceOfTruth,
    #[serde(default)]
    pub connection_type: Option<ConnectionType>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl UnitControlMapping {
    pub fn is_external(&self) -> bool {
        self.source_of_truth == SourceOfTruth::External
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_of_truth_parse() {
        assert_eq!("EXTERNAL".parse::<SourceOfTruth>().unwrap(), SourceOfTruth::External);
        assert_eq!("LOCAL".parse::<SourceOfTruth>().unwrap(), SourceOfTruth::Local);
        assert!("external".parse::<SourceOfTruth>().is_err());
    }

    #[test]
    fn test_mapping_deserialize_defaults() {
        let mapping: UnitControlMapping = serde_json::from_str(
            r#"{"unitId":"u-1","externalPropertyId":"p-9","sourceOfTruth":"EXTERNAL"}"#,
        )
        .unwrap();
        assert!(mapping.is_external());
        assert_eq!(mapping.external_room_id, None);
        assert_eq!(mapping.connection_type, None);
    }
}
