//! Source-of-truth guard.
//!
//! Blocks local mutation of units whose bookings and inventory are owned by
//! the channel manager. Every local write path that touches a unit calls
//! [`SourceOfTruthGuard::assert_not_externally_controlled`] before doing
//! anything with side effects.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{ConnectionType, SourceOfTruth, UnitId};
use crate::interfaces::{MappingStore, StoreError};

/// Local mutations the guard can be asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GuardOperation {
    MutateBookingDates,
    MutateBookingStatus,
    CreateBooking,
    CancelBooking,
    UpdateInventory,
    UpdateAvailability,
    AutoApproveExtension,
}

impl GuardOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            GuardOperation::MutateBookingDates => "MUTATE_BOOKING_DATES",
            GuardOperation::MutateBookingStatus => "MUTATE_BOOKING_STATUS",
            GuardOperation::CreateBooking => "CREATE_BOOKING",
            GuardOperation::CancelBooking => "CANCEL_BOOKING",
            GuardOperation::UpdateInventory => "UPDATE_INVENTORY",
            GuardOperation::UpdateAvailability => "UPDATE_AVAILABILITY",
            GuardOperation::AutoApproveExtension => "AUTO_APPROVE_EXTENSION",
        }
    }
}

impl fmt::Display for GuardOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by guard checks.
#[derive(Debug, thiserror::Error)]
pub enum GuardError {
    #[error("Unit {unit_id} is controlled by the channel manager (property {external_property_id}); {operation} must be done there")]
    ExternallyControlled {
        unit_id: UnitId,
        operation: GuardOperation,
        external_property_id: String,
    },

    /// The mapping could not be read. Writes do not proceed on an unknown
    /// ownership state.
    #[error("Unit control mapping lookup failed: {0}")]
    Lookup(#[from] StoreError),
}

/// Non-failing view of a unit's control state, for UI badges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardStatus {
    pub unit_id: UnitId,
    pub externally_controlled: bool,
    pub source_of_truth: Option<SourceOfTruth>,
    pub external_property_id: Option<String>,
    pub connection_type: Option<ConnectionType>,
    /// The mapping store could not be read; the other fields are defaults.
    pub lookup_failed: bool,
}

impl GuardStatus {
    fn unmapped(unit_id: &UnitId) -> Self {
        Self {
            unit_id: unit_id.clone(),
            externally_controlled: false,
            source_of_truth: None,
            external_property_id: None,
            connection_type: None,
            lookup_failed: false,
        }
    }
}

/// Checks unit ownership against the mapping store.
///
/// Without a store every check allows. That is the degraded mode for local
/// development or a deployment not yet connected to a channel manager.
#[derive(Clone)]
pub struct SourceOfTruthGuard {
    mappings: Option<Arc<dyn MappingStore>>,
}

impl SourceOfTruthGuard {
    pub fn new(mappings: Option<Arc<dyn MappingStore>>) -> Self {
        if mappings.is_none() {
            warn!("source-of-truth guard has no mapping store; all units treated as local");
        }
        Self { mappings }
    }

    /// Guard that allows everything.
    pub fn disabled() -> Self {
        Self::new(None)
    }

    pub fn is_enabled(&self) -> bool {
        self.mappings.is_some()
    }

    /// Fail if `unit_id` is controlled externally.
    ///
    /// No mapping or a `LOCAL` mapping allows the operation.
    pub async fn assert_not_externally_controlled(
        &self,
        unit_id: &UnitId,
        operation: GuardOperation,
    ) -> Result<(), GuardError> {
        let Some(mappings) = &self.mappings else {
            return Ok(());
        };

        match mappings.get(unit_id).await? {
            Some(mapping) if mapping.is_external() => {
                info!(
                    unit_id = %unit_id,
                    operation = %operation,
                    external_property_id = %mapping.external_property_id,
                    "local mutation blocked for externally controlled unit"
                );
                Err(GuardError::ExternallyControlled {
                    unit_id: unit_id.clone(),
                    operation,
                    external_property_id: mapping.external_property_id,
                })
            }
            _ => {
                debug!(unit_id = %unit_id, operation = %operation, "guard allowed");
                Ok(())
            }
        }
    }

    pub async fn guard_status(&self, unit_id: &UnitId) -> GuardStatus {
        let Some(mappings) = &self.mappings else {
            return GuardStatus::unmapped(unit_id);
        };

        match mappings.get(unit_id).await {
            Ok(Some(mapping)) => GuardStatus {
                unit_id: unit_id.clone(),
                externally_controlled: mapping.is_external(),
                source_of_truth: Some(mapping.source_of_truth),
                external_property_id: Some(mapping.external_property_id),
                connection_type: mapping.connection_type,
                lookup_failed: false,
            },
            Ok(None) => GuardStatus::unmapped(unit_id),
            Err(e) => {
                warn!(unit_id = %unit_id, error = %e, "guard status lookup failed");
                GuardStatus {
                    lookup_failed: true,
                    ..GuardStatus::unmapped(unit_id)
                }
            }
        }
    }

    /// Every unit whose source of truth is `EXTERNAL`.
    pub async fn controlled_unit_ids(&self) -> Result<HashSet<UnitId>, GuardError> {
        match &self.mappings {
            Some(mappings) => Ok(mappings.controlled_unit_ids().await?),
            None => Ok(HashSet::new()),
        }
    }
}
