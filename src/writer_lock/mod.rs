//! Writer lock: at most one service writes a brand's bookings.
//!
//! Every booking-mutating route runs [`enforce_writer_lock`] before its
//! handler. The brand's mode is read from shared configuration, never from
//! the request, and the shared policy decides whether this service is the
//! designated writer. A rejection is a normal policy outcome, not a fault.

mod middleware;
mod mode_source;

pub use middleware::enforce_writer_lock;
pub use mode_source::{CachedModeSource, ModeSource, StoreModeSource};

use std::sync::Arc;

use rentsync_policy::{designated_writer, is_writer_allowed, OperationMode, WriterRole};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::Brand;
use crate::interfaces::StoreError;

/// Error code carried by every writer-lock rejection.
pub const WRITER_LOCK_VIOLATION: &str = "WRITER_LOCK_VIOLATION";

/// Details of a rejected write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriterLockViolation {
    pub code: &'static str,
    pub brand: Brand,
    pub mode: OperationMode,
    pub designated_writer: WriterRole,
    pub rejected_by: WriterRole,
}

impl WriterLockViolation {
    pub fn message(&self) -> String {
        format!(
            "Brand '{}' is in {} mode; bookings are written by the {}, not the {}",
            self.brand, self.mode, self.designated_writer, self.rejected_by
        )
    }
}

/// A permitted write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterLockDecision {
    pub brand: Brand,
    pub mode: OperationMode,
}

#[derive(Debug, thiserror::Error)]
pub enum WriterLockError {
    #[error("{}", .0.message())]
    Violation(WriterLockViolation),

    /// The mode could not be determined; no write proceeds.
    #[error("Operation mode for brand '{brand}' is unavailable: {source}")]
    ModeUnavailable {
        brand: Brand,
        #[source]
        source: StoreError,
    },
}

/// Writer-lock check for one service.
pub struct WriterLock {
    self_role: WriterRole,
    modes: Arc<dyn ModeSource>,
}

impl WriterLock {
    pub fn new(self_role: WriterRole, modes: Arc<dyn ModeSource>) -> Self {
        Self { self_role, modes }
    }

    pub fn role(&self) -> WriterRole {
        self.self_role
    }

    /// Decide whether this service may write `brand`'s bookings now.
    pub async fn check(&self, brand: &Brand) -> Result<WriterLockDecision, WriterLockError> {
        let mode = self.modes.mode_for(brand).await.map_err(|source| {
            warn!(brand = %brand, error = %source, "brand mode lookup failed; refusing write");
            WriterLockError::ModeUnavailable {
                brand: brand.clone(),
                source,
            }
        })?;

        if is_writer_allowed(mode, self.self_role) {
            debug!(brand = %brand, mode = %mode, role = %self.self_role, "writer lock allowed");
            return Ok(WriterLockDecision {
                brand: brand.clone(),
                mode,
            });
        }

        let violation = WriterLockViolation {
            code: WRITER_LOCK_VIOLATION,
            brand: brand.clone(),
            mode,
            designated_writer: designated_writer(mode),
            rejected_by: self.self_role,
        };
        info!(
            brand = %brand,
            mode = %mode,
            designated_writer = %violation.designated_writer,
            rejected_by = %self.self_role,
            "writer lock rejected write"
        );
        Err(WriterLockError::Violation(violation))
    }
}
