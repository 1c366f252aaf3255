//! HTTP error bodies.
//!
//! Policy rejections (writer lock, source-of-truth guard) share one
//! conflict contract:
//!
//! ```json
//! {"code": "...", "message": "...", "brand": "...", "unitId": "...",
//!  "externalPropertyId": "...", "mode": "...", "designatedWriter": "...",
//!  "rejectedBy": "..."}
//! ```
//!
//! Optional fields are omitted when they do not apply.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rentsync_policy::{OperationMode, WriterRole};
use serde::Serialize;
use tracing::error;

use crate::admin::AdminError;
use crate::bookings::{BackendError, BookingError};
use crate::domain::{Brand, UnitId};
use crate::guard::{GuardError, GuardOperation};
use crate::interfaces::StoreError;
use crate::reconciliation::ReconcileError;
use crate::writer_lock::WriterLockError;

pub const MODE_UNAVAILABLE: &str = "MODE_UNAVAILABLE";
pub const EXTERNALLY_CONTROLLED: &str = "EXTERNALLY_CONTROLLED";
pub const MAPPING_UNAVAILABLE: &str = "MAPPING_UNAVAILABLE";
pub const NIGHTS_OUT_OF_RANGE: &str = "NIGHTS_OUT_OF_RANGE";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brand: Option<Brand>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_id: Option<UnitId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_property_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<OperationMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub designated_writer: Option<WriterRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejected_by: Option<WriterRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<GuardOperation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorBody,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            body: ErrorBody {
                code,
                message: message.into(),
                brand: None,
                unit_id: None,
                external_property_id: None,
                mode: None,
                designated_writer: None,
                rejected_by: None,
                operation: None,
            },
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, code, message)
    }

    pub fn with_brand(mut self, brand: &Brand) -> Self {
        self.body.brand = Some(brand.clone());
        self
    }

    /// Record which service turned the request away.
    pub fn rejected_by(mut self, role: WriterRole) -> Self {
        self.body.rejected_by = Some(role);
        self
    }

    /// Guard rejection as seen by the service running as `role`.
    pub fn from_guard(err: GuardError, role: WriterRole) -> Self {
        let message = err.to_string();
        match err {
            GuardError::ExternallyControlled {
                unit_id,
                operation,
                external_property_id,
            } => {
                let mut api = Self::new(StatusCode::CONFLICT, EXTERNALLY_CONTROLLED, message)
                    .rejected_by(role);
                api.body.unit_id = Some(unit_id);
                api.body.external_property_id = Some(external_property_id);
                api.body.operation = Some(operation);
                api
            }
            GuardError::Lookup(e) => {
                error!(error = %e, "unit control mapping lookup failed");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    MAPPING_UNAVAILABLE,
                    "unit control mapping is unavailable; write refused",
                )
            }
        }
    }

    pub fn from_booking(err: BookingError, brand: &Brand, role: WriterRole) -> Self {
        match err {
            BookingError::NightsOutOfRange { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                NIGHTS_OUT_OF_RANGE,
                err.to_string(),
            )
            .with_brand(brand),
            BookingError::InvalidDates { .. } => {
                Self::new(StatusCode::UNPROCESSABLE_ENTITY, "INVALID_DATES", err.to_string())
            }
            BookingError::Guard(e) => Self::from_guard(e, role).with_brand(brand),
            BookingError::Backend(BackendError::NotFound(id)) => {
                Self::not_found("BOOKING_NOT_FOUND", format!("booking {id} not found"))
            }
            BookingError::Backend(BackendError::Conflict(message)) => {
                Self::new(StatusCode::CONFLICT, "BOOKING_CONFLICT", message).with_brand(brand)
            }
            BookingError::Backend(BackendError::NotLinked(_)) => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNIT_NOT_LINKED",
                err.to_string(),
            )
            .with_brand(brand),
            BookingError::Backend(BackendError::Store(e)) => e.into(),
            BookingError::Backend(BackendError::Upstream(message)) => {
                error!(brand = %brand, %message, "channel manager call failed");
                Self::new(StatusCode::BAD_GATEWAY, "CHANNEL_MANAGER_ERROR", message)
            }
        }
    }
}

impl From<WriterLockError> for ApiError {
    fn from(err: WriterLockError) -> Self {
        match err {
            WriterLockError::Violation(v) => {
                let mut api = Self::new(StatusCode::CONFLICT, v.code, v.message());
                api.body.brand = Some(v.brand);
                api.body.mode = Some(v.mode);
                api.body.designated_writer = Some(v.designated_writer);
                api.body.rejected_by = Some(v.rejected_by);
                api
            }
            WriterLockError::ModeUnavailable { brand, .. } => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                MODE_UNAVAILABLE,
                format!("operation mode for brand '{brand}' is unavailable; write refused"),
            )
            .with_brand(&brand),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable => Self::new(
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_UNAVAILABLE",
                "storage is unavailable",
            ),
            other => {
                error!(error = %other, "store error");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORE_ERROR",
                    "internal storage error",
                )
            }
        }
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        match err {
            ReconcileError::EmptyPeriod { .. } => {
                Self::new(StatusCode::BAD_REQUEST, "INVALID_PERIOD", err.to_string())
            }
            ReconcileError::Store(e) => e.into(),
        }
    }
}

impl From<AdminError> for ApiError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::NotLinked(_) => Self::not_found("UNIT_NOT_LINKED", err.to_string()),
            AdminError::Invalid(message) => Self::bad_request(message),
            AdminError::Store(e) => e.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::writer_lock::{WriterLockViolation, WRITER_LOCK_VIOLATION};

    fn body(err: ApiError) -> serde_json::Value {
        serde_json::to_value(err.body).unwrap()
    }

    #[test]
    fn test_writer_lock_violation_contract() {
        let err = ApiError::from(WriterLockError::Violation(WriterLockViolation {
            code: WRITER_LOCK_VIOLATION,
            brand: Brand::new("monthly"),
            mode: OperationMode::Standalone,
            designated_writer: WriterRole::Adapter,
            rejected_by: WriterRole::Hub,
        }));
        assert_eq!(err.status, StatusCode::CONFLICT);

        let value = body(err);
        assert_eq!(value["code"], "WRITER_LOCK_VIOLATION");
        assert_eq!(value["brand"], "monthly");
        assert_eq!(value["mode"], "standalone");
        assert_eq!(value["designatedWriter"], "adapter");
        assert_eq!(value["rejectedBy"], "hub");
        assert!(value.get("unitId").is_none());
    }

    #[test]
    fn test_mode_unavailable_is_503() {
        let err = ApiError::from(WriterLockError::ModeUnavailable {
            brand: Brand::new("monthly"),
            source: StoreError::Unavailable,
        });
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.body.code, MODE_UNAVAILABLE);
    }

    #[test]
    fn test_guard_conflict_names_unit_and_role() {
        let err = ApiError::from_guard(
            GuardError::ExternallyControlled {
                unit_id: UnitId::new("u-7"),
                operation: GuardOperation::CancelBooking,
                external_property_id: "prop-7".to_string(),
            },
            WriterRole::Adapter,
        );
        assert_eq!(err.status, StatusCode::CONFLICT);
        let value = body(err);
        assert_eq!(value["code"], EXTERNALLY_CONTROLLED);
        assert_eq!(value["unitId"], "u-7");
        assert_eq!(value["externalPropertyId"], "prop-7");
        assert_eq!(value["operation"], "CANCEL_BOOKING");
        assert_eq!(value["rejectedBy"], "adapter");
    }

    #[test]
    fn test_guard_lookup_failure_is_503() {
        let err = ApiError::from_guard(GuardError::Lookup(StoreError::Unavailable), WriterRole::Hub);
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.body.code, MAPPING_UNAVAILABLE);
    }

    #[test]
    fn test_nights_out_of_range_is_422() {
        let brand = Brand::new("nightly");
        let err = ApiError::from_booking(
            BookingError::NightsOutOfRange {
                brand: brand.clone(),
                nights: 45,
                min: 1,
                max: 29,
            },
            &brand,
            WriterRole::Hub,
        );
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body(err)["code"], json!(NIGHTS_OUT_OF_RANGE));
    }

    #[test]
    fn test_unlinked_unit_is_422() {
        let brand = Brand::new("nightly");
        let err = ApiError::from_booking(
            BookingError::Backend(BackendError::NotLinked("unit u-3".to_string())),
            &brand,
            WriterRole::Adapter,
        );
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        let value = body(err);
        assert_eq!(value["code"], "UNIT_NOT_LINKED");
        assert_eq!(value["message"], "unit u-3 is not linked to the channel manager");
    }
}
