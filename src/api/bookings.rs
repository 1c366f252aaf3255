//! Booking mutation routes.
//!
//! Every route sits behind [`enforce_writer_lock`]; the guard runs inside
//! [`BookingService`] before the backend is touched.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::{patch, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use rentsync_policy::WriterRole;
use serde::Deserialize;

use super::ApiError;
use crate::bookings::{BookingError, BookingService};
use crate::domain::{Booking, BookingStatus, Brand, NewBooking};
use crate::writer_lock::{enforce_writer_lock, WriterLock};

#[derive(Clone)]
struct BookingRoutes {
    service: Arc<BookingService>,
    role: WriterRole,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatesRequest {
    check_in: NaiveDate,
    check_out: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct StatusRequest {
    status: BookingStatus,
}

pub fn router(service: Arc<BookingService>, lock: Arc<WriterLock>) -> Router {
    let state = BookingRoutes {
        service,
        role: lock.role(),
    };
    Router::new()
        .route("/brands/:brand/bookings", post(create))
        .route("/brands/:brand/bookings/:id/dates", patch(change_dates))
        .route("/brands/:brand/bookings/:id/status", patch(change_status))
        .route("/brands/:brand/bookings/:id/cancel", post(cancel))
        .route_layer(from_fn_with_state(lock, enforce_writer_lock))
        .with_state(state)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

impl BookingRoutes {
    fn reply(
        &self,
        brand: &Brand,
        status: StatusCode,
        result: Result<Booking, BookingError>,
    ) -> Result<(StatusCode, Json<Booking>), ApiError> {
        result
            .map(|booking| (status, Json(booking)))
            .map_err(|e| ApiError::from_booking(e, brand, self.role))
    }
}

// ============================================================================
// Handlers
// ============================================================================

async fn create(
    State(routes): State<BookingRoutes>,
    Path(brand): Path<String>,
    payload: Result<Json<NewBooking>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let brand = Brand::new(brand);
    let request = body(payload)?;
    let result = routes.service.create(&brand, request).await;
    routes.reply(&brand, StatusCode::CREATED, result)
}

async fn change_dates(
    State(routes): State<BookingRoutes>,
    Path((brand, id)): Path<(String, String)>,
    payload: Result<Json<DatesRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let brand = Brand::new(brand);
    let request = body(payload)?;
    let result = routes
        .service
        .change_dates(&brand, &id, request.check_in, request.check_out)
        .await;
    routes.reply(&brand, StatusCode::OK, result)
}

async fn change_status(
    State(routes): State<BookingRoutes>,
    Path((brand, id)): Path<(String, String)>,
    payload: Result<Json<StatusRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let brand = Brand::new(brand);
    let request = body(payload)?;
    let result = routes
        .service
        .change_status(&brand, &id, request.status)
        .await;
    routes.reply(&brand, StatusCode::OK, result)
}

async fn cancel(
    State(routes): State<BookingRoutes>,
    Path((brand, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let brand = Brand::new(brand);
    let result = routes.service.cancel(&brand, &id).await;
    routes.reply(&brand, StatusCode::OK, result)
}
