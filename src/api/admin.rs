//! Privileged admin routes (hub).
//!
//! Mounted only when an admin token is configured. Requests must carry the
//! token in the configured header; the acting operator is taken from
//! `x-admin-actor` and recorded in the audit trail.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, patch, post, put};
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use rentsync_policy::OperationMode;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::info;

use super::ApiError;
use crate::admin::{AdminService, AUDIT_TARGET};
use crate::domain::{Brand, ConnectionType, SourceOfTruth, UnitControlMapping, UnitId};
use crate::interfaces::AuditRecord;
use crate::reconciliation::{ReconciliationEngine, SnapshotReport};

/// Header naming the operator behind an admin request.
pub const ACTOR_HEADER: &str = "x-admin-actor";

const DEFAULT_AUDIT_LIMIT: u32 = 50;
const MAX_AUDIT_LIMIT: u32 = 500;

#[derive(Clone)]
struct AdminToken {
    header: String,
    token: String,
}

#[derive(Clone)]
struct AdminRoutes {
    service: Arc<AdminService>,
    engine: Arc<ReconciliationEngine>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrandMode {
    brand: Brand,
    mode: OperationMode,
}

#[derive(Debug, Deserialize)]
struct ModeRequest {
    mode: OperationMode,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LinkRequest {
    external_property_id: String,
    #[serde(default)]
    external_room_id: Option<String>,
    source_of_truth: SourceOfTruth,
    #[serde(default)]
    connection_type: Option<ConnectionType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SourceOfTruthRequest {
    source_of_truth: SourceOfTruth,
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct SnapshotRequest {
    date: Option<NaiveDate>,
    #[serde(default)]
    force: bool,
}

pub fn router(
    service: Arc<AdminService>,
    engine: Arc<ReconciliationEngine>,
    token_header: &str,
    token: &str,
) -> Router {
    let auth = AdminToken {
        header: token_header.to_ascii_lowercase(),
        token: token.to_string(),
    };
    Router::new()
        .route("/admin/modes", get(list_modes))
        .route("/admin/brands/:brand/mode", put(set_mode))
        .route("/admin/mappings", get(list_mappings))
        .route(
            "/admin/units/:unit_id/mapping",
            put(link_unit).delete(unlink_unit),
        )
        .route(
            "/admin/units/:unit_id/source-of-truth",
            patch(set_source_of_truth),
        )
        .route("/admin/audit", get(recent_audit))
        .route("/admin/snapshots", post(snapshot))
        .route_layer(from_fn_with_state(auth, require_token))
        .with_state(AdminRoutes { service, engine })
}

async fn require_token(State(auth): State<AdminToken>, request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(auth.header.as_str())
        .map(|v| v.as_bytes())
        .unwrap_or_default();
    if !bool::from(presented.ct_eq(auth.token.as_bytes())) {
        info!(target: AUDIT_TARGET, path = %request.uri().path(), "admin request rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "unauthorized" })),
        )
            .into_response();
    }
    next.run(request).await
}

fn actor(headers: &HeaderMap) -> String {
    headers
        .get(ACTOR_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or("admin")
        .to_string()
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

// ============================================================================
// Handlers
// ============================================================================

async fn list_modes(State(routes): State<AdminRoutes>) -> Result<Json<Vec<BrandMode>>, ApiError> {
    let modes = routes.service.modes().await?;
    Ok(Json(
        modes
            .into_iter()
            .map(|(brand, mode)| BrandMode { brand, mode })
            .collect(),
    ))
}

async fn set_mode(
    State(routes): State<AdminRoutes>,
    Path(brand): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ModeRequest>, JsonRejection>,
) -> Result<Json<BrandMode>, ApiError> {
    let brand = Brand::new(brand);
    let request = body(payload)?;
    routes
        .service
        .set_brand_mode(&brand, request.mode, &actor(&headers))
        .await?;
    Ok(Json(BrandMode {
        brand,
        mode: request.mode,
    }))
}

async fn list_mappings(
    State(routes): State<AdminRoutes>,
) -> Result<Json<Vec<UnitControlMapping>>, ApiError> {
    Ok(Json(routes.service.mappings().await?))
}

async fn link_unit(
    State(routes): State<AdminRoutes>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<LinkRequest>, JsonRejection>,
) -> Result<Json<UnitControlMapping>, ApiError> {
    let request = body(payload)?;
    let mapping = UnitControlMapping {
        unit_id: UnitId::new(unit_id),
        external_property_id: request.external_property_id,
        external_room_id: request.external_room_id,
        source_of_truth: request.source_of_truth,
        connection_type: request.connection_type,
        updated_at: Utc::now(),
    };
    Ok(Json(
        routes.service.link_unit(mapping, &actor(&headers)).await?,
    ))
}

async fn set_source_of_truth(
    State(routes): State<AdminRoutes>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<SourceOfTruthRequest>, JsonRejection>,
) -> Result<Json<UnitControlMapping>, ApiError> {
    let request = body(payload)?;
    Ok(Json(
        routes
            .service
            .set_source_of_truth(
                &UnitId::new(unit_id),
                request.source_of_truth,
                &actor(&headers),
            )
            .await?,
    ))
}

async fn unlink_unit(
    State(routes): State<AdminRoutes>,
    Path(unit_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    routes
        .service
        .unlink_unit(&UnitId::new(unit_id), &actor(&headers))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn recent_audit(
    State(routes): State<AdminRoutes>,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Vec<AuditRecord>>, ApiError> {
    let limit = params
        .limit
        .unwrap_or(DEFAULT_AUDIT_LIMIT)
        .clamp(1, MAX_AUDIT_LIMIT);
    Ok(Json(routes.service.recent_audit(limit).await?))
}

/// Snapshot a day on demand; `force` re-derives rows already captured.
async fn snapshot(
    State(routes): State<AdminRoutes>,
    headers: HeaderMap,
    payload: Option<Json<SnapshotRequest>>,
) -> Result<Json<SnapshotReport>, ApiError> {
    let request = payload.map(|Json(r)| r).unwrap_or_default();
    let date = request.date.unwrap_or_else(|| Utc::now().date_naive());
    let report = routes.engine.snapshot_day(date, request.force).await?;
    info!(
        target: AUDIT_TARGET,
        actor = %actor(&headers),
        action = "snapshot_day",
        %date,
        force = request.force,
        written = report.written,
        "occupancy snapshot requested"
    );
    Ok(Json(report))
}
