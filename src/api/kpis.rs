//! Occupancy and finance KPI read routes (hub).

use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use super::ApiError;
use crate::domain::{BuildingId, UnitId};
use crate::guard::{GuardStatus, SourceOfTruthGuard};
use crate::reconciliation::{FinanceKpis, OccupancyReport, ReconciliationEngine};

#[derive(Debug, Deserialize)]
struct OccupancyQuery {
    /// Defaults to today (UTC).
    date: Option<NaiveDate>,
    building: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FinanceQuery {
    from: NaiveDate,
    to: NaiveDate,
    building: Option<String>,
}

pub fn router(engine: Arc<ReconciliationEngine>) -> Router {
    Router::new()
        .route("/kpis/occupancy", get(occupancy))
        .route("/kpis/finance", get(finance))
        .with_state(engine)
}

/// Unit control badge lookup, mounted on both services.
pub fn control_router(guard: Arc<SourceOfTruthGuard>) -> Router {
    Router::new()
        .route("/units/:unit_id/control", get(control))
        .with_state(guard)
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, ApiError> {
    query
        .map(|Query(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

fn building(raw: Option<String>) -> Option<BuildingId> {
    raw.filter(|b| !b.trim().is_empty()).map(BuildingId::new)
}

async fn occupancy(
    State(engine): State<Arc<ReconciliationEngine>>,
    params: Result<Query<OccupancyQuery>, QueryRejection>,
) -> Result<Json<OccupancyReport>, ApiError> {
    let params = query(params)?;
    let date = params.date.unwrap_or_else(|| Utc::now().date_naive());
    let building = building(params.building);
    Ok(Json(engine.occupancy(date, building.as_ref()).await?))
}

async fn finance(
    State(engine): State<Arc<ReconciliationEngine>>,
    params: Result<Query<FinanceQuery>, QueryRejection>,
) -> Result<Json<FinanceKpis>, ApiError> {
    let params = query(params)?;
    let building = building(params.building);
    Ok(Json(
        engine
            .finance_kpis(params.from, params.to, building.as_ref())
            .await?,
    ))
}

async fn control(
    State(guard): State<Arc<SourceOfTruthGuard>>,
    Path(unit_id): Path<String>,
) -> Json<GuardStatus> {
    Json(guard.guard_status(&UnitId::new(unit_id)).await)
}
