//! HTTP surface of the webhook pipeline.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{ConnectInfo, Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tracing::warn;

use super::ingest::{IngestOutcome, WebhookIngestor, WebhookStatusReport};

/// Largest accepted notification body.
const MAX_BODY_BYTES: usize = 256 * 1024;

/// Build the webhook router (separated for testing).
pub fn router(ingestor: Arc<WebhookIngestor>, path: &str, status_path: &str) -> Router {
    Router::new()
        .route(path, post(receive))
        .route(status_path, get(status))
        .with_state(ingestor)
}

// ============================================================================
// Handlers
// ============================================================================

async fn receive(State(ingestor): State<Arc<WebhookIngestor>>, request: Request) -> Response {
    if !ingestor.is_enabled() {
        return StatusCode::NO_CONTENT.into_response();
    }

    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let (parts, body) = request.into_parts();
    let body = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(body) => body,
        Err(e) => {
            warn!(error = %e, "failed to read webhook body");
            return invalid("unreadable body");
        }
    };

    match ingestor.ingest(&parts.headers, peer, &body).await {
        IngestOutcome::Disabled => StatusCode::NO_CONTENT.into_response(),
        IngestOutcome::Unauthorized(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "error": "unauthorized" })),
        )
            .into_response(),
        IngestOutcome::Forbidden(_) => {
            (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response()
        }
        IngestOutcome::Invalid(message) => invalid(&message),
        IngestOutcome::Accepted(ack) => (StatusCode::OK, Json(ack)).into_response(),
    }
}

fn invalid(message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": "invalid_payload", "message": message })),
    )
        .into_response()
}

async fn status(State(ingestor): State<Arc<WebhookIngestor>>) -> Json<WebhookStatusReport> {
    Json(ingestor.status())
}
