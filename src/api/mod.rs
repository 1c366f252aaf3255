//! HTTP API shared by the adapter and the hub.
//!
//! | Route | Services |
//! |-------|----------|
//! | `GET /health` | both |
//! | booking mutations under `/brands/{brand}/bookings` | both, writer-locked |
//! | `GET /units/{unit}/control` | both |
//! | webhook receiver and status | both, when enabled |
//! | `GET /kpis/...` | hub |
//! | `/admin/...` | hub, when an admin token is configured |

mod admin;
mod bookings;
pub mod error;
mod kpis;

pub use admin::ACTOR_HEADER;
pub use error::{ApiError, ErrorBody};

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};
use rentsync_policy::{WriterRole, POLICY_VERSION};
use serde_json::json;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::admin::AdminService;
use crate::bookings::BookingService;
use crate::config::Config;
use crate::guard::SourceOfTruthGuard;
use crate::reconciliation::ReconciliationEngine;
use crate::utils::bootstrap::shutdown_signal;
use crate::webhook::{self, WebhookIngestor};
use crate::writer_lock::WriterLock;

/// Everything the routes need, built once at startup.
#[derive(Clone)]
pub struct Services {
    pub role: WriterRole,
    pub writer_lock: Arc<WriterLock>,
    pub guard: Arc<SourceOfTruthGuard>,
    pub bookings: Arc<BookingService>,
    pub webhook: Arc<WebhookIngestor>,
    /// Hub only.
    pub reconciliation: Option<Arc<ReconciliationEngine>>,
    /// Hub only.
    pub admin: Option<Arc<AdminService>>,
}

/// Build the service router (separated for testing).
pub fn build_router(services: &Services, config: &Config) -> Router {
    let role = services.role;
    let mut app = Router::new()
        .route(
            "/health",
            get(move || async move {
                Json(json!({ "status": "ok", "role": role, "policyVersion": POLICY_VERSION }))
            }),
        )
        .merge(bookings::router(
            services.bookings.clone(),
            services.writer_lock.clone(),
        ))
        .merge(kpis::control_router(services.guard.clone()))
        .merge(webhook::router(
            services.webhook.clone(),
            &config.webhook.path,
            &config.webhook.status_path(),
        ));

    if let Some(engine) = &services.reconciliation {
        app = app.merge(kpis::router(engine.clone()));

        let token = config.admin.token.as_deref().filter(|t| !t.is_empty());
        match (&services.admin, token) {
            (Some(admin), Some(token)) => {
                app = app.merge(admin::router(
                    admin.clone(),
                    engine.clone(),
                    &config.admin.token_header,
                    token,
                ));
            }
            (Some(_), None) => info!("admin token not configured; admin routes disabled"),
            _ => {}
        }
    }

    app.layer(TraceLayer::new_for_http())
}

/// Serve `router` until a shutdown signal arrives.
pub async fn serve(
    router: Router,
    bind_addr: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let actual_port = listener.local_addr()?.port();
    info!(port = actual_port, "HTTP API listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

#[cfg(all(test, feature = "sqlite"))]
mod tests;
