//! axum middleware enforcing the writer lock on booking mutation routes.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::WriterLock;
use crate::api::ApiError;
use crate::domain::Brand;

/// Route parameter naming the brand.
const BRAND_PARAM: &str = "brand";

/// Reject the request unless this service is the brand's designated writer.
///
/// Apply with `route_layer` so path parameters are available. Runs before
/// the handler, so a rejected request causes no persistence and no
/// outbound call.
pub async fn enforce_writer_lock(
    State(lock): State<Arc<WriterLock>>,
    Path(params): Path<HashMap<String, String>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(brand) = params.get(BRAND_PARAM).map(Brand::new) else {
        return ApiError::bad_request("route has no brand segment").into_response();
    };

    match lock.check(&brand).await {
        Ok(_) => next.run(request).await,
        Err(e) => ApiError::from(e).into_response(),
    }
}
