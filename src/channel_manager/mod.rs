//! HTTP client for the channel manager's booking API.
//!
//! The adapter writes bookings through this client instead of the local
//! store. Only the calls the adapter needs are modelled:
//!
//! | Operation     | Request                          |
//! |---------------|----------------------------------|
//! | get           | `GET   /bookings/{id}`           |
//! | create        | `POST  /bookings`                |
//! | update dates  | `PATCH /bookings/{id}`           |
//! | update status | `PATCH /bookings/{id}`           |
//! | cancel        | `POST  /bookings/{id}/cancel`    |
//!
//! The channel manager only knows its own property and room ids. Units are
//! translated through the control mappings on the way out and back; a unit
//! without a mapping cannot be booked here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::bookings::{BackendError, BookingBackend};
use crate::config::ChannelManagerConfig;
use crate::domain::{Booking, BookingStatus, Brand, NewBooking, UnitControlMapping, UnitId};
use crate::interfaces::MappingStore;

#[derive(Debug, thiserror::Error)]
pub enum ChannelManagerError {
    #[error("channel_manager.base_url is not configured")]
    NotConfigured,

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateRequest<'a> {
    brand: &'a Brand,
    property_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    room_id: Option<&'a str>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    guest_reference: Option<&'a str>,
}

/// A booking as the channel manager returns it.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelBooking {
    booking_id: String,
    brand: Brand,
    property_id: String,
    #[serde(default)]
    room_id: Option<String>,
    check_in: NaiveDate,
    check_out: NaiveDate,
    status: BookingStatus,
    #[serde(default)]
    guest_reference: Option<String>,
}

impl ChannelBooking {
    fn into_booking(self, unit_id: UnitId) -> Booking {
        Booking {
            booking_id: self.booking_id,
            brand: self.brand,
            unit_id,
            check_in: self.check_in,
            check_out: self.check_out,
            status: self.status,
            guest_reference: self.guest_reference,
        }
    }
}

/// reqwest-backed channel manager client.
#[derive(Clone)]
pub struct HttpChannelManagerClient {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
    mappings: Arc<dyn MappingStore>,
}

impl HttpChannelManagerClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
        mappings: Arc<dyn MappingStore>,
    ) -> Result<Self, ChannelManagerError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into(),
            api_key,
            client,
            mappings,
        })
    }

    pub fn from_config(
        config: &ChannelManagerConfig,
        mappings: Arc<dyn MappingStore>,
    ) -> Result<Self, ChannelManagerError> {
        let base_url = config
            .base_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .ok_or(ChannelManagerError::NotConfigured)?;
        Self::new(
            base_url,
            config.api_key.clone(),
            Duration::from_millis(config.timeout_ms),
            mappings,
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        self.authorized(request)
            .send()
            .await
            .map_err(|e| BackendError::Upstream(format!("request failed: {e}")))
    }

    async fn mapping_for(&self, unit_id: &UnitId) -> Result<UnitControlMapping, BackendError> {
        self.mappings
            .get(unit_id)
            .await?
            .ok_or_else(|| BackendError::NotLinked(format!("unit {unit_id}")))
    }

    /// Local unit for a channel-manager property/room.
    async fn unit_for(&self, remote: &ChannelBooking) -> Result<UnitId, BackendError> {
        let mapping = self
            .mappings
            .find_by_external(&remote.property_id, remote.room_id.as_deref())
            .await?;
        match mapping {
            Some(mapping) => Ok(mapping.unit_id),
            None => Err(BackendError::NotLinked(format!(
                "property {}",
                remote.property_id
            ))),
        }
    }

    async fn remote(
        &self,
        request: RequestBuilder,
        id: &str,
    ) -> Result<ChannelBooking, BackendError> {
        let response = self.send(request).await?;
        if response.status().is_success() {
            return response
                .json::<ChannelBooking>()
                .await
                .map_err(|e| BackendError::Upstream(format!("invalid booking response: {e}")));
        }
        Err(error_from(response, id).await)
    }

    async fn booking(&self, request: RequestBuilder, id: &str) -> Result<Booking, BackendError> {
        let remote = self.remote(request, id).await?;
        let unit_id = self.unit_for(&remote).await?;
        Ok(remote.into_booking(unit_id))
    }
}

/// Map a non-success response, preferring the body's `message` field.
async fn error_from(response: Response, id: &str) -> BackendError {
    let status = response.status();
    let body = response.bytes().await.unwrap_or_default();
    let message = serde_json::from_slice::<serde_json::Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("message")
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());

    debug!(%status, booking_id = id, %message, "channel manager rejected request");
    match status {
        StatusCode::NOT_FOUND => BackendError::NotFound(id.to_string()),
        StatusCode::CONFLICT => BackendError::Conflict(message),
        _ => BackendError::Upstream(format!("{status}: {message}")),
    }
}

#[async_trait]
impl BookingBackend for HttpChannelManagerClient {
    async fn get(&self, booking_id: &str) -> Result<Option<Booking>, BackendError> {
        let request = self.client.get(self.url(&format!("/bookings/{booking_id}")));
        match self.booking(request, booking_id).await {
            Ok(booking) => Ok(Some(booking)),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn create(&self, brand: &Brand, booking: &NewBooking) -> Result<Booking, BackendError> {
        let mapping = self.mapping_for(&booking.unit_id).await?;
        let body = CreateRequest {
            brand,
            property_id: &mapping.external_property_id,
            room_id: mapping.external_room_id.as_deref(),
            check_in: booking.check_in,
            check_out: booking.check_out,
            guest_reference: booking.guest_reference.as_deref(),
        };
        let request = self.client.post(self.url("/bookings")).json(&body);
        let remote = self.remote(request, booking.unit_id.as_str()).await?;
        Ok(remote.into_booking(booking.unit_id.clone()))
    }

    fn mutates_local_state(&self) -> bool {
        false
    }

    async fn update_dates(
        &self,
        booking_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking, BackendError> {
        let request = self
            .client
            .patch(self.url(&format!("/bookings/{booking_id}")))
            .json(&json!({ "checkIn": check_in, "checkOut": check_out }));
        self.booking(request, booking_id).await
    }

    async fn update_status(
        &self,
        booking_id: &str,
        status: BookingStatus,
    ) -> Result<Booking, BackendError> {
        let request = self
            .client
            .patch(self.url(&format!("/bookings/{booking_id}")))
            .json(&json!({ "status": status }));
        self.booking(request, booking_id).await
    }

    async fn cancel(&self, booking_id: &str) -> Result<Booking, BackendError> {
        let request = self
            .client
            .post(self.url(&format!("/bookings/{booking_id}/cancel")));
        self.booking(request, booking_id).await
    }
}

#[cfg(test)]
mod tests {
    use axum::extract::{Path, State};
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use chrono::Utc;
    use tokio::sync::Mutex;

    use super::*;
    use crate::domain::SourceOfTruth;
    use crate::storage::mock::MockMappingStore;

    #[derive(Default)]
    struct Seen {
        authorization: Vec<Option<String>>,
        bodies: Vec<serde_json::Value>,
    }

    fn remote(id: &str, status: &str) -> serde_json::Value {
        json!({
            "bookingId": id,
            "brand": "nightly",
            "propertyId": "prop-1",
            "roomId": "room-7",
            "checkIn": "2026-03-01",
            "checkOut": "2026-03-03",
            "status": status
        })
    }

    async fn mappings() -> Arc<MockMappingStore> {
        let store = Arc::new(MockMappingStore::new());
        store
            .insert(UnitControlMapping {
                unit_id: UnitId::new("u-1"),
                external_property_id: "prop-1".to_string(),
                external_room_id: Some("room-7".to_string()),
                source_of_truth: SourceOfTruth::External,
                connection_type: None,
                updated_at: Utc::now(),
            })
            .await;
        store
    }

    async fn spawn_server() -> (String, Arc<Mutex<Seen>>) {
        let seen = Arc::new(Mutex::new(Seen::default()));
        let app = Router::new()
            .route(
                "/bookings",
                post(
                    |State(seen): State<Arc<Mutex<Seen>>>,
                     headers: HeaderMap,
                     Json(body): Json<serde_json::Value>| async move {
                        let mut seen = seen.lock().await;
                        seen.authorization.push(
                            headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_string),
                        );
                        seen.bodies.push(body);
                        (StatusCode::CREATED, Json(remote("cm-1", "CONFIRMED")))
                    },
                ),
            )
            .route(
                "/bookings/:id",
                get(|Path(id): Path<String>| async move {
                    match id.as_str() {
                        "cm-1" => Ok(Json(remote("cm-1", "CONFIRMED"))),
                        "cm-elsewhere" => Ok(Json(json!({
                            "bookingId": "cm-elsewhere",
                            "brand": "nightly",
                            "propertyId": "prop-unknown",
                            "checkIn": "2026-03-01",
                            "checkOut": "2026-03-03",
                            "status": "CONFIRMED"
                        }))),
                        _ => Err((StatusCode::NOT_FOUND, Json(json!({ "message": "gone" })))),
                    }
                })
                .patch(|| async {
                    (
                        StatusCode::CONFLICT,
                        Json(json!({ "message": "room already sold" })),
                    )
                }),
            )
            .route(
                "/bookings/:id/cancel",
                post(|| async {
                    (
                        StatusCode::SERVICE_UNAVAILABLE,
                        Json(json!({ "message": "maintenance" })),
                    )
                }),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}/"), seen)
    }

    async fn client(base_url: String) -> HttpChannelManagerClient {
        HttpChannelManagerClient::new(
            base_url,
            Some("k-123".to_string()),
            Duration::from_secs(5),
            mappings().await,
        )
        .unwrap()
    }

    fn request(unit: &str) -> NewBooking {
        NewBooking {
            unit_id: UnitId::new(unit),
            check_in: "2026-03-01".parse().unwrap(),
            check_out: "2026-03-03".parse().unwrap(),
            guest_reference: None,
        }
    }

    #[tokio::test]
    async fn test_create_sends_external_ids_with_bearer() {
        let (base, seen) = spawn_server().await;

        let created = client(base)
            .await
            .create(&Brand::new("nightly"), &request("u-1"))
            .await
            .unwrap();
        assert_eq!(created.booking_id, "cm-1");
        assert_eq!(created.unit_id, UnitId::new("u-1"));

        let seen = seen.lock().await;
        assert_eq!(seen.authorization, vec![Some("Bearer k-123".to_string())]);
        assert_eq!(
            seen.bodies[0],
            json!({
                "brand": "nightly",
                "propertyId": "prop-1",
                "roomId": "room-7",
                "checkIn": "2026-03-01",
                "checkOut": "2026-03-03"
            })
        );
    }

    #[tokio::test]
    async fn test_create_refuses_unlinked_unit() {
        let (base, seen) = spawn_server().await;

        let result = client(base)
            .await
            .create(&Brand::new("nightly"), &request("u-2"))
            .await;
        assert!(matches!(result, Err(BackendError::NotLinked(m)) if m.contains("u-2")));
        assert!(seen.lock().await.bodies.is_empty());
    }

    #[tokio::test]
    async fn test_get_resolves_unit_and_maps_not_found() {
        let (base, _) = spawn_server().await;
        let cm = client(base).await;

        let found = cm.get("cm-1").await.unwrap().unwrap();
        assert_eq!(found.unit_id, UnitId::new("u-1"));
        assert!(cm.get("cm-404").await.unwrap().is_none());
        assert!(matches!(
            cm.get("cm-elsewhere").await,
            Err(BackendError::NotLinked(m)) if m.contains("prop-unknown")
        ));
    }

    #[tokio::test]
    async fn test_conflict_carries_message() {
        let (base, _) = spawn_server().await;
        let result = client(base)
            .await
            .update_status("cm-1", BookingStatus::Pending)
            .await;
        match result {
            Err(BackendError::Conflict(message)) => assert_eq!(message, "room already sold"),
            other => panic!("expected conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_upstream() {
        let (base, _) = spawn_server().await;
        let result = client(base).await.cancel("cm-1").await;
        assert!(matches!(result, Err(BackendError::Upstream(m)) if m.contains("maintenance")));
    }

    #[test]
    fn test_from_config_requires_base_url() {
        let config = ChannelManagerConfig::default();
        assert!(matches!(
            HttpChannelManagerClient::from_config(&config, Arc::new(MockMappingStore::new())),
            Err(ChannelManagerError::NotConfigured)
        ));
    }
}
