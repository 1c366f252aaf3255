//! Router tests: both roles over one shared in-memory store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::Response;
use chrono::Utc;
use rentsync_policy::OperationMode;
use serde_json::{json, Value};
use tower::ServiceExt;

use super::*;
use crate::bookings::LocalBookingBackend;
use crate::config::{BrandRule, StorageConfig};
use crate::domain::{Brand, SourceOfTruth, UnitControlMapping, UnitId};
use crate::interfaces::{AuditLog, AuditRecord, BookingStore, MappingStore, ModeStore};
use crate::runtime::Runtime;
use crate::storage::{init_storage, Stores};

const ADMIN_TOKEN: &str = "admin-token-1";

fn config(admin_token: Option<&str>) -> Config {
    let mut config = Config::for_test();
    config.brands = vec![
        BrandRule {
            name: Brand::new("nightly"),
            min_nights: 1,
            max_nights: 27,
        },
        BrandRule {
            name: Brand::new("monthly"),
            min_nights: 28,
            max_nights: 365,
        },
    ];
    config.admin.token = admin_token.map(str::to_string);
    config
}

async fn stores() -> Stores {
    let (stores, _pool) = init_storage(&StorageConfig::in_memory())
        .await
        .expect("failed to init in-memory storage");
    stores
}

/// Router for `role`. The adapter's channel manager is stood in for by the
/// local store so both roles can be exercised without a network peer.
fn app(role: WriterRole, stores: &Stores, config: Config) -> Router {
    Runtime::builder(role, config)
        .with_stores(stores.clone())
        .with_backend(Arc::new(LocalBookingBackend::new(stores.bookings.clone())))
        .build()
        .unwrap()
        .router()
}

async fn set_mode(stores: &Stores, brand: &str, mode: OperationMode) {
    stores
        .modes
        .set_mode(
            &Brand::new(brand),
            mode,
            AuditRecord::new("test", "set_brand_mode", brand, "{}"),
        )
        .await
        .unwrap();
}

async fn link_external(stores: &Stores, unit: &str) {
    stores
        .mappings
        .upsert(
            UnitControlMapping {
                unit_id: UnitId::new(unit),
                external_property_id: "prop-1".to_string(),
                external_room_id: None,
                source_of_truth: SourceOfTruth::External,
                connection_type: None,
                updated_at: Utc::now(),
            },
            AuditRecord::new("test", "link_unit", unit, "{}"),
        )
        .await
        .unwrap();
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn create_booking(brand: &str, unit: &str, check_in: &str, check_out: &str) -> Request<Body> {
    json_request(
        "POST",
        &format!("/brands/{brand}/bookings"),
        json!({ "unitId": unit, "checkIn": check_in, "checkOut": check_out }),
    )
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_standalone_brand_is_written_by_adapter_only() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Standalone).await;
    let adapter = app(WriterRole::Adapter, &stores, config(None));
    let hub = app(WriterRole::Hub, &stores, config(None));

    let response = adapter
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = hub
        .oneshot(create_booking("nightly", "u-2", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["code"], "WRITER_LOCK_VIOLATION");
    assert_eq!(body["brand"], "nightly");
    assert_eq!(body["mode"], "standalone");
    assert_eq!(body["designatedWriter"], "adapter");
    assert_eq!(body["rejectedBy"], "hub");
}

#[tokio::test]
async fn test_integrated_brand_is_written_by_hub_only() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Integrated).await;
    let adapter = app(WriterRole::Adapter, &stores, config(None));
    let hub = app(WriterRole::Hub, &stores, config(None));

    let response = adapter
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["designatedWriter"], "hub");
    assert_eq!(body["rejectedBy"], "adapter");

    let response = hub
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_rejected_write_has_no_side_effect() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Standalone).await;
    let hub = app(WriterRole::Hub, &stores, config(None));

    let response = hub
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let from = "2026-01-01".parse().unwrap();
    let to = "2027-01-01".parse().unwrap();
    assert!(stores.bookings.overlapping(from, to).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_guard_blocks_externally_controlled_unit() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Integrated).await;
    link_external(&stores, "u-9").await;
    let hub = app(WriterRole::Hub, &stores, config(None));

    let response = hub
        .oneshot(create_booking("nightly", "u-9", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = json_body(response).await;
    assert_eq!(body["code"], "EXTERNALLY_CONTROLLED");
    assert_eq!(body["unitId"], "u-9");
    assert_eq!(body["operation"], "CREATE_BOOKING");
    assert_eq!(body["rejectedBy"], "hub");
}

#[tokio::test]
async fn test_booking_lifecycle_on_hub() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Integrated).await;
    let hub = app(WriterRole::Hub, &stores, config(None));

    let response = hub
        .clone()
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    let id = json_body(response).await["bookingId"]
        .as_str()
        .unwrap()
        .to_string();

    let response = hub
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/brands/nightly/bookings/{id}/dates"),
            json!({ "checkIn": "2026-05-02", "checkOut": "2026-05-06" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["checkOut"], "2026-05-06");

    let response = hub
        .clone()
        .oneshot(json_request(
            "PATCH",
            &format!("/brands/nightly/bookings/{id}/status"),
            json!({ "status": "PENDING" }),
        ))
        .await
        .unwrap();
    assert_eq!(json_body(response).await["status"], "PENDING");

    let response = hub
        .oneshot(json_request(
            "POST",
            &format!("/brands/nightly/bookings/{id}/cancel"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "CANCELLED");
}

#[tokio::test]
async fn test_night_rules_and_bad_bodies() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Integrated).await;
    let hub = app(WriterRole::Hub, &stores, config(None));

    let response = hub
        .clone()
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-06-15"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["code"], "NIGHTS_OUT_OF_RANGE");

    let response = hub
        .clone()
        .oneshot(json_request(
            "POST",
            "/brands/nightly/bookings",
            json!({ "unitId": "u-1" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = hub
        .oneshot(json_request(
            "PATCH",
            "/brands/nightly/bookings/missing/status",
            json!({ "status": "CONFIRMED" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_routes_hidden_without_token() {
    let stores = stores().await;
    let hub = app(WriterRole::Hub, &stores, config(None));

    let response = hub.oneshot(get("/admin/modes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_token_is_required() {
    let stores = stores().await;
    let hub = app(WriterRole::Hub, &stores, config(Some(ADMIN_TOKEN)));

    let response = hub.clone().oneshot(get("/admin/modes")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/admin/modes")
        .header("x-admin-token", "admin-token-2")
        .body(Body::empty())
        .unwrap();
    let response = hub.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_mode_change_takes_effect_immediately_on_hub() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Standalone).await;
    let hub = app(WriterRole::Hub, &stores, config(Some(ADMIN_TOKEN)));

    let response = hub
        .clone()
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut request = json_request(
        "PUT",
        "/admin/brands/nightly/mode",
        json!({ "mode": "integrated" }),
    );
    request
        .headers_mut()
        .insert("x-admin-token", ADMIN_TOKEN.parse().unwrap());
    request
        .headers_mut()
        .insert(ACTOR_HEADER, "ops@example.com".parse().unwrap());
    let response = hub.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = hub
        .oneshot(create_booking("nightly", "u-1", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let audit = stores.audit.recent(10).await.unwrap();
    assert!(audit
        .iter()
        .any(|r| r.actor == "ops@example.com" && r.action == "set_brand_mode"));
}

#[tokio::test]
async fn test_kpis_are_hub_only() {
    let stores = stores().await;
    let hub = app(WriterRole::Hub, &stores, config(None));
    let adapter = app(WriterRole::Adapter, &stores, config(None));

    let response = hub
        .clone()
        .oneshot(get("/kpis/occupancy?date=2026-05-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["date"], "2026-05-01");
    assert_eq!(body["rate"], Value::Null);

    let response = hub
        .oneshot(get("/kpis/finance?from=2026-05-01&to=2026-05-01"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(json_body(response).await["code"], "INVALID_PERIOD");

    let response = adapter.oneshot(get("/kpis/occupancy")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_control_badge_and_health() {
    let stores = stores().await;
    link_external(&stores, "u-9").await;
    let adapter = app(WriterRole::Adapter, &stores, config(None));

    let response = adapter
        .clone()
        .oneshot(get("/units/u-9/control"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["externallyControlled"], true);
    assert_eq!(body["externalPropertyId"], "prop-1");

    let response = adapter.oneshot(get("/health")).await.unwrap();
    let body = json_body(response).await;
    assert_eq!(body["role"], "adapter");
    assert_eq!(body["policyVersion"], POLICY_VERSION);
}

// ============================================================================
// Adapter over the channel manager
// ============================================================================

/// Channel manager that accepts every booking and records request bodies.
async fn spawn_channel_manager() -> (String, Arc<tokio::sync::Mutex<Vec<Value>>>) {
    use axum::extract::State;
    use axum::routing::post;

    let received = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let app = Router::new()
        .route(
            "/bookings",
            post(
                |State(received): State<Arc<tokio::sync::Mutex<Vec<Value>>>>,
                 axum::Json(body): axum::Json<Value>| async move {
                    received.lock().await.push(body.clone());
                    (
                        StatusCode::CREATED,
                        axum::Json(json!({
                            "bookingId": "cm-77",
                            "brand": body["brand"],
                            "propertyId": body["propertyId"],
                            "checkIn": body["checkIn"],
                            "checkOut": body["checkOut"],
                            "status": "CONFIRMED"
                        })),
                    )
                },
            ),
        )
        .with_state(received.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), received)
}

fn channel_adapter(stores: &Stores, base_url: String) -> Router {
    let mut config = config(None);
    config.channel_manager.base_url = Some(base_url);
    Runtime::builder(WriterRole::Adapter, config)
        .with_stores(stores.clone())
        .build()
        .unwrap()
        .router()
}

#[tokio::test]
async fn test_adapter_books_channel_managed_unit_through_channel_manager() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Standalone).await;
    link_external(&stores, "u-9").await;
    let (base_url, received) = spawn_channel_manager().await;

    let response = channel_adapter(&stores, base_url)
        .oneshot(create_booking("nightly", "u-9", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = json_body(response).await;
    assert_eq!(body["bookingId"], "cm-77");
    assert_eq!(body["unitId"], "u-9");

    let received = received.lock().await;
    assert_eq!(received.len(), 1);
    assert_eq!(received[0]["propertyId"], "prop-1");
    assert!(received[0].get("unitId").is_none());

    // The channel manager owns this booking; nothing is written locally.
    let from = "2026-05-01".parse().unwrap();
    let to = "2026-05-04".parse().unwrap();
    assert!(stores.bookings.overlapping(from, to).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_adapter_refuses_unit_unknown_to_channel_manager() {
    let stores = stores().await;
    set_mode(&stores, "nightly", OperationMode::Standalone).await;
    let (base_url, received) = spawn_channel_manager().await;

    let response = channel_adapter(&stores, base_url)
        .oneshot(create_booking("nightly", "u-3", "2026-05-01", "2026-05-04"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert_eq!(body["code"], "UNIT_NOT_LINKED");
    assert_eq!(body["brand"], "nightly");
    assert!(received.lock().await.is_empty());
}
