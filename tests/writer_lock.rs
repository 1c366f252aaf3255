//! Writer-lock scenarios using cucumber-rs (Gherkin).
//!
//! Both services run in-process over one shared in-memory store. The
//! adapter's channel manager is replaced by the local booking store.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use chrono::{Days, NaiveDate, Utc};
use cucumber::{given, then, when, World};
use serde_json::{json, Value};
use tower::ServiceExt;

use rentsync::bookings::LocalBookingBackend;
use rentsync::config::{BrandRule, Config, StorageConfig};
use rentsync::domain::{Brand, SourceOfTruth, UnitControlMapping, UnitId};
use rentsync::interfaces::{AuditRecord, MappingStore, ModeStore};
use rentsync::policy::{OperationMode, WriterRole};
use rentsync::runtime::Runtime;
use rentsync::storage::{init_storage, Stores};

/// Test world containing all scenario state.
#[derive(World)]
#[world(init = Self::new)]
pub struct LockWorld {
    stores: Stores,
    config: Config,
    status: Option<u16>,
    body: Value,
}

impl std::fmt::Debug for LockWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LockWorld")
            .field("status", &self.status)
            .field("body", &self.body)
            .finish()
    }
}

impl LockWorld {
    async fn new() -> Self {
        let (stores, _pool) = init_storage(&StorageConfig::in_memory())
            .await
            .expect("failed to init in-memory storage");
        Self {
            stores,
            config: Config::for_test(),
            status: None,
            body: Value::Null,
        }
    }

    fn role(name: &str) -> WriterRole {
        name.parse().expect("unknown role")
    }

    async fn create(&mut self, role: WriterRole, brand: &str, nights: u64, unit: &str) {
        let router = Runtime::builder(role, self.config.clone())
            .with_stores(self.stores.clone())
            .with_backend(Arc::new(LocalBookingBackend::new(
                self.stores.bookings.clone(),
            )))
            .build()
            .expect("runtime")
            .router();

        let check_in = NaiveDate::from_ymd_opt(2026, 7, 1).expect("date");
        let check_out = check_in + Days::new(nights);
        let request = Request::builder()
            .method("POST")
            .uri(format!("/brands/{brand}/bookings"))
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "unitId": unit, "checkIn": check_in, "checkOut": check_out }).to_string(),
            ))
            .expect("request");

        let response = router.oneshot(request).await.expect("response");
        self.status = Some(response.status().as_u16());
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        self.body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    }
}

// Step implementations

#[given(expr = "brand {string} accepts stays of {int} to {int} nights")]
async fn given_brand_rule(world: &mut LockWorld, brand: String, min: u32, max: u32) {
    world.config.brands.push(BrandRule {
        name: Brand::new(brand),
        min_nights: min,
        max_nights: max,
    });
}

#[given(expr = "brand {string} is in {string} mode")]
async fn given_brand_mode(world: &mut LockWorld, brand: String, mode: String) {
    let mode: OperationMode = mode.parse().expect("unknown mode");
    world
        .stores
        .modes
        .set_mode(
            &Brand::new(&brand),
            mode,
            AuditRecord::new("cucumber", "set_brand_mode", brand.as_str(), "{}"),
        )
        .await
        .expect("set mode");
}

#[given(expr = "unit {string} is controlled by the channel manager")]
async fn given_external_unit(world: &mut LockWorld, unit: String) {
    world
        .stores
        .mappings
        .upsert(
            UnitControlMapping {
                unit_id: UnitId::new(unit.as_str()),
                external_property_id: "prop-1".to_string(),
                external_room_id: None,
                source_of_truth: SourceOfTruth::External,
                connection_type: None,
                updated_at: Utc::now(),
            },
            AuditRecord::new("cucumber", "link_unit", unit.as_str(), "{}"),
        )
        .await
        .expect("link unit");
}

#[when(expr = "the {word} creates a {int} night booking for {string} on unit {string}")]
async fn when_create(world: &mut LockWorld, role: String, nights: u64, brand: String, unit: String) {
    world
        .create(LockWorld::role(&role), &brand, nights, &unit)
        .await;
}

#[then(expr = "the response status is {int}")]
async fn then_status(world: &mut LockWorld, status: u16) {
    assert_eq!(world.status, Some(status), "body: {}", world.body);
}

#[then(expr = "the conflict names {string} as designated writer")]
async fn then_designated(world: &mut LockWorld, role: String) {
    assert_eq!(world.body["designatedWriter"], role);
}

#[then(expr = "the conflict was raised by {string}")]
async fn then_rejected_by(world: &mut LockWorld, role: String) {
    assert_eq!(world.body["rejectedBy"], role);
}

#[then(expr = "the conflict code is {string}")]
async fn then_code(world: &mut LockWorld, code: String) {
    assert_eq!(world.body["code"], code);
}

#[tokio::main]
async fn main() {
    LockWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/features/writer_lock.feature")
        .await;
}
