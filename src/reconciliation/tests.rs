//! Reconciliation engine tests against in-memory SQLite.

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

use super::*;
use crate::config::StorageConfig;
use crate::domain::{
    Booking, BookingStatus, Brand, Occupancy, SourceOfTruth, StatusSource, StatusStamp,
    UnitControlMapping,
};
use crate::interfaces::AuditRecord;
use crate::storage::init_storage;

fn d(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

/// Building b-1: u-01..u-02 blocked, u-03 maintenance, u-04..u-10 active.
/// Building b-2: u-11, externally controlled.
async fn seeded() -> (ReconciliationEngine, Stores, SqlitePool) {
    let (stores, pool) = init_storage(&StorageConfig::in_memory())
        .await
        .expect("failed to init in-memory storage");

    for n in 1..=10 {
        let status = match n {
            1 | 2 => "BLOCKED",
            3 => "MAINTENANCE",
            _ => "ACTIVE",
        };
        sqlx::query(
            "INSERT INTO units (unit_id, building_id, status, monthly_rent_cents) VALUES (?, 'b-1', ?, 100000)",
        )
        .bind(format!("u-{n:02}"))
        .bind(status)
        .execute(&pool)
        .await
        .unwrap();
    }
    sqlx::query(
        "INSERT INTO units (unit_id, building_id, status, monthly_rent_cents) VALUES ('u-11', 'b-2', 'ACTIVE', 200000)",
    )
    .execute(&pool)
    .await
    .unwrap();

    for n in 4..=7 {
        book(&stores, &format!("u-{n:02}"), "2026-03-01", "2026-04-01").await;
    }
    stores
        .mappings
        .upsert(
            UnitControlMapping {
                unit_id: UnitId::new("u-11"),
                external_property_id: "prop-11".to_string(),
                external_room_id: None,
                source_of_truth: SourceOfTruth::External,
                connection_type: None,
                updated_at: Utc::now(),
            },
            AuditRecord::new("test", "link_unit", "u-11", "{}"),
        )
        .await
        .unwrap();

    (ReconciliationEngine::new(&stores), stores, pool)
}

async fn book(stores: &Stores, unit: &str, check_in: &str, check_out: &str) {
    stores
        .bookings
        .insert(Booking {
            booking_id: format!("b-{unit}-{check_in}"),
            brand: Brand::new("monthly"),
            unit_id: UnitId::new(unit),
            check_in: d(check_in),
            check_out: d(check_out),
            status: BookingStatus::Confirmed,
            guest_reference: None,
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_building_occupancy_rate() {
    let (engine, _stores, _pool) = seeded().await;
    let b1 = BuildingId::new("b-1");

    let report = engine.occupancy(d("2026-03-15"), Some(&b1)).await.unwrap();
    assert_eq!(report.summary.total, 10);
    assert_eq!(report.summary.blocked, 2);
    assert_eq!(report.summary.maintenance, 1);
    assert_eq!(report.summary.occupied, 4);
    assert_eq!(report.summary.vacant, 3);
    assert_eq!(report.derived_units, 10);
    assert!((report.rate.unwrap() - 4.0 / 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_external_unit_is_unknown_until_data_arrives() {
    let (engine, stores, _pool) = seeded().await;
    let b2 = BuildingId::new("b-2");
    // A local booking must not leak into an externally controlled unit.
    book(&stores, "u-11", "2026-03-10", "2026-03-20").await;

    let rows = engine.derive_day(d("2026-03-15"), Some(&b2)).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].occupancy, Occupancy::Unknown);
    assert_eq!(rows[0].source, StatusSource::None);
    assert_eq!(
        engine.occupancy(d("2026-03-15"), Some(&b2)).await.unwrap().rate,
        None
    );

    stores
        .external_status
        .record_availability(
            &UnitId::new("u-11"),
            &[d("2026-03-15")],
            true,
            &StatusStamp::now("evt-1"),
        )
        .await
        .unwrap();

    let rows = engine.derive_day(d("2026-03-15"), Some(&b2)).await.unwrap();
    assert_eq!(rows[0].occupancy, Occupancy::Vacant);
    assert_eq!(rows[0].source, StatusSource::External);
}

#[tokio::test]
async fn test_snapshot_keeps_history_unless_forced() {
    let (engine, stores, _pool) = seeded().await;
    let day = d("2026-03-15");

    let first = engine.snapshot_day(day, false).await.unwrap();
    assert_eq!(first.derived, 11);
    assert_eq!(first.written, 11);

    book(&stores, "u-08", "2026-03-14", "2026-03-16").await;

    let second = engine.snapshot_day(day, false).await.unwrap();
    assert_eq!(second.written, 0);
    let b1 = BuildingId::new("b-1");
    let report = engine.occupancy(day, Some(&b1)).await.unwrap();
    assert_eq!(report.summary.occupied, 4);
    assert_eq!(report.derived_units, 0);

    let forced = engine.snapshot_day(day, true).await.unwrap();
    assert_eq!(forced.written, 11);
    let report = engine.occupancy(day, Some(&b1)).await.unwrap();
    assert_eq!(report.summary.occupied, 5);
}

#[tokio::test]
async fn test_checkout_day_is_vacant() {
    let (engine, _stores, _pool) = seeded().await;
    let b1 = BuildingId::new("b-1");

    let report = engine.occupancy(d("2026-04-01"), Some(&b1)).await.unwrap();
    assert_eq!(report.summary.occupied, 0);
    assert_eq!(report.summary.vacant, 7);
}

#[tokio::test]
async fn test_finance_kpis_for_building() {
    let (engine, _stores, pool) = seeded().await;
    sqlx::query(
        "INSERT INTO ledger_entries (entry_id, parent_id, unit_id, building_id, kind, status, amount_cents, paid_at) VALUES
            ('e-1', NULL, 'u-04', 'b-1', 'RENT', 'PAID', 100000, '2026-03-02T09:00:00Z'),
            ('e-2', NULL, 'u-05', 'b-1', 'RENT', 'PAID', 100000, '2026-03-31T23:59:00Z'),
            ('e-3', NULL, 'u-06', 'b-1', 'RENT', 'DUE', 100000, NULL),
            ('e-4', NULL, 'u-07', 'b-1', 'RENT', 'PAID', 100000, '2026-04-01T00:00:00Z'),
            ('e-5', NULL, 'u-11', 'b-2', 'RENT', 'PAID', 200000, '2026-03-05T00:00:00Z')",
    )
    .execute(&pool)
    .await
    .unwrap();

    let b1 = BuildingId::new("b-1");
    let kpis = engine
        .finance_kpis(d("2026-03-01"), d("2026-04-01"), Some(&b1))
        .await
        .unwrap();

    assert_eq!(kpis.available_units, 7);
    assert_eq!(kpis.potential_annual_rent_cents, 7 * 100_000 * 12);
    assert_eq!(kpis.collected_revenue_cents, 200_000);
    assert_eq!(kpis.rev_pau_cents, Some(28_571));
    assert_eq!(kpis.effective_annual_rent_cents, Some(4_800_000));
    assert!((kpis.occupancy_rate.unwrap() - 4.0 / 7.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_finance_kpis_read_snapshotted_rents() {
    let (engine, _stores, pool) = seeded().await;
    let b1 = BuildingId::new("b-1");
    engine.snapshot_day(d("2026-03-31"), false).await.unwrap();
    let before = engine
        .finance_kpis(d("2026-03-01"), d("2026-04-01"), Some(&b1))
        .await
        .unwrap();

    sqlx::query("UPDATE units SET monthly_rent_cents = 900000 WHERE unit_id = 'u-04'")
        .execute(&pool)
        .await
        .unwrap();
    sqlx::query("UPDATE units SET status = 'BLOCKED' WHERE unit_id = 'u-08'")
        .execute(&pool)
        .await
        .unwrap();

    let after = engine
        .finance_kpis(d("2026-03-01"), d("2026-04-01"), Some(&b1))
        .await
        .unwrap();
    assert_eq!(after, before);
    assert_eq!(after.potential_annual_rent_cents, 7 * 100_000 * 12);
    assert_eq!(after.available_units, 7);
}

#[tokio::test]
async fn test_empty_period_rejected() {
    let (engine, _stores, _pool) = seeded().await;
    assert!(matches!(
        engine.finance_kpis(d("2026-03-01"), d("2026-03-01"), None).await,
        Err(ReconcileError::EmptyPeriod { .. })
    ));
}
