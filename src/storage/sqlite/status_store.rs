//! SQLite stores for ingested external status and daily snapshots.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_query::{Expr, InsertStatement, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Acquire, Row, SqliteConnection, SqlitePool};

use crate::domain::{
    BuildingId, DailyUnitStatus, ExternalDailyStatus, ExternalStay, Occupancy, StatusSource,
    StatusStamp, UnitId,
};
use crate::interfaces::{ExternalStatusStore, Result, SnapshotStore};
use crate::storage::schema::{
    DailyUnitStatus as Snapshots, ExternalAvailability as Availability,
    ExternalStayNights as StayNights,
};

use super::{fmt_date, fmt_ts, parse_date, parse_ts};

// ============================================================================
// External status
// ============================================================================

pub struct SqliteExternalStatusStore {
    pool: SqlitePool,
}

impl SqliteExternalStatusStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn read(&self, window: Window<'_>) -> Result<Vec<ExternalDailyStatus>> {
        let mut select = Query::select();
        select
            .columns([
                Availability::UnitId,
                Availability::Date,
                Availability::Available,
                Availability::EventId,
                Availability::RecordedAt,
            ])
            .from(Availability::Table);
        match window {
            Window::Day(date) => {
                select.and_where(Expr::col(Availability::Date).eq(fmt_date(date)));
            }
            Window::Unit { unit_id, from, to } => {
                select
                    .and_where(Expr::col(Availability::UnitId).eq(unit_id.as_str()))
                    .and_where(Expr::col(Availability::Date).gte(fmt_date(from)))
                    .and_where(Expr::col(Availability::Date).lt(fmt_date(to)));
            }
        }
        let flags = self.fetch(&select, flag_from_row).await?;

        let mut select = Query::select();
        select
            .columns([
                StayNights::BookingId,
                StayNights::UnitId,
                StayNights::Date,
                StayNights::EventId,
                StayNights::RecordedAt,
            ])
            .from(StayNights::Table)
            .order_by(StayNights::RecordedAt, Order::Asc);
        match window {
            Window::Day(date) => {
                select.and_where(Expr::col(StayNights::Date).eq(fmt_date(date)));
            }
            Window::Unit { unit_id, from, to } => {
                select
                    .and_where(Expr::col(StayNights::UnitId).eq(unit_id.as_str()))
                    .and_where(Expr::col(StayNights::Date).gte(fmt_date(from)))
                    .and_where(Expr::col(StayNights::Date).lt(fmt_date(to)));
            }
        }
        let stays = self.fetch(&select, stay_from_row).await?;

        Ok(merge(flags, stays))
    }

    async fn fetch(
        &self,
        select: &SelectStatement,
        from_row: fn(&SqliteRow) -> Result<ExternalDailyStatus>,
    ) -> Result<Vec<ExternalDailyStatus>> {
        let query = select.to_string(SqliteQueryBuilder);
        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(from_row).collect()
    }
}

#[derive(Clone, Copy)]
enum Window<'a> {
    Day(NaiveDate),
    Unit {
        unit_id: &'a UnitId,
        from: NaiveDate,
        to: NaiveDate,
    },
}

fn flag_from_row(row: &SqliteRow) -> Result<ExternalDailyStatus> {
    let unit_id: String = row.try_get("unit_id")?;
    let date: String = row.try_get("date")?;
    let recorded_at: String = row.try_get("recorded_at")?;

    Ok(ExternalDailyStatus {
        unit_id: UnitId::new(unit_id),
        date: parse_date(&date)?,
        occupied: false,
        available: row.try_get("available")?,
        booking_id: None,
        event_id: row.try_get("event_id")?,
        recorded_at: parse_ts(&recorded_at)?,
    })
}

fn stay_from_row(row: &SqliteRow) -> Result<ExternalDailyStatus> {
    let unit_id: String = row.try_get("unit_id")?;
    let date: String = row.try_get("date")?;
    let recorded_at: String = row.try_get("recorded_at")?;

    Ok(ExternalDailyStatus {
        unit_id: UnitId::new(unit_id),
        date: parse_date(&date)?,
        occupied: true,
        available: false,
        booking_id: Some(row.try_get("booking_id")?),
        event_id: row.try_get("event_id")?,
        recorded_at: parse_ts(&recorded_at)?,
    })
}

/// Folds availability flags and held nights into one row per unit-night.
/// A held night is never available. The latest holder names the booking.
fn merge(
    flags: Vec<ExternalDailyStatus>,
    stays: Vec<ExternalDailyStatus>,
) -> Vec<ExternalDailyStatus> {
    let mut nights: BTreeMap<(String, NaiveDate), ExternalDailyStatus> = BTreeMap::new();
    for row in flags.into_iter().chain(stays) {
        match nights.entry((row.unit_id.as_str().to_string(), row.date)) {
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
            Entry::Occupied(mut slot) => {
                let night = slot.get_mut();
                let later = row.recorded_at >= night.recorded_at;
                if row.occupied && (!night.occupied || later) {
                    night.booking_id = row.booking_id;
                }
                night.occupied |= row.occupied;
                night.available = night.available && !night.occupied;
                if later {
                    night.event_id = row.event_id;
                    night.recorded_at = row.recorded_at;
                }
            }
        }
    }
    nights.into_values().collect()
}

async fn set_available(
    conn: &mut SqliteConnection,
    unit_id: &UnitId,
    date: NaiveDate,
    available: bool,
    stamp: &StatusStamp,
) -> Result<()> {
    let query = Query::insert()
        .into_table(Availability::Table)
        .columns([
            Availability::UnitId,
            Availability::Date,
            Availability::Available,
            Availability::EventId,
            Availability::RecordedAt,
        ])
        .values_panic([
            unit_id.as_str().into(),
            fmt_date(date).into(),
            available.into(),
            stamp.event_id.as_str().into(),
            fmt_ts(stamp.recorded_at).into(),
        ])
        .on_conflict(
            OnConflict::columns([Availability::UnitId, Availability::Date])
                .update_columns([
                    Availability::Available,
                    Availability::EventId,
                    Availability::RecordedAt,
                ])
                .to_owned(),
        )
        .to_string(SqliteQueryBuilder);
    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

/// Nights currently held by a booking, as (unit, date).
async fn held_by(conn: &mut SqliteConnection, booking_id: &str) -> Result<Vec<(UnitId, NaiveDate)>> {
    let query = Query::select()
        .columns([StayNights::UnitId, StayNights::Date])
        .from(StayNights::Table)
        .and_where(Expr::col(StayNights::BookingId).eq(booking_id))
        .to_string(SqliteQueryBuilder);
    let rows = sqlx::query(&query).fetch_all(&mut *conn).await?;
    rows.iter()
        .map(|row| {
            let unit_id: String = row.try_get("unit_id")?;
            let date: String = row.try_get("date")?;
            Ok((UnitId::new(unit_id), parse_date(&date)?))
        })
        .collect()
}

async fn delete_held_by(conn: &mut SqliteConnection, booking_id: &str) -> Result<()> {
    let query = Query::delete()
        .from_table(StayNights::Table)
        .and_where(Expr::col(StayNights::BookingId).eq(booking_id))
        .to_string(SqliteQueryBuilder);
    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

#[async_trait]
impl ExternalStatusStore for SqliteExternalStatusStore {
    async fn record_stay(&self, stay: ExternalStay, stamp: &StatusStamp) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        for (unit_id, date) in held_by(&mut tx, &stay.booking_id).await? {
            if unit_id != stay.unit_id || !stay.nights.contains(&date) {
                set_available(&mut tx, &unit_id, date, true, stamp).await?;
            }
        }
        delete_held_by(&mut tx, &stay.booking_id).await?;

        for date in &stay.nights {
            let query = Query::insert()
                .into_table(StayNights::Table)
                .columns([
                    StayNights::BookingId,
                    StayNights::UnitId,
                    StayNights::Date,
                    StayNights::EventId,
                    StayNights::RecordedAt,
                ])
                .values_panic([
                    stay.booking_id.as_str().into(),
                    stay.unit_id.as_str().into(),
                    fmt_date(*date).into(),
                    stamp.event_id.as_str().into(),
                    fmt_ts(stamp.recorded_at).into(),
                ])
                .to_string(SqliteQueryBuilder);
            sqlx::query(&query).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn release_stay(
        &self,
        booking_id: &str,
        unit_id: &UnitId,
        nights: &[NaiveDate],
        stamp: &StatusStamp,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        for (held_unit, date) in held_by(&mut tx, booking_id).await? {
            set_available(&mut tx, &held_unit, date, true, stamp).await?;
        }
        delete_held_by(&mut tx, booking_id).await?;
        for date in nights {
            set_available(&mut tx, unit_id, *date, true, stamp).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn release_nights(
        &self,
        unit_id: &UnitId,
        nights: &[NaiveDate],
        stamp: &StatusStamp,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;

        for date in nights {
            let query = Query::delete()
                .from_table(StayNights::Table)
                .and_where(Expr::col(StayNights::UnitId).eq(unit_id.as_str()))
                .and_where(Expr::col(StayNights::Date).eq(fmt_date(*date)))
                .to_string(SqliteQueryBuilder);
            sqlx::query(&query).execute(&mut *tx).await?;
            set_available(&mut tx, unit_id, *date, true, stamp).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn record_availability(
        &self,
        unit_id: &UnitId,
        nights: &[NaiveDate],
        available: bool,
        stamp: &StatusStamp,
    ) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        for date in nights {
            set_available(&mut tx, unit_id, *date, available, stamp).await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn for_date(&self, date: NaiveDate) -> Result<Vec<ExternalDailyStatus>> {
        self.read(Window::Day(date)).await
    }

    async fn for_unit(
        &self,
        unit_id: &UnitId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExternalDailyStatus>> {
        self.read(Window::Unit { unit_id, from, to }).await
    }
}

// ============================================================================
// Daily snapshots
// ============================================================================

pub struct SqliteSnapshotStore {
    pool: SqlitePool,
}

impl SqliteSnapshotStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn write(&self, rows: Vec<DailyUnitStatus>, on_conflict: OnConflict) -> Result<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut written = 0;
        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        for row in &rows {
            let query = snapshot_insert(row)
                .on_conflict(on_conflict.clone())
                .to_string(SqliteQueryBuilder);
            written += sqlx::query(&query).execute(&mut *tx).await?.rows_affected();
        }
        tx.commit().await?;
        Ok(written)
    }
}

fn snapshot_insert(row: &DailyUnitStatus) -> InsertStatement {
    Query::insert()
        .into_table(Snapshots::Table)
        .columns([
            Snapshots::UnitId,
            Snapshots::BuildingId,
            Snapshots::Date,
            Snapshots::Occupancy,
            Snapshots::Occupied,
            Snapshots::Available,
            Snapshots::Source,
            Snapshots::MonthlyRentCents,
        ])
        .values_panic([
            row.unit_id.as_str().into(),
            row.building_id.as_str().into(),
            fmt_date(row.date).into(),
            row.occupancy.as_str().into(),
            row.occupied.into(),
            row.available.into(),
            row.source.as_str().into(),
            row.monthly_rent_cents.into(),
        ])
        .to_owned()
}

fn snapshot_from_row(row: &SqliteRow) -> Result<DailyUnitStatus> {
    let unit_id: String = row.try_get("unit_id")?;
    let building_id: String = row.try_get("building_id")?;
    let date: String = row.try_get("date")?;
    let occupancy: String = row.try_get("occupancy")?;
    let source: String = row.try_get("source")?;

    Ok(DailyUnitStatus {
        unit_id: UnitId::new(unit_id),
        building_id: BuildingId::new(building_id),
        date: parse_date(&date)?,
        occupancy: occupancy.parse::<Occupancy>()?,
        occupied: row.try_get("occupied")?,
        available: row.try_get("available")?,
        source: source.parse::<StatusSource>()?,
        monthly_rent_cents: row.try_get("monthly_rent_cents")?,
    })
}

#[async_trait]
impl SnapshotStore for SqliteSnapshotStore {
    async fn insert_missing(&self, rows: Vec<DailyUnitStatus>) -> Result<u64> {
        let keep_history = OnConflict::columns([Snapshots::UnitId, Snapshots::Date])
            .do_nothing()
            .to_owned();
        self.write(rows, keep_history).await
    }

    async fn replace(&self, rows: Vec<DailyUnitStatus>) -> Result<u64> {
        let overwrite = OnConflict::columns([Snapshots::UnitId, Snapshots::Date])
            .update_columns([
                Snapshots::BuildingId,
                Snapshots::Occupancy,
                Snapshots::Occupied,
                Snapshots::Available,
                Snapshots::Source,
                Snapshots::MonthlyRentCents,
            ])
            .to_owned();
        self.write(rows, overwrite).await
    }

    async fn for_date(
        &self,
        date: NaiveDate,
        building: Option<&BuildingId>,
    ) -> Result<Vec<DailyUnitStatus>> {
        let mut select = Query::select();
        select
            .columns([
                Snapshots::UnitId,
                Snapshots::BuildingId,
                Snapshots::Date,
                Snapshots::Occupancy,
                Snapshots::Occupied,
                Snapshots::Available,
                Snapshots::Source,
                Snapshots::MonthlyRentCents,
            ])
            .from(Snapshots::Table)
            .and_where(Expr::col(Snapshots::Date).eq(fmt_date(date)))
            .order_by(Snapshots::UnitId, Order::Asc);
        if let Some(building) = building {
            select.and_where(Expr::col(Snapshots::BuildingId).eq(building.as_str()));
        }
        let query = select.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(snapshot_from_row).collect()
    }
}
