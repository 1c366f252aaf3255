//! SQLite BookingStore implementation.
//!
//! Writes run under `BEGIN IMMEDIATE` on a single connection so the overlap
//! check and the write cannot interleave with another writer.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::pool::PoolConnection;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqliteConnection, SqlitePool};

use crate::domain::{Booking, BookingStatus, Brand, UnitId};
use crate::interfaces::{BookingStore, Result, StoreError};
use crate::storage::schema::Bookings;

use super::{fmt_date, fmt_ts, parse_date};

pub struct SqliteBookingStore {
    pool: SqlitePool,
}

impl SqliteBookingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn begin(&self) -> Result<PoolConnection<Sqlite>> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
        Ok(conn)
    }
}

async fn finish<T>(conn: &mut SqliteConnection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(value)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}

fn select_bookings() -> SelectStatement {
    Query::select()
        .columns([
            Bookings::BookingId,
            Bookings::Brand,
            Bookings::UnitId,
            Bookings::CheckIn,
            Bookings::CheckOut,
            Bookings::Status,
            Bookings::GuestReference,
        ])
        .from(Bookings::Table)
        .to_owned()
}

fn booking_from_row(row: &SqliteRow) -> Result<Booking> {
    let brand: String = row.try_get("brand")?;
    let unit_id: String = row.try_get("unit_id")?;
    let check_in: String = row.try_get("check_in")?;
    let check_out: String = row.try_get("check_out")?;
    let status: String = row.try_get("status")?;

    Ok(Booking {
        booking_id: row.try_get("booking_id")?,
        brand: Brand::new(brand),
        unit_id: UnitId::new(unit_id),
        check_in: parse_date(&check_in)?,
        check_out: parse_date(&check_out)?,
        status: status.parse::<BookingStatus>()?,
        guest_reference: row.try_get("guest_reference")?,
    })
}

async fn fetch(conn: &mut SqliteConnection, booking_id: &str) -> Result<Booking> {
    let (sql, values) = select_bookings()
        .and_where(Expr::col(Bookings::BookingId).eq(booking_id))
        .build_sqlx(SqliteQueryBuilder);

    let row = sqlx::query_with(&sql, values)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking_id)))?;
    booking_from_row(&row)
}

/// Fail when another active booking holds a night of `[check_in, check_out)`
/// on the unit.
async fn ensure_free(
    conn: &mut SqliteConnection,
    unit_id: &UnitId,
    check_in: NaiveDate,
    check_out: NaiveDate,
    booking_id: &str,
) -> Result<()> {
    let (sql, values) = select_bookings()
        .and_where(Expr::col(Bookings::UnitId).eq(unit_id.as_str()))
        .and_where(Expr::col(Bookings::BookingId).ne(booking_id))
        .and_where(Expr::col(Bookings::CheckIn).lt(fmt_date(check_out)))
        .and_where(Expr::col(Bookings::CheckOut).gt(fmt_date(check_in)))
        .and_where(Expr::col(Bookings::Status).ne(BookingStatus::Cancelled.as_str()))
        .limit(1)
        .build_sqlx(SqliteQueryBuilder);

    match sqlx::query_with(&sql, values)
        .fetch_optional(&mut *conn)
        .await?
    {
        Some(row) => {
            let clash = booking_from_row(&row)?;
            Err(StoreError::Conflict(format!(
                "unit {} is already booked by {} for overlapping nights",
                unit_id, clash.booking_id
            )))
        }
        None => Ok(()),
    }
}

async fn insert_checked(conn: &mut SqliteConnection, booking: &Booking) -> Result<()> {
    if booking.status != BookingStatus::Cancelled {
        ensure_free(
            conn,
            &booking.unit_id,
            booking.check_in,
            booking.check_out,
            &booking.booking_id,
        )
        .await?;
    }

    let (sql, values) = Query::insert()
        .into_table(Bookings::Table)
        .columns([
            Bookings::BookingId,
            Bookings::Brand,
            Bookings::UnitId,
            Bookings::CheckIn,
            Bookings::CheckOut,
            Bookings::Status,
            Bookings::GuestReference,
            Bookings::UpdatedAt,
        ])
        .values_panic([
            booking.booking_id.as_str().into(),
            booking.brand.as_str().into(),
            booking.unit_id.as_str().into(),
            fmt_date(booking.check_in).into(),
            fmt_date(booking.check_out).into(),
            booking.status.as_str().into(),
            booking.guest_reference.clone().into(),
            fmt_ts(Utc::now()).into(),
        ])
        .build_sqlx(SqliteQueryBuilder);

    match sqlx::query_with(&sql, values).execute(&mut *conn).await {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(err)) if err.is_unique_violation() => Err(
            StoreError::Conflict(format!("booking {} already exists", booking.booking_id)),
        ),
        Err(err) => Err(err.into()),
    }
}

async fn update_dates_checked(
    conn: &mut SqliteConnection,
    booking_id: &str,
    check_in: NaiveDate,
    check_out: NaiveDate,
) -> Result<Booking> {
    let existing = fetch(conn, booking_id).await?;
    if existing.status != BookingStatus::Cancelled {
        ensure_free(conn, &existing.unit_id, check_in, check_out, booking_id).await?;
    }

    let (sql, values) = Query::update()
        .table(Bookings::Table)
        .value(Bookings::CheckIn, fmt_date(check_in))
        .value(Bookings::CheckOut, fmt_date(check_out))
        .value(Bookings::UpdatedAt, fmt_ts(Utc::now()))
        .and_where(Expr::col(Bookings::BookingId).eq(booking_id))
        .build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(&mut *conn).await?;

    Ok(Booking {
        check_in,
        check_out,
        ..existing
    })
}

async fn update_status_checked(
    conn: &mut SqliteConnection,
    booking_id: &str,
    status: BookingStatus,
) -> Result<Booking> {
    let existing = fetch(conn, booking_id).await?;
    // Reactivating a cancelled booking takes its nights back.
    if existing.status == BookingStatus::Cancelled && status != BookingStatus::Cancelled {
        ensure_free(
            conn,
            &existing.unit_id,
            existing.check_in,
            existing.check_out,
            booking_id,
        )
        .await?;
    }

    let (sql, values) = Query::update()
        .table(Bookings::Table)
        .value(Bookings::Status, status.as_str())
        .value(Bookings::UpdatedAt, fmt_ts(Utc::now()))
        .and_where(Expr::col(Bookings::BookingId).eq(booking_id))
        .build_sqlx(SqliteQueryBuilder);
    sqlx::query_with(&sql, values).execute(&mut *conn).await?;

    Ok(Booking { status, ..existing })
}

#[async_trait]
impl BookingStore for SqliteBookingStore {
    async fn insert(&self, booking: Booking) -> Result<()> {
        let mut conn = self.begin().await?;
        let result = insert_checked(&mut conn, &booking).await;
        finish(&mut conn, result).await
    }

    async fn get(&self, booking_id: &str) -> Result<Option<Booking>> {
        let (sql, values) = select_bookings()
            .and_where(Expr::col(Bookings::BookingId).eq(booking_id))
            .build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(booking_from_row).transpose()
    }

    async fn update_dates(
        &self,
        booking_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking> {
        let mut conn = self.begin().await?;
        let result = update_dates_checked(&mut conn, booking_id, check_in, check_out).await;
        finish(&mut conn, result).await
    }

    async fn update_status(&self, booking_id: &str, status: BookingStatus) -> Result<Booking> {
        let mut conn = self.begin().await?;
        let result = update_status_checked(&mut conn, booking_id, status).await;
        finish(&mut conn, result).await
    }

    async fn overlapping(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Booking>> {
        // Half-open ranges overlap when each starts before the other ends.
        let (sql, values) = select_bookings()
            .and_where(Expr::col(Bookings::CheckIn).lt(fmt_date(to)))
            .and_where(Expr::col(Bookings::CheckOut).gt(fmt_date(from)))
            .and_where(Expr::col(Bookings::Status).ne(BookingStatus::Cancelled.as_str()))
            .order_by(Bookings::CheckIn, Order::Asc)
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        rows.iter().map(booking_from_row).collect()
    }
}
