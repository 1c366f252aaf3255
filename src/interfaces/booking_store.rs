//! Local booking storage interface (hub persistence).

use async_trait::async_trait;
use chrono::NaiveDate;

use super::Result;
use crate::domain::{Booking, BookingStatus};

/// Local bookings.
///
/// No two active (non-cancelled) bookings of a unit may share a night.
/// Every write that would break this fails with `StoreError::Conflict`
/// and changes nothing: inserting an active booking, moving an active
/// booking, and reactivating a cancelled one.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: Booking) -> Result<()>;

    async fn get(&self, booking_id: &str) -> Result<Option<Booking>>;

    async fn update_dates(
        &self,
        booking_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<Booking>;

    async fn update_status(&self, booking_id: &str, status: BookingStatus) -> Result<Booking>;

    /// Non-cancelled bookings occupying any night in `[from, to)`.
    async fn overlapping(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<Booking>>;
}
