//! Occupancy status storage: ingested external truth and daily snapshots.

use async_trait::async_trait;
use chrono::NaiveDate;

use super::Result;
use crate::domain::{
    BuildingId, DailyUnitStatus, ExternalDailyStatus, ExternalStay, StatusStamp, UnitId,
};

/// Channel-manager status written by the webhook worker.
///
/// Occupancy is tracked per channel-manager booking so a modified or
/// cancelled booking only ever touches the nights it held. Nights a
/// booking gives up are recorded as available, so they read back as
/// known vacant rather than unknown.
#[async_trait]
pub trait ExternalStatusStore: Send + Sync {
    /// Replace the nights held by `stay.booking_id` with `stay.nights`.
    async fn record_stay(&self, stay: ExternalStay, stamp: &StatusStamp) -> Result<()>;

    /// Drop every night held by a booking, plus mark `nights` available.
    async fn release_stay(
        &self,
        booking_id: &str,
        unit_id: &UnitId,
        nights: &[NaiveDate],
        stamp: &StatusStamp,
    ) -> Result<()>;

    /// Drop whatever holds `nights` on a unit and mark them available.
    async fn release_nights(
        &self,
        unit_id: &UnitId,
        nights: &[NaiveDate],
        stamp: &StatusStamp,
    ) -> Result<()>;

    /// Set the availability flag. Occupancy is left as recorded.
    async fn record_availability(
        &self,
        unit_id: &UnitId,
        nights: &[NaiveDate],
        available: bool,
        stamp: &StatusStamp,
    ) -> Result<()>;

    async fn for_date(&self, date: NaiveDate) -> Result<Vec<ExternalDailyStatus>>;

    /// Rows for one unit with dates in `[from, to)`.
    async fn for_unit(
        &self,
        unit_id: &UnitId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<ExternalDailyStatus>>;
}

/// Persisted daily occupancy snapshot.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Insert rows whose (unit, date) is not yet present. Existing history
    /// is left untouched. Returns the number of rows written.
    async fn insert_missing(&self, rows: Vec<DailyUnitStatus>) -> Result<u64>;

    /// Replace rows for an explicit re-derivation.
    async fn replace(&self, rows: Vec<DailyUnitStatus>) -> Result<u64>;

    async fn for_date(
        &self,
        date: NaiveDate,
        building: Option<&BuildingId>,
    ) -> Result<Vec<DailyUnitStatus>>;
}
