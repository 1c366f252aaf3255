//! Occupancy and finance reconciliation.
//!
//! For every unit and night the engine picks one source of truth: ingested
//! channel-manager status for externally controlled units, local bookings
//! for everyone else. Daily results are persisted as snapshots; KPIs are
//! derived on demand from snapshots, unit rents and the ledger.

pub mod kpi;
pub mod occupancy;
pub mod scheduler;

pub use kpi::{FinanceKpis, KpiPeriod};
pub use occupancy::{resolve, OccupancySummary, Resolved, UnitFacts};
pub use scheduler::SnapshotScheduler;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{Days, NaiveDate, NaiveTime};
use serde::Serialize;
use tracing::{debug, info};

use crate::domain::{
    BuildingId, DailyUnitStatus, LedgerFilter, LedgerKind, LedgerStatus, UnitId, UnitRecord,
};
use crate::interfaces::{
    BookingStore, ExternalStatusStore, LedgerReader, MappingStore, SnapshotStore, StoreError,
    UnitDirectory,
};
use crate::storage::Stores;

#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("empty period: {from} is not before {to}")]
    EmptyPeriod { from: NaiveDate, to: NaiveDate },
}

/// Result of one `snapshot_day` run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotReport {
    pub date: NaiveDate,
    pub derived: usize,
    pub written: u64,
    pub forced: bool,
}

/// Occupancy of a scope on one day.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancyReport {
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<BuildingId>,
    pub summary: OccupancySummary,
    pub rate: Option<f64>,
    /// Units whose status was derived because no snapshot row existed.
    pub derived_units: usize,
}

pub struct ReconciliationEngine {
    units: Arc<dyn UnitDirectory>,
    mappings: Arc<dyn MappingStore>,
    external: Arc<dyn ExternalStatusStore>,
    bookings: Arc<dyn BookingStore>,
    snapshots: Arc<dyn SnapshotStore>,
    ledger: Arc<dyn LedgerReader>,
}

impl ReconciliationEngine {
    pub fn new(stores: &Stores) -> Self {
        Self {
            units: stores.units.clone(),
            mappings: stores.mappings.clone(),
            external: stores.external_status.clone(),
            bookings: stores.bookings.clone(),
            snapshots: stores.snapshots.clone(),
            ledger: stores.ledger.clone(),
        }
    }

    /// Resolve every unit in scope for `date` without persisting anything.
    pub async fn derive_day(
        &self,
        date: NaiveDate,
        building: Option<&BuildingId>,
    ) -> Result<Vec<DailyUnitStatus>, ReconcileError> {
        let units = self.units.units(building).await?;
        self.derive_units(date, &units).await
    }

    async fn derive_units(
        &self,
        date: NaiveDate,
        units: &[UnitRecord],
    ) -> Result<Vec<DailyUnitStatus>, ReconcileError> {
        if units.is_empty() {
            return Ok(Vec::new());
        }

        let controlled = self.mappings.controlled_unit_ids().await?;
        let external: HashMap<UnitId, _> = self
            .external
            .for_date(date)
            .await?
            .into_iter()
            .map(|row| (row.unit_id.clone(), row))
            .collect();
        let booked: HashSet<UnitId> = self
            .bookings
            .overlapping(date, date + Days::new(1))
            .await?
            .into_iter()
            .filter(|b| b.occupies(date))
            .map(|b| b.unit_id)
            .collect();

        Ok(units
            .iter()
            .map(|unit| {
                let resolved = resolve(UnitFacts {
                    unit,
                    externally_controlled: controlled.contains(&unit.unit_id),
                    external: external.get(&unit.unit_id),
                    locally_booked: booked.contains(&unit.unit_id),
                });
                DailyUnitStatus {
                    unit_id: unit.unit_id.clone(),
                    building_id: unit.building_id.clone(),
                    date,
                    occupancy: resolved.occupancy,
                    occupied: resolved.occupied,
                    available: resolved.available,
                    source: resolved.source,
                    monthly_rent_cents: unit.monthly_rent_cents,
                }
            })
            .collect())
    }

    /// Persist the day's snapshot for every unit.
    ///
    /// Existing rows are kept unless `force` is set, in which case the day
    /// is re-derived and overwritten.
    #[tracing::instrument(skip(self))]
    pub async fn snapshot_day(
        &self,
        date: NaiveDate,
        force: bool,
    ) -> Result<SnapshotReport, ReconcileError> {
        let rows = self.derive_day(date, None).await?;
        let derived = rows.len();
        let written = if force {
            self.snapshots.replace(rows).await?
        } else {
            self.snapshots.insert_missing(rows).await?
        };

        info!(derived, written, "occupancy snapshot written");
        Ok(SnapshotReport {
            date,
            derived,
            written,
            forced: force,
        })
    }

    /// Occupancy for a day: snapshot rows where present, derived otherwise.
    pub async fn occupancy(
        &self,
        date: NaiveDate,
        building: Option<&BuildingId>,
    ) -> Result<OccupancyReport, ReconcileError> {
        let (rows, derived_units) = self.day_rows(date, building).await?;
        let summary: OccupancySummary = rows.iter().map(|row| row.occupancy).collect();
        Ok(OccupancyReport {
            date,
            building: building.cloned(),
            rate: summary.rate(),
            summary,
            derived_units,
        })
    }

    /// Snapshot rows for a day, with rows derived for any unit the
    /// snapshot is missing. Returns the rows and how many were derived.
    async fn day_rows(
        &self,
        date: NaiveDate,
        building: Option<&BuildingId>,
    ) -> Result<(Vec<DailyUnitStatus>, usize), ReconcileError> {
        let units = self.units.units(building).await?;
        let mut rows = self.snapshots.for_date(date, building).await?;
        let captured: HashSet<&UnitId> = rows.iter().map(|row| &row.unit_id).collect();
        let missing: Vec<UnitRecord> = units
            .iter()
            .filter(|u| !captured.contains(&u.unit_id))
            .cloned()
            .collect();

        let derived = self.derive_units(date, &missing).await?;
        let derived_count = derived.len();
        if derived_count > 0 {
            debug!(%date, units = derived_count, "snapshot incomplete, derived missing units");
        }
        rows.extend(derived);
        Ok((rows, derived_count))
    }

    /// Finance KPIs for a building, or the whole portfolio.
    pub async fn finance_kpis(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        building: Option<&BuildingId>,
    ) -> Result<FinanceKpis, ReconcileError> {
        let period = KpiPeriod::new(from, to).ok_or(ReconcileError::EmptyPeriod { from, to })?;
        let (rows, _) = self.day_rows(period.last_day(), building).await?;

        let filter = LedgerFilter {
            kinds: vec![LedgerKind::Rent],
            statuses: vec![LedgerStatus::Paid],
            from: Some(period.from.and_time(NaiveTime::MIN).and_utc()),
            to: Some(period.to.and_time(NaiveTime::MIN).and_utc()),
            building: building.cloned(),
        };
        let entries = self.ledger.entries(&filter).await?;

        Ok(kpi::compute(period, building.cloned(), &rows, &entries))
    }
}

#[cfg(all(test, feature = "sqlite"))]
mod tests;
