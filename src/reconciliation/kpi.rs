//! Finance KPIs derived from the daily snapshot and the payment ledger.
//!
//! Nothing here is stored. Rents and statuses are read from the snapshot
//! rows, so a past period reports the same figures after units change.

use chrono::NaiveDate;
use serde::Serialize;

use super::OccupancySummary;
use crate::domain::{BuildingId, DailyUnitStatus, LedgerEntry, LedgerKind, LedgerStatus};

/// Half-open reporting period `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiPeriod {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl KpiPeriod {
    /// Returns `None` when the period is empty.
    pub fn new(from: NaiveDate, to: NaiveDate) -> Option<Self> {
        (from < to).then_some(Self { from, to })
    }

    pub fn last_day(&self) -> NaiveDate {
        self.to.pred_opt().unwrap_or(self.from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinanceKpis {
    pub period: KpiPeriod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub building: Option<BuildingId>,
    pub occupancy: OccupancySummary,
    pub occupancy_rate: Option<f64>,
    pub available_units: u32,
    pub potential_annual_rent_cents: i64,
    pub collected_revenue_cents: i64,
    pub effective_annual_rent_cents: Option<i64>,
    pub rev_pau_cents: Option<i64>,
}

/// Σ monthly rent × 12 over rows that were rentable that day.
pub fn potential_annual_rent(rows: &[DailyUnitStatus]) -> i64 {
    rows.iter()
        .filter(|row| row.occupancy.is_rentable())
        .map(|row| row.monthly_rent_cents * 12)
        .sum()
}

/// Σ paid rent. Entries are expected to be pre-filtered to the period.
pub fn collected_revenue(entries: &[LedgerEntry]) -> i64 {
    entries
        .iter()
        .filter(|e| e.kind == LedgerKind::Rent && e.status == LedgerStatus::Paid)
        .map(|e| e.amount_cents)
        .sum()
}

/// KPIs for a period from the rows of its last day.
pub fn compute(
    period: KpiPeriod,
    building: Option<BuildingId>,
    rows: &[DailyUnitStatus],
    entries: &[LedgerEntry],
) -> FinanceKpis {
    let occupancy: OccupancySummary = rows.iter().map(|row| row.occupancy).collect();
    let rate = occupancy.rate();
    let available_units = occupancy.available_units();
    let potential = potential_annual_rent(rows);
    let collected = collected_revenue(entries);

    FinanceKpis {
        period,
        building,
        occupancy,
        occupancy_rate: rate,
        available_units,
        potential_annual_rent_cents: potential,
        collected_revenue_cents: collected,
        effective_annual_rent_cents: rate.map(|r| (potential as f64 * r).round() as i64),
        rev_pau_cents: (available_units > 0)
            .then(|| (collected as f64 / f64::from(available_units)).round() as i64),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::domain::{Occupancy, StatusSource, UnitId};

    fn row(id: &str, occupancy: Occupancy, rent: i64) -> DailyUnitStatus {
        DailyUnitStatus {
            unit_id: UnitId::new(id),
            building_id: BuildingId::new("b-1"),
            date: d("2026-03-31"),
            occupancy,
            occupied: occupancy.is_occupied(),
            available: occupancy.is_available(),
            source: StatusSource::Local,
            monthly_rent_cents: rent,
        }
    }

    fn entry(kind: LedgerKind, status: LedgerStatus, amount: i64) -> LedgerEntry {
        LedgerEntry {
            entry_id: format!("{}-{}", kind.as_str(), amount),
            parent_id: None,
            unit_id: None,
            building_id: None,
            kind,
            status,
            amount_cents: amount,
            paid_at: Some("2026-03-05T00:00:00Z".parse::<DateTime<Utc>>().unwrap()),
        }
    }

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_period_last_day_is_exclusive_end() {
        let period = KpiPeriod::new(d("2026-03-01"), d("2026-04-01")).unwrap();
        assert_eq!(period.last_day(), d("2026-03-31"));
        assert!(KpiPeriod::new(d("2026-03-01"), d("2026-03-01")).is_none());
    }

    #[test]
    fn test_potential_rent_skips_blocked_and_maintenance() {
        let rows = vec![
            row("u-1", Occupancy::Occupied, 100_000),
            row("u-2", Occupancy::Blocked, 500_000),
            row("u-3", Occupancy::Vacant, 50_000),
            row("u-4", Occupancy::Maintenance, 500_000),
            row("u-5", Occupancy::Unknown, 10_000),
        ];
        assert_eq!(potential_annual_rent(&rows), 1_920_000);
    }

    #[test]
    fn test_collected_revenue_counts_paid_rent_only() {
        let entries = vec![
            entry(LedgerKind::Rent, LedgerStatus::Paid, 100_000),
            entry(LedgerKind::Rent, LedgerStatus::Due, 100_000),
            entry(LedgerKind::Deposit, LedgerStatus::Paid, 200_000),
            entry(LedgerKind::Rent, LedgerStatus::Paid, 40_000),
        ];
        assert_eq!(collected_revenue(&entries), 140_000);
    }

    #[test]
    fn test_compute_derives_effective_rent_and_revpau() {
        let rows = vec![
            row("u-1", Occupancy::Occupied, 100_000),
            row("u-2", Occupancy::Vacant, 100_000),
        ];
        let entries = vec![entry(LedgerKind::Rent, LedgerStatus::Paid, 100_000)];
        let period = KpiPeriod::new(d("2026-03-01"), d("2026-04-01")).unwrap();

        let kpis = compute(period, None, &rows, &entries);
        assert_eq!(kpis.occupancy_rate, Some(0.5));
        assert_eq!(kpis.potential_annual_rent_cents, 2_400_000);
        assert_eq!(kpis.effective_annual_rent_cents, Some(1_200_000));
        assert_eq!(kpis.rev_pau_cents, Some(50_000));
    }

    #[test]
    fn test_compute_without_rentable_units() {
        let period = KpiPeriod::new(d("2026-03-01"), d("2026-04-01")).unwrap();
        let rows = vec![row("u-1", Occupancy::Blocked, 100_000)];
        let kpis = compute(period, None, &rows, &[]);
        assert_eq!(kpis.occupancy_rate, None);
        assert_eq!(kpis.potential_annual_rent_cents, 0);
        assert_eq!(kpis.effective_annual_rent_cents, None);
        assert_eq!(kpis.rev_pau_cents, None);
    }
}
