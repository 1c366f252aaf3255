//! Per-unit occupancy resolution and summary counts.

use serde::Serialize;

use crate::domain::{ExternalDailyStatus, Occupancy, StatusSource, UnitRecord, UnitStatus};

/// What is known about one unit on one night.
#[derive(Debug, Clone, Copy)]
pub struct UnitFacts<'a> {
    pub unit: &'a UnitRecord,
    pub externally_controlled: bool,
    pub external: Option<&'a ExternalDailyStatus>,
    pub locally_booked: bool,
}

/// Resolved status of a unit-night.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub occupancy: Occupancy,
    pub occupied: bool,
    pub available: bool,
    pub source: StatusSource,
}

/// Choose the authoritative status of a unit for one night.
///
/// Operational status wins over everything. Externally controlled units
/// only ever use ingested channel-manager data and are `UNKNOWN` without
/// it; local bookings are never consulted for them.
pub fn resolve(facts: UnitFacts<'_>) -> Resolved {
    match facts.unit.status {
        UnitStatus::Blocked => return Resolved::inactive(Occupancy::Blocked),
        UnitStatus::Maintenance => return Resolved::inactive(Occupancy::Maintenance),
        UnitStatus::Active => {}
    }

    if facts.externally_controlled {
        return match facts.external {
            Some(status) if status.occupied => Resolved {
                occupancy: Occupancy::Occupied,
                occupied: true,
                available: false,
                source: StatusSource::External,
            },
            Some(status) => Resolved {
                occupancy: Occupancy::Vacant,
                occupied: false,
                available: status.available,
                source: StatusSource::External,
            },
            None => Resolved::inactive(Occupancy::Unknown),
        };
    }

    Resolved {
        occupancy: if facts.locally_booked {
            Occupancy::Occupied
        } else {
            Occupancy::Vacant
        },
        occupied: facts.locally_booked,
        available: !facts.locally_booked,
        source: StatusSource::Local,
    }
}

impl Resolved {
    fn inactive(occupancy: Occupancy) -> Self {
        Self {
            occupancy,
            occupied: false,
            available: false,
            source: StatusSource::None,
        }
    }
}

/// Unit counts by occupancy for one day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupancySummary {
    pub total: u32,
    pub occupied: u32,
    pub vacant: u32,
    pub blocked: u32,
    pub maintenance: u32,
    pub unknown: u32,
}

impl OccupancySummary {
    pub fn add(&mut self, occupancy: Occupancy) {
        self.total += 1;
        match occupancy {
            Occupancy::Occupied => self.occupied += 1,
            Occupancy::Vacant => self.vacant += 1,
            Occupancy::Blocked => self.blocked += 1,
            Occupancy::Maintenance => self.maintenance += 1,
            Occupancy::Unknown => self.unknown += 1,
        }
    }

    /// Units that could be rented: not blocked, not in maintenance.
    pub fn available_units(&self) -> u32 {
        self.total - self.blocked - self.maintenance
    }

    /// `occupied / (total - blocked - maintenance - unknown)`; `None` when
    /// no unit has a known rentable status.
    pub fn rate(&self) -> Option<f64> {
        let denominator = self.available_units() - self.unknown;
        if denominator == 0 {
            None
        } else {
            Some(f64::from(self.occupied) / f64::from(denominator))
        }
    }
}

impl FromIterator<Occupancy> for OccupancySummary {
    fn from_iter<I: IntoIterator<Item = Occupancy>>(iter: I) -> Self {
        let mut summary = Self::default();
        for occupancy in iter {
            summary.add(occupancy);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::{BuildingId, UnitId};

    fn unit(status: UnitStatus) -> UnitRecord {
        UnitRecord {
            unit_id: UnitId::new("u-1"),
            building_id: BuildingId::new("b-1"),
            status,
            monthly_rent_cents: 150_000,
        }
    }

    fn external(occupied: bool, available: bool) -> ExternalDailyStatus {
        ExternalDailyStatus {
            unit_id: UnitId::new("u-1"),
            date: "2026-03-10".parse().unwrap(),
            occupied,
            available,
            booking_id: occupied.then(|| "cm-1".to_string()),
            event_id: "evt-1".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_external_unit_without_data_is_unknown() {
        let u = unit(UnitStatus::Active);
        let resolved = resolve(UnitFacts {
            unit: &u,
            externally_controlled: true,
            external: None,
            locally_booked: true,
        });
        assert_eq!(resolved.occupancy, Occupancy::Unknown);
        assert_eq!(resolved.source, StatusSource::None);
        assert!(!resolved.occupied);
        assert!(!resolved.available);
    }

    #[test]
    fn test_external_data_wins_over_local_bookings() {
        let u = unit(UnitStatus::Active);
        let vacant = external(false, true);
        let resolved = resolve(UnitFacts {
            unit: &u,
            externally_controlled: true,
            external: Some(&vacant),
            locally_booked: true,
        });
        assert_eq!(resolved.occupancy, Occupancy::Vacant);
        assert_eq!(resolved.source, StatusSource::External);

        let booked = external(true, false);
        let resolved = resolve(UnitFacts {
            unit: &u,
            externally_controlled: true,
            external: Some(&booked),
            locally_booked: false,
        });
        assert_eq!(resolved.occupancy, Occupancy::Occupied);
    }

    #[test]
    fn test_local_unit_uses_bookings() {
        let u = unit(UnitStatus::Active);
        let facts = |booked| UnitFacts {
            unit: &u,
            externally_controlled: false,
            external: None,
            locally_booked: booked,
        };
        assert_eq!(resolve(facts(true)).occupancy, Occupancy::Occupied);
        assert_eq!(resolve(facts(false)).occupancy, Occupancy::Vacant);
        assert_eq!(resolve(facts(false)).source, StatusSource::Local);
    }

    #[test]
    fn test_operational_status_overrides() {
        let blocked = unit(UnitStatus::Blocked);
        let data = external(true, false);
        let resolved = resolve(UnitFacts {
            unit: &blocked,
            externally_controlled: true,
            external: Some(&data),
            locally_booked: true,
        });
        assert_eq!(resolved.occupancy, Occupancy::Blocked);

        let maintenance = unit(UnitStatus::Maintenance);
        let resolved = resolve(UnitFacts {
            unit: &maintenance,
            externally_controlled: false,
            external: None,
            locally_booked: true,
        });
        assert_eq!(resolved.occupancy, Occupancy::Maintenance);
    }

    #[test]
    fn test_rate_excludes_blocked_maintenance_unknown() {
        let mut statuses = vec![Occupancy::Blocked, Occupancy::Blocked, Occupancy::Maintenance];
        statuses.extend([Occupancy::Occupied; 4]);
        statuses.extend([Occupancy::Vacant; 3]);
        let summary: OccupancySummary = statuses.into_iter().collect();

        assert_eq!(summary.total, 10);
        assert_eq!(summary.available_units(), 7);
        let rate = summary.rate().unwrap();
        assert!((rate - 4.0 / 7.0).abs() < 1e-9);

        let mut with_unknown = summary;
        with_unknown.add(Occupancy::Unknown);
        assert_eq!(with_unknown.available_units(), 8);
        assert!((with_unknown.rate().unwrap() - 4.0 / 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_rate_undefined_without_known_units() {
        let summary: OccupancySummary = [Occupancy::Unknown, Occupancy::Blocked].into_iter().collect();
        assert_eq!(summary.rate(), None);
        assert_eq!(OccupancySummary::default().rate(), None);
    }
}
