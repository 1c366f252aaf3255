//! Local booking records.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Brand, ParseEnumError, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }
}

impl FromStr for BookingStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(ParseEnumError::new("booking_status", other)),
        }
    }
}

/// A booking request before it has an id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewBooking {
    pub unit_id: UnitId,
    pub check_in: NaiveDate,
    /// Exclusive: the guest leaves on this date.
    pub check_out: NaiveDate,
    #[serde(default)]
    pub guest_reference: Option<String>,
}

impl NewBooking {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub booking_id: String,
    pub brand: Brand,
    pub unit_id: UnitId,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub status: BookingStatus,
    #[serde(default)]
    pub guest_reference: Option<String>,
}

impl Booking {
    /// Whether the guest occupies the unit on the night of `date`.
    pub fn occupies(&self, date: NaiveDate) -> bool {
        self.status != BookingStatus::Cancelled && self.check_in <= date && date < self.check_out
    }

    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn booking(status: BookingStatus) -> Booking {
        Booking {
            booking_id: "b-1".to_string(),
            brand: Brand::new("monthly"),
            unit_id: UnitId::new("u-1"),
            check_in: date("2026-03-01"),
            check_out: date("2026-03-31"),
            status,
            guest_reference: None,
        }
    }

    #[test]
    fn test_occupies_half_open_range() {
        let b = booking(BookingStatus::Confirmed);
        assert!(b.occupies(date("2026-03-01")));
        assert!(b.occupies(date("2026-03-30")));
        assert!(!b.occupies(date("2026-03-31")));
        assert!(!b.occupies(date("2026-02-28")));
        assert_eq!(b.nights(), 30);
    }

    #[test]
    fn test_cancelled_never_occupies() {
        let b = booking(BookingStatus::Cancelled);
        assert!(!b.occupies(date("2026-03-10")));
    }
}
