//! Read-only view of the payment ledger.
//!
//! The ledger is owned by the payment subsystem. This crate only reads
//! finalized entries, and relies on one invariant of the owner: a `PAID`
//! entry is never rewritten in place. Corrections appear as child entries
//! of kind `REFUND` or `ADJUSTMENT`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BuildingId, ParseEnumError, UnitId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerKind {
    Rent,
    Deposit,
    Fee,
    Refund,
    Adjustment,
}

impl LedgerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerKind::Rent => "RENT",
            LedgerKind::Deposit => "DEPOSIT",
            LedgerKind::Fee => "FEE",
            LedgerKind::Refund => "REFUND",
            LedgerKind::Adjustment => "ADJUSTMENT",
        }
    }

    /// Kinds that correct an already-paid parent entry.
    pub fn is_correction(&self) -> bool {
        matches!(self, LedgerKind::Refund | LedgerKind::Adjustment)
    }
}

impl FromStr for LedgerKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RENT" => Ok(LedgerKind::Rent),
            "DEPOSIT" => Ok(LedgerKind::Deposit),
            "FEE" => Ok(LedgerKind::Fee),
            "REFUND" => Ok(LedgerKind::Refund),
            "ADJUSTMENT" => Ok(LedgerKind::Adjustment),
            other => Err(ParseEnumError::new("ledger_kind", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Due,
    Pending,
    Paid,
    Failed,
    Refunded,
    Void,
}

impl LedgerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerStatus::Due => "DUE",
            LedgerStatus::Pending => "PENDING",
            LedgerStatus::Paid => "PAID",
            LedgerStatus::Failed => "FAILED",
            LedgerStatus::Refunded => "REFUNDED",
            LedgerStatus::Void => "VOID",
        }
    }

    /// Finalized entries never change status in place.
    pub fn is_final(&self) -> bool {
        matches!(self, LedgerStatus::Paid | LedgerStatus::Refunded | LedgerStatus::Void)
    }

    /// In-place transitions the ledger owner permits.
    pub fn can_transition_to(&self, next: LedgerStatus) -> bool {
        use LedgerStatus::*;
        match self {
            Due => matches!(next, Pending | Paid | Failed | Void),
            Pending => matches!(next, Paid | Failed | Void),
            Failed => matches!(next, Due | Pending | Void),
            Paid | Refunded | Void => false,
        }
    }
}

impl FromStr for LedgerStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DUE" => Ok(LedgerStatus::Due),
            "PENDING" => Ok(LedgerStatus::Pending),
            "PAID" => Ok(LedgerStatus::Paid),
            "FAILED" => Ok(LedgerStatus::Failed),
            "REFUNDED" => Ok(LedgerStatus::Refunded),
            "VOID" => Ok(LedgerStatus::Void),
            other => Err(ParseEnumError::new("ledger_status", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub entry_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub unit_id: Option<UnitId>,
    #[serde(default)]
    pub building_id: Option<BuildingId>,
    pub kind: LedgerKind,
    pub status: LedgerStatus,
    pub amount_cents: i64,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
}

/// Ledger query. Empty `kinds`/`statuses` match everything; the time range
/// applies to `paid_at` and is half-open `[from, to)`.
#[derive(Debug, Clone, Default)]
pub struct LedgerFilter {
    pub kinds: Vec<LedgerKind>,
    pub statuses: Vec<LedgerStatus>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub building: Option<BuildingId>,
}

impl LedgerFilter {
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if !self.kinds.is_empty() && !self.kinds.contains(&entry.kind) {
            return false;
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&entry.status) {
            return false;
        }
        if let Some(building) = &self.building {
            if entry.building_id.as_ref() != Some(building) {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(paid_at) = entry.paid_at else {
                return false;
            };
            if self.from.is_some_and(|from| paid_at < from) {
                return false;
            }
            if self.to.is_some_and(|to| paid_at >= to) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paid_is_never_rewritten() {
        for next in [
            LedgerStatus::Due,
            LedgerStatus::Pending,
            LedgerStatus::Failed,
            LedgerStatus::Refunded,
            LedgerStatus::Void,
        ] {
            assert!(!LedgerStatus::Paid.can_transition_to(next));
        }
        assert!(LedgerStatus::Paid.is_final());
    }

    #[test]
    fn test_open_entries_can_settle() {
        assert!(LedgerStatus::Due.can_transition_to(LedgerStatus::Paid));
        assert!(LedgerStatus::Pending.can_transition_to(LedgerStatus::Paid));
        assert!(LedgerStatus::Failed.can_transition_to(LedgerStatus::Pending));
        assert!(!LedgerStatus::Void.can_transition_to(LedgerStatus::Due));
    }

    #[test]
    fn test_filter_time_range_is_half_open() {
        let at = |s: &str| s.parse::<DateTime<Utc>>().unwrap();
        let entry = LedgerEntry {
            entry_id: "e-1".to_string(),
            parent_id: None,
            unit_id: None,
            building_id: Some(BuildingId::new("b-1")),
            kind: LedgerKind::Rent,
            status: LedgerStatus::Paid,
            amount_cents: 100_000,
            paid_at: Some(at("2026-03-01T00:00:00Z")),
        };
        let filter = LedgerFilter {
            kinds: vec![LedgerKind::Rent],
            statuses: vec![LedgerStatus::Paid],
            from: Some(at("2026-03-01T00:00:00Z")),
            to: Some(at("2026-04-01T00:00:00Z")),
            building: Some(BuildingId::new("b-1")),
        };
        assert!(filter.matches(&entry));

        let before = LedgerFilter {
            to: Some(at("2026-03-01T00:00:00Z")),
            ..Default::default()
        };
        assert!(!before.matches(&entry));
        assert!(LedgerKind::Refund.is_correction());
    }
}
