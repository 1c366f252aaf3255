//! SQLite readers for unit attributes and the payment ledger.
//!
//! Both tables belong to other subsystems; nothing here writes to them.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::domain::{
    BuildingId, LedgerEntry, LedgerFilter, LedgerKind, LedgerStatus, UnitId, UnitRecord,
    UnitStatus,
};
use crate::interfaces::{LedgerReader, Result, UnitDirectory};
use crate::storage::schema::{LedgerEntries, Units};

use super::parse_ts;

// ============================================================================
// Units
// ============================================================================

pub struct SqliteUnitDirectory {
    pool: SqlitePool,
}

impl SqliteUnitDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn select_units() -> SelectStatement {
    Query::select()
        .columns([
            Units::UnitId,
            Units::BuildingId,
            Units::Status,
            Units::MonthlyRentCents,
        ])
        .from(Units::Table)
        .to_owned()
}

fn unit_from_row(row: &SqliteRow) -> Result<UnitRecord> {
    let unit_id: String = row.try_get("unit_id")?;
    let building_id: String = row.try_get("building_id")?;
    let status: String = row.try_get("status")?;

    Ok(UnitRecord {
        unit_id: UnitId::new(unit_id),
        building_id: BuildingId::new(building_id),
        status: status.parse::<UnitStatus>()?,
        monthly_rent_cents: row.try_get("monthly_rent_cents")?,
    })
}

#[async_trait]
impl UnitDirectory for SqliteUnitDirectory {
    async fn units(&self, building: Option<&BuildingId>) -> Result<Vec<UnitRecord>> {
        let mut select = select_units();
        select.order_by(Units::UnitId, Order::Asc);
        if let Some(building) = building {
            select.and_where(Expr::col(Units::BuildingId).eq(building.as_str()));
        }
        let query = select.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(unit_from_row).collect()
    }

    async fn unit(&self, unit_id: &UnitId) -> Result<Option<UnitRecord>> {
        let query = select_units()
            .and_where(Expr::col(Units::UnitId).eq(unit_id.as_str()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(unit_from_row).transpose()
    }
}

// ============================================================================
// Ledger
// ============================================================================

pub struct SqliteLedgerReader {
    pool: SqlitePool,
}

impl SqliteLedgerReader {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn entry_from_row(row: &SqliteRow) -> Result<LedgerEntry> {
    let unit_id: Option<String> = row.try_get("unit_id")?;
    let building_id: Option<String> = row.try_get("building_id")?;
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let paid_at: Option<String> = row.try_get("paid_at")?;

    Ok(LedgerEntry {
        entry_id: row.try_get("entry_id")?,
        parent_id: row.try_get("parent_id")?,
        unit_id: unit_id.map(UnitId::new),
        building_id: building_id.map(BuildingId::new),
        kind: kind.parse::<LedgerKind>()?,
        status: status.parse::<LedgerStatus>()?,
        amount_cents: row.try_get("amount_cents")?,
        paid_at: paid_at.as_deref().map(parse_ts).transpose()?,
    })
}

#[async_trait]
impl LedgerReader for SqliteLedgerReader {
    async fn entries(&self, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>> {
        let mut select = Query::select();
        select
            .columns([
                LedgerEntries::EntryId,
                LedgerEntries::ParentId,
                LedgerEntries::UnitId,
                LedgerEntries::BuildingId,
                LedgerEntries::Kind,
                LedgerEntries::Status,
                LedgerEntries::AmountCents,
                LedgerEntries::PaidAt,
            ])
            .from(LedgerEntries::Table)
            .order_by(LedgerEntries::EntryId, Order::Asc);
        if !filter.kinds.is_empty() {
            select.and_where(
                Expr::col(LedgerEntries::Kind).is_in(filter.kinds.iter().map(|k| k.as_str())),
            );
        }
        if !filter.statuses.is_empty() {
            select.and_where(
                Expr::col(LedgerEntries::Status)
                    .is_in(filter.statuses.iter().map(|s| s.as_str())),
            );
        }
        if let Some(building) = &filter.building {
            select.and_where(Expr::col(LedgerEntries::BuildingId).eq(building.as_str()));
        }
        let query = select.to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let entries = rows
            .iter()
            .map(entry_from_row)
            .collect::<Result<Vec<_>>>()?;

        // Timestamps are compared parsed; the ledger's text format is not ours.
        Ok(entries.into_iter().filter(|e| filter.matches(e)).collect())
    }
}
