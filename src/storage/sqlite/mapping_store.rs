//! SQLite MappingStore implementation.

use std::collections::HashSet;

use async_trait::async_trait;
use sea_query::{Expr, OnConflict, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Acquire, Row, SqlitePool};

use crate::domain::{ConnectionType, SourceOfTruth, UnitControlMapping, UnitId};
use crate::interfaces::{AuditRecord, MappingStore, Result};
use crate::storage::schema::UnitControlMappings;

use super::{audit_insert, fmt_ts, parse_ts};

pub struct SqliteMappingStore {
    pool: SqlitePool,
}

impl SqliteMappingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn select_mappings() -> SelectStatement {
    Query::select()
        .columns([
            UnitControlMappings::UnitId,
            UnitControlMappings::ExternalPropertyId,
            UnitControlMappings::ExternalRoomId,
            UnitControlMappings::SourceOfTruth,
            UnitControlMappings::ConnectionType,
            UnitControlMappings::UpdatedAt,
        ])
        .from(UnitControlMappings::Table)
        .to_owned()
}

fn mapping_from_row(row: &SqliteRow) -> Result<UnitControlMapping> {
    let source_of_truth: String = row.try_get("source_of_truth")?;
    let connection_type: Option<String> = row.try_get("connection_type")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(UnitControlMapping {
        unit_id: UnitId::new(row.try_get::<String, _>("unit_id")?),
        external_property_id: row.try_get("external_property_id")?,
        external_room_id: row.try_get("external_room_id")?,
        source_of_truth: source_of_truth.parse::<SourceOfTruth>()?,
        connection_type: connection_type
            .map(|c| c.parse::<ConnectionType>())
            .transpose()?,
        updated_at: parse_ts(&updated_at)?,
    })
}

#[async_trait]
impl MappingStore for SqliteMappingStore {
    async fn get(&self, unit_id: &UnitId) -> Result<Option<UnitControlMapping>> {
        let query = select_mappings()
            .and_where(Expr::col(UnitControlMappings::UnitId).eq(unit_id.as_str()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(mapping_from_row).transpose()
    }

    async fn find_by_external(
        &self,
        property_id: &str,
        room_id: Option<&str>,
    ) -> Result<Option<UnitControlMapping>> {
        let query = select_mappings()
            .and_where(Expr::col(UnitControlMappings::ExternalPropertyId).eq(property_id))
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let candidates = rows
            .iter()
            .map(mapping_from_row)
            .collect::<Result<Vec<_>>>()?;

        // Room-specific mappings win over property-wide ones.
        let exact = room_id.and_then(|room| {
            candidates
                .iter()
                .find(|m| m.external_room_id.as_deref() == Some(room))
        });
        let found = exact.or_else(|| candidates.iter().find(|m| m.external_room_id.is_none()));
        Ok(found.cloned())
    }

    async fn list(&self) -> Result<Vec<UnitControlMapping>> {
        let query = select_mappings()
            .order_by(UnitControlMappings::UnitId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(mapping_from_row).collect()
    }

    async fn controlled_unit_ids(&self) -> Result<HashSet<UnitId>> {
        let query = Query::select()
            .column(UnitControlMappings::UnitId)
            .from(UnitControlMappings::Table)
            .and_where(
                Expr::col(UnitControlMappings::SourceOfTruth).eq(SourceOfTruth::External.as_str()),
            )
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter()
            .map(|row| -> Result<UnitId> { Ok(UnitId::new(row.try_get::<String, _>("unit_id")?)) })
            .collect()
    }

    async fn upsert(&self, mapping: UnitControlMapping, audit: AuditRecord) -> Result<()> {
        let upsert = Query::insert()
            .into_table(UnitControlMappings::Table)
            .columns([
                UnitControlMappings::UnitId,
                UnitControlMappings::ExternalPropertyId,
                UnitControlMappings::ExternalRoomId,
                UnitControlMappings::SourceOfTruth,
                UnitControlMappings::ConnectionType,
                UnitControlMappings::UpdatedAt,
            ])
            .values_panic([
                mapping.unit_id.as_str().into(),
                mapping.external_property_id.as_str().into(),
                mapping.external_room_id.clone().into(),
                mapping.source_of_truth.as_str().into(),
                mapping.connection_type.map(|c| c.as_str()).into(),
                fmt_ts(mapping.updated_at).into(),
            ])
            .on_conflict(
                OnConflict::column(UnitControlMappings::UnitId)
                    .update_columns([
                        UnitControlMappings::ExternalPropertyId,
                        UnitControlMappings::ExternalRoomId,
                        UnitControlMappings::SourceOfTruth,
                        UnitControlMappings::ConnectionType,
                        UnitControlMappings::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .to_string(SqliteQueryBuilder);

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        sqlx::query(&upsert).execute(&mut *tx).await?;
        sqlx::query(&audit_insert(&audit)).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, unit_id: &UnitId, audit: AuditRecord) -> Result<bool> {
        let delete = Query::delete()
            .from_table(UnitControlMappings::Table)
            .and_where(Expr::col(UnitControlMappings::UnitId).eq(unit_id.as_str()))
            .to_string(SqliteQueryBuilder);

        let mut conn = self.pool.acquire().await?;
        let mut tx = conn.begin().await?;
        let removed = sqlx::query(&delete).execute(&mut *tx).await?.rows_affected();
        if removed == 0 {
            tx.rollback().await?;
            return Ok(false);
        }
        sqlx::query(&audit_insert(&audit)).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(true)
    }
}
