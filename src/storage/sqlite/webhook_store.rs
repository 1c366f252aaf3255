//! SQLite WebhookEventStore implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};
use sea_query_binder::SqlxBinder;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::domain::{NewWebhookEvent, WebhookEvent, WebhookStatus};
use crate::interfaces::{InsertOutcome, Result, WebhookEventStore};
use crate::storage::schema::WebhookEvents;

use super::{fmt_ts, parse_ts};

pub struct SqliteWebhookEventStore {
    pool: SqlitePool,
}

impl SqliteWebhookEventStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Move one event between statuses. Only rows currently in `from` change.
    async fn transition(
        &self,
        event_id: &str,
        from: WebhookStatus,
        to: WebhookStatus,
        error: Option<&str>,
    ) -> Result<u64> {
        let mut update = Query::update();
        update
            .table(WebhookEvents::Table)
            .value(WebhookEvents::Status, to.as_str())
            .value(WebhookEvents::UpdatedAt, fmt_ts(Utc::now()))
            .and_where(Expr::col(WebhookEvents::EventId).eq(event_id))
            .and_where(Expr::col(WebhookEvents::Status).eq(from.as_str()));
        if let Some(error) = error {
            update.value(WebhookEvents::LastError, error);
        }

        let (sql, values) = update.build_sqlx(SqliteQueryBuilder);
        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

fn select_events() -> SelectStatement {
    Query::select()
        .columns([
            WebhookEvents::EventId,
            WebhookEvents::EventType,
            WebhookEvents::Source,
            WebhookEvents::Payload,
            WebhookEvents::Status,
            WebhookEvents::Attempts,
            WebhookEvents::MaxRetries,
            WebhookEvents::LastError,
            WebhookEvents::ReceivedAt,
            WebhookEvents::UpdatedAt,
        ])
        .from(WebhookEvents::Table)
        .to_owned()
}

fn event_from_row(row: &SqliteRow) -> Result<WebhookEvent> {
    let status: String = row.try_get("status")?;
    let attempts: i64 = row.try_get("attempts")?;
    let max_retries: i64 = row.try_get("max_retries")?;
    let received_at: String = row.try_get("received_at")?;
    let updated_at: String = row.try_get("updated_at")?;

    Ok(WebhookEvent {
        event_id: row.try_get("event_id")?,
        event_type: row.try_get("event_type")?,
        source: row.try_get("source")?,
        payload: row.try_get("payload")?,
        status: status.parse::<WebhookStatus>()?,
        attempts: attempts as u32,
        max_retries: max_retries as u32,
        last_error: row.try_get("last_error")?,
        received_at: parse_ts(&received_at)?,
        updated_at: parse_ts(&updated_at)?,
    })
}

#[async_trait]
impl WebhookEventStore for SqliteWebhookEventStore {
    async fn insert(&self, event: NewWebhookEvent) -> Result<InsertOutcome> {
        let now = fmt_ts(Utc::now());
        // Payloads are caller-controlled text, so they go through bound parameters.
        let (sql, values) = Query::insert()
            .into_table(WebhookEvents::Table)
            .columns([
                WebhookEvents::EventId,
                WebhookEvents::EventType,
                WebhookEvents::Source,
                WebhookEvents::Payload,
                WebhookEvents::Status,
                WebhookEvents::Attempts,
                WebhookEvents::MaxRetries,
                WebhookEvents::ReceivedAt,
                WebhookEvents::UpdatedAt,
            ])
            .values_panic([
                event.event_id.as_str().into(),
                event.event_type.as_str().into(),
                event.source.as_str().into(),
                event.payload.as_str().into(),
                WebhookStatus::Pending.as_str().into(),
                0_i64.into(),
                i64::from(event.max_retries).into(),
                now.clone().into(),
                now.into(),
            ])
            .build_sqlx(SqliteQueryBuilder);

        match sqlx::query_with(&sql, values).execute(&self.pool).await {
            Ok(_) => Ok(InsertOutcome::Inserted),
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                debug!(event_id = %event.event_id, "webhook event already recorded");
                Ok(InsertOutcome::Duplicate)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn get(&self, event_id: &str) -> Result<Option<WebhookEvent>> {
        let (sql, values) = select_events()
            .and_where(Expr::col(WebhookEvents::EventId).eq(event_id))
            .build_sqlx(SqliteQueryBuilder);

        let row = sqlx::query_with(&sql, values)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(event_from_row).transpose()
    }

    async fn claim(&self, event_id: &str) -> Result<Option<WebhookEvent>> {
        let (sql, values) = Query::update()
            .table(WebhookEvents::Table)
            .value(WebhookEvents::Status, WebhookStatus::Processing.as_str())
            .value(WebhookEvents::Attempts, Expr::col(WebhookEvents::Attempts).add(1))
            .value(WebhookEvents::UpdatedAt, fmt_ts(Utc::now()))
            .and_where(Expr::col(WebhookEvents::EventId).eq(event_id))
            .and_where(Expr::col(WebhookEvents::Status).eq(WebhookStatus::Pending.as_str()))
            .build_sqlx(SqliteQueryBuilder);

        let claimed = sqlx::query_with(&sql, values)
            .execute(&self.pool)
            .await?
            .rows_affected();
        if claimed == 0 {
            return Ok(None);
        }
        self.get(event_id).await
    }

    async fn mark_done(&self, event_id: &str) -> Result<()> {
        self.transition(event_id, WebhookStatus::Processing, WebhookStatus::Done, None)
            .await?;
        Ok(())
    }

    async fn mark_retry(&self, event_id: &str, error: &str) -> Result<()> {
        self.transition(
            event_id,
            WebhookStatus::Processing,
            WebhookStatus::Pending,
            Some(error),
        )
        .await?;
        Ok(())
    }

    async fn mark_failed(&self, event_id: &str, error: &str) -> Result<()> {
        self.transition(
            event_id,
            WebhookStatus::Processing,
            WebhookStatus::Failed,
            Some(error),
        )
        .await?;
        Ok(())
    }

    async fn list_by_status(&self, status: WebhookStatus, limit: u32) -> Result<Vec<WebhookEvent>> {
        let (sql, values) = select_events()
            .and_where(Expr::col(WebhookEvents::Status).eq(status.as_str()))
            .order_by(WebhookEvents::ReceivedAt, Order::Asc)
            .limit(u64::from(limit))
            .build_sqlx(SqliteQueryBuilder);

        let rows = sqlx::query_with(&sql, values).fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn reset_stale(&self, older_than: DateTime<Utc>) -> Result<u64> {
        let (sql, values) = Query::update()
            .table(WebhookEvents::Table)
            .value(WebhookEvents::Status, WebhookStatus::Pending.as_str())
            .value(WebhookEvents::UpdatedAt, fmt_ts(Utc::now()))
            .and_where(Expr::col(WebhookEvents::Status).eq(WebhookStatus::Processing.as_str()))
            .and_where(Expr::col(WebhookEvents::UpdatedAt).lt(fmt_ts(older_than)))
            .build_sqlx(SqliteQueryBuilder);

        let result = sqlx::query_with(&sql, values).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
