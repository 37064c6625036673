//! Transactional outbox decoupling state transitions from downstream effects.
//!
//! Every state change writes its event row in the same transaction as the
//! change itself, so no event is lost or duplicated relative to the state it
//! reports. A separate consumer (notifications, audit) polls unprocessed
//! rows and marks them processed; that consumer lives outside this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

/// Event type tags written by the core
pub mod event_type {
    pub const RESERVATION_CREATED: &str = "reservation.created";
    pub const RESERVATION_CANCELLED: &str = "reservation.cancelled";
    pub const RESERVATION_CHECKED_IN: &str = "reservation.checked_in";
    pub const RESERVATION_CHECKED_OUT: &str = "reservation.checked_out";
    pub const RESERVATION_EXPIRED: &str = "reservation.expired";
    pub const RESERVATION_NO_SHOW: &str = "reservation.no_show";
    pub const RESERVATION_AUTO_COMPLETED: &str = "reservation.auto_completed";
    pub const PAYMENT_SETTLED: &str = "payment.settled";
    pub const PAYMENT_FAILED: &str = "payment.failed";
    pub const PAYMENT_REFUNDED: &str = "payment.refunded";
    pub const CREDITS_ADJUSTED: &str = "credits.adjusted";
}

/// Outbox event row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEvent {
    pub id: i64,
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub processed: bool,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OutboxEvent {
    fn from_row(row: &sqlx::postgres::PgRow) -> Self {
        OutboxEvent {
            id: row.get("id"),
            event_type: row.get("event_type"),
            event_data: row.get("event_data"),
            processed: row.get("processed"),
            processed_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("processed_at")
                .map(|dt| dt.and_utc()),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        }
    }
}

/// Insert an event row inside an existing transaction.
pub(crate) async fn emit(
    tx: &mut Transaction<'_, Postgres>,
    event_type: &str,
    event_data: serde_json::Value,
) -> Result<i64, sqlx::Error> {
    let row = sqlx::query(
        "INSERT INTO outbox_events (event_type, event_data) VALUES ($1, $2) RETURNING id",
    )
    .bind(event_type)
    .bind(event_data)
    .fetch_one(&mut **tx)
    .await?;

    Ok(row.get("id"))
}

/// Read/ack interface for the external event consumer
#[derive(Clone)]
pub struct OutboxStore {
    pool: Arc<PgPool>,
}

impl OutboxStore {
    /// Create a new outbox store
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Fetch unprocessed events, oldest first
    pub async fn list_unprocessed(&self, limit: i64) -> Result<Vec<OutboxEvent>, sqlx::Error> {
        let rows = sqlx::query(
            r#"
            SELECT id, event_type, event_data, processed, processed_at, created_at
            FROM outbox_events
            WHERE NOT processed
            ORDER BY created_at, id
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(OutboxEvent::from_row).collect())
    }

    /// Mark an event processed. Safe to call twice; the second call is a no-op.
    pub async fn mark_processed(&self, event_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE outbox_events
             SET processed = TRUE, processed_at = NOW()
             WHERE id = $1 AND NOT processed",
        )
        .bind(event_id)
        .execute(self.pool.as_ref())
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
