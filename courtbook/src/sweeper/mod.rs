//! Auto-expiry / no-show sweeper.
//!
//! Converts time-based conditions into state transitions without user
//! action. Each invocation runs three passes, each of which only selects
//! rows still in the qualifying status, so re-running against the same
//! clock transitions nothing twice. A failure on one row is logged and
//! the sweep continues with the rest.

use chrono::{DateTime, Utc};
use log::{error, info};
use serde_json::json;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use crate::config::ReservationConfig;
use crate::db::timeouts::with_long_timeout;
use crate::outbox::{self, event_type};
use crate::reservation::{Reservation, ReservationError, ReservationId, ReservationResult};

/// Counts from a single sweep invocation
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// PENDING holds released
    pub expired: usize,
    /// Bookings marked NO_SHOW
    pub no_shows: usize,
    /// IN_PROGRESS bookings auto-completed
    pub auto_completed: usize,
    /// Rows that failed to transition and were skipped
    pub failures: usize,
}

impl SweepReport {
    /// Total state transitions performed
    pub fn transitions(&self) -> usize {
        self.expired + self.no_shows + self.auto_completed
    }
}

/// Periodic sweeper over stale reservations
#[derive(Clone)]
pub struct Sweeper {
    pool: Arc<PgPool>,
    config: ReservationConfig,
}

impl Sweeper {
    /// Create a new sweeper
    pub fn new(pool: Arc<PgPool>, config: ReservationConfig) -> Self {
        Self { pool, config }
    }

    /// Run all three passes against the current clock
    pub async fn run_once(&self) -> SweepReport {
        self.run_at(Utc::now()).await
    }

    /// Run all three passes against a fixed clock
    ///
    /// Exposed separately so tests can replay the same instant and assert
    /// the second run is a no-op.
    pub async fn run_at(&self, now: DateTime<Utc>) -> SweepReport {
        let mut report = SweepReport::default();

        self.expire_pending(now, &mut report).await;
        self.mark_no_shows(now, &mut report).await;
        self.auto_complete(now, &mut report).await;

        if report.transitions() > 0 || report.failures > 0 {
            info!(
                "sweep: {} expired, {} no-shows, {} auto-completed, {} failures",
                report.expired, report.no_shows, report.auto_completed, report.failures
            );
        }

        report
    }

    /// Pass 1: release PENDING holds past their expiry.
    ///
    /// Asynchronous-settlement methods (bank transfer, on-site, courtesy)
    /// get an extended grace period on top of the hold window before the
    /// slot is released.
    async fn expire_pending(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let async_cutoff = now - self.config.async_settlement_grace();

        let candidates = with_long_timeout(
            sqlx::query(
                "SELECT id FROM reservations
                 WHERE status = 'PENDING'
                   AND expires_at IS NOT NULL
                   AND (
                       (payment_method NOT IN ('BANK_TRANSFER', 'ON_SITE', 'COURTESY')
                        AND expires_at < $1)
                    OR (payment_method IN ('BANK_TRANSFER', 'ON_SITE', 'COURTESY')
                        AND expires_at < $2)
                   )
                 ORDER BY id",
            )
            .bind(now.naive_utc())
            .bind(async_cutoff.naive_utc())
            .fetch_all(self.pool.as_ref()),
        )
        .await;

        let ids = match candidates {
            Ok(rows) => rows.iter().map(|r| r.get::<i64, _>("id")).collect::<Vec<_>>(),
            Err(e) => {
                error!("sweep: expiry candidate query failed: {e}");
                report.failures += 1;
                return;
            }
        };

        for id in ids {
            match self.expire_one(id, now).await {
                Ok(true) => report.expired += 1,
                Ok(false) => {} // row moved on since the candidate query
                Err(e) => {
                    error!("sweep: failed to expire reservation {id}: {e}");
                    report.failures += 1;
                }
            }
        }
    }

    async fn expire_one(&self, id: ReservationId, now: DateTime<Utc>) -> ReservationResult<bool> {
        let mut tx = self.pool.begin().await?;

        let Some(reservation) = lock_if_pending(&mut tx, id).await? else {
            return Ok(false);
        };

        let cutoff = if reservation.payment_method.is_async_settlement() {
            now - self.config.async_settlement_grace()
        } else {
            now
        };
        let still_expired = reservation
            .expires_at
            .map(|at| at < cutoff)
            .unwrap_or(false);
        if !still_expired {
            return Ok(false);
        }

        sqlx::query(
            "UPDATE reservations
             SET status = 'CANCELLED', expires_at = NULL,
                 notes = 'Hold expired without payment', updated_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_EXPIRED,
            json!({
                "reservation_id": id,
                "court_id": reservation.court_id,
                "user_id": reservation.user_id,
                "expired_at": now,
                "payment_method": reservation.payment_method,
            }),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Pass 2: mark never-checked-in bookings NO_SHOW after the grace period.
    async fn mark_no_shows(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let cutoff = now - self.config.no_show_grace();

        let candidates = with_long_timeout(
            sqlx::query(
                "SELECT id FROM reservations
                 WHERE status IN ('PENDING', 'PAID')
                   AND check_in_time IS NULL
                   AND end_time < $1
                 ORDER BY id",
            )
            .bind(cutoff.naive_utc())
            .fetch_all(self.pool.as_ref()),
        )
        .await;

        let ids = match candidates {
            Ok(rows) => rows.iter().map(|r| r.get::<i64, _>("id")).collect::<Vec<_>>(),
            Err(e) => {
                error!("sweep: no-show candidate query failed: {e}");
                report.failures += 1;
                return;
            }
        };

        for id in ids {
            match self.no_show_one(id, cutoff).await {
                Ok(true) => report.no_shows += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("sweep: failed to mark reservation {id} no-show: {e}");
                    report.failures += 1;
                }
            }
        }
    }

    async fn no_show_one(
        &self,
        id: ReservationId,
        cutoff: DateTime<Utc>,
    ) -> ReservationResult<bool> {
        let mut tx = self.pool.begin().await?;

        // Idempotent re-check under lock
        let result = sqlx::query(
            "UPDATE reservations
             SET status = 'NO_SHOW', expires_at = NULL, updated_at = NOW()
             WHERE id = $1
               AND status IN ('PENDING', 'PAID')
               AND check_in_time IS NULL
               AND end_time < $2
             RETURNING court_id, user_id",
        )
        .bind(id)
        .bind(cutoff.naive_utc())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = result else {
            return Ok(false);
        };

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_NO_SHOW,
            json!({
                "reservation_id": id,
                "court_id": row.get::<i64, _>("court_id"),
                "user_id": row.get::<i64, _>("user_id"),
            }),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }

    /// Pass 3: complete IN_PROGRESS bookings whose end time passed without
    /// a check-out.
    async fn auto_complete(&self, now: DateTime<Utc>, report: &mut SweepReport) {
        let candidates = with_long_timeout(
            sqlx::query(
                "SELECT id FROM reservations
                 WHERE status = 'IN_PROGRESS' AND end_time < $1
                 ORDER BY id",
            )
            .bind(now.naive_utc())
            .fetch_all(self.pool.as_ref()),
        )
        .await;

        let ids = match candidates {
            Ok(rows) => rows.iter().map(|r| r.get::<i64, _>("id")).collect::<Vec<_>>(),
            Err(e) => {
                error!("sweep: auto-complete candidate query failed: {e}");
                report.failures += 1;
                return;
            }
        };

        for id in ids {
            match self.auto_complete_one(id, now).await {
                Ok(true) => report.auto_completed += 1,
                Ok(false) => {}
                Err(e) => {
                    error!("sweep: failed to auto-complete reservation {id}: {e}");
                    report.failures += 1;
                }
            }
        }
    }

    async fn auto_complete_one(
        &self,
        id: ReservationId,
        now: DateTime<Utc>,
    ) -> ReservationResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE reservations
             SET status = 'COMPLETED', updated_at = NOW()
             WHERE id = $1 AND status = 'IN_PROGRESS' AND end_time < $2
             RETURNING court_id, user_id",
        )
        .bind(id)
        .bind(now.naive_utc())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = result else {
            return Ok(false);
        };

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_AUTO_COMPLETED,
            json!({
                "reservation_id": id,
                "court_id": row.get::<i64, _>("court_id"),
                "user_id": row.get::<i64, _>("user_id"),
            }),
        )
        .await?;

        tx.commit().await?;
        Ok(true)
    }
}

/// Lock a reservation row if it is still PENDING.
async fn lock_if_pending(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    id: ReservationId,
) -> Result<Option<Reservation>, ReservationError> {
    let row = sqlx::query(
        r#"
        SELECT id, court_id, user_id, start_time, end_time, total_price_cents,
               status, payment_status, payment_method, check_in_time,
               check_out_time, expires_at, notes, created_at, updated_at
        FROM reservations
        WHERE id = $1 AND status = 'PENDING'
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(row) => Ok(Some(
            Reservation::from_row(&row).ok_or(ReservationError::CorruptRow(id))?,
        )),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_transitions() {
        let report = SweepReport {
            expired: 2,
            no_shows: 1,
            auto_completed: 3,
            failures: 1,
        };
        assert_eq!(report.transitions(), 6);
    }

    #[test]
    fn test_empty_report() {
        let report = SweepReport::default();
        assert_eq!(report.transitions(), 0);
        assert_eq!(report.failures, 0);
    }
}
