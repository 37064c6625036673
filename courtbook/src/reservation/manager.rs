//! Reservation state machine implementation.
//!
//! All transitions run inside a single database transaction with the
//! reservation row locked, so concurrent calls observe a consistent state
//! and terminal states can never be mutated. Double-booking is prevented
//! with a per-court advisory lock held for the duration of the creating
//! transaction: the overlap check and the insert are atomic with respect
//! to any other creation on the same court.

use chrono::{DateTime, NaiveTime, Utc};
use log::warn;
use serde_json::json;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::{
    errors::{ReservationError, ReservationResult},
    models::{
        Court, CreateReservation, PaymentMethod, PaymentStatus, Reservation, ReservationId,
        ReservationStatus,
    },
};
use crate::config::ReservationConfig;
use crate::db::CourtRepository;
use crate::outbox::{self, event_type};
use crate::payments;
use crate::pricing::PricingResolver;

/// Reservation manager
#[derive(Clone)]
pub struct ReservationManager {
    pool: Arc<PgPool>,
    courts: Arc<dyn CourtRepository>,
    pricing: PricingResolver,
    config: ReservationConfig,
}

impl ReservationManager {
    /// Create a new reservation manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `courts` - Court lookup repository
    /// * `pricing` - Price resolver used at creation time
    /// * `config` - Lifecycle timing configuration
    pub fn new(
        pool: Arc<PgPool>,
        courts: Arc<dyn CourtRepository>,
        pricing: PricingResolver,
        config: ReservationConfig,
    ) -> Self {
        Self {
            pool,
            courts,
            pricing,
            config,
        }
    }

    /// Create a reservation holding the slot for the configured window
    ///
    /// # Errors
    ///
    /// * `ReservationError::InvalidWindow` - Malformed window or outside
    ///   the court's operating hours
    /// * `ReservationError::SlotUnavailable` - Another non-terminal
    ///   reservation overlaps the window
    /// * `ReservationError::Pricing` - No base rate configured
    pub async fn create(&self, request: CreateReservation) -> ReservationResult<Reservation> {
        let court = self
            .courts
            .find_by_id(request.court_id)
            .await?
            .filter(|c| c.is_active)
            .ok_or(ReservationError::CourtNotFound(request.court_id))?;

        let now = Utc::now();
        validate_window(&court, request.start_time, request.end_time, now)?;

        let quote = self
            .pricing
            .resolve(&court, request.user_id, request.start_time, request.end_time)
            .await?;

        // Courtesy bookings carry no payment leg: free and settled at creation.
        let (price_cents, status, payment_status, expires_at) =
            if request.payment_method == PaymentMethod::Courtesy {
                (0i64, ReservationStatus::Paid, PaymentStatus::Paid, None)
            } else {
                (
                    quote.total_cents,
                    ReservationStatus::Pending,
                    PaymentStatus::Pending,
                    Some(now + self.config.hold_window()),
                )
            };

        let mut tx = self.pool.begin().await?;

        // Serialize creations per court for the rest of this transaction.
        // Any concurrent create on the same court blocks here until our
        // overlap check and insert have committed.
        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(court.id)
            .execute(&mut *tx)
            .await?;

        let conflict = sqlx::query(
            "SELECT id FROM reservations
             WHERE court_id = $1
               AND status IN ('PENDING', 'PAID', 'IN_PROGRESS')
               AND start_time < $3
               AND end_time > $2
             LIMIT 1",
        )
        .bind(court.id)
        .bind(request.start_time.naive_utc())
        .bind(request.end_time.naive_utc())
        .fetch_optional(&mut *tx)
        .await?;

        if conflict.is_some() {
            return Err(ReservationError::SlotUnavailable {
                court_id: court.id,
                start: request.start_time,
                end: request.end_time,
            });
        }

        let row = sqlx::query(
            r#"
            INSERT INTO reservations
                (court_id, user_id, start_time, end_time, total_price_cents,
                 status, payment_status, payment_method, expires_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                      status, payment_status, payment_method, check_in_time,
                      check_out_time, expires_at, notes, created_at, updated_at
            "#,
        )
        .bind(court.id)
        .bind(request.user_id)
        .bind(request.start_time.naive_utc())
        .bind(request.end_time.naive_utc())
        .bind(price_cents)
        .bind(status.as_str())
        .bind(payment_status.as_str())
        .bind(request.payment_method.as_str())
        .bind(expires_at.map(|dt| dt.naive_utc()))
        .fetch_one(&mut *tx)
        .await?;

        let id: i64 = row.get("id");
        let reservation =
            Reservation::from_row(&row).ok_or(ReservationError::CorruptRow(id))?;

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_CREATED,
            json!({
                "reservation_id": reservation.id,
                "court_id": reservation.court_id,
                "user_id": reservation.user_id,
                "start_time": reservation.start_time,
                "end_time": reservation.end_time,
                "total_price_cents": reservation.total_price_cents,
                "payment_method": reservation.payment_method,
                "expires_at": reservation.expires_at,
            }),
        )
        .await?;

        tx.commit().await?;

        Ok(reservation)
    }

    /// Check a paid reservation in, within the tolerance window
    ///
    /// # Errors
    ///
    /// * `ReservationError::NotPaid` - Payment has not settled yet
    /// * `ReservationError::OutsideWindow` - Now is before
    ///   `start - tolerance` or after `end`
    /// * `ReservationError::AlreadyStarted` / `AlreadyCompleted`
    pub async fn check_in(
        &self,
        reservation_id: ReservationId,
        actor: &str,
    ) -> ReservationResult<Reservation> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;

        match reservation.status {
            ReservationStatus::Paid => {}
            ReservationStatus::Pending => return Err(ReservationError::NotPaid),
            ReservationStatus::InProgress => return Err(ReservationError::AlreadyStarted),
            status => return Err(ReservationError::AlreadyCompleted { status }),
        }

        let opens = reservation.start_time - self.config.checkin_tolerance();
        if now < opens || now > reservation.end_time {
            return Err(ReservationError::OutsideWindow {
                at: now,
                tolerance_minutes: self.config.checkin_tolerance_minutes,
            });
        }

        let row = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'IN_PROGRESS', check_in_time = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                      status, payment_status, payment_method, check_in_time,
                      check_out_time, expires_at, notes, created_at, updated_at
            "#,
        )
        .bind(reservation_id)
        .bind(now.naive_utc())
        .fetch_one(&mut *tx)
        .await?;

        let updated =
            Reservation::from_row(&row).ok_or(ReservationError::CorruptRow(reservation_id))?;

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_CHECKED_IN,
            json!({
                "reservation_id": updated.id,
                "court_id": updated.court_id,
                "user_id": updated.user_id,
                "check_in_time": updated.check_in_time,
                "actor": actor,
            }),
        )
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Check a reservation out, completing it
    ///
    /// # Errors
    ///
    /// * `ReservationError::NotInProgress` - Reservation is not checked in
    pub async fn check_out(&self, reservation_id: ReservationId) -> ReservationResult<Reservation> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;

        if reservation.status != ReservationStatus::InProgress {
            return Err(ReservationError::NotInProgress);
        }

        let row = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'COMPLETED', check_out_time = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                      status, payment_status, payment_method, check_in_time,
                      check_out_time, expires_at, notes, created_at, updated_at
            "#,
        )
        .bind(reservation_id)
        .bind(now.naive_utc())
        .fetch_one(&mut *tx)
        .await?;

        let updated =
            Reservation::from_row(&row).ok_or(ReservationError::CorruptRow(reservation_id))?;

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_CHECKED_OUT,
            json!({
                "reservation_id": updated.id,
                "court_id": updated.court_id,
                "user_id": updated.user_id,
                "check_out_time": updated.check_out_time,
            }),
        )
        .await?;

        tx.commit().await?;

        Ok(updated)
    }

    /// Cancel a non-terminal reservation, refunding a settled payment
    ///
    /// The refund (ledger credit for wallet payments, refund marker for
    /// gateway payments) commits in the same transaction as the status
    /// change.
    ///
    /// # Errors
    ///
    /// * `ReservationError::AlreadyCompleted` - Reservation is terminal
    pub async fn cancel(
        &self,
        reservation_id: ReservationId,
        reason: &str,
        actor: &str,
    ) -> ReservationResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;

        if reservation.status.is_terminal() {
            return Err(ReservationError::AlreadyCompleted {
                status: reservation.status,
            });
        }

        let was_paid = reservation.payment_status == PaymentStatus::Paid;
        let refunded = if was_paid {
            payments::refund_in_tx(&mut tx, &reservation, reason, actor).await?
        } else {
            None
        };

        let payment_status = if was_paid {
            PaymentStatus::Refunded
        } else {
            reservation.payment_status
        };

        let row = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'CANCELLED', payment_status = $2, expires_at = NULL,
                notes = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                      status, payment_status, payment_method, check_in_time,
                      check_out_time, expires_at, notes, created_at, updated_at
            "#,
        )
        .bind(reservation_id)
        .bind(payment_status.as_str())
        .bind(reason)
        .fetch_one(&mut *tx)
        .await?;

        let updated =
            Reservation::from_row(&row).ok_or(ReservationError::CorruptRow(reservation_id))?;

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_CANCELLED,
            json!({
                "reservation_id": updated.id,
                "court_id": updated.court_id,
                "user_id": updated.user_id,
                "reason": reason,
                "actor": actor,
                "refund_entry_id": refunded.as_ref().map(|e| e.id),
            }),
        )
        .await?;

        tx.commit().await?;

        if updated.payment_status == PaymentStatus::Refunded
            && updated.payment_method == PaymentMethod::Gateway
        {
            // The gateway capture is reversed by the external refund worker
            // off the outbox event; nothing more to do here.
            warn!(
                "reservation {} cancelled after gateway settlement; refund delegated",
                updated.id
            );
        }

        Ok(updated)
    }

    /// Fetch a reservation by ID
    pub async fn get(&self, reservation_id: ReservationId) -> ReservationResult<Reservation> {
        let row = sqlx::query(
            r#"
            SELECT id, court_id, user_id, start_time, end_time, total_price_cents,
                   status, payment_status, payment_method, check_in_time,
                   check_out_time, expires_at, notes, created_at, updated_at
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(reservation_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(ReservationError::NotFound(reservation_id))?;

        Reservation::from_row(&row).ok_or(ReservationError::CorruptRow(reservation_id))
    }

    /// List a user's reservations, most recent start first
    pub async fn list_for_user(
        &self,
        user_id: i64,
        limit: i64,
    ) -> ReservationResult<Vec<Reservation>> {
        let rows = sqlx::query(
            r#"
            SELECT id, court_id, user_id, start_time, end_time, total_price_cents,
                   status, payment_status, payment_method, check_in_time,
                   check_out_time, expires_at, notes, created_at, updated_at
            FROM reservations
            WHERE user_id = $1
            ORDER BY start_time DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| {
                let id: i64 = row.get("id");
                Reservation::from_row(row).ok_or(ReservationError::CorruptRow(id))
            })
            .collect()
    }
}

/// Lock a reservation row for the remainder of the transaction.
pub(crate) async fn lock_reservation(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    reservation_id: ReservationId,
) -> ReservationResult<Reservation> {
    let row = sqlx::query(
        r#"
        SELECT id, court_id, user_id, start_time, end_time, total_price_cents,
               status, payment_status, payment_method, check_in_time,
               check_out_time, expires_at, notes, created_at, updated_at
        FROM reservations
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(reservation_id)
    .fetch_optional(&mut **tx)
    .await?
    .ok_or(ReservationError::NotFound(reservation_id))?;

    Reservation::from_row(&row).ok_or(ReservationError::CorruptRow(reservation_id))
}

/// Validate a requested window against court operating hours.
///
/// The window must be well-formed (`start < end`), not start in the past,
/// fall within a single calendar day, and fit inside the court's open
/// hours.
fn validate_window(
    court: &Court,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ReservationResult<()> {
    if start >= end {
        return Err(ReservationError::InvalidWindow(
            "start must precede end".to_string(),
        ));
    }

    if start < now {
        return Err(ReservationError::InvalidWindow(
            "window starts in the past".to_string(),
        ));
    }

    if start.date_naive() != end.date_naive() {
        return Err(ReservationError::InvalidWindow(
            "window must fall within a single day".to_string(),
        ));
    }

    let open = u32::try_from(court.open_hour)
        .ok()
        .and_then(|h| NaiveTime::from_hms_opt(h, 0, 0));
    let close = u32::try_from(court.close_hour)
        .ok()
        .and_then(|h| NaiveTime::from_hms_opt(h, 0, 0));

    match (open, close) {
        (Some(open), Some(close)) => {
            if start.time() < open || end.time() > close {
                return Err(ReservationError::InvalidWindow(format!(
                    "court is open {:02}:00-{:02}:00",
                    court.open_hour, court.close_hour
                )));
            }
        }
        _ => {
            return Err(ReservationError::InvalidWindow(
                "court has no valid operating hours".to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn court() -> Court {
        Court {
            id: 1,
            name: "Center Court".to_string(),
            sport: "padel".to_string(),
            open_hour: 8,
            close_hour: 22,
            is_active: true,
        }
    }

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, h, m, 0).unwrap()
    }

    #[test]
    fn test_window_start_before_end() {
        let err = validate_window(&court(), at(11, 0), at(10, 0), at(8, 0)).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidWindow(_)));

        let err = validate_window(&court(), at(10, 0), at(10, 0), at(8, 0)).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidWindow(_)));
    }

    #[test]
    fn test_window_in_the_past_rejected() {
        let err = validate_window(&court(), at(10, 0), at(11, 0), at(12, 0)).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidWindow(_)));
    }

    #[test]
    fn test_window_within_operating_hours() {
        assert!(validate_window(&court(), at(10, 0), at(11, 0), at(8, 0)).is_ok());
        // Exactly at the edges is fine
        assert!(validate_window(&court(), at(8, 0), at(9, 0), at(7, 0)).is_ok());
        assert!(validate_window(&court(), at(21, 0), at(22, 0), at(8, 0)).is_ok());
    }

    #[test]
    fn test_window_outside_operating_hours() {
        let err = validate_window(&court(), at(7, 0), at(8, 0), at(6, 0)).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidWindow(_)));

        let err = validate_window(&court(), at(21, 30), at(22, 30), at(8, 0)).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidWindow(_)));
    }

    #[test]
    fn test_window_spanning_days_rejected() {
        let start = Utc.with_ymd_and_hms(2026, 9, 1, 21, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2026, 9, 2, 9, 0, 0).unwrap();
        let err = validate_window(&court(), start, end, at(8, 0)).unwrap_err();
        assert!(matches!(err, ReservationError::InvalidWindow(_)));
    }
}
