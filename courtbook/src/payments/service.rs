//! Payment reconciliation service.
//!
//! Applies payment outcomes to reservations exactly once regardless of
//! source: gateway webhook, wallet debit, or staff refund. Exactly-once is
//! enforced structurally: ledger moves carry idempotency keys derived from
//! the reservation ID, and webhook settlement is status-gated inside the
//! same transaction that writes the new state.

use chrono::Utc;
use log::{info, warn};
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use std::sync::Arc;

use super::{
    errors::{PaymentError, PaymentResult},
    gateway::{GatewayEvent, GatewayOutcome, WebhookVerifier},
};
use crate::ledger::{self, EntryType, LedgerEntry, NewEntry, reason};
use crate::outbox::{self, event_type};
use crate::reservation::{
    PaymentMethod, PaymentStatus, Reservation, ReservationId, ReservationStatus,
};

/// Idempotency key for a reservation's wallet debit
pub fn pay_idempotency_key(reservation_id: ReservationId) -> String {
    format!("res-pay-{reservation_id}")
}

/// Idempotency key for a reservation's refund credit
pub fn refund_idempotency_key(reservation_id: ReservationId) -> String {
    format!("res-refund-{reservation_id}")
}

/// Result of a wallet payment
#[derive(Debug, Clone)]
pub struct CreditsPayment {
    pub reservation: Reservation,
    /// `None` when the reservation priced to zero and no debit was needed
    pub entry: Option<LedgerEntry>,
}

/// What a webhook delivery did
#[derive(Debug, Clone)]
pub enum WebhookDisposition {
    /// Funds applied, reservation settled
    Settled(Reservation),
    /// Re-delivery of an already-applied event; nothing changed
    AlreadySettled,
    /// Declined attempt recorded; reservation left PENDING for the sweeper
    FailureRecorded,
    /// Gateway aborted the session; reservation cancelled
    Cancelled(Reservation),
    /// Abort for a reservation no longer PENDING; nothing to do
    Ignored,
}

/// Payment reconciliation service
#[derive(Clone)]
pub struct PaymentService {
    pool: Arc<PgPool>,
    verifier: WebhookVerifier,
}

impl PaymentService {
    /// Create a new payment service
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    /// * `verifier` - Webhook signature verifier holding the shared secret
    pub fn new(pool: Arc<PgPool>, verifier: WebhookVerifier) -> Self {
        Self { pool, verifier }
    }

    /// Handle a gateway webhook delivery
    ///
    /// The signature is verified before the body is interpreted; a
    /// mismatch rejects the delivery outright. Re-delivery of an applied
    /// event is a no-op.
    ///
    /// # Errors
    ///
    /// * `PaymentError::InvalidSignature` - Signature mismatch, fail closed
    /// * `PaymentError::ReservationExpired` - Settlement arrived after the
    ///   hold lapsed or the slot was released
    pub async fn handle_gateway_webhook(
        &self,
        raw_body: &[u8],
        signature: &str,
    ) -> PaymentResult<WebhookDisposition> {
        self.verifier.verify(raw_body, signature)?;

        let event = GatewayEvent::decode(raw_body)?;
        let reservation_id = event.reservation_id()?;

        match event.outcome {
            GatewayOutcome::Succeeded => self.apply_settlement(reservation_id, &event).await,
            GatewayOutcome::Failed => {
                // Customer may retry while the hold lasts; the sweeper
                // releases the slot if they never do.
                let mut tx = self.pool.begin().await?;
                outbox::emit(
                    &mut tx,
                    event_type::PAYMENT_FAILED,
                    json!({
                        "reservation_id": reservation_id,
                        "gateway_event_id": event.event_id,
                        "amount_cents": event.amount_cents,
                    }),
                )
                .await?;
                tx.commit().await?;

                info!("payment failed for reservation {reservation_id}, hold retained");
                Ok(WebhookDisposition::FailureRecorded)
            }
            GatewayOutcome::Aborted => self.apply_abort(reservation_id, &event).await,
        }
    }

    async fn apply_settlement(
        &self,
        reservation_id: ReservationId,
        event: &GatewayEvent,
    ) -> PaymentResult<WebhookDisposition> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;

        match reservation.status {
            // Re-delivery: the first application already moved the row.
            ReservationStatus::Paid
            | ReservationStatus::InProgress
            | ReservationStatus::Completed => return Ok(WebhookDisposition::AlreadySettled),
            ReservationStatus::Cancelled | ReservationStatus::NoShow => {
                return Err(PaymentError::ReservationExpired);
            }
            ReservationStatus::Pending => {}
        }

        if let Some(expires_at) = reservation.expires_at {
            if now > expires_at {
                // The slot is already forfeit even if the sweeper has not
                // run yet; accepting would pay for a released slot.
                return Err(PaymentError::ReservationExpired);
            }
        }

        if event.amount_cents != reservation.total_price_cents {
            return Err(PaymentError::AmountMismatch {
                expected: reservation.total_price_cents,
                got: event.amount_cents,
            });
        }

        let updated = settle_reservation(&mut tx, reservation_id).await?;

        outbox::emit(
            &mut tx,
            event_type::PAYMENT_SETTLED,
            json!({
                "reservation_id": updated.id,
                "user_id": updated.user_id,
                "amount_cents": updated.total_price_cents,
                "method": updated.payment_method,
                "gateway_event_id": event.event_id,
            }),
        )
        .await?;

        tx.commit().await?;

        Ok(WebhookDisposition::Settled(updated))
    }

    async fn apply_abort(
        &self,
        reservation_id: ReservationId,
        event: &GatewayEvent,
    ) -> PaymentResult<WebhookDisposition> {
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;

        if reservation.status != ReservationStatus::Pending {
            return Ok(WebhookDisposition::Ignored);
        }

        let updated = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'CANCELLED', expires_at = NULL,
                notes = 'Payment session aborted by gateway', updated_at = NOW()
            WHERE id = $1
            RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                      status, payment_status, payment_method, check_in_time,
                      check_out_time, expires_at, notes, created_at, updated_at
            "#,
        )
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        let updated =
            Reservation::from_row(&updated).ok_or(PaymentError::CorruptRow(reservation_id))?;

        outbox::emit(
            &mut tx,
            event_type::RESERVATION_CANCELLED,
            json!({
                "reservation_id": updated.id,
                "court_id": updated.court_id,
                "user_id": updated.user_id,
                "reason": "Payment session aborted by gateway",
                "actor": "gateway",
                "gateway_event_id": event.event_id,
            }),
        )
        .await?;

        tx.commit().await?;

        warn!("reservation {reservation_id} cancelled: gateway aborted the payment session");
        Ok(WebhookDisposition::Cancelled(updated))
    }

    /// Pay a PENDING reservation from the owner's wallet
    ///
    /// The balance check, ledger entry, and status transition commit in one
    /// transaction. A retry after a timed-out first attempt that actually
    /// committed returns the original ledger entry and changes nothing.
    ///
    /// # Errors
    ///
    /// * `PaymentError::NotOwner` - Reservation belongs to another user
    /// * `PaymentError::NotPending` - Reservation is not awaiting payment
    /// * `PaymentError::ReservationExpired` - Hold already lapsed
    /// * `PaymentError::Ledger(InsufficientBalance)` - Wallet cannot cover
    ///   the price
    pub async fn pay_with_credits(
        &self,
        reservation_id: ReservationId,
        user_id: i64,
    ) -> PaymentResult<CreditsPayment> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;

        if reservation.user_id != user_id {
            return Err(PaymentError::NotOwner);
        }

        // Replayed call: the first attempt committed, hand back its entry.
        let key = pay_idempotency_key(reservation_id);
        if let Some(existing) = ledger::manager::find_by_key(&mut tx, &key).await? {
            return Ok(CreditsPayment {
                reservation,
                entry: Some(existing),
            });
        }

        if reservation.status != ReservationStatus::Pending {
            return Err(PaymentError::NotPending {
                status: reservation.status,
            });
        }

        if let Some(expires_at) = reservation.expires_at {
            if now > expires_at {
                return Err(PaymentError::ReservationExpired);
            }
        }

        let entry = if reservation.total_price_cents > 0 {
            Some(
                ledger::manager::apply_entry(
                    &mut tx,
                    NewEntry {
                        user_id,
                        entry_type: EntryType::Debit,
                        amount_cents: reservation.total_price_cents,
                        reason: reason::RESERVATION.to_string(),
                        idempotency_key: Some(key),
                        metadata: json!({
                            "reservation_id": reservation_id,
                            "court_id": reservation.court_id,
                        }),
                        allow_negative: false,
                    },
                )
                .await?,
            )
        } else {
            None
        };

        // Record how the booking was actually settled; refunds key off the
        // payment method.
        let row = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'PAID', payment_status = 'PAID', payment_method = 'CREDITS',
                expires_at = NULL, updated_at = NOW()
            WHERE id = $1
            RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                      status, payment_status, payment_method, check_in_time,
                      check_out_time, expires_at, notes, created_at, updated_at
            "#,
        )
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        let updated =
            Reservation::from_row(&row).ok_or(PaymentError::CorruptRow(reservation_id))?;

        outbox::emit(
            &mut tx,
            event_type::PAYMENT_SETTLED,
            json!({
                "reservation_id": updated.id,
                "user_id": updated.user_id,
                "amount_cents": updated.total_price_cents,
                "method": updated.payment_method,
                "ledger_entry_id": entry.as_ref().map(|e| e.id),
            }),
        )
        .await?;

        tx.commit().await?;

        Ok(CreditsPayment {
            reservation: updated,
            entry,
        })
    }

    /// Refund a settled payment without touching the lifecycle status
    ///
    /// Wallet payments are reversed in the ledger; gateway captures are
    /// marked refunded and the outbox event carries the order reference for
    /// the external gateway-refund consumer.
    ///
    /// # Errors
    ///
    /// * `PaymentError::NothingToRefund` - Payment never settled or was
    ///   already refunded
    pub async fn refund(
        &self,
        reservation_id: ReservationId,
        refund_reason: &str,
        actor: &str,
    ) -> PaymentResult<Reservation> {
        let mut tx = self.pool.begin().await?;

        let reservation = lock_reservation(&mut tx, reservation_id).await?;

        if reservation.payment_status != PaymentStatus::Paid {
            return Err(PaymentError::NothingToRefund);
        }

        refund_in_tx(&mut tx, &reservation, refund_reason, actor).await?;

        let row = sqlx::query(
            r#"
            UPDATE reservations
            SET payment_status = 'REFUNDED', updated_at = NOW()
            WHERE id = $1
            RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                      status, payment_status, payment_method, check_in_time,
                      check_out_time, expires_at, notes, created_at, updated_at
            "#,
        )
        .bind(reservation_id)
        .fetch_one(&mut *tx)
        .await?;

        let updated =
            Reservation::from_row(&row).ok_or(PaymentError::CorruptRow(reservation_id))?;

        tx.commit().await?;

        Ok(updated)
    }
}

/// Reverse a settled payment inside an existing transaction.
///
/// Writes the refund ledger entry for wallet payments (idempotent on the
/// derived key) and always records the `payment.refunded` outbox event.
/// The caller is responsible for updating the reservation row itself.
pub(crate) async fn refund_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    reservation: &Reservation,
    refund_reason: &str,
    actor: &str,
) -> PaymentResult<Option<LedgerEntry>> {
    let entry = if reservation.payment_method == PaymentMethod::Credits
        && reservation.total_price_cents > 0
    {
        Some(
            ledger::manager::apply_entry(
                tx,
                NewEntry {
                    user_id: reservation.user_id,
                    entry_type: EntryType::Credit,
                    amount_cents: reservation.total_price_cents,
                    reason: reason::REFUND.to_string(),
                    idempotency_key: Some(refund_idempotency_key(reservation.id)),
                    metadata: json!({
                        "reservation_id": reservation.id,
                        "reason": refund_reason,
                        "actor": actor,
                    }),
                    allow_negative: false,
                },
            )
            .await?,
        )
    } else {
        None
    };

    outbox::emit(
        tx,
        event_type::PAYMENT_REFUNDED,
        json!({
            "reservation_id": reservation.id,
            "user_id": reservation.user_id,
            "amount_cents": reservation.total_price_cents,
            "method": reservation.payment_method,
            "order_reference": super::gateway::order_reference(reservation.id),
            "reason": refund_reason,
            "actor": actor,
            "ledger_entry_id": entry.as_ref().map(|e| e.id),
        }),
    )
    .await?;

    Ok(entry)
}

/// Mark a reservation settled: PAID on both axes, hold cleared.
async fn settle_reservation(
    tx: &mut Transaction<'_, Postgres>,
    reservation_id: ReservationId,
) -> PaymentResult<Reservation> {
    let row = sqlx::query(
        r#"
        UPDATE reservations
        SET status = 'PAID', payment_status = 'PAID', expires_at = NULL, updated_at = NOW()
        WHERE id = $1
        RETURNING id, court_id, user_id, start_time, end_time, total_price_cents,
                  status, payment_status, payment_method, check_in_time,
                  check_out_time, expires_at, notes, created_at, updated_at
        "#,
    )
    .bind(reservation_id)
    .fetch_one(&mut **tx)
    .await?;

    Reservation::from_row(&row).ok_or(PaymentError::CorruptRow(reservation_id))
}

/// Lock a reservation row for the remainder of the transaction.
async fn lock_reservation(
    tx: &mut Transaction<'_, Postgres>,
    reservation_id: ReservationId,
) -> PaymentResult<Reservation> {
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
    .ok_or(PaymentError::NotFound(reservation_id))?;

    Reservation::from_row(&row).ok_or(PaymentError::CorruptRow(reservation_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_idempotency_keys_are_stable() {
        assert_eq!(pay_idempotency_key(42), "res-pay-42");
        assert_eq!(refund_idempotency_key(42), "res-refund-42");
        assert_ne!(pay_idempotency_key(42), refund_idempotency_key(42));
    }
}
