//! Reservation API handlers.
//!
//! This module provides HTTP REST endpoints for the booking lifecycle:
//! - Listing courts with their operating hours
//! - Creating reservations (slot held until payment or expiry)
//! - Cancelling, with automatic refund of settled wallet payments
//! - Paying a pending reservation from the wallet
//! - Staff check-in and check-out
//!
//! # Examples
//!
//! Create a reservation:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/reservations \
//!   -H "x-user-id: 42" \
//!   -H "Content-Type: application/json" \
//!   -d '{"court_id": 1, "start_time": "2026-09-01T10:00:00Z",
//!        "end_time": "2026-09-01T11:00:00Z", "payment_method": "CREDITS"}'
//! ```
//!
//! Check in (back office):
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/reservations/7/check-in \
//!   -H "x-staff-id: 3"
//! ```

use axum::{
    Json,
    extract::{Extension, Path, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use courtbook::ledger::LedgerEntry;
use courtbook::reservation::{
    Court, CreateReservation, PaymentMethod, Reservation, ReservationError,
};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::{ApiError, ErrorResponse, payment_error, reservation_error};
use super::middleware::StaffId;
use crate::metrics;

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
    pub court_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreditsPaymentResponse {
    pub reservation: Reservation,
    /// Absent when the reservation priced to zero
    pub entry: Option<LedgerEntry>,
}

/// List all active courts.
///
/// Public endpoint backing the booking page's court picker.
///
/// # Response
///
/// Returns `200 OK` with an array of courts:
/// ```json
/// [{"id": 1, "name": "Center Court", "sport": "padel",
///   "open_hour": 8, "close_hour": 22, "is_active": true}]
/// ```
pub async fn list_courts(State(state): State<AppState>) -> Result<Json<Vec<Court>>, ApiError> {
    state
        .courts
        .list_active()
        .await
        .map(Json)
        .map_err(|e| reservation_error(&e))
}

/// Create a reservation.
///
/// Holds the slot as PENDING with an expiry deadline; payment must settle
/// before the hold lapses or the sweeper releases the slot.
///
/// # Errors
///
/// - `400 Bad Request`: malformed window or outside operating hours
/// - `409 Conflict`: slot already taken (`slot_unavailable`)
/// - `422 Unprocessable Entity`: no rate configured for the court
pub async fn create_reservation(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Json(request): Json<CreateReservationRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let result = state
        .reservations
        .create(CreateReservation {
            court_id: request.court_id,
            user_id,
            start_time: request.start_time,
            end_time: request.end_time,
            payment_method: request.payment_method,
        })
        .await;

    match result {
        Ok(reservation) => {
            metrics::reservations_created_total(reservation.payment_method.as_str());
            Ok(Json(reservation))
        }
        Err(e) => {
            if matches!(e, ReservationError::SlotUnavailable { .. }) {
                metrics::reservation_conflicts_total();
            }
            Err(reservation_error(&e))
        }
    }
}

/// List the caller's reservations, most recent start first.
pub async fn list_reservations(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
) -> Result<Json<Vec<Reservation>>, ApiError> {
    state
        .reservations
        .list_for_user(user_id, 100)
        .await
        .map(Json)
        .map_err(|e| reservation_error(&e))
}

/// Fetch one of the caller's reservations.
///
/// # Errors
///
/// - `404 Not Found`: no such reservation, or it belongs to another user
pub async fn get_reservation(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .reservations
        .get(reservation_id)
        .await
        .map_err(|e| reservation_error(&e))?;

    // Another user's booking is indistinguishable from a missing one
    if reservation.user_id != user_id {
        return Err(reservation_error(&ReservationError::NotFound(
            reservation_id,
        )));
    }

    Ok(Json(reservation))
}

/// Cancel one of the caller's reservations.
///
/// A settled wallet payment is refunded in the same transaction; gateway
/// captures are queued for the external refund worker.
///
/// # Request Body
///
/// ```json
/// {"reason": "Change of plans"}
/// ```
///
/// # Errors
///
/// - `403 Forbidden`: reservation belongs to another user
/// - `409 Conflict`: reservation already in a terminal state
pub async fn cancel_reservation(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Path(reservation_id): Path<i64>,
    Json(request): Json<CancelRequest>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .reservations
        .get(reservation_id)
        .await
        .map_err(|e| reservation_error(&e))?;

    if reservation.user_id != user_id {
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new(
                "not_owner",
                "Reservation belongs to another user".to_string(),
            )),
        ));
    }

    let reason = request
        .reason
        .unwrap_or_else(|| "Cancelled by customer".to_string());

    let cancelled = state
        .reservations
        .cancel(reservation_id, &reason, &format!("user:{user_id}"))
        .await
        .map_err(|e| reservation_error(&e))?;

    metrics::reservation_transitions_total("CANCELLED");
    Ok(Json(cancelled))
}

/// Pay a pending reservation from the caller's wallet.
///
/// Retry-safe: re-sending after a timeout returns the original ledger
/// entry instead of debiting twice.
///
/// # Errors
///
/// - `402 Payment Required`: insufficient balance (`insufficient_balance`)
/// - `409 Conflict`: not awaiting payment, or the hold expired
///   (`reservation_expired`)
pub async fn pay_with_credits(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<CreditsPaymentResponse>, ApiError> {
    let payment = state
        .payments
        .pay_with_credits(reservation_id, user_id)
        .await
        .map_err(|e| payment_error(&e))?;

    metrics::payments_settled_total("CREDITS");
    if let Some(entry) = &payment.entry {
        metrics::payment_amount_cents(entry.amount_cents);
    }

    Ok(Json(CreditsPaymentResponse {
        reservation: payment.reservation,
        entry: payment.entry,
    }))
}

/// Check a paid reservation in (back office).
///
/// # Errors
///
/// - `409 Conflict`: not paid yet, already started or finalized, or now
///   is outside `[start - tolerance, end]` (`outside_window`)
pub async fn check_in(
    State(state): State<AppState>,
    Extension(staff): Extension<StaffId>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .reservations
        .check_in(reservation_id, &staff.actor())
        .await
        .map_err(|e| reservation_error(&e))?;

    metrics::reservation_transitions_total("IN_PROGRESS");
    Ok(Json(reservation))
}

/// Check a reservation out (back office).
///
/// # Errors
///
/// - `409 Conflict`: reservation is not in progress
pub async fn check_out(
    State(state): State<AppState>,
    Extension(_staff): Extension<StaffId>,
    Path(reservation_id): Path<i64>,
) -> Result<Json<Reservation>, ApiError> {
    let reservation = state
        .reservations
        .check_out(reservation_id)
        .await
        .map_err(|e| reservation_error(&e))?;

    metrics::reservation_transitions_total("COMPLETED");
    Ok(Json(reservation))
}
