//! Error-to-response mapping for the HTTP surface.
//!
//! Error responses carry a machine-readable kind and a client-safe
//! message; full detail is logged server-side only.

use axum::{Json, http::StatusCode};
use courtbook::ledger::LedgerError;
use courtbook::payments::PaymentError;
use courtbook::reservation::ReservationError;
use serde::Serialize;
use tracing::error;

/// Error payload: `{ "error": { "kind": "...", "message": "..." } }`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(kind: &str, message: String) -> Self {
        Self {
            error: ErrorBody {
                kind: kind.to_string(),
                message,
            },
        }
    }
}

/// Response type handlers return on failure
pub type ApiError = (StatusCode, Json<ErrorResponse>);

fn respond(status: StatusCode, kind: &str, message: String) -> ApiError {
    (status, Json(ErrorResponse::new(kind, message)))
}

/// Map a reservation error to an HTTP response
pub fn reservation_error(err: &ReservationError) -> ApiError {
    let status = match err {
        ReservationError::NotFound(_) | ReservationError::CourtNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ReservationError::InvalidWindow(_) => StatusCode::BAD_REQUEST,
        ReservationError::SlotUnavailable { .. }
        | ReservationError::OutsideWindow { .. }
        | ReservationError::NotPaid
        | ReservationError::AlreadyStarted
        | ReservationError::AlreadyCompleted { .. }
        | ReservationError::NotInProgress => StatusCode::CONFLICT,
        ReservationError::Pricing(_) => StatusCode::UNPROCESSABLE_ENTITY,
        ReservationError::Refund(e) => return payment_error(e),
        ReservationError::Database(_) | ReservationError::CorruptRow(_) => {
            error!("reservation operation failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    respond(status, err.kind(), err.client_message())
}

/// Map a payment error to an HTTP response
pub fn payment_error(err: &PaymentError) -> ApiError {
    let status = match err {
        PaymentError::InvalidSignature => StatusCode::UNAUTHORIZED,
        PaymentError::MalformedPayload(_)
        | PaymentError::UnknownOrderReference(_)
        | PaymentError::AmountMismatch { .. } => StatusCode::BAD_REQUEST,
        PaymentError::NotFound(_) => StatusCode::NOT_FOUND,
        PaymentError::NotOwner => StatusCode::FORBIDDEN,
        PaymentError::NotPending { .. }
        | PaymentError::ReservationExpired
        | PaymentError::NothingToRefund => StatusCode::CONFLICT,
        PaymentError::Ledger(e) => return ledger_error(e),
        PaymentError::Database(_) | PaymentError::CorruptRow(_) => {
            error!("payment operation failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    respond(status, err.kind(), err.client_message())
}

/// Map a ledger error to an HTTP response
pub fn ledger_error(err: &LedgerError) -> ApiError {
    let status = match err {
        LedgerError::WalletNotFound(_) => StatusCode::NOT_FOUND,
        LedgerError::InsufficientBalance { .. } => StatusCode::PAYMENT_REQUIRED,
        LedgerError::InvalidAmount(_) => StatusCode::BAD_REQUEST,
        LedgerError::BalanceOverflow => StatusCode::CONFLICT,
        LedgerError::Database(_) | LedgerError::CorruptRow(_) => {
            error!("ledger operation failed: {err}");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    respond(status, err.kind(), err.client_message())
}

#[cfg(test)]
mod tests {
    use super::*;
    use courtbook::reservation::ReservationStatus;

    #[test]
    fn test_conflicts_map_to_409() {
        let (status, _) = reservation_error(&ReservationError::SlotUnavailable {
            court_id: 1,
            start: chrono::Utc::now(),
            end: chrono::Utc::now(),
        });
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, _) = payment_error(&PaymentError::NotPending {
            status: ReservationStatus::Cancelled,
        });
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[test]
    fn test_invalid_signature_maps_to_401() {
        let (status, body) = payment_error(&PaymentError::InvalidSignature);
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body.0.error.kind, "invalid_signature");
    }

    #[test]
    fn test_insufficient_balance_maps_to_402() {
        let err = PaymentError::Ledger(LedgerError::InsufficientBalance {
            available: 100,
            required: 200,
        });
        let (status, body) = payment_error(&err);
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
        assert_eq!(body.0.error.kind, "insufficient_balance");
    }

    #[test]
    fn test_database_error_sanitized() {
        let (status, body) = ledger_error(&LedgerError::Database(sqlx::Error::PoolClosed));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.0.error.message, "Internal server error");
    }
}
