//! Payment reconciliation error types.

use thiserror::Error;

use crate::ledger::LedgerError;
use crate::reservation::ReservationStatus;

/// Payment errors
#[derive(Debug, Error)]
pub enum PaymentError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Webhook signature did not verify against the shared secret
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// Webhook body did not parse into a known event shape
    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    /// Order reference did not map to a reservation
    #[error("Unknown order reference: {0}")]
    UnknownOrderReference(String),

    /// Reservation not found
    #[error("Reservation {0} not found")]
    NotFound(i64),

    /// Caller does not own the reservation
    #[error("Reservation belongs to another user")]
    NotOwner,

    /// Payment attempted on a reservation that is not awaiting payment
    #[error("Reservation is not awaiting payment (status {status})")]
    NotPending { status: ReservationStatus },

    /// Payment arrived after the hold expired or the slot was released
    #[error("Reservation hold has expired")]
    ReservationExpired,

    /// Gateway-reported amount does not match the reservation price
    #[error("Amount mismatch: expected {expected}, got {got}")]
    AmountMismatch { expected: i64, got: i64 },

    /// Refund requested for a reservation with no settled payment
    #[error("Reservation has no settled payment to refund")]
    NothingToRefund,

    /// Ledger failure while moving credits
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A persisted status column holds an unknown value
    #[error("Corrupt reservation row {0}")]
    CorruptRow(i64),
}

impl PaymentError {
    /// Get a client-safe error message that doesn't leak internals
    pub fn client_message(&self) -> String {
        match self {
            PaymentError::Database(_) | PaymentError::CorruptRow(_) => {
                "Internal server error".to_string()
            }
            PaymentError::Ledger(e) => e.client_message(),
            _ => self.to_string(),
        }
    }

    /// Machine-readable error kind for the HTTP surface
    pub fn kind(&self) -> &'static str {
        match self {
            PaymentError::Database(_) | PaymentError::CorruptRow(_) => "internal",
            PaymentError::InvalidSignature => "invalid_signature",
            PaymentError::MalformedPayload(_) => "malformed_payload",
            PaymentError::UnknownOrderReference(_) => "unknown_order_reference",
            PaymentError::NotFound(_) => "not_found",
            PaymentError::NotOwner => "not_owner",
            PaymentError::NotPending { .. } => "not_pending",
            PaymentError::ReservationExpired => "reservation_expired",
            PaymentError::AmountMismatch { .. } => "amount_mismatch",
            PaymentError::NothingToRefund => "nothing_to_refund",
            PaymentError::Ledger(e) => e.kind(),
        }
    }
}

/// Result type for payment operations
pub type PaymentResult<T> = Result<T, PaymentError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_balance_surfaces_through_ledger() {
        let err = PaymentError::Ledger(LedgerError::InsufficientBalance {
            available: 2000,
            required: 3000,
        });
        assert_eq!(err.kind(), "insufficient_balance");
        assert!(err.client_message().contains("2000"));
    }

    #[test]
    fn test_expired_and_unavailable_are_distinct() {
        assert_eq!(PaymentError::ReservationExpired.kind(), "reservation_expired");
        assert_eq!(
            PaymentError::NotPending {
                status: ReservationStatus::Cancelled
            }
            .kind(),
            "not_pending"
        );
    }
}
