//! Reservation error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::ReservationStatus;
use crate::pricing::PricingError;

/// Reservation errors
#[derive(Debug, Error)]
pub enum ReservationError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Reservation not found
    #[error("Reservation {0} not found")]
    NotFound(i64),

    /// Court not found or inactive
    #[error("Court {0} not found")]
    CourtNotFound(i64),

    /// Requested time window is malformed or outside operating hours
    #[error("Invalid booking window: {0}")]
    InvalidWindow(String),

    /// Another non-terminal reservation already claims the slot
    #[error("Court {court_id} is already booked between {start} and {end}")]
    SlotUnavailable {
        court_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Check-in attempted outside the allowed window
    #[error("Check-in window is [start - {tolerance_minutes}min, end]; not open at {at}")]
    OutsideWindow {
        at: DateTime<Utc>,
        tolerance_minutes: i64,
    },

    /// Check-in attempted before payment settled
    #[error("Reservation is awaiting payment")]
    NotPaid,

    /// Check-in attempted twice
    #[error("Reservation is already in progress")]
    AlreadyStarted,

    /// Operation attempted on a reservation in a terminal state
    #[error("Reservation already finalized as {status}")]
    AlreadyCompleted { status: ReservationStatus },

    /// Check-out attempted on a reservation that is not in progress
    #[error("Reservation is not in progress")]
    NotInProgress,

    /// Pricing failure at creation time
    #[error(transparent)]
    Pricing(#[from] PricingError),

    /// Refund failure while cancelling a paid reservation
    #[error(transparent)]
    Refund(#[from] crate::payments::PaymentError),

    /// A persisted status column holds an unknown value
    #[error("Corrupt reservation row {0}")]
    CorruptRow(i64),
}

impl ReservationError {
    /// Get a client-safe error message that doesn't leak internals
    pub fn client_message(&self) -> String {
        match self {
            ReservationError::Database(_) | ReservationError::CorruptRow(_) => {
                "Internal server error".to_string()
            }
            ReservationError::Pricing(e) => e.client_message(),
            ReservationError::Refund(e) => e.client_message(),
            _ => self.to_string(),
        }
    }

    /// Machine-readable error kind for the HTTP surface
    pub fn kind(&self) -> &'static str {
        match self {
            ReservationError::Database(_) => "database",
            ReservationError::NotFound(_) => "not_found",
            ReservationError::CourtNotFound(_) => "court_not_found",
            ReservationError::InvalidWindow(_) => "invalid_window",
            ReservationError::SlotUnavailable { .. } => "slot_unavailable",
            ReservationError::OutsideWindow { .. } => "outside_window",
            ReservationError::NotPaid => "not_paid",
            ReservationError::AlreadyStarted => "already_started",
            ReservationError::AlreadyCompleted { .. } => "already_completed",
            ReservationError::NotInProgress => "not_in_progress",
            ReservationError::Pricing(e) => e.kind(),
            ReservationError::Refund(e) => e.kind(),
            ReservationError::CorruptRow(_) => "internal",
        }
    }
}

/// Result type for reservation operations
pub type ReservationResult<T> = Result<T, ReservationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_error_sanitized() {
        let err = ReservationError::Database(sqlx::Error::PoolClosed);
        assert_eq!(err.client_message(), "Internal server error");
    }

    #[test]
    fn test_conflict_messages_pass_through() {
        let err = ReservationError::NotInProgress;
        assert_eq!(err.client_message(), "Reservation is not in progress");
        assert_eq!(err.kind(), "not_in_progress");
    }

    #[test]
    fn test_already_completed_names_state() {
        let err = ReservationError::AlreadyCompleted {
            status: ReservationStatus::NoShow,
        };
        assert!(err.to_string().contains("NO_SHOW"));
    }
}
