//! Reservation data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, postgres::PgRow};

/// Court ID type
pub type CourtId = i64;

/// User ID type
pub type UserId = i64;

/// Reservation ID type
pub type ReservationId = i64;

/// A bookable court and its operating window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Court {
    pub id: CourtId,
    pub name: String,
    pub sport: String,
    /// First bookable hour of the day (UTC)
    pub open_hour: i16,
    /// Hour at which the court closes (UTC); bookings must end by then
    pub close_hour: i16,
    pub is_active: bool,
}

/// Reservation lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReservationStatus {
    Pending,
    Paid,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
}

impl ReservationStatus {
    /// Database/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "PENDING",
            ReservationStatus::Paid => "PAID",
            ReservationStatus::InProgress => "IN_PROGRESS",
            ReservationStatus::Completed => "COMPLETED",
            ReservationStatus::Cancelled => "CANCELLED",
            ReservationStatus::NoShow => "NO_SHOW",
        }
    }

    /// Parse the database representation
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReservationStatus::Pending),
            "PAID" => Some(ReservationStatus::Paid),
            "IN_PROGRESS" => Some(ReservationStatus::InProgress),
            "COMPLETED" => Some(ReservationStatus::Completed),
            "CANCELLED" => Some(ReservationStatus::Cancelled),
            "NO_SHOW" => Some(ReservationStatus::NoShow),
            _ => None,
        }
    }

    /// Terminal states accept no further transitions
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ReservationStatus::Completed | ReservationStatus::Cancelled | ReservationStatus::NoShow
        )
    }

    /// Non-terminal states hold the court slot for overlap purposes
    pub fn holds_slot(&self) -> bool {
        !self.is_terminal()
    }
}

impl std::fmt::Display for ReservationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payment axis, independent of the lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Paid => "PAID",
            PaymentStatus::Refunded => "REFUNDED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(PaymentStatus::Pending),
            "PAID" => Some(PaymentStatus::Paid),
            "REFUNDED" => Some(PaymentStatus::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the reservation is (to be) paid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    /// Online card payment settled by the gateway webhook
    Gateway,
    /// Wallet credits debited at booking time
    Credits,
    BankTransfer,
    OnSite,
    /// Staff-granted free booking
    Courtesy,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Gateway => "GATEWAY",
            PaymentMethod::Credits => "CREDITS",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::OnSite => "ON_SITE",
            PaymentMethod::Courtesy => "COURTESY",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "GATEWAY" => Some(PaymentMethod::Gateway),
            "CREDITS" => Some(PaymentMethod::Credits),
            "BANK_TRANSFER" => Some(PaymentMethod::BankTransfer),
            "ON_SITE" => Some(PaymentMethod::OnSite),
            "COURTESY" => Some(PaymentMethod::Courtesy),
            _ => None,
        }
    }

    /// Methods that settle outside the synchronous payment flow get an
    /// extended hold before auto-expiry.
    pub fn is_async_settlement(&self) -> bool {
        matches!(
            self,
            PaymentMethod::BankTransfer | PaymentMethod::OnSite | PaymentMethod::Courtesy
        )
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reservation model, one row per time-slot claim on a court
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub court_id: CourtId,
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub total_price_cents: i64,
    pub status: ReservationStatus,
    pub payment_status: PaymentStatus,
    pub payment_method: PaymentMethod,
    pub check_in_time: Option<DateTime<Utc>>,
    pub check_out_time: Option<DateTime<Utc>>,
    /// Set only while PENDING; cleared on payment
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    /// Map a full reservation row. Returns `None` when a status column
    /// holds a value outside the known enumerations.
    pub(crate) fn from_row(row: &PgRow) -> Option<Self> {
        let status = ReservationStatus::parse(&row.get::<String, _>("status"))?;
        let payment_status = PaymentStatus::parse(&row.get::<String, _>("payment_status"))?;
        let payment_method = PaymentMethod::parse(&row.get::<String, _>("payment_method"))?;

        Some(Reservation {
            id: row.get("id"),
            court_id: row.get("court_id"),
            user_id: row.get("user_id"),
            start_time: row.get::<chrono::NaiveDateTime, _>("start_time").and_utc(),
            end_time: row.get::<chrono::NaiveDateTime, _>("end_time").and_utc(),
            total_price_cents: row.get("total_price_cents"),
            status,
            payment_status,
            payment_method,
            check_in_time: row
                .get::<Option<chrono::NaiveDateTime>, _>("check_in_time")
                .map(|dt| dt.and_utc()),
            check_out_time: row
                .get::<Option<chrono::NaiveDateTime>, _>("check_out_time")
                .map(|dt| dt.and_utc()),
            expires_at: row
                .get::<Option<chrono::NaiveDateTime>, _>("expires_at")
                .map(|dt| dt.and_utc()),
            notes: row.get("notes"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }
}

/// Request to create a reservation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReservation {
    pub court_id: CourtId,
    pub user_id: UserId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub payment_method: PaymentMethod,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            ReservationStatus::Pending,
            ReservationStatus::Paid,
            ReservationStatus::InProgress,
            ReservationStatus::Completed,
            ReservationStatus::Cancelled,
            ReservationStatus::NoShow,
        ] {
            assert_eq!(ReservationStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ReservationStatus::parse("UNKNOWN"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ReservationStatus::Completed.is_terminal());
        assert!(ReservationStatus::Cancelled.is_terminal());
        assert!(ReservationStatus::NoShow.is_terminal());
        assert!(!ReservationStatus::Pending.is_terminal());
        assert!(!ReservationStatus::Paid.is_terminal());
        assert!(!ReservationStatus::InProgress.is_terminal());
    }

    #[test]
    fn test_slot_holding_states() {
        assert!(ReservationStatus::Pending.holds_slot());
        assert!(ReservationStatus::Paid.holds_slot());
        assert!(ReservationStatus::InProgress.holds_slot());
        assert!(!ReservationStatus::Cancelled.holds_slot());
    }

    #[test]
    fn test_async_settlement_methods() {
        assert!(PaymentMethod::BankTransfer.is_async_settlement());
        assert!(PaymentMethod::OnSite.is_async_settlement());
        assert!(PaymentMethod::Courtesy.is_async_settlement());
        assert!(!PaymentMethod::Gateway.is_async_settlement());
        assert!(!PaymentMethod::Credits.is_async_settlement());
    }

    #[test]
    fn test_payment_method_round_trip() {
        for method in [
            PaymentMethod::Gateway,
            PaymentMethod::Credits,
            PaymentMethod::BankTransfer,
            PaymentMethod::OnSite,
            PaymentMethod::Courtesy,
        ] {
            assert_eq!(PaymentMethod::parse(method.as_str()), Some(method));
        }
    }
}
