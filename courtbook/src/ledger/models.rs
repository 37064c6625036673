//! Wallet and ledger data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Row, postgres::PgRow};

/// Wallet model, one row per user holding the current balance snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub user_id: i64,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryType {
    Credit,
    Debit,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Credit => "CREDIT",
            EntryType::Debit => "DEBIT",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREDIT" => Some(EntryType::Credit),
            "DEBIT" => Some(EntryType::Debit),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Well-known business reasons recorded on ledger entries. The column is
/// free-form; these are the tags the core itself writes.
pub mod reason {
    /// Staff balance adjustment
    pub const ADJUST: &str = "ADJUST";
    /// Reversal of a reservation debit
    pub const REFUND: &str = "REFUND";
    /// Reservation paid with credits
    pub const RESERVATION: &str = "RESERVATION";
    /// Credit pack purchase settled externally
    pub const PURCHASE: &str = "PURCHASE";
}

/// Immutable ledger entry; corrections are new entries, never edits
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub user_id: i64,
    pub entry_type: EntryType,
    pub reason: String,
    pub amount_cents: i64,
    /// Balance immediately after this entry was applied
    pub balance_after_cents: i64,
    /// Unique when present; retried mutations with the same key return
    /// the original entry
    pub idempotency_key: Option<String>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Map a full ledger row. Returns `None` for an unknown entry type.
    pub(crate) fn from_row(row: &PgRow) -> Option<Self> {
        let entry_type = EntryType::parse(&row.get::<String, _>("entry_type"))?;

        Some(LedgerEntry {
            id: row.get("id"),
            user_id: row.get("user_id"),
            entry_type,
            reason: row.get("reason"),
            amount_cents: row.get("amount_cents"),
            balance_after_cents: row.get("balance_after_cents"),
            idempotency_key: row.get("idempotency_key"),
            metadata: row.get("metadata"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_type_round_trip() {
        assert_eq!(EntryType::parse("CREDIT"), Some(EntryType::Credit));
        assert_eq!(EntryType::parse("DEBIT"), Some(EntryType::Debit));
        assert_eq!(EntryType::parse("credit"), None);
        assert_eq!(EntryType::Credit.to_string(), "CREDIT");
    }
}
