//! Ledger error types.

use thiserror::Error;

/// Ledger errors
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Wallet not found
    #[error("Wallet not found for user {0}")]
    WalletNotFound(i64),

    /// Insufficient balance for a debit
    #[error("Insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: i64, required: i64 },

    /// Invalid amount (must be positive)
    #[error("Invalid amount: {0}")]
    InvalidAmount(i64),

    /// Balance arithmetic would overflow
    #[error("Balance overflow")]
    BalanceOverflow,

    /// A persisted entry holds an unknown type value
    #[error("Corrupt ledger entry {0}")]
    CorruptRow(i64),
}

impl LedgerError {
    /// Get a client-safe error message that doesn't leak sensitive information
    pub fn client_message(&self) -> String {
        match self {
            LedgerError::Database(_) | LedgerError::CorruptRow(_) => {
                "Internal server error".to_string()
            }
            LedgerError::WalletNotFound(_) => "Wallet not found".to_string(),
            _ => self.to_string(),
        }
    }

    /// Machine-readable error kind for the HTTP surface
    pub fn kind(&self) -> &'static str {
        match self {
            LedgerError::Database(_) | LedgerError::CorruptRow(_) => "internal",
            LedgerError::WalletNotFound(_) => "wallet_not_found",
            LedgerError::InsufficientBalance { .. } => "insufficient_balance",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::BalanceOverflow => "balance_overflow",
        }
    }
}

/// Result type for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_not_found_redacts_user_id() {
        let err = LedgerError::WalletNotFound(42);
        assert_eq!(err.client_message(), "Wallet not found");
    }

    #[test]
    fn test_insufficient_balance_is_actionable() {
        let err = LedgerError::InsufficientBalance {
            available: 100,
            required: 250,
        };
        let msg = err.client_message();
        assert!(msg.contains("100"));
        assert!(msg.contains("250"));
        assert_eq!(err.kind(), "insufficient_balance");
    }
}
