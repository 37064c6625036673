//! Credits ledger providing wallet balances with an append-only entry log.
//!
//! This module implements:
//! - Append-only ledger entries with a `balance_after` snapshot per entry
//! - Idempotency keys: a retried mutation returns the original entry
//! - Atomic conditional debits (no negative balances without an explicit override)
//! - Wallet rows created lazily on first use
//!
//! ## Example
//!
//! ```no_run
//! use courtbook::ledger::{EntryType, LedgerManager, NewEntry, reason};
//! use courtbook::db::Database;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&Default::default()).await?;
//!     let ledger = LedgerManager::new(Arc::new(db.pool().clone()));
//!
//!     let entry = ledger
//!         .adjust(NewEntry {
//!             user_id: 1,
//!             entry_type: EntryType::Credit,
//!             amount_cents: 5000,
//!             reason: reason::ADJUST.to_string(),
//!             idempotency_key: Some("welcome-grant-1".to_string()),
//!             metadata: serde_json::json!({ "actor": "staff:7" }),
//!             allow_negative: false,
//!         })
//!         .await?;
//!     println!("Balance after grant: {}", entry.balance_after_cents);
//!
//!     Ok(())
//! }
//! ```

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{LedgerError, LedgerResult};
pub use manager::{LedgerManager, NewEntry};
pub use models::{EntryType, LedgerEntry, Wallet, reason};
