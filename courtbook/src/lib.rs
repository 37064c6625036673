//! # Courtbook
//!
//! Reservation lifecycle and payment reconciliation core for a sports-center
//! platform.
//!
//! A court booking moves through a strict transition graph:
//!
//! - **PENDING**: created with a hold on the slot and an expiry deadline
//! - **PAID**: payment settled (gateway webhook or wallet debit)
//! - **IN_PROGRESS**: checked in within the tolerance window
//! - **COMPLETED**: checked out, or auto-completed after the end time
//! - **CANCELLED**: explicit cancel, hold expiry, or gateway abort
//! - **NO_SHOW**: never checked in and the grace period elapsed
//!
//! Correctness comes from the database, not from in-process locks: every
//! multi-step operation runs in a single transaction, contended rows are
//! locked before they are read, ledger mutations carry idempotency keys,
//! and a per-court advisory lock makes the overlap check atomic with the
//! insert.
//!
//! ## Core Modules
//!
//! - [`reservation`]: the state machine over court bookings
//! - [`payments`]: webhook settlement, wallet payments, refunds
//! - [`ledger`]: append-only credits ledger with balance snapshots
//! - [`pricing`]: base rates and tariff discount resolution
//! - [`sweeper`]: auto-expiry, no-show, and auto-complete passes
//! - [`outbox`]: transactional event log for downstream consumers
//! - [`db`]: connection pooling and repository traits
//!
//! ## Example
//!
//! ```no_run
//! use courtbook::config::ReservationConfig;
//! use courtbook::db::{Database, DatabaseConfig, PgCourtRepository};
//! use courtbook::pricing::PricingResolver;
//! use courtbook::reservation::ReservationManager;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::new(&DatabaseConfig::from_env()).await?;
//!     let pool = Arc::new(db.pool().clone());
//!     let config = ReservationConfig::from_env();
//!
//!     let manager = ReservationManager::new(
//!         pool.clone(),
//!         Arc::new(PgCourtRepository::new(pool.clone())),
//!         PricingResolver::new(pool.clone(), &config),
//!         config,
//!     );
//!     let _ = manager;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod db;
pub mod ledger;
pub mod outbox;
pub mod payments;
pub mod pricing;
pub mod reservation;
pub mod sweeper;

pub use config::ReservationConfig;
pub use ledger::LedgerManager;
pub use payments::{PaymentService, WebhookVerifier};
pub use pricing::PricingResolver;
pub use reservation::ReservationManager;
pub use sweeper::Sweeper;
