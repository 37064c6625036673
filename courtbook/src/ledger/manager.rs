//! Ledger manager implementation with append-only entries and idempotent retries.

use super::{
    errors::{LedgerError, LedgerResult},
    models::{EntryType, LedgerEntry, Wallet},
};
use serde_json::json;
use sqlx::{PgPool, Postgres, Row, Transaction};
use std::sync::Arc;

use crate::outbox::{self, event_type};

/// Parameters for a single ledger mutation
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub user_id: i64,
    pub entry_type: EntryType,
    pub amount_cents: i64,
    pub reason: String,
    pub idempotency_key: Option<String>,
    pub metadata: serde_json::Value,
    /// Staff override: permit a debit to drive the balance negative
    pub allow_negative: bool,
}

/// Ledger manager
#[derive(Clone)]
pub struct LedgerManager {
    pool: Arc<PgPool>,
}

impl LedgerManager {
    /// Create a new ledger manager
    ///
    /// # Arguments
    ///
    /// * `pool` - Database connection pool
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Get wallet balance for a user
    ///
    /// # Errors
    ///
    /// * `LedgerError::WalletNotFound` - No wallet row exists yet
    pub async fn get_wallet(&self, user_id: i64) -> LedgerResult<Wallet> {
        let row = sqlx::query(
            r#"
            SELECT user_id, balance_cents, created_at, updated_at
            FROM wallets
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or(LedgerError::WalletNotFound(user_id))?;

        Ok(Wallet {
            user_id: row.get("user_id"),
            balance_cents: row.get("balance_cents"),
            created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
            updated_at: row.get::<chrono::NaiveDateTime, _>("updated_at").and_utc(),
        })
    }

    /// Apply a generic credit adjustment (staff flow)
    ///
    /// When `entry.idempotency_key` is supplied and an entry with that key
    /// already exists, the existing entry is returned unchanged instead of
    /// re-applying the mutation.
    ///
    /// # Errors
    ///
    /// * `LedgerError::InsufficientBalance` - Debit would drive the balance
    ///   negative and the override flag is not set
    /// * `LedgerError::InvalidAmount` - Amount is zero or negative
    pub async fn adjust(&self, entry: NewEntry) -> LedgerResult<LedgerEntry> {
        let mut tx = self.pool.begin().await?;

        // Replay: return the original entry without re-emitting its event
        if let Some(key) = &entry.idempotency_key {
            if let Some(existing) = find_by_key(&mut tx, key).await? {
                return Ok(existing);
            }
        }

        let applied = apply_entry(&mut tx, entry).await?;

        outbox::emit(
            &mut tx,
            event_type::CREDITS_ADJUSTED,
            json!({
                "entry_id": applied.id,
                "user_id": applied.user_id,
                "entry_type": applied.entry_type,
                "amount_cents": applied.amount_cents,
                "balance_after_cents": applied.balance_after_cents,
                "reason": applied.reason,
            }),
        )
        .await?;

        tx.commit().await?;
        Ok(applied)
    }

    /// Get ledger entries for a user, newest first
    pub async fn entries(&self, user_id: i64, limit: i64) -> LedgerResult<Vec<LedgerEntry>> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, entry_type, reason, amount_cents, balance_after_cents,
                   idempotency_key, metadata, created_at
            FROM wallet_ledger
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.iter()
            .map(|row| {
                LedgerEntry::from_row(row).ok_or_else(|| LedgerError::CorruptRow(row.get("id")))
            })
            .collect()
    }
}

/// Look up a ledger entry by idempotency key inside a transaction.
pub(crate) async fn find_by_key(
    tx: &mut Transaction<'_, Postgres>,
    key: &str,
) -> LedgerResult<Option<LedgerEntry>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, entry_type, reason, amount_cents, balance_after_cents,
               idempotency_key, metadata, created_at
        FROM wallet_ledger
        WHERE idempotency_key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(&mut **tx)
    .await?;

    match row {
        Some(row) => {
            let id: i64 = row.get("id");
            LedgerEntry::from_row(&row)
                .map(Some)
                .ok_or(LedgerError::CorruptRow(id))
        }
        None => Ok(None),
    }
}

/// Apply a ledger mutation inside an existing transaction.
///
/// The wallet balance and the ledger entry commit together or not at all;
/// callers compose this with reservation-state writes in the same
/// transaction.
pub(crate) async fn apply_entry(
    tx: &mut Transaction<'_, Postgres>,
    entry: NewEntry,
) -> LedgerResult<LedgerEntry> {
    if entry.amount_cents <= 0 {
        return Err(LedgerError::InvalidAmount(entry.amount_cents));
    }

    // Replayed key: return the original entry, apply nothing.
    if let Some(key) = &entry.idempotency_key {
        if let Some(existing) = find_by_key(tx, key).await? {
            return Ok(existing);
        }
    }

    // Wallets are created on first use.
    sqlx::query(
        "INSERT INTO wallets (user_id, balance_cents) VALUES ($1, 0)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(entry.user_id)
    .execute(&mut **tx)
    .await?;

    let new_balance = match entry.entry_type {
        EntryType::Credit => {
            // Row lock so the overflow check and the update see the same balance
            let row = sqlx::query(
                "SELECT balance_cents FROM wallets WHERE user_id = $1 FOR UPDATE",
            )
            .bind(entry.user_id)
            .fetch_one(&mut **tx)
            .await?;

            let current: i64 = row.get("balance_cents");
            let new_balance = current
                .checked_add(entry.amount_cents)
                .ok_or(LedgerError::BalanceOverflow)?;

            sqlx::query(
                "UPDATE wallets SET balance_cents = $1, updated_at = NOW() WHERE user_id = $2",
            )
            .bind(new_balance)
            .bind(entry.user_id)
            .execute(&mut **tx)
            .await?;

            new_balance
        }
        EntryType::Debit if entry.allow_negative => {
            let row = sqlx::query(
                "SELECT balance_cents FROM wallets WHERE user_id = $1 FOR UPDATE",
            )
            .bind(entry.user_id)
            .fetch_one(&mut **tx)
            .await?;

            let current: i64 = row.get("balance_cents");
            let new_balance = current
                .checked_sub(entry.amount_cents)
                .ok_or(LedgerError::BalanceOverflow)?;

            sqlx::query(
                "UPDATE wallets SET balance_cents = $1, updated_at = NOW() WHERE user_id = $2",
            )
            .bind(new_balance)
            .bind(entry.user_id)
            .execute(&mut **tx)
            .await?;

            new_balance
        }
        EntryType::Debit => {
            // Atomic conditional debit: the balance check and the update are
            // one statement, so concurrent debits cannot both pass the check.
            let debited = sqlx::query(
                "UPDATE wallets
                 SET balance_cents = balance_cents - $1, updated_at = NOW()
                 WHERE user_id = $2 AND balance_cents >= $1
                 RETURNING balance_cents",
            )
            .bind(entry.amount_cents)
            .bind(entry.user_id)
            .fetch_optional(&mut **tx)
            .await?;

            match debited {
                Some(row) => row.get("balance_cents"),
                None => {
                    let row = sqlx::query("SELECT balance_cents FROM wallets WHERE user_id = $1")
                        .bind(entry.user_id)
                        .fetch_one(&mut **tx)
                        .await?;
                    let available: i64 = row.get("balance_cents");
                    return Err(LedgerError::InsufficientBalance {
                        available,
                        required: entry.amount_cents,
                    });
                }
            }
        }
    };

    let row = sqlx::query(
        r#"
        INSERT INTO wallet_ledger
            (user_id, entry_type, reason, amount_cents, balance_after_cents,
             idempotency_key, metadata)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING id, created_at
        "#,
    )
    .bind(entry.user_id)
    .bind(entry.entry_type.as_str())
    .bind(&entry.reason)
    .bind(entry.amount_cents)
    .bind(new_balance)
    .bind(&entry.idempotency_key)
    .bind(&entry.metadata)
    .fetch_one(&mut **tx)
    .await?;

    Ok(LedgerEntry {
        id: row.get("id"),
        user_id: entry.user_id,
        entry_type: entry.entry_type,
        reason: entry.reason,
        amount_cents: entry.amount_cents,
        balance_after_cents: new_balance,
        idempotency_key: entry.idempotency_key,
        metadata: entry.metadata,
        created_at: row.get::<chrono::NaiveDateTime, _>("created_at").and_utc(),
    })
}
