//! Wallet API handlers.
//!
//! Balance lookup and ledger listing for customers, plus the staff
//! credit-adjustment endpoint used by the back office.
//!
//! # Examples
//!
//! Ledger listing:
//! ```bash
//! curl http://localhost:8080/api/v1/wallet/ledger -H "x-user-id: 42"
//! ```
//!
//! Staff adjustment:
//! ```bash
//! curl -X POST http://localhost:8080/api/v1/wallet/adjust \
//!   -H "x-staff-id: 3" \
//!   -H "Content-Type: application/json" \
//!   -d '{"user_id": 42, "entry_type": "CREDIT", "amount_cents": 5000,
//!        "reason": "ADJUST", "idempotency_key": "grant-2026-08-42"}'
//! ```

use axum::{
    Json,
    extract::{Extension, Query, State},
};
use courtbook::ledger::{EntryType, LedgerEntry, NewEntry, Wallet};
use serde::Deserialize;
use serde_json::json;

use super::AppState;
use super::error::{ApiError, ledger_error};
use super::middleware::StaffId;

#[derive(Debug, Deserialize)]
pub struct LedgerQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub user_id: i64,
    pub entry_type: EntryType,
    pub amount_cents: i64,
    pub reason: String,
    pub idempotency_key: Option<String>,
    /// Permit a debit to drive the balance negative
    #[serde(default)]
    pub allow_negative: bool,
}

/// Get the caller's wallet balance.
///
/// # Errors
///
/// - `404 Not Found`: no wallet yet (first credit creates it)
pub async fn get_wallet(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
) -> Result<Json<Wallet>, ApiError> {
    state
        .ledger
        .get_wallet(user_id)
        .await
        .map(Json)
        .map_err(|e| ledger_error(&e))
}

/// List the caller's ledger entries, newest first.
pub async fn list_ledger(
    State(state): State<AppState>,
    Extension(user_id): Extension<i64>,
    Query(query): Query<LedgerQuery>,
) -> Result<Json<Vec<LedgerEntry>>, ApiError> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);

    state
        .ledger
        .entries(user_id, limit)
        .await
        .map(Json)
        .map_err(|e| ledger_error(&e))
}

/// Adjust a user's credit balance (back office).
///
/// Supplying an idempotency key makes the call retry-safe: a replay
/// returns the original entry without re-applying the mutation.
///
/// # Errors
///
/// - `400 Bad Request`: non-positive amount
/// - `402 Payment Required`: debit exceeds the balance and
///   `allow_negative` is not set
pub async fn adjust_credits(
    State(state): State<AppState>,
    Extension(staff): Extension<StaffId>,
    Json(request): Json<AdjustRequest>,
) -> Result<Json<LedgerEntry>, ApiError> {
    let entry = state
        .ledger
        .adjust(NewEntry {
            user_id: request.user_id,
            entry_type: request.entry_type,
            amount_cents: request.amount_cents,
            reason: request.reason,
            idempotency_key: request.idempotency_key,
            metadata: json!({ "actor": staff.actor() }),
            allow_negative: request.allow_negative,
        })
        .await
        .map_err(|e| ledger_error(&e))?;

    Ok(Json(entry))
}
