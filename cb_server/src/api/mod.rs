//! HTTP API for the courtbook reservation platform.
//!
//! This module provides the REST surface consumed by the public site and
//! the admin back office. Authentication itself lives in the upstream
//! proxy; requests arrive with the caller's identity in trusted headers
//! (see [`middleware`]).
//!
//! # Modules
//!
//! - [`reservations`]: booking create/cancel/check-in/check-out/payment
//! - [`wallet`]: balance, ledger listing, staff credit adjustments
//! - [`webhook`]: payment gateway webhook receiver
//! - [`middleware`]: identity extraction for user and staff endpoints
//! - [`request_id`]: request ID correlation
//! - [`rate_limiter`]: sliding-window limiter for abuse-prone endpoints
//!
//! # Endpoints Overview
//!
//! ```text
//! GET  /health                                   - Health check (public)
//! POST /webhooks/payment                         - Gateway webhook (signed)
//! GET  /api/v1/courts                            - List courts (public)
//! POST /api/v1/reservations                      - Create booking (user)
//! GET  /api/v1/reservations                      - List own bookings (user)
//! GET  /api/v1/reservations/{id}                 - Fetch booking (user)
//! POST /api/v1/reservations/{id}/cancel          - Cancel booking (user)
//! POST /api/v1/reservations/{id}/pay-with-credits - Wallet payment (user)
//! POST /api/v1/reservations/{id}/check-in        - Check in (staff)
//! POST /api/v1/reservations/{id}/check-out       - Check out (staff)
//! GET  /api/v1/wallet                            - Balance (user)
//! GET  /api/v1/wallet/ledger                     - Ledger listing (user)
//! POST /api/v1/wallet/adjust                     - Credit adjustment (staff)
//! ```

pub mod error;
pub mod middleware;
pub mod rate_limiter;
pub mod request_id;
pub mod reservations;
pub mod wallet;
pub mod webhook;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use courtbook::db::CourtRepository;
use courtbook::{LedgerManager, PaymentService, ReservationManager};
use serde_json::json;
use sqlx::PgPool;
use std::sync::{Arc, Mutex};
use tower_http::cors::CorsLayer;

use rate_limiter::RateLimiter;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request (cheap due to Arc wrappers); every manager receives
/// its database handle at construction, there are no ambient singletons.
#[derive(Clone)]
pub struct AppState {
    pub reservations: Arc<ReservationManager>,
    pub payments: Arc<PaymentService>,
    pub ledger: Arc<LedgerManager>,
    pub courts: Arc<dyn CourtRepository>,
    pub pool: Arc<PgPool>,
    /// Shared limiter for the webhook receiver
    pub webhook_limiter: Arc<Mutex<RateLimiter>>,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Arguments
///
/// - `state`: Application state with managers
///
/// # Returns
///
/// Configured Axum router ready to serve requests
pub fn create_router(state: AppState) -> Router {
    // API v1 routes (versioned for future evolution)
    let v1_routes = create_v1_router(state.clone());

    // Root routes (health check, webhook receiver - not versioned)
    let root_routes = Router::new()
        .route("/health", get(health_check))
        // The webhook authenticates with its signature, not identity headers
        .route("/webhooks/payment", post(webhook::payment_webhook));

    Router::new()
        .merge(root_routes)
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create API v1 router with all versioned endpoints.
fn create_v1_router(state: AppState) -> Router<AppState> {
    // Public routes (no identity required)
    let public_routes = Router::new().route("/courts", get(reservations::list_courts));

    // Customer routes (user identity required)
    let user_routes = Router::new()
        .route("/reservations", post(reservations::create_reservation))
        .route("/reservations", get(reservations::list_reservations))
        .route("/reservations/{reservation_id}", get(reservations::get_reservation))
        .route(
            "/reservations/{reservation_id}/cancel",
            post(reservations::cancel_reservation),
        )
        .route(
            "/reservations/{reservation_id}/pay-with-credits",
            post(reservations::pay_with_credits),
        )
        .route("/wallet", get(wallet::get_wallet))
        .route("/wallet/ledger", get(wallet::list_ledger))
        .layer(axum::middleware::from_fn(middleware::require_user));

    // Back-office routes (staff identity required)
    let staff_routes = Router::new()
        .route(
            "/reservations/{reservation_id}/check-in",
            post(reservations::check_in),
        )
        .route(
            "/reservations/{reservation_id}/check-out",
            post(reservations::check_out),
        )
        .route("/wallet/adjust", post(wallet::adjust_credits))
        .layer(axum::middleware::from_fn(middleware::require_staff));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .merge(staff_routes)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Checks database connectivity and returns JSON with detailed status.
/// Returns `200 OK` when healthy, `503 Service Unavailable` otherwise.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","database":true,"timestamp":"2026-08-06T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let db_healthy = sqlx::query("SELECT 1")
        .fetch_one(&*state.pool)
        .await
        .is_ok();

    let status_code = if db_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let response = json!({
        "status": if db_healthy { "healthy" } else { "unhealthy" },
        "version": env!("CARGO_PKG_VERSION"),
        "database": db_healthy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    (status_code, Json(response))
}
