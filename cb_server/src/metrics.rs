//! Prometheus metrics for monitoring reservation and payment activity.
//!
//! This module provides metrics collection and export via a dedicated
//! scrape endpoint. Metrics are exposed in Prometheus text format.
//!
//! # Metrics Categories
//!
//! - **Reservation Metrics**: creations, transitions, conflicts
//! - **Payment Metrics**: settlements, failures, refunds
//! - **Webhook Metrics**: deliveries by outcome, signature rejections
//! - **Sweeper Metrics**: transitions per pass, failures

#![allow(dead_code)] // Public API for future integration

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Sets up a Prometheus scrape endpoint on the specified address.
/// Metrics will be available at `http://<addr>/metrics`.
///
/// # Arguments
///
/// - `addr`: Address to bind the metrics server to (e.g., `0.0.0.0:9090`)
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// Reservation Metrics
// ============================================================================

/// Increment reservations created counter.
pub fn reservations_created_total(payment_method: &str) {
    metrics::counter!("reservations_created_total",
        "payment_method" => payment_method.to_string()
    )
    .increment(1);
}

/// Increment slot conflict counter (booking attempts that lost the slot).
pub fn reservation_conflicts_total() {
    metrics::counter!("reservation_conflicts_total").increment(1);
}

/// Increment reservation transition counter.
pub fn reservation_transitions_total(to_status: &str) {
    metrics::counter!("reservation_transitions_total",
        "to_status" => to_status.to_string()
    )
    .increment(1);
}

// ============================================================================
// Payment Metrics
// ============================================================================

/// Increment settled payments counter.
pub fn payments_settled_total(method: &str) {
    metrics::counter!("payments_settled_total",
        "method" => method.to_string()
    )
    .increment(1);
}

/// Increment refunds counter.
pub fn refunds_total() {
    metrics::counter!("refunds_total").increment(1);
}

/// Record settled payment amount distribution.
pub fn payment_amount_cents(amount: i64) {
    metrics::histogram!("payment_amount_cents").record(amount as f64);
}

// ============================================================================
// Webhook Metrics
// ============================================================================

/// Increment webhook deliveries counter by disposition.
pub fn webhook_deliveries_total(disposition: &str) {
    metrics::counter!("webhook_deliveries_total",
        "disposition" => disposition.to_string()
    )
    .increment(1);
}

/// Increment rejected webhook signatures counter.
pub fn webhook_signature_rejections_total() {
    metrics::counter!("webhook_signature_rejections_total").increment(1);
}

// ============================================================================
// Sweeper Metrics
// ============================================================================

/// Record a sweep invocation's transition counts.
pub fn sweep_transitions(expired: usize, no_shows: usize, auto_completed: usize) {
    metrics::counter!("sweep_expired_total").increment(expired as u64);
    metrics::counter!("sweep_no_shows_total").increment(no_shows as u64);
    metrics::counter!("sweep_auto_completed_total").increment(auto_completed as u64);
}

/// Increment sweeper per-row failure counter.
pub fn sweep_failures_total(count: usize) {
    metrics::counter!("sweep_failures_total").increment(count as u64);
}

// ============================================================================
// HTTP Metrics
// ============================================================================

/// Record HTTP request.
pub fn http_requests_total(method: &str, path: &str, status: u16) {
    metrics::counter!("http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record database connection pool size.
pub fn db_connections_active(count: u32) {
    metrics::gauge!("db_connections_active").set(count as f64);
}
