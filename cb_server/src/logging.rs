//! Structured logging configuration.
//!
//! This module provides structured logging with request correlation and
//! configurable log levels via the `RUST_LOG` environment variable.
//! `log` records emitted by the courtbook library are captured by the
//! same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Features:
/// - Request ID correlation
/// - Configurable log levels via RUST_LOG env var
/// - Captures `log`-based records from library crates
///
/// # Example
///
/// ```no_run
/// use cb_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user_id` - Optional user ID
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use cb_server::logging::log_security_event;
///
/// log_security_event("webhook_signature_mismatch", None, "Rejected delivery");
/// ```
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_security_event() {
        // Just ensure it doesn't panic
        log_security_event("test_event", Some(1), "Test message");
    }
}
