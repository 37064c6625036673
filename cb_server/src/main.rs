//! Courtbook reservation server.
//!
//! Boots the database pool, constructs the domain managers, spawns the
//! sweeper task, and serves the HTTP API with graceful shutdown.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use anyhow::Error;
use cb_server::api::rate_limiter::RateLimiter;
use cb_server::{api, config::ServerConfig, logging, metrics, sweep};
use courtbook::db::{Database, PgCourtRepository};
use courtbook::{
    LedgerManager, PaymentService, PricingResolver, ReservationManager, Sweeper, WebhookVerifier,
};
use pico_args::Arguments;
use tracing::info;

const HELP: &str = "\
Run the courtbook reservation server

USAGE:
  cb_server [OPTIONS]

OPTIONS:
  --bind           IP:PORT   Server socket bind address    [default: env SERVER_BIND or 127.0.0.1:8080]
  --db-url         URL       Database connection string    [default: env DATABASE_URL]
  --sweep-interval SECS      Seconds between sweep passes  [default: env SWEEP_INTERVAL_SECS or 60]

FLAGS:
  -h, --help                 Print help information

ENVIRONMENT:
  SERVER_BIND                Server bind address (e.g., 0.0.0.0:8080)
  METRICS_BIND               Prometheus exporter bind address (optional)
  DATABASE_URL               PostgreSQL connection string
  GATEWAY_WEBHOOK_SECRET     Shared webhook signing secret (required)
  RESERVATION_HOLD_MINUTES   Hold window for PENDING reservations
  CHECKIN_TOLERANCE_MINUTES  Early check-in margin
  NO_SHOW_GRACE_MINUTES      Grace after end time before no-show
  ASYNC_SETTLEMENT_GRACE_HOURS  Extra hold for bank transfer / on-site
  (See .env.example for all configuration options)
";

struct Args {
    bind: Option<SocketAddr>,
    database_url: Option<String>,
    sweep_interval: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        database_url: pargs.opt_value_from_str("--db-url")?,
        sweep_interval: pargs.opt_value_from_str("--sweep-interval")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.database_url, args.sweep_interval)
        .map_err(|e| anyhow::anyhow!("Configuration error: {e}"))?;
    config.validate()?;

    info!("Starting courtbook server at {}", config.bind);

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind)
            .map_err(|e| anyhow::anyhow!("Metrics exporter error: {e}"))?;
        info!("Prometheus metrics exposed at http://{metrics_bind}/metrics");
    }

    // Initialize database
    info!("Connecting to database");
    let db = Database::new(&config.database)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to connect to database: {e}"))?;
    info!("Database connected successfully");

    // Construct managers; every dependency is passed in explicitly
    let pool = Arc::new(db.pool().clone());
    let courts = Arc::new(PgCourtRepository::new(pool.clone()));
    let pricing = PricingResolver::new(pool.clone(), &config.reservation);
    let reservations = Arc::new(ReservationManager::new(
        pool.clone(),
        courts.clone(),
        pricing,
        config.reservation.clone(),
    ));
    let payments = Arc::new(PaymentService::new(
        pool.clone(),
        WebhookVerifier::new(config.gateway.webhook_secret.clone()),
    ));
    let ledger = Arc::new(LedgerManager::new(pool.clone()));

    // Periodic auto-expiry / no-show / auto-complete passes
    let sweeper = Sweeper::new(pool.clone(), config.reservation.clone());
    let sweep_handle = sweep::spawn_sweeper(sweeper, config.sweep_interval_secs);
    info!(
        "Sweeper running every {} second(s)",
        config.sweep_interval_secs
    );

    let state = api::AppState {
        reservations,
        payments,
        ledger,
        courts,
        pool,
        webhook_limiter: Arc::new(Mutex::new(RateLimiter::webhook())),
    };

    let app = api::create_router(state);

    info!("Starting HTTP server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {e}", config.bind))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {e}"))?;

    sweep_handle.abort();
    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
