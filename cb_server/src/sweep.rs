//! Periodic sweeper task.
//!
//! Drives the library's stateless sweep passes on a fixed interval. The
//! task never exits on its own; per-row failures are already isolated
//! inside the sweeper, and a wholesale failure is just logged and retried
//! on the next tick.

use courtbook::Sweeper;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::debug;

use crate::metrics;

/// Spawn the sweep loop on the given interval.
pub fn spawn_sweeper(sweeper: Sweeper, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let report = sweeper.run_once().await;

            metrics::sweep_transitions(report.expired, report.no_shows, report.auto_completed);
            if report.failures > 0 {
                metrics::sweep_failures_total(report.failures);
            }

            debug!(
                expired = report.expired,
                no_shows = report.no_shows,
                auto_completed = report.auto_completed,
                failures = report.failures,
                "sweep tick complete"
            );
        }
    })
}
