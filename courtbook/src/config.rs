//! Booking timing configuration.
//!
//! The hold window, check-in tolerance, and grace periods are named
//! parameters rather than hard-coded constants; every duration can be
//! overridden through the environment.

use chrono::Duration;

/// Timing parameters for the reservation lifecycle
#[derive(Debug, Clone)]
pub struct ReservationConfig {
    /// Minutes a PENDING reservation holds its slot before auto-expiry
    pub hold_minutes: i64,

    /// Allowed early check-in margin before start time, in minutes
    pub checkin_tolerance_minutes: i64,

    /// Minutes after end time before a never-checked-in booking becomes a no-show
    pub no_show_grace_minutes: i64,

    /// Extra hours granted to asynchronous-settlement payment methods
    /// (bank transfer, on-site, courtesy) before their hold expires
    pub async_settlement_grace_hours: i64,

    /// Hour of day (UTC) at which the night rate starts applying
    pub night_start_hour: u32,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            hold_minutes: 15,
            checkin_tolerance_minutes: 30,
            no_show_grace_minutes: 15,
            async_settlement_grace_hours: 24,
            night_start_hour: 18,
        }
    }
}

impl ReservationConfig {
    /// Load configuration from environment variables
    ///
    /// Expected environment variables (all optional):
    /// - `RESERVATION_HOLD_MINUTES`: hold window (default: 15)
    /// - `CHECKIN_TOLERANCE_MINUTES`: early check-in margin (default: 30)
    /// - `NO_SHOW_GRACE_MINUTES`: no-show grace after end time (default: 15)
    /// - `ASYNC_SETTLEMENT_GRACE_HOURS`: extra hold for asynchronous
    ///   payment methods (default: 24)
    /// - `NIGHT_RATE_START_HOUR`: night tariff boundary, UTC hour (default: 18)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            hold_minutes: parse_env_or("RESERVATION_HOLD_MINUTES", defaults.hold_minutes),
            checkin_tolerance_minutes: parse_env_or(
                "CHECKIN_TOLERANCE_MINUTES",
                defaults.checkin_tolerance_minutes,
            ),
            no_show_grace_minutes: parse_env_or(
                "NO_SHOW_GRACE_MINUTES",
                defaults.no_show_grace_minutes,
            ),
            async_settlement_grace_hours: parse_env_or(
                "ASYNC_SETTLEMENT_GRACE_HOURS",
                defaults.async_settlement_grace_hours,
            ),
            night_start_hour: parse_env_or("NIGHT_RATE_START_HOUR", defaults.night_start_hour),
        }
    }

    /// Hold window as a duration
    pub fn hold_window(&self) -> Duration {
        Duration::minutes(self.hold_minutes)
    }

    /// Check-in tolerance as a duration
    pub fn checkin_tolerance(&self) -> Duration {
        Duration::minutes(self.checkin_tolerance_minutes)
    }

    /// No-show grace as a duration
    pub fn no_show_grace(&self) -> Duration {
        Duration::minutes(self.no_show_grace_minutes)
    }

    /// Extra grace for asynchronous-settlement methods as a duration
    pub fn async_settlement_grace(&self) -> Duration {
        Duration::hours(self.async_settlement_grace_hours)
    }
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReservationConfig::default();
        assert_eq!(config.hold_minutes, 15);
        assert_eq!(config.checkin_tolerance_minutes, 30);
        assert_eq!(config.no_show_grace_minutes, 15);
        assert_eq!(config.async_settlement_grace_hours, 24);
        assert_eq!(config.night_start_hour, 18);
    }

    #[test]
    fn test_duration_accessors() {
        let config = ReservationConfig::default();
        assert_eq!(config.hold_window(), Duration::minutes(15));
        assert_eq!(config.checkin_tolerance(), Duration::minutes(30));
        assert_eq!(config.no_show_grace(), Duration::minutes(15));
        assert_eq!(config.async_settlement_grace(), Duration::hours(24));
    }
}
