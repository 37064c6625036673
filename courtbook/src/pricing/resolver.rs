//! Price resolution for reservation creation.

use chrono::{DateTime, Timelike, Utc};
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::{
    errors::{PricingError, PricingResult},
    models::{PriceQuote, Tariff, TimeOfDay, UserProfile, best_tariff},
};
use crate::config::ReservationConfig;
use crate::reservation::Court;

/// Pricing resolver
///
/// Computes the total price for a reservation window: base rate per
/// court/sport/time-of-day scaled by duration, reduced by the best
/// applicable tariff discount, floored at zero.
#[derive(Clone)]
pub struct PricingResolver {
    pool: Arc<PgPool>,
    night_start_hour: u32,
}

impl PricingResolver {
    /// Create a new pricing resolver
    pub fn new(pool: Arc<PgPool>, config: &ReservationConfig) -> Self {
        Self {
            pool,
            night_start_hour: config.night_start_hour,
        }
    }

    /// Resolve the price for a window on a court
    ///
    /// # Errors
    ///
    /// * `PricingError::NoPricingConfigured` - No base rate matches the
    ///   court/sport/time-of-day combination
    pub async fn resolve(
        &self,
        court: &Court,
        user_id: i64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> PricingResult<PriceQuote> {
        let time_of_day = TimeOfDay::from_hour(start.hour(), self.night_start_hour);

        let rate = sqlx::query(
            "SELECT price_cents_per_hour FROM court_rates
             WHERE court_id = $1 AND sport = $2 AND time_of_day = $3",
        )
        .bind(court.id)
        .bind(&court.sport)
        .bind(time_of_day.as_str())
        .fetch_optional(self.pool.as_ref())
        .await?
        .ok_or_else(|| PricingError::NoPricingConfigured {
            court_id: court.id,
            sport: court.sport.clone(),
            time_of_day: time_of_day.to_string(),
        })?;

        let price_per_hour: i64 = rate.get("price_cents_per_hour");
        let minutes = (end - start).num_minutes();
        let base_cents = price_per_hour * minutes / 60;

        let profile = self.load_profile(user_id).await?;
        let tariffs = self.applicable_tariffs(user_id, court.id).await?;

        let reference_date = start.date_naive();
        let best = best_tariff(&tariffs, &profile, reference_date);

        let (discount_percent, tariff_id) = match best {
            Some(t) => (t.discount_percent, Some(t.id)),
            None => (0, None),
        };

        let total_cents = (base_cents * i64::from(100 - discount_percent) / 100).max(0);

        Ok(PriceQuote {
            total_cents,
            base_cents,
            discount_percent,
            tariff_id,
        })
    }

    async fn load_profile(&self, user_id: i64) -> PricingResult<UserProfile> {
        let row = sqlx::query("SELECT segment, date_of_birth FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(self.pool.as_ref())
            .await?;

        // Unknown user: no discounts, base price still resolves
        Ok(row
            .map(|r| UserProfile {
                segment: r.get("segment"),
                date_of_birth: r.get("date_of_birth"),
            })
            .unwrap_or_default())
    }

    /// Tariffs the user can draw on for this court: approval-free tariffs
    /// plus those the user holds an APPROVED enrollment for. Validity,
    /// segment, and age filtering happen in [`best_tariff`].
    async fn applicable_tariffs(&self, user_id: i64, court_id: i64) -> PricingResult<Vec<Tariff>> {
        let rows = sqlx::query(
            r#"
            SELECT t.id, t.name, t.segment, t.min_age, t.max_age, t.discount_percent,
                   t.valid_from, t.valid_until, t.requires_approval, t.applies_to_all_courts
            FROM tariffs t
            WHERE (NOT t.requires_approval
                   OR EXISTS (
                       SELECT 1 FROM tariff_enrollments e
                       WHERE e.tariff_id = t.id AND e.user_id = $1 AND e.status = 'APPROVED'
                   ))
              AND (t.applies_to_all_courts
                   OR EXISTS (
                       SELECT 1 FROM tariff_courts tc
                       WHERE tc.tariff_id = t.id AND tc.court_id = $2
                   ))
            "#,
        )
        .bind(user_id)
        .bind(court_id)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.iter().map(Tariff::from_row).collect())
    }
}
