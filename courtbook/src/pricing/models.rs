//! Pricing data models.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sqlx::{Row, postgres::PgRow};

/// Day/night rate split
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimeOfDay {
    Day,
    Night,
}

impl TimeOfDay {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeOfDay::Day => "DAY",
            TimeOfDay::Night => "NIGHT",
        }
    }

    /// Classify a start hour against the configured night boundary
    pub fn from_hour(hour: u32, night_start_hour: u32) -> Self {
        if hour >= night_start_hour {
            TimeOfDay::Night
        } else {
            TimeOfDay::Day
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Discount-eligibility rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tariff {
    pub id: i64,
    pub name: String,
    /// Segment the tariff targets; `None` matches every segment
    pub segment: Option<String>,
    pub min_age: Option<i16>,
    pub max_age: Option<i16>,
    pub discount_percent: i16,
    pub valid_from: NaiveDate,
    pub valid_until: NaiveDate,
    pub requires_approval: bool,
    pub applies_to_all_courts: bool,
}

impl Tariff {
    pub(crate) fn from_row(row: &PgRow) -> Self {
        Tariff {
            id: row.get("id"),
            name: row.get("name"),
            segment: row.get("segment"),
            min_age: row.get("min_age"),
            max_age: row.get("max_age"),
            discount_percent: row.get("discount_percent"),
            valid_from: row.get("valid_from"),
            valid_until: row.get("valid_until"),
            requires_approval: row.get("requires_approval"),
            applies_to_all_courts: row.get("applies_to_all_courts"),
        }
    }

    /// Whether this tariff applies to the given user profile on the given date
    pub fn eligible(&self, profile: &UserProfile, on: NaiveDate) -> bool {
        if on < self.valid_from || on > self.valid_until {
            return false;
        }

        if let Some(segment) = &self.segment {
            if profile.segment.as_deref() != Some(segment.as_str()) {
                return false;
            }
        }

        if self.min_age.is_some() || self.max_age.is_some() {
            let Some(age) = profile.age_on(on) else {
                // Age-bounded tariff, no birth date on file
                return false;
            };
            if let Some(min) = self.min_age {
                if age < i32::from(min) {
                    return false;
                }
            }
            if let Some(max) = self.max_age {
                if age > i32::from(max) {
                    return false;
                }
            }
        }

        true
    }
}

/// The slice of the user record pricing cares about
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    pub segment: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

impl UserProfile {
    /// Whole years of age on the given date
    pub fn age_on(&self, on: NaiveDate) -> Option<i32> {
        let dob = self.date_of_birth?;
        let mut age = on.year() - dob.year();
        if (on.month(), on.day()) < (dob.month(), dob.day()) {
            age -= 1;
        }
        Some(age)
    }
}

/// Pick the best applicable tariff: highest discount among eligible ones
pub fn best_tariff<'a>(
    tariffs: &'a [Tariff],
    profile: &UserProfile,
    on: NaiveDate,
) -> Option<&'a Tariff> {
    tariffs
        .iter()
        .filter(|t| t.eligible(profile, on))
        .max_by_key(|t| t.discount_percent)
}

/// Resolved price for a reservation window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceQuote {
    pub total_cents: i64,
    pub base_cents: i64,
    pub discount_percent: i16,
    pub tariff_id: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn tariff(id: i64, discount: i16) -> Tariff {
        Tariff {
            id,
            name: format!("tariff-{id}"),
            segment: None,
            min_age: None,
            max_age: None,
            discount_percent: discount,
            valid_from: date(2026, 1, 1),
            valid_until: date(2026, 12, 31),
            requires_approval: true,
            applies_to_all_courts: true,
        }
    }

    #[test]
    fn test_time_of_day_boundary() {
        assert_eq!(TimeOfDay::from_hour(17, 18), TimeOfDay::Day);
        assert_eq!(TimeOfDay::from_hour(18, 18), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(23, 18), TimeOfDay::Night);
        assert_eq!(TimeOfDay::from_hour(8, 18), TimeOfDay::Day);
    }

    #[test]
    fn test_validity_window_bounds() {
        let t = tariff(1, 20);
        let profile = UserProfile::default();

        assert!(t.eligible(&profile, date(2026, 1, 1)));
        assert!(t.eligible(&profile, date(2026, 12, 31)));
        assert!(!t.eligible(&profile, date(2025, 12, 31)));
        assert!(!t.eligible(&profile, date(2027, 1, 1)));
    }

    #[test]
    fn test_segment_match() {
        let t = Tariff {
            segment: Some("senior".to_string()),
            ..tariff(1, 30)
        };

        let senior = UserProfile {
            segment: Some("senior".to_string()),
            date_of_birth: None,
        };
        let student = UserProfile {
            segment: Some("student".to_string()),
            date_of_birth: None,
        };
        let unknown = UserProfile::default();

        assert!(t.eligible(&senior, date(2026, 6, 1)));
        assert!(!t.eligible(&student, date(2026, 6, 1)));
        assert!(!t.eligible(&unknown, date(2026, 6, 1)));
    }

    #[test]
    fn test_age_bounds_require_birth_date() {
        let t = Tariff {
            min_age: Some(65),
            ..tariff(1, 40)
        };

        let no_dob = UserProfile::default();
        assert!(!t.eligible(&no_dob, date(2026, 6, 1)));

        let senior = UserProfile {
            segment: None,
            date_of_birth: Some(date(1950, 3, 15)),
        };
        assert!(t.eligible(&senior, date(2026, 6, 1)));

        let junior = UserProfile {
            segment: None,
            date_of_birth: Some(date(2000, 3, 15)),
        };
        assert!(!t.eligible(&junior, date(2026, 6, 1)));
    }

    #[test]
    fn test_age_counts_whole_years() {
        let profile = UserProfile {
            segment: None,
            date_of_birth: Some(date(2000, 6, 15)),
        };

        assert_eq!(profile.age_on(date(2026, 6, 14)), Some(25));
        assert_eq!(profile.age_on(date(2026, 6, 15)), Some(26));
    }

    #[test]
    fn test_best_tariff_picks_highest_discount() {
        let tariffs = vec![tariff(1, 10), tariff(2, 35), tariff(3, 20)];
        let profile = UserProfile::default();

        let best = best_tariff(&tariffs, &profile, date(2026, 6, 1)).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_best_tariff_skips_ineligible() {
        let expired = Tariff {
            valid_until: date(2026, 2, 1),
            ..tariff(1, 90)
        };
        let tariffs = vec![expired, tariff(2, 15)];
        let profile = UserProfile::default();

        let best = best_tariff(&tariffs, &profile, date(2026, 6, 1)).unwrap();
        assert_eq!(best.id, 2);
    }

    #[test]
    fn test_best_tariff_none_when_empty() {
        let profile = UserProfile::default();
        assert!(best_tariff(&[], &profile, date(2026, 6, 1)).is_none());
    }
}
