//! Property tests for tariff selection.

use chrono::NaiveDate;
use courtbook::pricing::{Tariff, UserProfile, best_tariff};
use proptest::prelude::*;

fn arb_tariff() -> impl Strategy<Value = Tariff> {
    (
        1i64..1000,
        0i16..=100,
        prop::option::of(0i16..90),
        prop::option::of(10i16..120),
        prop::bool::ANY,
    )
        .prop_map(|(id, discount, min_age, max_age, approval)| Tariff {
            id,
            name: format!("tariff-{id}"),
            segment: None,
            min_age,
            max_age,
            discount_percent: discount,
            valid_from: NaiveDate::from_ymd_opt(2026, 1, 1).unwrap(),
            valid_until: NaiveDate::from_ymd_opt(2026, 12, 31).unwrap(),
            requires_approval: approval,
            applies_to_all_courts: true,
        })
}

proptest! {
    /// The selected tariff is always eligible and carries the maximum
    /// discount among eligible tariffs.
    #[test]
    fn best_tariff_is_eligible_maximum(
        tariffs in prop::collection::vec(arb_tariff(), 0..20),
        age in 0i32..100,
    ) {
        let profile = UserProfile {
            segment: None,
            date_of_birth: NaiveDate::from_ymd_opt(2026 - age, 1, 1),
        };
        let on = NaiveDate::from_ymd_opt(2026, 6, 15).unwrap();

        let best = best_tariff(&tariffs, &profile, on);

        let eligible_max = tariffs
            .iter()
            .filter(|t| t.eligible(&profile, on))
            .map(|t| t.discount_percent)
            .max();

        match (best, eligible_max) {
            (Some(t), Some(max)) => {
                prop_assert!(t.eligible(&profile, on));
                prop_assert_eq!(t.discount_percent, max);
            }
            (None, None) => {}
            (best, eligible_max) => {
                prop_assert!(false, "mismatch: {:?} vs {:?}", best.map(|t| t.id), eligible_max);
            }
        }
    }

    /// A discounted price is never negative and never exceeds the base.
    #[test]
    fn discount_stays_within_bounds(base in 0i64..10_000_000, discount in 0i16..=100) {
        let total = (base * i64::from(100 - discount) / 100).max(0);
        prop_assert!(total >= 0);
        prop_assert!(total <= base);
    }
}
