//! Property-based tests for proportional spreading.

use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use super::allocation::{spread_proportionally, spread_weighted};

/// Strategy for a capacity on the 0.01 grid (0.00 to 100,000.00).
fn capacity() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Capacities with at least one non-zero part, plus a total within their sum.
fn spread_input() -> impl Strategy<Value = (Vec<Decimal>, Decimal)> {
    prop::collection::vec(capacity(), 1..8)
        .prop_filter("needs capacity", |caps| caps.iter().any(|c| !c.is_zero()))
        .prop_flat_map(|caps| {
            let sum: Decimal = caps.iter().copied().sum();
            let max_cents = (sum * Decimal::ONE_HUNDRED).trunc().to_i64().unwrap_or(1);
            (Just(caps), (1i64..=max_cents).prop_map(|cents| Decimal::new(cents, 2)))
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: parts sum to the total exactly.
    ///
    /// *For any* capacities and total within their sum, the spread SHALL
    /// succeed and its parts SHALL add up to the total with no residue.
    #[test]
    fn prop_parts_sum_to_total((caps, total) in spread_input()) {
        let parts = spread_proportionally(total, &caps);
        prop_assert!(parts.is_some(), "Spread of {} over {:?} failed", total, caps);
        let parts = parts.unwrap();
        prop_assert_eq!(parts.iter().copied().sum::<Decimal>(), total);
    }

    /// Property: no part exceeds its capacity and none is negative.
    #[test]
    fn prop_parts_within_capacity((caps, total) in spread_input()) {
        let parts = spread_proportionally(total, &caps).unwrap();
        for (part, cap) in parts.iter().zip(&caps) {
            prop_assert!(*part >= Decimal::ZERO);
            prop_assert!(part <= cap, "Part {} over capacity {}", part, cap);
            prop_assert!(part.scale() <= 2);
        }
    }

    /// Property: weighted spreads stay exact and within capacity.
    ///
    /// *For any* weights and capacities, a total within the summed capacity
    /// SHALL be placed in full without overfilling any part.
    #[test]
    fn prop_weighted_parts_within_capacity(
        (caps, total) in spread_input(),
        weights in prop::collection::vec(capacity(), 8),
    ) {
        let weights = &weights[..caps.len()];
        let parts = spread_weighted(total, weights, &caps);
        prop_assert!(parts.is_some(), "Weighted spread of {} over {:?} failed", total, caps);
        let parts = parts.unwrap();
        prop_assert_eq!(parts.iter().copied().sum::<Decimal>(), total);
        for (part, cap) in parts.iter().zip(&caps) {
            prop_assert!(*part >= Decimal::ZERO);
            prop_assert!(part <= cap, "Part {} over capacity {}", part, cap);
        }
    }

    /// Property: a total over the summed capacity is refused.
    #[test]
    fn prop_overdraw_refused(caps in prop::collection::vec(capacity(), 1..8), extra in 1i64..1000) {
        let sum: Decimal = caps.iter().copied().sum();
        prop_assert_eq!(spread_proportionally(sum + Decimal::new(extra, 2), &caps), None);
    }
}
