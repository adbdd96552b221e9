//! Proportional spreading using the Largest Remainder Method.
//!
//! Obligations are spread across their RP lines and payments across their
//! obligation lines. A part never receives more than its remaining capacity
//! and the parts always sum to the total exactly.
//!
//! 1. Calculate exact shares from the weights, capping full parts
//! 2. Round each share down to the 0.01 grid
//! 3. Hand the leftover 0.01 units to the largest fractional parts

use std::cmp::Ordering;

use erario_shared::types::MONEY_SCALE;
use rust_decimal::prelude::*;

/// Spreads `total` across parts weighted by their remaining `capacities`.
///
/// Returns `None` if there are no parts, `total` exceeds the summed
/// capacity, or the 0.01 grid cannot place every unit.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use erario_core::budget::spread_proportionally;
///
/// // 100 over capacities 200/100 = [66.67, 33.33]
/// let parts = spread_proportionally(dec!(100), &[dec!(200), dec!(100)]).unwrap();
/// assert_eq!(parts, vec![dec!(66.67), dec!(33.33)]);
/// ```
#[must_use]
pub fn spread_proportionally(total: Decimal, capacities: &[Decimal]) -> Option<Vec<Decimal>> {
    spread_weighted(total, capacities, capacities)
}

/// Spreads `total` in proportion to `weights`, never giving a part more than
/// its capacity.
///
/// Shares that would overflow a part are capped at its capacity and the
/// excess is shared among the remaining parts by the same weights. Parts
/// with zero weight only absorb what the weighted parts cannot hold.
///
/// Returns `None` on mismatched lengths, no parts, negative inputs, a total
/// above the summed capacity, or a grid that cannot place every unit.
///
/// # Example
///
/// ```
/// use rust_decimal_macros::dec;
/// use erario_core::budget::spread_weighted;
///
/// // Weights 300/100, but the first part only has 60 left
/// let weights = [dec!(300), dec!(100)];
/// let parts = spread_weighted(dec!(100), &weights, &[dec!(60), dec!(100)]).unwrap();
/// assert_eq!(parts, vec![dec!(60), dec!(40)]);
/// ```
#[must_use]
pub fn spread_weighted(
    total: Decimal,
    weights: &[Decimal],
    capacities: &[Decimal],
) -> Option<Vec<Decimal>> {
    if capacities.is_empty()
        || weights.len() != capacities.len()
        || weights.iter().chain(capacities).any(Decimal::is_sign_negative)
    {
        return None;
    }

    let capacity: Decimal = capacities.iter().copied().sum();
    match total.cmp(&capacity) {
        Ordering::Greater => return None,
        Ordering::Equal => return Some(capacities.to_vec()),
        Ordering::Less => {}
    }

    let exact = capped_shares(total, weights, capacities);
    round_to_grid(total, &exact, capacities)
}

/// Exact shares of `total`, filling capped parts first.
fn capped_shares(total: Decimal, weights: &[Decimal], capacities: &[Decimal]) -> Vec<Decimal> {
    let mut exact = vec![Decimal::ZERO; capacities.len()];
    let mut capped = vec![false; capacities.len()];

    loop {
        let placed: Decimal = (0..exact.len()).filter(|&i| capped[i]).map(|i| exact[i]).sum();
        let remaining = total - placed;
        let open: Vec<usize> = (0..exact.len()).filter(|&i| !capped[i]).collect();

        // Once the weighted parts are full, the rest goes by capacity
        let mut open_weight: Decimal = open.iter().map(|&i| weights[i]).sum();
        let use_capacity = open_weight.is_zero();
        if use_capacity {
            open_weight = open.iter().map(|&i| capacities[i]).sum();
        }
        if open.is_empty() || open_weight.is_zero() {
            return exact;
        }

        let mut overflow = false;
        for &i in &open {
            let weight = if use_capacity { capacities[i] } else { weights[i] };
            let share = remaining * weight / open_weight;
            if share >= capacities[i] {
                exact[i] = capacities[i];
                capped[i] = true;
                overflow = true;
            } else {
                exact[i] = share;
            }
        }
        if !overflow {
            return exact;
        }
    }
}

/// Rounds exact shares onto the 0.01 grid so they sum to `total`.
fn round_to_grid(
    total: Decimal,
    exact: &[Decimal],
    capacities: &[Decimal],
) -> Option<Vec<Decimal>> {
    let unit = Decimal::new(1, MONEY_SCALE);

    // Round down each
    let mut parts: Vec<Decimal> = exact
        .iter()
        .map(|a| a.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::ToZero))
        .collect();

    let allocated: Decimal = parts.iter().copied().sum();
    let units = ((total - allocated) / unit)
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_usize()
        .unwrap_or(0);

    // Largest fractional remainder first, earlier part on ties
    let mut remainders: Vec<(usize, Decimal)> = exact
        .iter()
        .zip(parts.iter())
        .enumerate()
        .map(|(i, (e, r))| (i, *e - *r))
        .collect();
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));

    let mut given = 0;
    for (idx, _) in &remainders {
        if given == units {
            break;
        }
        if parts[*idx] + unit <= capacities[*idx] {
            parts[*idx] += unit;
            given += 1;
        }
    }

    let sum: Decimal = parts.iter().copied().sum();
    (sum == total).then_some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_capacities() {
        assert_eq!(spread_proportionally(dec!(10), &[]), None);
    }

    #[test]
    fn test_total_above_capacity() {
        assert_eq!(spread_proportionally(dec!(301), &[dec!(200), dec!(100)]), None);
    }

    #[test]
    fn test_full_capacity_returns_capacities() {
        assert_eq!(
            spread_proportionally(dec!(300), &[dec!(200), dec!(100)]),
            Some(vec![dec!(200), dec!(100)])
        );
    }

    #[test]
    fn test_even_thirds() {
        let parts = spread_proportionally(dec!(100), &[dec!(50), dec!(50), dec!(50)]).unwrap();
        assert_eq!(parts, vec![dec!(33.34), dec!(33.33), dec!(33.33)]);
    }

    #[test]
    fn test_single_part() {
        assert_eq!(
            spread_proportionally(dec!(12.34), &[dec!(50)]),
            Some(vec![dec!(12.34)])
        );
    }

    #[test]
    fn test_zero_capacity_part_gets_nothing() {
        let parts = spread_proportionally(dec!(10), &[dec!(0), dec!(40)]).unwrap();
        assert_eq!(parts, vec![dec!(0), dec!(10)]);
    }

    #[test]
    fn test_weights_follow_original_amounts() {
        // 300 of an RP split 200/100, with 100 already accrued evenly
        let parts =
            spread_weighted(dec!(90), &[dec!(200), dec!(100)], &[dec!(150), dec!(50)]).unwrap();
        assert_eq!(parts, vec![dec!(60), dec!(30)]);
    }

    #[test]
    fn test_capped_part_overflows_to_others() {
        let parts = spread_weighted(
            dec!(120),
            &[dec!(100), dec!(100), dec!(100)],
            &[dec!(10), dec!(100), dec!(100)],
        )
        .unwrap();
        assert_eq!(parts, vec![dec!(10), dec!(55), dec!(55)]);
    }

    #[test]
    fn test_zero_weight_parts_absorb_the_rest() {
        let parts =
            spread_weighted(dec!(70), &[dec!(1), dec!(0)], &[dec!(50), dec!(50)]).unwrap();
        assert_eq!(parts, vec![dec!(50), dec!(20)]);
    }

    #[test]
    fn test_mismatched_lengths() {
        assert_eq!(spread_weighted(dec!(1), &[dec!(1)], &[dec!(1), dec!(1)]), None);
    }

    #[test]
    fn test_uneven_weights_sum_exactly() {
        let caps = [dec!(123.45), dec!(0.07), dec!(999.99)];
        let parts = spread_proportionally(dec!(500.01), &caps).unwrap();
        assert_eq!(parts.iter().copied().sum::<Decimal>(), dec!(500.01));
        for (part, cap) in parts.iter().zip(caps) {
            assert!(*part <= cap);
        }
    }
}
