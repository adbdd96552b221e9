//! Property-based tests for journal line validation.
//!
//! Every accepted set of lines balances within the tolerance, and every
//! rejected set names the rule it broke.

use erario_shared::types::BALANCE_TOLERANCE;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::PostingError;
use super::types::JournalLineInput;
use super::validation::validate_lines;

/// Strategy to generate a valid positive amount (0.01 to 1,000,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a balanced set of lines: debits split arbitrarily,
/// one credit line for the total.
fn balanced_lines() -> impl Strategy<Value = Vec<JournalLineInput>> {
    prop::collection::vec(positive_amount(), 1..8).prop_map(|debits| {
        let total: Decimal = debits.iter().copied().sum();
        let mut lines: Vec<JournalLineInput> = debits
            .into_iter()
            .map(|amount| JournalLineInput::debit("1105", amount))
            .collect();
        lines.push(JournalLineInput::credit("4135", total));
        lines
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: balanced lines are accepted with exact totals.
    ///
    /// *For any* set of debit lines offset by a single credit line for their
    /// sum, validation SHALL accept it and report equal totals.
    #[test]
    fn prop_balanced_lines_accepted(lines in balanced_lines()) {
        let totals = validate_lines(&lines, BALANCE_TOLERANCE);
        prop_assert!(totals.is_ok(), "Balanced lines rejected: {:?}", totals);
        let totals = totals.unwrap();
        prop_assert_eq!(totals.debit, totals.credit);
    }

    /// Property: accepted entries balance within the tolerance.
    ///
    /// *For any* debit and credit amount, validation SHALL accept the pair if
    /// and only if they differ by at most 0.01.
    #[test]
    fn prop_accepted_iff_within_tolerance(
        debit in positive_amount(),
        credit in positive_amount(),
    ) {
        let lines = vec![
            JournalLineInput::debit("1105", debit),
            JournalLineInput::credit("4135", credit),
        ];
        let result = validate_lines(&lines, BALANCE_TOLERANCE);
        let within = (debit - credit).abs() <= BALANCE_TOLERANCE;

        if within {
            prop_assert!(result.is_ok());
        } else {
            prop_assert_eq!(result, Err(PostingError::UnbalancedEntry { debit, credit }));
        }
    }

    /// Property: single line entries are rejected.
    #[test]
    fn prop_single_line_rejected(amount in positive_amount()) {
        let lines = vec![JournalLineInput::debit("1105", amount)];
        prop_assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::InsufficientLines)
        );
    }

    /// Property: negative amounts are rejected before balance is checked.
    #[test]
    fn prop_negative_amount_rejected(amount in positive_amount()) {
        let lines = vec![
            JournalLineInput::debit("1105", -amount),
            JournalLineInput::credit("4135", -amount),
        ];
        prop_assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::NegativeAmount { line: 1 })
        );
    }
}
