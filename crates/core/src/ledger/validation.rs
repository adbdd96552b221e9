//! Business rule validation for journal lines.

use erario_shared::types::has_money_scale;
use rust_decimal::Decimal;

use super::error::PostingError;
use super::types::{EntryTotals, JournalLineInput};

/// Validates the shape of a set of journal lines and returns their totals.
///
/// Rules, in order:
/// 1. At least 2 lines
/// 2. Per line: no negative side, not both sides, not neither side, at most 2 decimals
/// 3. `|sum(debit) - sum(credit)| <= tolerance`
///
/// # Errors
///
/// Returns the first violated rule. Line numbers are 1-based.
pub fn validate_lines(
    lines: &[JournalLineInput],
    tolerance: Decimal,
) -> Result<EntryTotals, PostingError> {
    if lines.len() < 2 {
        return Err(PostingError::InsufficientLines);
    }

    let mut total_debit = Decimal::ZERO;
    let mut total_credit = Decimal::ZERO;

    for (index, line) in lines.iter().enumerate() {
        let number = index + 1;

        if line.debit < Decimal::ZERO || line.credit < Decimal::ZERO {
            return Err(PostingError::NegativeAmount { line: number });
        }
        match (line.debit.is_zero(), line.credit.is_zero()) {
            (false, false) => return Err(PostingError::BothSides { line: number }),
            (true, true) => return Err(PostingError::ZeroAmount { line: number }),
            _ => {}
        }
        if !has_money_scale(line.debit) || !has_money_scale(line.credit) {
            return Err(PostingError::InvalidPrecision { line: number });
        }

        total_debit += line.debit;
        total_credit += line.credit;
    }

    let totals = EntryTotals::new(total_debit, total_credit, tolerance);
    if !totals.is_balanced {
        return Err(PostingError::UnbalancedEntry {
            debit: total_debit,
            credit: total_credit,
        });
    }

    Ok(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use erario_shared::types::BALANCE_TOLERANCE;
    use rust_decimal_macros::dec;

    #[test]
    fn test_balanced_lines() {
        let lines = vec![
            JournalLineInput::debit("1105", dec!(100)),
            JournalLineInput::credit("4135", dec!(100)),
        ];
        let totals = validate_lines(&lines, BALANCE_TOLERANCE).unwrap();
        assert_eq!(totals.debit, dec!(100));
        assert_eq!(totals.credit, dec!(100));
        assert!(totals.is_balanced);
    }

    #[test]
    fn test_unbalanced_lines_carry_both_totals() {
        let lines = vec![
            JournalLineInput::debit("1105", dec!(100)),
            JournalLineInput::credit("4135", dec!(99)),
        ];
        assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::UnbalancedEntry {
                debit: dec!(100),
                credit: dec!(99),
            })
        );
    }

    #[test]
    fn test_one_cent_difference_is_tolerated() {
        let lines = vec![
            JournalLineInput::debit("1105", dec!(100.01)),
            JournalLineInput::credit("4135", dec!(100)),
        ];
        assert!(validate_lines(&lines, BALANCE_TOLERANCE).is_ok());
    }

    #[test]
    fn test_single_line_rejected() {
        let lines = vec![JournalLineInput::debit("1105", dec!(100))];
        assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::InsufficientLines)
        );
    }

    #[test]
    fn test_both_sides_rejected() {
        let mut both = JournalLineInput::debit("1105", dec!(100));
        both.credit = dec!(100);
        let lines = vec![both, JournalLineInput::credit("4135", dec!(100))];
        assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::BothSides { line: 1 })
        );
    }

    #[test]
    fn test_zero_line_rejected() {
        let lines = vec![
            JournalLineInput::debit("1105", dec!(100)),
            JournalLineInput::credit("4135", dec!(0)),
        ];
        assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::ZeroAmount { line: 2 })
        );
    }

    #[test]
    fn test_negative_line_rejected() {
        let lines = vec![
            JournalLineInput::debit("1105", dec!(-100)),
            JournalLineInput::credit("4135", dec!(100)),
        ];
        assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::NegativeAmount { line: 1 })
        );
    }

    #[test]
    fn test_sub_cent_precision_rejected() {
        let lines = vec![
            JournalLineInput::debit("1105", dec!(100.005)),
            JournalLineInput::credit("4135", dec!(100.005)),
        ];
        assert_eq!(
            validate_lines(&lines, BALANCE_TOLERANCE),
            Err(PostingError::InvalidPrecision { line: 1 })
        );
    }
}
