//! Reversing entries.
//!
//! Posted entries are never edited or deleted. Voiding one posts a new entry
//! with every line's debit and credit swapped, referencing the original.

use chrono::NaiveDate;

use super::types::{JournalEntryDraft, JournalLineInput, PostedEntry};

/// Stateless service for building reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Builds the draft that reverses `original`.
    ///
    /// For each original line:
    /// - Debits become credits
    /// - Credits become debits
    /// - Account, tags and currency amounts are preserved
    /// - The description is prefixed with "Reversal: "
    #[must_use]
    pub fn reversing_draft(
        original: &PostedEntry,
        date: NaiveDate,
        reason: &str,
    ) -> JournalEntryDraft {
        let lines = original
            .lines
            .iter()
            .map(|line| JournalLineInput {
                account_code: line.account_code.clone(),
                debit: line.credit,
                credit: line.debit,
                description: Some(format!(
                    "Reversal: {}",
                    line.description.clone().unwrap_or_default()
                )),
                cost_center: line.cost_center,
                project: line.project,
            })
            .collect();

        JournalEntryDraft {
            journal_type: original.journal_type.clone(),
            date,
            description: format!("Reversal of entry {}. Reason: {reason}", original.number),
            reference: Some(original.number.clone()),
            currency: original.currency,
            exchange_rate: original.exchange_rate,
            lines,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use erario_shared::types::{
        AccountId, CompanyId, Currency, FiscalPeriodId, JournalEntryId, UserId,
    };
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::ledger::types::{EntryTotals, PostedLine};

    fn posted_line(n: usize, code: &str, debit: Decimal, credit: Decimal) -> PostedLine {
        PostedLine {
            line_number: n,
            account_id: AccountId::new(),
            account_code: code.to_string(),
            description: Some("Venta".to_string()),
            debit,
            credit,
            functional_debit: debit,
            functional_credit: credit,
            cost_center: None,
            project: None,
        }
    }

    fn posted_entry() -> PostedEntry {
        PostedEntry {
            id: JournalEntryId::new(),
            company_id: CompanyId::new(),
            fiscal_period_id: FiscalPeriodId::new(),
            journal_type: "CG".to_string(),
            sequence: 7,
            number: "CG000007".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            description: "Venta de contado".to_string(),
            reference: None,
            currency: Currency::Cop,
            exchange_rate: Decimal::ONE,
            lines: vec![
                posted_line(1, "1105", dec!(100), Decimal::ZERO),
                posted_line(2, "4135", Decimal::ZERO, dec!(100)),
            ],
            totals: EntryTotals::new(dec!(100), dec!(100), dec!(0.01)),
            reverses: None,
            posted_by: UserId::new(),
            posted_at: Utc::now(),
            hash: String::new(),
        }
    }

    #[test]
    fn test_reversing_draft_swaps_sides() {
        let original = posted_entry();
        let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let draft = ReversalService::reversing_draft(&original, date, "Duplicate entry");

        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.lines[0].account_code, "1105");
        assert_eq!(draft.lines[0].debit, Decimal::ZERO);
        assert_eq!(draft.lines[0].credit, dec!(100));
        assert_eq!(draft.lines[1].debit, dec!(100));
        assert_eq!(draft.lines[1].credit, Decimal::ZERO);
        assert!(draft.lines[0].description.as_deref().unwrap().starts_with("Reversal: "));
    }

    #[test]
    fn test_reversing_draft_references_original() {
        let original = posted_entry();
        let date = NaiveDate::from_ymd_opt(2026, 3, 20).unwrap();
        let draft = ReversalService::reversing_draft(&original, date, "Duplicate entry");

        assert_eq!(draft.journal_type, "CG");
        assert_eq!(draft.reference.as_deref(), Some("CG000007"));
        assert!(draft.description.contains("Reversal of entry CG000007"));
        assert!(draft.description.contains("Duplicate entry"));
        assert_eq!(draft.date, date);
    }
}
