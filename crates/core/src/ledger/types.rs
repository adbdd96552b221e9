//! Ledger domain types for journal entry creation and posting.
//!
//! This module defines the core types used for creating and posting
//! journal entries in the double-entry bookkeeping system.

use chrono::{DateTime, NaiveDate, Utc};
use erario_shared::types::{
    AccountId, CompanyId, CostCenterId, Currency, FiscalPeriodId, JournalEntryId, ProjectId,
    UserId, within_tolerance,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A journal (comprobante) with its own numbering sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalType {
    /// Short code, unique per company (e.g. "CG").
    pub code: String,
    /// Display name.
    pub name: String,
    /// Prefix of every entry number in this journal.
    pub prefix: String,
}

impl JournalType {
    /// Creates a journal type.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        prefix: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            prefix: prefix.into(),
        }
    }
}

/// Input for a single journal line.
///
/// Exactly one of `debit` / `credit` must be non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalLineInput {
    /// Code of the detail account to post to.
    pub account_code: String,
    /// Debit amount in the entry currency.
    pub debit: Decimal,
    /// Credit amount in the entry currency.
    pub credit: Decimal,
    /// Optional line description.
    pub description: Option<String>,
    /// Optional cost center tag.
    pub cost_center: Option<CostCenterId>,
    /// Optional project tag.
    pub project: Option<ProjectId>,
}

impl JournalLineInput {
    /// Creates a debit line.
    #[must_use]
    pub fn debit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: amount,
            credit: Decimal::ZERO,
            description: None,
            cost_center: None,
            project: None,
        }
    }

    /// Creates a credit line.
    #[must_use]
    pub fn credit(account_code: impl Into<String>, amount: Decimal) -> Self {
        Self {
            account_code: account_code.into(),
            debit: Decimal::ZERO,
            credit: amount,
            description: None,
            cost_center: None,
            project: None,
        }
    }

    /// Sets the line description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Tags the line with a cost center.
    #[must_use]
    pub const fn with_cost_center(mut self, cost_center: CostCenterId) -> Self {
        self.cost_center = Some(cost_center);
        self
    }

    /// Tags the line with a project.
    #[must_use]
    pub const fn with_project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }
}

/// Input for posting a journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntryDraft {
    /// Journal type code.
    pub journal_type: String,
    /// Accounting date; must fall inside the target period.
    pub date: NaiveDate,
    /// Entry description.
    pub description: String,
    /// Optional external reference (invoice, contract).
    pub reference: Option<String>,
    /// Currency of the line amounts.
    pub currency: Currency,
    /// Rate into the functional currency, supplied by the caller.
    pub exchange_rate: Decimal,
    /// The lines (at least 2).
    pub lines: Vec<JournalLineInput>,
}

impl JournalEntryDraft {
    /// Creates a draft with rate 1 and no lines.
    #[must_use]
    pub fn new(
        journal_type: impl Into<String>,
        date: NaiveDate,
        description: impl Into<String>,
        currency: Currency,
    ) -> Self {
        Self {
            journal_type: journal_type.into(),
            date,
            description: description.into(),
            reference: None,
            currency,
            exchange_rate: Decimal::ONE,
            lines: Vec::new(),
        }
    }

    /// Appends a line.
    #[must_use]
    pub fn line(mut self, line: JournalLineInput) -> Self {
        self.lines.push(line);
        self
    }

    /// Sets the external reference.
    #[must_use]
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Sets the exchange rate into the functional currency.
    #[must_use]
    pub const fn with_exchange_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = rate;
        self
    }
}

/// A posted journal line, resolved against the chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedLine {
    /// 1-based position in the entry.
    pub line_number: usize,
    /// Account posted to.
    pub account_id: AccountId,
    /// Account code at posting time.
    pub account_code: String,
    /// Line description.
    pub description: Option<String>,
    /// Debit in the entry currency.
    pub debit: Decimal,
    /// Credit in the entry currency.
    pub credit: Decimal,
    /// Debit in the functional currency.
    pub functional_debit: Decimal,
    /// Credit in the functional currency.
    pub functional_credit: Decimal,
    /// Cost center tag.
    pub cost_center: Option<CostCenterId>,
    /// Project tag.
    pub project: Option<ProjectId>,
}

/// Entry totals for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Total debits.
    pub debit: Decimal,
    /// Total credits.
    pub credit: Decimal,
    /// Whether debits and credits agree within the tolerance.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals, checking balance within `tolerance`.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal, tolerance: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: within_tolerance(debit, credit, tolerance),
        }
    }
}

/// An immutable posted journal entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedEntry {
    /// Entry identifier.
    pub id: JournalEntryId,
    /// Owning company.
    pub company_id: CompanyId,
    /// Fiscal period the entry is booked in.
    pub fiscal_period_id: FiscalPeriodId,
    /// Journal type code.
    pub journal_type: String,
    /// Sequence number within the journal type.
    pub sequence: u64,
    /// Entry number, `{prefix}{sequence:06}`.
    pub number: String,
    /// Accounting date.
    pub date: NaiveDate,
    /// Description.
    pub description: String,
    /// External reference.
    pub reference: Option<String>,
    /// Currency of the line amounts.
    pub currency: Currency,
    /// Rate into the functional currency.
    pub exchange_rate: Decimal,
    /// Posted lines.
    pub lines: Vec<PostedLine>,
    /// Functional-currency totals.
    pub totals: EntryTotals,
    /// The entry this one reverses, if any.
    pub reverses: Option<JournalEntryId>,
    /// Posting user.
    pub posted_by: UserId,
    /// Posting timestamp.
    pub posted_at: DateTime<Utc>,
    /// SHA-256 over company, number, date and totals.
    pub hash: String,
}

impl PostedEntry {
    /// Returns true if this entry reverses another.
    #[must_use]
    pub const fn is_reversal(&self) -> bool {
        self.reverses.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erario_shared::types::BALANCE_TOLERANCE;
    use rust_decimal_macros::dec;

    #[test]
    fn test_line_constructors() {
        let debit = JournalLineInput::debit("1105", dec!(100));
        assert_eq!(debit.debit, dec!(100));
        assert_eq!(debit.credit, Decimal::ZERO);

        let credit = JournalLineInput::credit("4135", dec!(100)).with_description("Venta");
        assert_eq!(credit.credit, dec!(100));
        assert_eq!(credit.description.as_deref(), Some("Venta"));
    }

    #[test]
    fn test_draft_builder() {
        let draft = JournalEntryDraft::new(
            "CG",
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            "Venta de contado",
            Currency::Cop,
        )
        .line(JournalLineInput::debit("1105", dec!(100)))
        .line(JournalLineInput::credit("4135", dec!(100)))
        .with_reference("FV-1");

        assert_eq!(draft.lines.len(), 2);
        assert_eq!(draft.exchange_rate, Decimal::ONE);
        assert_eq!(draft.reference.as_deref(), Some("FV-1"));
    }

    #[test]
    fn test_totals_tolerance() {
        assert!(EntryTotals::new(dec!(100), dec!(100.01), BALANCE_TOLERANCE).is_balanced);
        assert!(!EntryTotals::new(dec!(100), dec!(99), BALANCE_TOLERANCE).is_balanced);
    }
}
