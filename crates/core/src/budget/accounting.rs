//! Journal entries generated by obligations.
//!
//! An accrued obligation posts:
//! - Debit the expense account for the gross amount
//! - Credit the payable account for the net amount
//! - Credit the withholding account for the deductions, if any

use erario_shared::types::Currency;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::documents::Obligation;
use super::error::BudgetError;
use crate::ledger::{JournalEntryDraft, JournalLineInput};

/// Accounts an obligation posts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationAccounting {
    /// Journal type of the entry.
    pub journal_type: String,
    /// Expense account debited with the gross amount.
    pub expense_account: String,
    /// Payable account credited with the net amount.
    pub payable_account: String,
    /// Withholding account credited with the deductions.
    pub withholding_account: Option<String>,
}

impl ObligationAccounting {
    /// Creates a mapping without a withholding account.
    #[must_use]
    pub fn new(
        journal_type: impl Into<String>,
        expense_account: impl Into<String>,
        payable_account: impl Into<String>,
    ) -> Self {
        Self {
            journal_type: journal_type.into(),
            expense_account: expense_account.into(),
            payable_account: payable_account.into(),
            withholding_account: None,
        }
    }

    /// Sets the withholding account.
    #[must_use]
    pub fn with_withholding(mut self, account: impl Into<String>) -> Self {
        self.withholding_account = Some(account.into());
        self
    }

    /// Builds the journal entry draft of an obligation.
    ///
    /// # Errors
    ///
    /// Returns `MissingWithholdingAccount` if the obligation has deductions
    /// and no withholding account is mapped.
    pub fn draft_for(
        &self,
        obligation: &Obligation,
        currency: Currency,
    ) -> Result<JournalEntryDraft, BudgetError> {
        let description = format!("Obligation {}: {}", obligation.number, obligation.concept);
        let mut draft = JournalEntryDraft::new(
            self.journal_type.clone(),
            obligation.date,
            description,
            currency,
        )
        .with_reference(obligation.number.clone())
        .line(JournalLineInput::debit(
            self.expense_account.clone(),
            obligation.gross_amount,
        ))
        .line(JournalLineInput::credit(
            self.payable_account.clone(),
            obligation.net_amount,
        ));

        if obligation.deductions > Decimal::ZERO {
            let account = self
                .withholding_account
                .clone()
                .ok_or(BudgetError::MissingWithholdingAccount)?;
            draft = draft.line(JournalLineInput::credit(account, obligation.deductions));
        }
        Ok(draft)
    }
}
