//! Ledger repository: periods, journal types, posting and balances.

use std::sync::Arc;

use chrono::NaiveDate;
use erario_core::accounts::AccountError;
use erario_core::ledger::{
    AccountBalance, FiscalPeriod, JournalEntryDraft, JournalType, PostedEntry, PostingError,
};
use erario_shared::OperationContext;
use erario_shared::config::LedgerConfig;
use erario_shared::types::JournalEntryId;
use tracing::{info, warn};

use crate::store::MemoryStore;

/// Ledger repository for posting operations.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    store: Arc<MemoryStore>,
    config: LedgerConfig,
}

fn rejected(operation: &'static str) -> impl Fn(&PostingError) {
    move |err| {
        warn!(
            operation,
            error_code = err.error_code(),
            error = %err,
            "Ledger operation rejected"
        );
    }
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(store: Arc<MemoryStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    /// Opens the context's fiscal period, or reopens it if closed.
    ///
    /// # Errors
    ///
    /// Returns `PeriodAlreadyOpen`, `InvalidPeriodRange` or `ConcurrencyConflict`.
    pub async fn open_period(
        &self,
        ctx: &OperationContext,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FiscalPeriod, PostingError> {
        let period = self
            .store
            .transaction(ctx.company_id, |books| {
                books
                    .ledger
                    .open_period(ctx.fiscal_period_id, name, start_date, end_date)
            })
            .await
            .inspect_err(rejected("open_period"))?;

        info!(company_id = %ctx.company_id, period_id = %period.id, name, "Fiscal period opened");
        Ok(period)
    }

    /// Closes the context's fiscal period.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound` or `ConcurrencyConflict`.
    pub async fn close_period(&self, ctx: &OperationContext) -> Result<FiscalPeriod, PostingError> {
        let period = self
            .store
            .transaction(ctx.company_id, |books| {
                books.ledger.close_period(ctx.fiscal_period_id)
            })
            .await
            .inspect_err(rejected("close_period"))?;

        info!(company_id = %ctx.company_id, period_id = %period.id, "Fiscal period closed");
        Ok(period)
    }

    /// Registers a journal type and its numbering sequence.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateJournalType` or `ConcurrencyConflict`.
    pub async fn create_journal_type(
        &self,
        ctx: &OperationContext,
        journal_type: JournalType,
    ) -> Result<(), PostingError> {
        let code = journal_type.code.clone();
        self.store
            .transaction(ctx.company_id, |books| {
                books.ledger.register_journal_type(journal_type)
            })
            .await
            .inspect_err(rejected("create_journal_type"))?;

        info!(company_id = %ctx.company_id, code = %code, "Journal type registered");
        Ok(())
    }

    /// Validates, numbers and posts a journal entry.
    ///
    /// # Errors
    ///
    /// Returns any `PostingError`; nothing is written on failure.
    pub async fn post_journal_entry(
        &self,
        ctx: &OperationContext,
        draft: &JournalEntryDraft,
    ) -> Result<PostedEntry, PostingError> {
        let entry = self
            .store
            .transaction(ctx.company_id, |books| {
                books.ledger.post(ctx, draft, &self.config)
            })
            .await
            .inspect_err(rejected("post_journal_entry"))?;

        info!(
            company_id = %ctx.company_id,
            entry_id = %entry.id,
            number = %entry.number,
            debit = %entry.totals.debit,
            credit = %entry.totals.credit,
            "Journal entry posted"
        );
        Ok(entry)
    }

    /// Posts the reversing entry of a posted entry.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `AlreadyReversed`, `CannotReverseReversal`
    /// or any posting error of the reversing entry.
    pub async fn reverse_journal_entry(
        &self,
        ctx: &OperationContext,
        entry_id: JournalEntryId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<PostedEntry, PostingError> {
        let reversal = self
            .store
            .transaction(ctx.company_id, |books| {
                books.ledger.reverse(ctx, entry_id, date, reason, &self.config)
            })
            .await
            .inspect_err(rejected("reverse_journal_entry"))?;

        info!(
            company_id = %ctx.company_id,
            entry_id = %entry_id,
            reversal_id = %reversal.id,
            number = %reversal.number,
            "Journal entry reversed"
        );
        Ok(reversal)
    }

    /// Looks a posted entry up.
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound` or `ConcurrencyConflict`.
    pub async fn journal_entry(
        &self,
        ctx: &OperationContext,
        entry_id: JournalEntryId,
    ) -> Result<PostedEntry, PostingError> {
        self.store
            .read(ctx.company_id, |books| {
                books
                    .ledger
                    .entry(entry_id)
                    .cloned()
                    .ok_or(PostingError::EntryNotFound(entry_id))
            })
            .await
    }

    /// Balance of an account in the context's period, rolled up for
    /// aggregation accounts.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `ConcurrencyConflict`.
    pub async fn account_balance(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<AccountBalance, AccountError> {
        self.store
            .read(ctx.company_id, |books| {
                books.ledger.account_balance(code, ctx.fiscal_period_id)
            })
            .await
    }
}
