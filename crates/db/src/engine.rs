//! The engine facade.
//!
//! `Engine` is the outward interface of the financial core. Every call takes
//! an explicit [`OperationContext`] and runs as one store transaction.

use std::sync::Arc;

use chrono::NaiveDate;
use erario_core::accounts::{Account, AccountError, NewAccount};
use erario_core::budget::{
    Availability, BudgetError, BudgetEvent, BudgetModification, BudgetRubro, Cdp, CdpRequest,
    ModificationRequest, NewRubro, Obligation, ObligationAccounting, ObligationRequest, Payment,
    Rp, RpRequest,
};
use erario_core::ledger::{
    AccountBalance, FiscalPeriod, JournalEntryDraft, JournalType, PostedEntry, PostingError,
};
use erario_shared::types::{CdpId, JournalEntryId, ObligationId, PaymentId, RpId, RubroId};
use erario_shared::{AppConfig, OperationContext};
use rust_decimal::Decimal;

use crate::repositories::{AccountRepository, BudgetRepository, LedgerRepository};
use crate::store::MemoryStore;

/// Accounting and budget engine over a shared store.
#[derive(Debug, Clone)]
pub struct Engine {
    accounts: AccountRepository,
    ledger: LedgerRepository,
    budget: BudgetRepository,
}

impl Engine {
    /// Creates an engine over a fresh store.
    #[must_use]
    pub fn new(config: &AppConfig) -> Self {
        let store = Arc::new(MemoryStore::new(&config.store, config.ledger.balance_tolerance()));
        Self {
            accounts: AccountRepository::new(Arc::clone(&store)),
            ledger: LedgerRepository::new(Arc::clone(&store), config.ledger.clone()),
            budget: BudgetRepository::new(store, config.ledger.clone()),
        }
    }

    // ========== Accounts ==========

    /// See [`AccountRepository::create_account`].
    pub async fn create_account(
        &self,
        ctx: &OperationContext,
        input: NewAccount,
    ) -> Result<Account, AccountError> {
        self.accounts.create_account(ctx, input).await
    }

    /// See [`AccountRepository::deactivate_account`].
    pub async fn deactivate_account(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<Account, AccountError> {
        self.accounts.deactivate_account(ctx, code).await
    }

    /// See [`AccountRepository::delete_account`].
    pub async fn delete_account(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<Account, AccountError> {
        self.accounts.delete_account(ctx, code).await
    }

    /// See [`AccountRepository::account`].
    pub async fn account(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<Account, AccountError> {
        self.accounts.account(ctx, code).await
    }

    // ========== Ledger ==========

    /// See [`LedgerRepository::open_period`].
    pub async fn open_period(
        &self,
        ctx: &OperationContext,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FiscalPeriod, PostingError> {
        self.ledger.open_period(ctx, name, start_date, end_date).await
    }

    /// See [`LedgerRepository::close_period`].
    pub async fn close_period(&self, ctx: &OperationContext) -> Result<FiscalPeriod, PostingError> {
        self.ledger.close_period(ctx).await
    }

    /// See [`LedgerRepository::create_journal_type`].
    pub async fn create_journal_type(
        &self,
        ctx: &OperationContext,
        journal_type: JournalType,
    ) -> Result<(), PostingError> {
        self.ledger.create_journal_type(ctx, journal_type).await
    }

    /// See [`LedgerRepository::post_journal_entry`].
    pub async fn post_journal_entry(
        &self,
        ctx: &OperationContext,
        draft: &JournalEntryDraft,
    ) -> Result<PostedEntry, PostingError> {
        self.ledger.post_journal_entry(ctx, draft).await
    }

    /// See [`LedgerRepository::reverse_journal_entry`].
    pub async fn reverse_journal_entry(
        &self,
        ctx: &OperationContext,
        entry_id: JournalEntryId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<PostedEntry, PostingError> {
        self.ledger
            .reverse_journal_entry(ctx, entry_id, date, reason)
            .await
    }

    /// See [`LedgerRepository::journal_entry`].
    pub async fn journal_entry(
        &self,
        ctx: &OperationContext,
        entry_id: JournalEntryId,
    ) -> Result<PostedEntry, PostingError> {
        self.ledger.journal_entry(ctx, entry_id).await
    }

    /// See [`LedgerRepository::account_balance`].
    pub async fn account_balance(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<AccountBalance, AccountError> {
        self.ledger.account_balance(ctx, code).await
    }

    // ========== Rubros ==========

    /// See [`BudgetRepository::create_rubro`].
    pub async fn create_rubro(
        &self,
        ctx: &OperationContext,
        input: NewRubro,
    ) -> Result<BudgetRubro, BudgetError> {
        self.budget.create_rubro(ctx, input).await
    }

    /// See [`BudgetRepository::deactivate_rubro`].
    pub async fn deactivate_rubro(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<BudgetRubro, BudgetError> {
        self.budget.deactivate_rubro(ctx, id).await
    }

    /// See [`BudgetRepository::rubro`].
    pub async fn rubro(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<BudgetRubro, BudgetError> {
        self.budget.rubro(ctx, id).await
    }

    /// See [`BudgetRepository::rubro_rollup`].
    pub async fn rubro_rollup(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<BudgetRubro, BudgetError> {
        self.budget.rubro_rollup(ctx, id).await
    }

    /// See [`BudgetRepository::query_available`].
    pub async fn query_available(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<Availability, BudgetError> {
        self.budget.query_available(ctx, id).await
    }

    // ========== Pipeline ==========

    /// See [`BudgetRepository::issue_cdp`].
    pub async fn issue_cdp(
        &self,
        ctx: &OperationContext,
        request: &CdpRequest,
    ) -> Result<Cdp, BudgetError> {
        self.budget.issue_cdp(ctx, request).await
    }

    /// See [`BudgetRepository::approve_cdp`].
    pub async fn approve_cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        self.budget.approve_cdp(ctx, id).await
    }

    /// See [`BudgetRepository::cancel_cdp`].
    pub async fn cancel_cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        self.budget.cancel_cdp(ctx, id).await
    }

    /// See [`BudgetRepository::expire_cdp`].
    pub async fn expire_cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        self.budget.expire_cdp(ctx, id).await
    }

    /// See [`BudgetRepository::cdp`].
    pub async fn cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        self.budget.cdp(ctx, id).await
    }

    /// See [`BudgetRepository::commit_rp`].
    pub async fn commit_rp(
        &self,
        ctx: &OperationContext,
        request: &RpRequest,
    ) -> Result<Rp, BudgetError> {
        self.budget.commit_rp(ctx, request).await
    }

    /// See [`BudgetRepository::approve_rp`].
    pub async fn approve_rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        self.budget.approve_rp(ctx, id).await
    }

    /// See [`BudgetRepository::cancel_rp`].
    pub async fn cancel_rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        self.budget.cancel_rp(ctx, id).await
    }

    /// See [`BudgetRepository::reverse_rp`].
    pub async fn reverse_rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        self.budget.reverse_rp(ctx, id).await
    }

    /// See [`BudgetRepository::rp`].
    pub async fn rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        self.budget.rp(ctx, id).await
    }

    /// See [`BudgetRepository::accrue_obligation`].
    pub async fn accrue_obligation(
        &self,
        ctx: &OperationContext,
        request: &ObligationRequest,
        accounting: Option<&ObligationAccounting>,
    ) -> Result<Obligation, BudgetError> {
        self.budget.accrue_obligation(ctx, request, accounting).await
    }

    /// See [`BudgetRepository::approve_obligation`].
    pub async fn approve_obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        self.budget.approve_obligation(ctx, id).await
    }

    /// See [`BudgetRepository::cancel_obligation`].
    pub async fn cancel_obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        self.budget.cancel_obligation(ctx, id).await
    }

    /// See [`BudgetRepository::obligation`].
    pub async fn obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        self.budget.obligation(ctx, id).await
    }

    /// See [`BudgetRepository::pay_obligation`].
    pub async fn pay_obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
        date: NaiveDate,
        amount: Decimal,
    ) -> Result<Payment, BudgetError> {
        self.budget.pay_obligation(ctx, id, date, amount).await
    }

    /// See [`BudgetRepository::reverse_payment`].
    pub async fn reverse_payment(
        &self,
        ctx: &OperationContext,
        id: PaymentId,
    ) -> Result<Payment, BudgetError> {
        self.budget.reverse_payment(ctx, id).await
    }

    // ========== Modifications and events ==========

    /// See [`BudgetRepository::apply_budget_modification`].
    pub async fn apply_budget_modification(
        &self,
        ctx: &OperationContext,
        request: &ModificationRequest,
    ) -> Result<BudgetModification, BudgetError> {
        self.budget.apply_budget_modification(ctx, request).await
    }

    /// See [`BudgetRepository::budget_events`].
    pub async fn budget_events(
        &self,
        ctx: &OperationContext,
    ) -> Result<Vec<BudgetEvent>, BudgetError> {
        self.budget.budget_events(ctx).await
    }
}
