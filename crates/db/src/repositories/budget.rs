//! Budget repository: rubros, the commitment pipeline and modifications.
//!
//! Obligations with an accounting mapping post their journal entry in the
//! same transaction as the accrual, and cancelling such an obligation
//! reverses that entry in the same transaction as the release.

use std::sync::Arc;

use chrono::NaiveDate;
use erario_core::budget::{
    Availability, BudgetError, BudgetEvent, BudgetModification, BudgetRubro, Cdp, CdpRequest,
    ModificationRequest, NewRubro, Obligation, ObligationAccounting, ObligationRequest, Payment,
    Rp, RpRequest,
};
use erario_shared::OperationContext;
use erario_shared::config::LedgerConfig;
use erario_shared::types::{CdpId, ObligationId, PaymentId, RpId, RubroId};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::store::{CompanyBooks, MemoryStore};

/// Budget repository for budget execution operations.
#[derive(Debug, Clone)]
pub struct BudgetRepository {
    store: Arc<MemoryStore>,
    config: LedgerConfig,
}

fn rejected(operation: &'static str) -> impl Fn(&BudgetError) {
    move |err| {
        warn!(
            operation,
            error_code = err.error_code(),
            error = %err,
            "Budget operation rejected"
        );
    }
}

impl BudgetRepository {
    /// Creates a new budget repository.
    #[must_use]
    pub const fn new(store: Arc<MemoryStore>, config: LedgerConfig) -> Self {
        Self { store, config }
    }

    // ========== Rubros ==========

    /// Creates a rubro in the context's period.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateRubro`, a `Hierarchy` error, `InvalidAmount`,
    /// `RubroNotPostable` or `ConcurrencyConflict`.
    pub async fn create_rubro(
        &self,
        ctx: &OperationContext,
        input: NewRubro,
    ) -> Result<BudgetRubro, BudgetError> {
        let rubro = self
            .store
            .transaction(ctx.company_id, |books| books.budget.create_rubro(ctx, input))
            .await
            .inspect_err(rejected("create_rubro"))?;

        info!(
            company_id = %ctx.company_id,
            rubro_id = %rubro.id,
            code = %rubro.code,
            appropriation = %rubro.initial_appropriation,
            "Rubro created"
        );
        Ok(rubro)
    }

    /// Deactivates a rubro.
    ///
    /// # Errors
    ///
    /// Returns `RubroNotFound` or `ConcurrencyConflict`.
    pub async fn deactivate_rubro(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<BudgetRubro, BudgetError> {
        let rubro = self
            .store
            .transaction(ctx.company_id, |books| books.budget.deactivate_rubro(ctx, id))
            .await
            .inspect_err(rejected("deactivate_rubro"))?;

        info!(company_id = %ctx.company_id, code = %rubro.code, "Rubro deactivated");
        Ok(rubro)
    }

    /// Looks a rubro up.
    ///
    /// # Errors
    ///
    /// Returns `RubroNotFound` or `ConcurrencyConflict`.
    pub async fn rubro(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<BudgetRubro, BudgetError> {
        self.store
            .read(ctx.company_id, |books| {
                books
                    .budget
                    .rubro(id)
                    .cloned()
                    .ok_or_else(|| BudgetError::rubro_not_found(id))
            })
            .await
    }

    /// Roll-up of a rubro over its detail descendants.
    ///
    /// # Errors
    ///
    /// Returns `RubroNotFound` or `ConcurrencyConflict`.
    pub async fn rubro_rollup(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<BudgetRubro, BudgetError> {
        self.store
            .read(ctx.company_id, |books| books.budget.rubro_rollup(id))
            .await
    }

    /// Available balances of a rubro.
    ///
    /// # Errors
    ///
    /// Returns `RubroNotFound` or `ConcurrencyConflict`.
    pub async fn query_available(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<Availability, BudgetError> {
        self.store
            .read(ctx.company_id, |books| books.budget.query_available(id))
            .await
    }

    // ========== CDP ==========

    /// Issues a CDP.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientAppropriation` if any rubro lacks appropriation,
    /// or any validation error of the request.
    pub async fn issue_cdp(
        &self,
        ctx: &OperationContext,
        request: &CdpRequest,
    ) -> Result<Cdp, BudgetError> {
        let cdp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.issue_cdp(ctx, request))
            .await
            .inspect_err(rejected("issue_cdp"))?;

        info!(
            company_id = %ctx.company_id,
            cdp_id = %cdp.id,
            number = %cdp.number,
            total = %cdp.total_amount,
            "CDP issued"
        );
        Ok(cdp)
    }

    /// Approves a CDP.
    ///
    /// # Errors
    ///
    /// Returns `CdpNotFound` or `InvalidTransition`.
    pub async fn approve_cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        let cdp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.approve_cdp(ctx, id))
            .await
            .inspect_err(rejected("approve_cdp"))?;

        info!(company_id = %ctx.company_id, number = %cdp.number, "CDP approved");
        Ok(cdp)
    }

    /// Cancels a CDP nothing has been committed against.
    ///
    /// # Errors
    ///
    /// Returns `CdpNotFound`, `AlreadyConsumed` or `InvalidTransition`.
    pub async fn cancel_cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        let cdp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.cancel_cdp(ctx, id))
            .await
            .inspect_err(rejected("cancel_cdp"))?;

        info!(company_id = %ctx.company_id, number = %cdp.number, "CDP cancelled");
        Ok(cdp)
    }

    /// Expires a CDP, releasing its uncommitted remainder.
    ///
    /// # Errors
    ///
    /// Returns `CdpNotFound` or `InvalidTransition`.
    pub async fn expire_cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        let cdp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.expire_cdp(ctx, id))
            .await
            .inspect_err(rejected("expire_cdp"))?;

        info!(company_id = %ctx.company_id, number = %cdp.number, "CDP expired");
        Ok(cdp)
    }

    /// Looks a CDP up.
    ///
    /// # Errors
    ///
    /// Returns `CdpNotFound` or `ConcurrencyConflict`.
    pub async fn cdp(&self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        self.store
            .read(ctx.company_id, |books| {
                books.budget.cdp(id).cloned().ok_or(BudgetError::CdpNotFound(id))
            })
            .await
    }

    // ========== RP ==========

    /// Commits an RP against CDP details.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientCdp`, `InvalidTransition` or any validation error.
    pub async fn commit_rp(
        &self,
        ctx: &OperationContext,
        request: &RpRequest,
    ) -> Result<Rp, BudgetError> {
        let rp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.commit_rp(ctx, request))
            .await
            .inspect_err(rejected("commit_rp"))?;

        info!(
            company_id = %ctx.company_id,
            rp_id = %rp.id,
            number = %rp.number,
            total = %rp.total_amount,
            beneficiary = %rp.beneficiary_id,
            "RP committed"
        );
        Ok(rp)
    }

    /// Approves an RP.
    ///
    /// # Errors
    ///
    /// Returns `RpNotFound` or `InvalidTransition`.
    pub async fn approve_rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        let rp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.approve_rp(ctx, id))
            .await
            .inspect_err(rejected("approve_rp"))?;

        info!(company_id = %ctx.company_id, number = %rp.number, "RP approved");
        Ok(rp)
    }

    /// Cancels an RP without obligations.
    ///
    /// # Errors
    ///
    /// Returns `RpNotFound`, `AlreadyConsumed` or `InvalidTransition`.
    pub async fn cancel_rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        let rp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.cancel_rp(ctx, id))
            .await
            .inspect_err(rejected("cancel_rp"))?;

        info!(company_id = %ctx.company_id, number = %rp.number, "RP cancelled");
        Ok(rp)
    }

    /// Reverses an RP's un-obligated remainder.
    ///
    /// # Errors
    ///
    /// Returns `RpNotFound` or `InvalidTransition`.
    pub async fn reverse_rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        let rp = self
            .store
            .transaction(ctx.company_id, |books| books.budget.reverse_rp(ctx, id))
            .await
            .inspect_err(rejected("reverse_rp"))?;

        info!(
            company_id = %ctx.company_id,
            number = %rp.number,
            released = %rp.released_amount,
            "RP reversed"
        );
        Ok(rp)
    }

    /// Looks an RP up.
    ///
    /// # Errors
    ///
    /// Returns `RpNotFound` or `ConcurrencyConflict`.
    pub async fn rp(&self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        self.store
            .read(ctx.company_id, |books| {
                books.budget.rp(id).cloned().ok_or(BudgetError::RpNotFound(id))
            })
            .await
    }

    // ========== Obligation ==========

    /// Accrues an obligation, posting its journal entry when `accounting` is given.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientRp`, `DeductionsExceedGross`, `InvalidTransition`,
    /// `MissingWithholdingAccount`, or the `Posting` error of the entry.
    pub async fn accrue_obligation(
        &self,
        ctx: &OperationContext,
        request: &ObligationRequest,
        accounting: Option<&ObligationAccounting>,
    ) -> Result<Obligation, BudgetError> {
        let obligation = self
            .store
            .transaction(ctx.company_id, |books| {
                let CompanyBooks { ledger, budget } = books;
                budget.accrue_obligation_with(ctx, request, |obligation| {
                    let Some(accounting) = accounting else {
                        return Ok(None);
                    };
                    let draft =
                        accounting.draft_for(obligation, self.config.functional_currency)?;
                    let entry = ledger.post(ctx, &draft, &self.config)?;
                    Ok(Some(entry.id))
                })
            })
            .await
            .inspect_err(rejected("accrue_obligation"))?;

        info!(
            company_id = %ctx.company_id,
            obligation_id = %obligation.id,
            number = %obligation.number,
            gross = %obligation.gross_amount,
            net = %obligation.net_amount,
            journal_entry = ?obligation.journal_entry_id,
            "Obligation accrued"
        );
        Ok(obligation)
    }

    /// Approves an obligation.
    ///
    /// # Errors
    ///
    /// Returns `ObligationNotFound` or `InvalidTransition`.
    pub async fn approve_obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        let obligation = self
            .store
            .transaction(ctx.company_id, |books| books.budget.approve_obligation(ctx, id))
            .await
            .inspect_err(rejected("approve_obligation"))?;

        info!(company_id = %ctx.company_id, number = %obligation.number, "Obligation approved");
        Ok(obligation)
    }

    /// Cancels an unpaid obligation and reverses its journal entry, if any.
    ///
    /// # Errors
    ///
    /// Returns `ObligationNotFound`, `AlreadyConsumed`, `InvalidTransition`,
    /// or the `Posting` error of the reversal.
    pub async fn cancel_obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        let obligation = self
            .store
            .transaction(ctx.company_id, |books| {
                let CompanyBooks { ledger, budget } = books;
                budget.cancel_obligation_with(ctx, id, |obligation| {
                    if let Some(entry_id) = obligation.journal_entry_id {
                        let reason = format!("Cancellation of {}", obligation.number);
                        ledger.reverse(ctx, entry_id, obligation.date, &reason, &self.config)?;
                    }
                    Ok(())
                })
            })
            .await
            .inspect_err(rejected("cancel_obligation"))?;

        info!(company_id = %ctx.company_id, number = %obligation.number, "Obligation cancelled");
        Ok(obligation)
    }

    /// Looks an obligation up.
    ///
    /// # Errors
    ///
    /// Returns `ObligationNotFound` or `ConcurrencyConflict`.
    pub async fn obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        self.store
            .read(ctx.company_id, |books| {
                books
                    .budget
                    .obligation(id)
                    .cloned()
                    .ok_or(BudgetError::ObligationNotFound(id))
            })
            .await
    }

    // ========== Payment ==========

    /// Pays part of an approved obligation.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientObligation`, `InvalidTransition` or `InvalidAmount`.
    pub async fn pay_obligation(
        &self,
        ctx: &OperationContext,
        id: ObligationId,
        date: NaiveDate,
        amount: Decimal,
    ) -> Result<Payment, BudgetError> {
        let payment = self
            .store
            .transaction(ctx.company_id, |books| {
                books.budget.pay_obligation(ctx, id, date, amount)
            })
            .await
            .inspect_err(rejected("pay_obligation"))?;

        info!(
            company_id = %ctx.company_id,
            payment_id = %payment.id,
            number = %payment.number,
            amount = %payment.amount,
            "Payment made"
        );
        Ok(payment)
    }

    /// Reverses a payment.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound` or `InvalidTransition`.
    pub async fn reverse_payment(
        &self,
        ctx: &OperationContext,
        id: PaymentId,
    ) -> Result<Payment, BudgetError> {
        let payment = self
            .store
            .transaction(ctx.company_id, |books| books.budget.reverse_payment(ctx, id))
            .await
            .inspect_err(rejected("reverse_payment"))?;

        info!(company_id = %ctx.company_id, number = %payment.number, "Payment reversed");
        Ok(payment)
    }

    // ========== Modifications and events ==========

    /// Applies an addition, reduction or transfer.
    ///
    /// # Errors
    ///
    /// Returns `UnbalancedModification`, `MovementNotAllowed`,
    /// `NegativeAppropriation` or any validation error.
    pub async fn apply_budget_modification(
        &self,
        ctx: &OperationContext,
        request: &ModificationRequest,
    ) -> Result<BudgetModification, BudgetError> {
        let modification = self
            .store
            .transaction(ctx.company_id, |books| {
                books.budget.apply_modification(ctx, request)
            })
            .await
            .inspect_err(rejected("apply_budget_modification"))?;

        info!(
            company_id = %ctx.company_id,
            number = %modification.number,
            kind = %modification.modification_type,
            total = %modification.total_amount,
            "Budget modification applied"
        );
        Ok(modification)
    }

    /// The company's budget event log, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `ConcurrencyConflict`.
    pub async fn budget_events(
        &self,
        ctx: &OperationContext,
    ) -> Result<Vec<BudgetEvent>, BudgetError> {
        self.store
            .read(ctx.company_id, |books| Ok(books.budget.events().to_vec()))
            .await
    }
}
