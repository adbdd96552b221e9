//! A company's budget book.
//!
//! The book owns the rubro hierarchy, every pipeline document, the document
//! counters and the event log. Mutating methods work on staged copies of the
//! rubros and documents they touch and only write them back once every check
//! has passed, so a rejected call leaves the book untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Utc};
use erario_shared::OperationContext;
use erario_shared::types::{
    BALANCE_TOLERANCE, CdpDetailId, CdpId, FiscalPeriodId, JournalEntryId, ModificationId,
    ObligationId, PaymentId, RpDetailId, RpId, RubroId, has_money_scale, within_tolerance,
};
use rust_decimal::Decimal;

use super::allocation::{spread_proportionally, spread_weighted};
use super::documents::{
    Cdp, CdpDetail, CdpRequest, DocumentState, Obligation, ObligationLine, ObligationRequest,
    Payment, PaymentLine, Rp, RpDetail, RpRequest, validate_amount,
};
use super::error::BudgetError;
use super::events::{Availability, BudgetEvent, BudgetEventKind, RubroSnapshot};
use super::modification::{BudgetModification, ModificationRequest, ModificationService, Movement};
use super::numbering::{DocumentKind, DocumentNumbering};
use super::rubro::{BudgetRubro, NewRubro};
use crate::hierarchy::{self, CodeFormat};

type Staged = BTreeMap<RubroId, BudgetRubro>;

/// Budget of one company.
#[derive(Debug, Clone)]
pub struct BudgetBook {
    tolerance: Decimal,
    rubros: BTreeMap<RubroId, BudgetRubro>,
    by_code: HashMap<(FiscalPeriodId, String), RubroId>,
    cdps: BTreeMap<CdpId, Cdp>,
    rps: BTreeMap<RpId, Rp>,
    obligations: BTreeMap<ObligationId, Obligation>,
    payments: BTreeMap<PaymentId, Payment>,
    modifications: BTreeMap<ModificationId, BudgetModification>,
    numbering: DocumentNumbering,
    events: Vec<BudgetEvent>,
}

impl Default for BudgetBook {
    fn default() -> Self {
        Self::with_tolerance(BALANCE_TOLERANCE)
    }
}

fn invalid_transition(document: &str, state: DocumentState, action: &'static str) -> BudgetError {
    BudgetError::InvalidTransition {
        document: document.to_string(),
        state: state.to_string(),
        action,
    }
}

fn staged_mut(staged: &mut Staged, id: RubroId) -> Result<&mut BudgetRubro, BudgetError> {
    staged.get_mut(&id).ok_or_else(|| BudgetError::rubro_not_found(id))
}

impl BudgetBook {
    /// Creates an empty book using `tolerance` for sum-equality checks.
    #[must_use]
    pub fn with_tolerance(tolerance: Decimal) -> Self {
        Self {
            tolerance,
            rubros: BTreeMap::new(),
            by_code: HashMap::new(),
            cdps: BTreeMap::new(),
            rps: BTreeMap::new(),
            obligations: BTreeMap::new(),
            payments: BTreeMap::new(),
            modifications: BTreeMap::new(),
            numbering: DocumentNumbering::default(),
            events: Vec::new(),
        }
    }

    // ========== Staging ==========

    fn stage(&self, ids: impl IntoIterator<Item = RubroId>) -> Result<Staged, BudgetError> {
        let mut staged = Staged::new();
        for id in ids {
            if !staged.contains_key(&id) {
                let rubro = self
                    .rubros
                    .get(&id)
                    .ok_or_else(|| BudgetError::rubro_not_found(id))?;
                staged.insert(id, rubro.clone());
            }
        }
        Ok(staged)
    }

    fn verify(staged: &Staged) -> Result<(), BudgetError> {
        staged.values().try_for_each(BudgetRubro::check_invariants)
    }

    /// Writes staged rubros back and appends the event. Must only run after
    /// every check of the operation has passed.
    fn commit(
        &mut self,
        ctx: &OperationContext,
        kind: BudgetEventKind,
        document_number: &str,
        staged: Staged,
    ) {
        let snapshots = staged.values().map(RubroSnapshot::from).collect();
        self.rubros.extend(staged);
        self.record(ctx, kind, document_number, snapshots);
    }

    fn record(
        &mut self,
        ctx: &OperationContext,
        kind: BudgetEventKind,
        document_number: &str,
        snapshots: Vec<RubroSnapshot>,
    ) {
        self.events.push(BudgetEvent {
            sequence: self.events.len() as u64 + 1,
            kind,
            document_number: document_number.to_string(),
            actor: ctx.actor_id,
            occurred_at: Utc::now(),
            snapshots,
        });
    }

    // ========== Rubros ==========

    /// Creates a rubro in the context's fiscal period.
    ///
    /// Only detail rubros carry appropriation; aggregation rubros roll up
    /// their descendants.
    ///
    /// # Errors
    ///
    /// - `DuplicateRubro` if the code exists in the period
    /// - `Hierarchy` for a missing parent, a detail parent or a bad code
    /// - `InvalidAmount` for a negative or over-precise appropriation
    /// - `RubroNotPostable` for an aggregation rubro with appropriation
    pub fn create_rubro(
        &mut self,
        ctx: &OperationContext,
        input: NewRubro,
    ) -> Result<BudgetRubro, BudgetError> {
        let period = ctx.fiscal_period_id;
        if self.by_code.contains_key(&(period, input.code.clone())) {
            return Err(BudgetError::DuplicateRubro(input.code));
        }

        let parent = match &input.parent_code {
            Some(code) => Some(
                self.rubro_by_code(period, code)
                    .ok_or_else(|| hierarchy::HierarchyError::MissingParent(code.clone()))?,
            ),
            None => None,
        };
        let level = hierarchy::validate_placement(CodeFormat::Rubro, &input.code, parent)?;
        let parent_id = parent.map(|p| p.id);

        let appropriation = input.initial_appropriation;
        if appropriation < Decimal::ZERO || !has_money_scale(appropriation) {
            return Err(BudgetError::InvalidAmount(appropriation));
        }
        if !input.is_detail && !appropriation.is_zero() {
            return Err(BudgetError::RubroNotPostable(input.code));
        }

        let rubro = BudgetRubro::new(period, input, parent_id, level);
        self.by_code.insert((period, rubro.code.clone()), rubro.id);
        self.rubros.insert(rubro.id, rubro.clone());
        self.record(
            ctx,
            BudgetEventKind::RubroCreated,
            &rubro.code,
            vec![RubroSnapshot::from(&rubro)],
        );
        Ok(rubro)
    }

    /// Deactivates a rubro; it keeps its counters but accepts nothing new.
    ///
    /// # Errors
    ///
    /// Returns `RubroNotFound`.
    pub fn deactivate_rubro(
        &mut self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<BudgetRubro, BudgetError> {
        let rubro = self
            .rubros
            .get_mut(&id)
            .ok_or_else(|| BudgetError::rubro_not_found(id))?;
        rubro.is_active = false;
        let rubro = rubro.clone();
        self.record(
            ctx,
            BudgetEventKind::RubroDeactivated,
            &rubro.code,
            vec![RubroSnapshot::from(&rubro)],
        );
        Ok(rubro)
    }

    /// Looks a rubro up.
    #[must_use]
    pub fn rubro(&self, id: RubroId) -> Option<&BudgetRubro> {
        self.rubros.get(&id)
    }

    /// Looks a rubro up by period and code.
    #[must_use]
    pub fn rubro_by_code(&self, period: FiscalPeriodId, code: &str) -> Option<&BudgetRubro> {
        self.by_code
            .get(&(period, code.to_string()))
            .and_then(|id| self.rubros.get(id))
    }

    /// Rubros of a period.
    pub fn rubros_in(&self, period: FiscalPeriodId) -> impl Iterator<Item = &BudgetRubro> {
        self.rubros
            .values()
            .filter(move |r| r.fiscal_period_id == period)
    }

    /// Roll-up of a rubro: the sum of its detail descendants.
    ///
    /// A detail rubro is returned as is.
    ///
    /// # Errors
    ///
    /// Returns `RubroNotFound` or a `Hierarchy` error for a looping parent chain.
    pub fn rubro_rollup(&self, id: RubroId) -> Result<BudgetRubro, BudgetError> {
        let node = self
            .rubros
            .get(&id)
            .ok_or_else(|| BudgetError::rubro_not_found(id))?;
        if node.is_detail {
            return Ok(node.clone());
        }

        let mut total = node.clone();
        for detail_id in hierarchy::detail_descendants(&self.rubros, id)? {
            if let Some(detail) = self.rubros.get(&detail_id) {
                total.absorb(detail);
            }
        }
        Ok(total)
    }

    /// Available appropriation, CDP and RP balances of a rubro or roll-up.
    ///
    /// # Errors
    ///
    /// See [`Self::rubro_rollup`].
    pub fn query_available(&self, id: RubroId) -> Result<Availability, BudgetError> {
        Ok(Availability::from(&self.rubro_rollup(id)?))
    }

    fn postable_rubro(
        &self,
        ctx: &OperationContext,
        id: RubroId,
    ) -> Result<&BudgetRubro, BudgetError> {
        let rubro = self
            .rubros
            .get(&id)
            .ok_or_else(|| BudgetError::rubro_not_found(id))?;
        if !rubro.is_postable() || rubro.fiscal_period_id != ctx.fiscal_period_id {
            return Err(BudgetError::RubroNotPostable(rubro.code.clone()));
        }
        Ok(rubro)
    }

    // ========== CDP ==========

    /// Issues a CDP, reserving every line's amount in its rubro.
    ///
    /// The reservation is applied at issuance; approval only gates RPs.
    ///
    /// # Errors
    ///
    /// - `ConceptTooShort`, `MissingRequester`
    /// - `EmptyDocument`, `InvalidAmount`, `RubroNotPostable`, `TotalMismatch`
    /// - `InsufficientAppropriation` if any rubro lacks appropriation
    pub fn issue_cdp(
        &mut self,
        ctx: &OperationContext,
        request: &CdpRequest,
    ) -> Result<Cdp, BudgetError> {
        request.validate_header()?;
        if request.lines.is_empty() {
            return Err(BudgetError::EmptyDocument);
        }
        for line in &request.lines {
            validate_amount(line.amount)?;
            self.postable_rubro(ctx, line.rubro_id)?;
        }

        let total: Decimal = request.lines.iter().map(|l| l.amount).sum();
        if let Some(header) = request.total_amount
            && !within_tolerance(header, total, self.tolerance)
        {
            return Err(BudgetError::TotalMismatch {
                total: header,
                details: total,
            });
        }

        let mut staged = self.stage(request.lines.iter().map(|l| l.rubro_id))?;
        let mut details = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let rubro = staged_mut(&mut staged, line.rubro_id)?;
            rubro.reserve_cdp(line.amount)?;
            details.push(CdpDetail {
                id: CdpDetailId::new(),
                rubro_id: line.rubro_id,
                rubro_code: rubro.code.clone(),
                amount: line.amount,
                committed_amount: Decimal::ZERO,
                released_amount: Decimal::ZERO,
            });
        }
        Self::verify(&staged)?;

        let cdp = Cdp {
            id: CdpId::new(),
            number: self.numbering.next(DocumentKind::Cdp, request.date.year()),
            company_id: ctx.company_id,
            fiscal_period_id: ctx.fiscal_period_id,
            date: request.date,
            concept: request.concept.clone(),
            requested_by: request.requested_by.clone(),
            request_area: request.request_area.clone(),
            expiry_date: request.expiry_date,
            total_amount: total,
            committed_amount: Decimal::ZERO,
            state: DocumentState::Draft,
            details,
            created_by: ctx.actor_id,
            approved_by: None,
        };

        self.commit(ctx, BudgetEventKind::CdpIssued, &cdp.number, staged);
        self.cdps.insert(cdp.id, cdp.clone());
        Ok(cdp)
    }

    /// Approves a draft CDP so RPs can draw on it.
    ///
    /// # Errors
    ///
    /// Returns `CdpNotFound` or `InvalidTransition` unless the CDP is a draft.
    pub fn approve_cdp(&mut self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        let cdp = self.cdps.get_mut(&id).ok_or(BudgetError::CdpNotFound(id))?;
        if cdp.state != DocumentState::Draft {
            return Err(invalid_transition(&cdp.number, cdp.state, "approve"));
        }
        cdp.state = DocumentState::Approved;
        cdp.approved_by = Some(ctx.actor_id);

        let cdp = cdp.clone();
        self.record(ctx, BudgetEventKind::CdpApproved, &cdp.number, Vec::new());
        Ok(cdp)
    }

    /// Cancels a CDP nothing has been committed against, releasing all of it.
    ///
    /// # Errors
    ///
    /// Returns `CdpNotFound`, `InvalidTransition` for a terminal CDP, or
    /// `AlreadyConsumed` if RPs committed part of it.
    pub fn cancel_cdp(&mut self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        let cdp = self.cdps.get(&id).ok_or(BudgetError::CdpNotFound(id))?;
        if !cdp.state.is_terminal() && cdp.committed_amount > Decimal::ZERO {
            return Err(BudgetError::AlreadyConsumed {
                document: cdp.number.clone(),
                consumed: cdp.committed_amount,
            });
        }
        self.release_cdp(
            ctx,
            id,
            DocumentState::Cancelled,
            "cancel",
            BudgetEventKind::CdpCancelled,
        )
    }

    /// Expires a CDP, releasing the uncommitted remainder of every detail.
    ///
    /// # Errors
    ///
    /// Returns `CdpNotFound` or `InvalidTransition` for a terminal CDP.
    pub fn expire_cdp(&mut self, ctx: &OperationContext, id: CdpId) -> Result<Cdp, BudgetError> {
        self.release_cdp(
            ctx,
            id,
            DocumentState::Expired,
            "expire",
            BudgetEventKind::CdpExpired,
        )
    }

    fn release_cdp(
        &mut self,
        ctx: &OperationContext,
        id: CdpId,
        target: DocumentState,
        action: &'static str,
        kind: BudgetEventKind,
    ) -> Result<Cdp, BudgetError> {
        let mut cdp = self
            .cdps
            .get(&id)
            .ok_or(BudgetError::CdpNotFound(id))?
            .clone();
        if cdp.state.is_terminal() {
            return Err(invalid_transition(&cdp.number, cdp.state, action));
        }

        let mut staged = self.stage(cdp.details.iter().map(|d| d.rubro_id))?;
        for detail in &mut cdp.details {
            let remainder = detail.available();
            staged_mut(&mut staged, detail.rubro_id)?.release_cdp(remainder)?;
            detail.released_amount += remainder;
        }
        cdp.state = target;
        Self::verify(&staged)?;

        self.commit(ctx, kind, &cdp.number, staged);
        self.cdps.insert(cdp.id, cdp.clone());
        Ok(cdp)
    }

    /// Looks a CDP up.
    #[must_use]
    pub fn cdp(&self, id: CdpId) -> Option<&Cdp> {
        self.cdps.get(&id)
    }

    // ========== RP ==========

    /// Commits an RP against one or more CDP details.
    ///
    /// # Errors
    ///
    /// - `EmptyDocument`, `InvalidAmount`
    /// - `CdpNotFound` for an unknown CDP or detail
    /// - `InvalidTransition` if a CDP is not approved
    /// - `CdpExpired` if the RP is dated after a CDP's expiry date
    /// - `InsufficientCdp` if a detail has less available than requested
    pub fn commit_rp(
        &mut self,
        ctx: &OperationContext,
        request: &RpRequest,
    ) -> Result<Rp, BudgetError> {
        if request.lines.is_empty() {
            return Err(BudgetError::EmptyDocument);
        }

        let mut cdps: BTreeMap<CdpId, Cdp> = BTreeMap::new();
        let mut rubro_ids = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            validate_amount(line.amount)?;
            let cdp = self
                .cdps
                .get(&line.cdp_id)
                .ok_or(BudgetError::CdpNotFound(line.cdp_id))?;
            if !cdp.state.accepts_consumption() {
                return Err(invalid_transition(&cdp.number, cdp.state, "commit"));
            }
            if let Some(expiry_date) = cdp.expiry_date
                && cdp.is_expired_on(request.date)
            {
                return Err(BudgetError::CdpExpired {
                    document: cdp.number.clone(),
                    expiry_date,
                });
            }
            let detail = cdp
                .detail(line.cdp_detail_id)
                .ok_or(BudgetError::CdpNotFound(line.cdp_id))?;
            rubro_ids.push(detail.rubro_id);
            cdps.entry(cdp.id).or_insert_with(|| cdp.clone());
        }

        let mut staged = self.stage(rubro_ids)?;
        let mut details = Vec::with_capacity(request.lines.len());
        for line in &request.lines {
            let cdp = cdps
                .get_mut(&line.cdp_id)
                .ok_or(BudgetError::CdpNotFound(line.cdp_id))?;
            let number = cdp.number.clone();
            let detail = cdp
                .detail_mut(line.cdp_detail_id)
                .ok_or(BudgetError::CdpNotFound(line.cdp_id))?;

            let available = detail.available();
            if line.amount > available {
                return Err(BudgetError::InsufficientCdp {
                    document: number,
                    rubro: detail.rubro_code.clone(),
                    requested: line.amount,
                    available,
                });
            }
            detail.committed_amount += line.amount;
            let (rubro_id, rubro_code) = (detail.rubro_id, detail.rubro_code.clone());
            cdp.committed_amount += line.amount;
            staged_mut(&mut staged, rubro_id)?.add_rp(line.amount)?;

            details.push(RpDetail {
                id: RpDetailId::new(),
                cdp_id: line.cdp_id,
                cdp_detail_id: line.cdp_detail_id,
                rubro_id,
                rubro_code,
                amount: line.amount,
                obligated_amount: Decimal::ZERO,
                released_amount: Decimal::ZERO,
            });
        }
        cdps.values_mut().for_each(Cdp::settle);
        Self::verify(&staged)?;

        let rp = Rp {
            id: RpId::new(),
            number: self.numbering.next(DocumentKind::Rp, request.date.year()),
            company_id: ctx.company_id,
            fiscal_period_id: ctx.fiscal_period_id,
            date: request.date,
            beneficiary_id: request.beneficiary_id.clone(),
            beneficiary_name: request.beneficiary_name.clone(),
            contract_type: request.contract_type,
            contract_number: request.contract_number.clone(),
            concept: request.concept.clone(),
            total_amount: details.iter().map(|d| d.amount).sum(),
            obligated_amount: Decimal::ZERO,
            released_amount: Decimal::ZERO,
            state: DocumentState::Draft,
            details,
            created_by: ctx.actor_id,
            approved_by: None,
        };

        self.commit(ctx, BudgetEventKind::RpCommitted, &rp.number, staged);
        self.cdps.extend(cdps);
        self.rps.insert(rp.id, rp.clone());
        Ok(rp)
    }

    /// Approves a draft RP so obligations can draw on it.
    ///
    /// # Errors
    ///
    /// Returns `RpNotFound` or `InvalidTransition` unless the RP is a draft.
    pub fn approve_rp(&mut self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        let rp = self.rps.get_mut(&id).ok_or(BudgetError::RpNotFound(id))?;
        if rp.state != DocumentState::Draft {
            return Err(invalid_transition(&rp.number, rp.state, "approve"));
        }
        rp.state = DocumentState::Approved;
        rp.approved_by = Some(ctx.actor_id);

        let rp = rp.clone();
        self.record(ctx, BudgetEventKind::RpApproved, &rp.number, Vec::new());
        Ok(rp)
    }

    /// Cancels an RP without obligations, returning everything to its CDPs.
    ///
    /// # Errors
    ///
    /// Returns `RpNotFound`, `AlreadyConsumed` if obligations drew on it, or
    /// `InvalidTransition` if the RP is terminal.
    pub fn cancel_rp(&mut self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        let rp = self.rps.get(&id).ok_or(BudgetError::RpNotFound(id))?;
        if !rp.state.is_terminal() && rp.obligated_amount > Decimal::ZERO {
            return Err(BudgetError::AlreadyConsumed {
                document: rp.number.clone(),
                consumed: rp.obligated_amount,
            });
        }
        self.release_rp(
            ctx,
            id,
            DocumentState::Cancelled,
            "cancel",
            BudgetEventKind::RpCancelled,
        )
    }

    /// Reverses an approved RP, returning its un-obligated remainder to the
    /// CDP details and rubros.
    ///
    /// # Errors
    ///
    /// Returns `RpNotFound` or `InvalidTransition` if the RP is not approved.
    pub fn reverse_rp(&mut self, ctx: &OperationContext, id: RpId) -> Result<Rp, BudgetError> {
        let rp = self.rps.get(&id).ok_or(BudgetError::RpNotFound(id))?;
        if !rp.state.accepts_consumption() {
            return Err(invalid_transition(&rp.number, rp.state, "reverse"));
        }
        self.release_rp(
            ctx,
            id,
            DocumentState::Reversed,
            "reverse",
            BudgetEventKind::RpReversed,
        )
    }

    fn release_rp(
        &mut self,
        ctx: &OperationContext,
        id: RpId,
        target: DocumentState,
        action: &'static str,
        kind: BudgetEventKind,
    ) -> Result<Rp, BudgetError> {
        let mut rp = self.rps.get(&id).ok_or(BudgetError::RpNotFound(id))?.clone();
        if rp.state.is_terminal() {
            return Err(invalid_transition(&rp.number, rp.state, action));
        }

        let mut cdps = self.source_cdps(&rp.details)?;
        let mut staged = self.stage(rp.details.iter().map(|d| d.rubro_id))?;
        let mut released = Decimal::ZERO;
        for detail in &mut rp.details {
            let remainder = detail.available();
            Self::return_to_cdp(&mut cdps, &mut staged, detail, remainder)?;
            detail.released_amount += remainder;
            released += remainder;
        }
        rp.released_amount += released;
        rp.state = target;
        cdps.values_mut().for_each(Cdp::settle);
        Self::verify(&staged)?;

        self.commit(ctx, kind, &rp.number, staged);
        self.cdps.extend(cdps);
        self.rps.insert(rp.id, rp.clone());
        Ok(rp)
    }

    fn source_cdps(&self, details: &[RpDetail]) -> Result<BTreeMap<CdpId, Cdp>, BudgetError> {
        let mut cdps = BTreeMap::new();
        for detail in details {
            let cdp = self
                .cdps
                .get(&detail.cdp_id)
                .ok_or(BudgetError::CdpNotFound(detail.cdp_id))?;
            cdps.entry(cdp.id).or_insert_with(|| cdp.clone());
        }
        Ok(cdps)
    }

    /// Hands `amount` committed by an RP detail back to its CDP detail.
    ///
    /// An expired or cancelled CDP cannot hold it again, so the reservation
    /// goes straight back to the rubro's appropriation.
    fn return_to_cdp(
        cdps: &mut BTreeMap<CdpId, Cdp>,
        staged: &mut Staged,
        detail: &RpDetail,
        amount: Decimal,
    ) -> Result<(), BudgetError> {
        let cdp = cdps
            .get_mut(&detail.cdp_id)
            .ok_or(BudgetError::CdpNotFound(detail.cdp_id))?;
        let closed = cdp.state.is_terminal();
        let cdp_detail = cdp
            .detail_mut(detail.cdp_detail_id)
            .ok_or(BudgetError::CdpNotFound(detail.cdp_id))?;
        cdp_detail.committed_amount -= amount;
        if closed {
            cdp_detail.released_amount += amount;
        }
        cdp.committed_amount -= amount;

        let rubro = staged_mut(staged, detail.rubro_id)?;
        rubro.release_rp(amount)?;
        if closed {
            rubro.release_cdp(amount)?;
        }
        Ok(())
    }

    /// Looks an RP up.
    #[must_use]
    pub fn rp(&self, id: RpId) -> Option<&Rp> {
        self.rps.get(&id)
    }

    // ========== Obligation ==========

    /// Accrues an obligation against an approved RP.
    ///
    /// The net amount is spread over the RP details in proportion to their
    /// committed amounts. A detail that has too little left is filled and
    /// the rest goes to the others.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount`, `DeductionsExceedGross`
    /// - `RpNotFound`, `InvalidTransition` if the RP is not approved
    /// - `InsufficientRp` if the net exceeds the RP's available amount
    pub fn accrue_obligation(
        &mut self,
        ctx: &OperationContext,
        request: &ObligationRequest,
    ) -> Result<Obligation, BudgetError> {
        self.accrue_obligation_with(ctx, request, |_| Ok(None))
    }

    /// Accrues an obligation, calling `post` once every budget check has
    /// passed and before anything is written.
    ///
    /// `post` returns the journal entry to link to the obligation. If it
    /// fails the book is left as it was.
    ///
    /// # Errors
    ///
    /// Those of [`Self::accrue_obligation`], or the error returned by `post`.
    pub fn accrue_obligation_with<F>(
        &mut self,
        ctx: &OperationContext,
        request: &ObligationRequest,
        post: F,
    ) -> Result<Obligation, BudgetError>
    where
        F: FnOnce(&Obligation) -> Result<Option<JournalEntryId>, BudgetError>,
    {
        validate_amount(request.gross_amount)?;
        if request.deductions < Decimal::ZERO || !has_money_scale(request.deductions) {
            return Err(BudgetError::InvalidAmount(request.deductions));
        }
        if request.deductions > request.gross_amount {
            return Err(BudgetError::DeductionsExceedGross {
                gross: request.gross_amount,
                deductions: request.deductions,
            });
        }
        let net = request.net_amount();
        validate_amount(net)?;

        let mut rp = self
            .rps
            .get(&request.rp_id)
            .ok_or(BudgetError::RpNotFound(request.rp_id))?
            .clone();
        if !rp.state.accepts_consumption() {
            return Err(invalid_transition(&rp.number, rp.state, "accrue"));
        }

        let insufficient = || BudgetError::InsufficientRp {
            document: rp.number.clone(),
            requested: net,
            available: rp.available_amount(),
        };
        if net > rp.available_amount() {
            return Err(insufficient());
        }
        let weights: Vec<Decimal> = rp.details.iter().map(|d| d.amount).collect();
        let capacities: Vec<Decimal> = rp.details.iter().map(RpDetail::available).collect();
        let parts = spread_weighted(net, &weights, &capacities).ok_or_else(insufficient)?;

        let mut staged = self.stage(rp.details.iter().map(|d| d.rubro_id))?;
        let mut lines = Vec::new();
        for (detail, part) in rp.details.iter_mut().zip(parts) {
            if part.is_zero() {
                continue;
            }
            staged_mut(&mut staged, detail.rubro_id)?.add_obligation(part)?;
            detail.obligated_amount += part;
            lines.push(ObligationLine {
                rp_detail_id: detail.id,
                rubro_id: detail.rubro_id,
                rubro_code: detail.rubro_code.clone(),
                amount: part,
                paid_amount: Decimal::ZERO,
            });
        }
        rp.obligated_amount += net;
        rp.settle();
        Self::verify(&staged)?;

        let year = request.date.year();
        let mut obligation = Obligation {
            id: ObligationId::new(),
            number: self.numbering.peek(DocumentKind::Obligation, year),
            company_id: ctx.company_id,
            fiscal_period_id: ctx.fiscal_period_id,
            date: request.date,
            rp_id: rp.id,
            concept: request.concept.clone(),
            invoice_number: request.invoice_number.clone(),
            gross_amount: request.gross_amount,
            deductions: request.deductions,
            net_amount: net,
            paid_amount: Decimal::ZERO,
            state: DocumentState::Draft,
            lines,
            journal_entry_id: None,
            created_by: ctx.actor_id,
            approved_by: None,
        };

        obligation.journal_entry_id = post(&obligation)?;

        self.numbering.next(DocumentKind::Obligation, year);
        self.commit(ctx, BudgetEventKind::ObligationAccrued, &obligation.number, staged);
        self.rps.insert(rp.id, rp);
        self.obligations.insert(obligation.id, obligation.clone());
        Ok(obligation)
    }

    /// Approves a draft obligation so it can be paid.
    ///
    /// # Errors
    ///
    /// Returns `ObligationNotFound` or `InvalidTransition` unless it is a draft.
    pub fn approve_obligation(
        &mut self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        let obligation = self
            .obligations
            .get_mut(&id)
            .ok_or(BudgetError::ObligationNotFound(id))?;
        if obligation.state != DocumentState::Draft {
            return Err(invalid_transition(&obligation.number, obligation.state, "approve"));
        }
        obligation.state = DocumentState::Approved;
        obligation.approved_by = Some(ctx.actor_id);

        let obligation = obligation.clone();
        self.record(ctx, BudgetEventKind::ObligationApproved, &obligation.number, Vec::new());
        Ok(obligation)
    }

    /// Cancels an unpaid obligation, returning its lines to the RP.
    ///
    /// Under a reversed RP the amount continues on to the CDP, and to the
    /// rubro's appropriation if the CDP is closed too. A linked journal
    /// entry is left for the caller to reverse.
    ///
    /// # Errors
    ///
    /// Returns `ObligationNotFound`, `AlreadyConsumed` if payments drew on it,
    /// or `InvalidTransition` if it is terminal.
    pub fn cancel_obligation(
        &mut self,
        ctx: &OperationContext,
        id: ObligationId,
    ) -> Result<Obligation, BudgetError> {
        self.cancel_obligation_with(ctx, id, |_| Ok(()))
    }

    /// Cancels an obligation, calling `reverse` once every budget check has
    /// passed and before anything is written.
    ///
    /// # Errors
    ///
    /// Those of [`Self::cancel_obligation`], or the error returned by `reverse`.
    pub fn cancel_obligation_with<F>(
        &mut self,
        ctx: &OperationContext,
        id: ObligationId,
        reverse: F,
    ) -> Result<Obligation, BudgetError>
    where
        F: FnOnce(&Obligation) -> Result<(), BudgetError>,
    {
        let mut obligation = self
            .obligations
            .get(&id)
            .ok_or(BudgetError::ObligationNotFound(id))?
            .clone();
        if obligation.state.is_terminal() {
            return Err(invalid_transition(&obligation.number, obligation.state, "cancel"));
        }
        if obligation.paid_amount > Decimal::ZERO {
            return Err(BudgetError::AlreadyConsumed {
                document: obligation.number.clone(),
                consumed: obligation.paid_amount,
            });
        }

        let mut rp = self
            .rps
            .get(&obligation.rp_id)
            .ok_or(BudgetError::RpNotFound(obligation.rp_id))?
            .clone();
        let rp_closed = rp.state.is_terminal();
        let mut cdps = if rp_closed {
            self.source_cdps(&rp.details)?
        } else {
            BTreeMap::new()
        };

        let mut staged = self.stage(obligation.lines.iter().map(|l| l.rubro_id))?;
        for line in &obligation.lines {
            let detail = rp
                .details
                .iter_mut()
                .find(|d| d.id == line.rp_detail_id)
                .ok_or(BudgetError::RpNotFound(rp.id))?;
            detail.obligated_amount -= line.amount;
            staged_mut(&mut staged, line.rubro_id)?.release_obligation(line.amount)?;
            if rp_closed {
                detail.released_amount += line.amount;
                Self::return_to_cdp(&mut cdps, &mut staged, detail, line.amount)?;
            }
        }
        rp.obligated_amount -= obligation.net_amount;
        if rp_closed {
            rp.released_amount += obligation.net_amount;
        }
        rp.settle();
        cdps.values_mut().for_each(Cdp::settle);
        obligation.state = DocumentState::Cancelled;
        Self::verify(&staged)?;
        reverse(&obligation)?;

        self.commit(ctx, BudgetEventKind::ObligationCancelled, &obligation.number, staged);
        self.cdps.extend(cdps);
        self.rps.insert(rp.id, rp);
        self.obligations.insert(obligation.id, obligation.clone());
        Ok(obligation)
    }

    /// Looks an obligation up.
    #[must_use]
    pub fn obligation(&self, id: ObligationId) -> Option<&Obligation> {
        self.obligations.get(&id)
    }

    // ========== Payment ==========

    /// Pays part of an approved obligation.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount`, `ObligationNotFound`
    /// - `InvalidTransition` if the obligation is not approved
    /// - `InsufficientObligation` if the amount exceeds the outstanding balance
    pub fn pay_obligation(
        &mut self,
        ctx: &OperationContext,
        id: ObligationId,
        date: chrono::NaiveDate,
        amount: Decimal,
    ) -> Result<Payment, BudgetError> {
        validate_amount(amount)?;
        let mut obligation = self
            .obligations
            .get(&id)
            .ok_or(BudgetError::ObligationNotFound(id))?
            .clone();
        if !obligation.state.accepts_consumption() {
            return Err(invalid_transition(&obligation.number, obligation.state, "pay"));
        }

        let insufficient = || BudgetError::InsufficientObligation {
            document: obligation.number.clone(),
            requested: amount,
            available: obligation.outstanding(),
        };
        if amount > obligation.outstanding() {
            return Err(insufficient());
        }
        let capacities: Vec<Decimal> = obligation
            .lines
            .iter()
            .map(ObligationLine::outstanding)
            .collect();
        let parts = spread_proportionally(amount, &capacities).ok_or_else(insufficient)?;

        let mut staged = self.stage(obligation.lines.iter().map(|l| l.rubro_id))?;
        let mut lines = Vec::new();
        for (line, part) in obligation.lines.iter_mut().zip(parts) {
            if part.is_zero() {
                continue;
            }
            staged_mut(&mut staged, line.rubro_id)?.add_payment(part)?;
            line.paid_amount += part;
            lines.push(PaymentLine {
                rp_detail_id: line.rp_detail_id,
                rubro_id: line.rubro_id,
                rubro_code: line.rubro_code.clone(),
                amount: part,
            });
        }
        obligation.paid_amount += amount;
        obligation.settle();
        Self::verify(&staged)?;

        let payment = Payment {
            id: PaymentId::new(),
            number: self.numbering.next(DocumentKind::Payment, date.year()),
            company_id: ctx.company_id,
            fiscal_period_id: ctx.fiscal_period_id,
            date,
            obligation_id: id,
            amount,
            state: DocumentState::Approved,
            lines,
            created_by: ctx.actor_id,
        };

        self.commit(ctx, BudgetEventKind::PaymentMade, &payment.number, staged);
        self.obligations.insert(obligation.id, obligation);
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    /// Reverses a payment, restoring the obligation and rubro counters.
    ///
    /// # Errors
    ///
    /// Returns `PaymentNotFound`, `ObligationNotFound` or `InvalidTransition`
    /// if the payment was already reversed.
    pub fn reverse_payment(
        &mut self,
        ctx: &OperationContext,
        id: PaymentId,
    ) -> Result<Payment, BudgetError> {
        let mut payment = self
            .payments
            .get(&id)
            .ok_or(BudgetError::PaymentNotFound(id))?
            .clone();
        if payment.state != DocumentState::Approved {
            return Err(invalid_transition(&payment.number, payment.state, "reverse"));
        }
        let mut obligation = self
            .obligations
            .get(&payment.obligation_id)
            .ok_or(BudgetError::ObligationNotFound(payment.obligation_id))?
            .clone();

        let mut staged = self.stage(payment.lines.iter().map(|l| l.rubro_id))?;
        for line in &payment.lines {
            let obligation_line = obligation
                .lines
                .iter_mut()
                .find(|l| l.rp_detail_id == line.rp_detail_id)
                .ok_or(BudgetError::ObligationNotFound(obligation.id))?;
            obligation_line.paid_amount -= line.amount;
            staged_mut(&mut staged, line.rubro_id)?.release_payment(line.amount)?;
        }
        obligation.paid_amount -= payment.amount;
        obligation.settle();
        payment.state = DocumentState::Reversed;
        Self::verify(&staged)?;

        self.commit(ctx, BudgetEventKind::PaymentReversed, &payment.number, staged);
        self.obligations.insert(obligation.id, obligation);
        self.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    /// Looks a payment up.
    #[must_use]
    pub fn payment(&self, id: PaymentId) -> Option<&Payment> {
        self.payments.get(&id)
    }

    // ========== Modifications ==========

    /// Applies an addition, reduction or transfer.
    ///
    /// Credits are applied before debits; each rubro's net decrease is
    /// checked against its available appropriation first.
    ///
    /// # Errors
    ///
    /// - Any error of [`ModificationService::validate`]
    /// - `RubroNotPostable` for aggregation, inactive or foreign-period rubros
    /// - `NegativeAppropriation` if a rubro would drop below its reservations
    pub fn apply_modification(
        &mut self,
        ctx: &OperationContext,
        request: &ModificationRequest,
    ) -> Result<BudgetModification, BudgetError> {
        let total = ModificationService::validate(request, self.tolerance)?;
        for detail in &request.details {
            self.postable_rubro(ctx, detail.rubro_id)?;
        }

        for (rubro_id, decrease) in ModificationService::net_decreases(&request.details) {
            let rubro = self.postable_rubro(ctx, rubro_id)?;
            let available = rubro.available_appropriation();
            if decrease > available {
                return Err(BudgetError::NegativeAppropriation {
                    rubro: rubro.code.clone(),
                    requested: decrease,
                    available,
                });
            }
        }

        let mut staged = self.stage(request.details.iter().map(|d| d.rubro_id))?;
        let credits = request.details.iter().filter(|d| d.movement == Movement::Credit);
        let debits = request.details.iter().filter(|d| d.movement == Movement::Debit);
        for detail in credits.chain(debits) {
            let change =
                ModificationService::change_for(request.modification_type, detail.movement)?;
            staged_mut(&mut staged, detail.rubro_id)?.apply_modification(change, detail.amount)?;
        }
        Self::verify(&staged)?;

        let modification = BudgetModification {
            id: ModificationId::new(),
            number: self
                .numbering
                .next(DocumentKind::Modification, request.date.year()),
            company_id: ctx.company_id,
            fiscal_period_id: ctx.fiscal_period_id,
            date: request.date,
            modification_type: request.modification_type,
            act_number: request.act_number.clone(),
            concept: request.concept.clone(),
            total_amount: total,
            details: request.details.clone(),
            applied_by: ctx.actor_id,
        };

        self.commit(ctx, BudgetEventKind::ModificationApplied, &modification.number, staged);
        self.modifications.insert(modification.id, modification.clone());
        Ok(modification)
    }

    /// Looks a modification up.
    #[must_use]
    pub fn modification(&self, id: ModificationId) -> Option<&BudgetModification> {
        self.modifications.get(&id)
    }

    // ========== Events ==========

    /// The event log, oldest first.
    #[must_use]
    pub fn events(&self) -> &[BudgetEvent] {
        &self.events
    }

    /// Checks the counter chain of every rubro.
    ///
    /// # Errors
    ///
    /// Returns the first `InvariantViolation` found.
    pub fn check_invariants(&self) -> Result<(), BudgetError> {
        self.rubros.values().try_for_each(BudgetRubro::check_invariants)
    }
}
