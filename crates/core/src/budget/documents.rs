//! Pipeline documents: CDP, RP, obligation and payment.
//!
//! - CDP reserves rubro appropriation
//! - RP commits part of one or more CDP details
//! - Obligation accrues part of one RP
//! - Payment disburses part of one obligation

use std::fmt;

use chrono::NaiveDate;
use erario_shared::types::{
    CdpDetailId, CdpId, CompanyId, FiscalPeriodId, JournalEntryId, ObligationId, PaymentId,
    RpDetailId, RpId, RubroId, UserId,
};
use erario_shared::types::has_money_scale;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BudgetError;

/// Minimum length of a CDP concept.
pub const MIN_CDP_CONCEPT_CHARS: usize = 10;

/// Rejects amounts that are not positive or carry more than two decimals.
///
/// # Errors
///
/// Returns `InvalidAmount`.
pub fn validate_amount(amount: Decimal) -> Result<(), BudgetError> {
    if amount <= Decimal::ZERO || !has_money_scale(amount) {
        return Err(BudgetError::InvalidAmount(amount));
    }
    Ok(())
}

/// Lifecycle state shared by every pipeline document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentState {
    /// Created, capacity already reserved, not yet usable downstream.
    Draft,
    /// Approved, nothing consumed downstream.
    Approved,
    /// Partly consumed downstream.
    Partial,
    /// Fully consumed downstream.
    Committed,
    /// Expired; the unconsumed remainder was released.
    Expired,
    /// Cancelled; everything it reserved was released.
    Cancelled,
    /// Reversed; the unconsumed remainder was released.
    Reversed,
}

impl DocumentState {
    /// State after a change in downstream consumption.
    #[must_use]
    pub fn derive(consumed: Decimal, capacity: Decimal) -> Self {
        if consumed.is_zero() {
            Self::Approved
        } else if consumed >= capacity {
            Self::Committed
        } else {
            Self::Partial
        }
    }

    /// Re-derives the state of an approved document; other states are kept.
    pub fn settle(&mut self, consumed: Decimal, capacity: Decimal) {
        if matches!(self, Self::Approved | Self::Partial | Self::Committed) {
            *self = Self::derive(consumed, capacity);
        }
    }

    /// Whether downstream documents may draw on this one.
    ///
    /// A committed document still accepts requests; they fail on the amount check.
    #[must_use]
    pub const fn accepts_consumption(self) -> bool {
        matches!(self, Self::Approved | Self::Partial | Self::Committed)
    }

    /// Whether no further transition is possible.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::Cancelled | Self::Reversed)
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Draft => "draft",
            Self::Approved => "approved",
            Self::Partial => "partial",
            Self::Committed => "committed",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
            Self::Reversed => "reversed",
        };
        f.write_str(name)
    }
}

// ========== Requests ==========

/// Amount requested from one rubro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubroAmount {
    /// Target detail rubro.
    pub rubro_id: RubroId,
    /// Requested amount.
    pub amount: Decimal,
}

/// Input for issuing a CDP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdpRequest {
    /// Document date.
    pub date: NaiveDate,
    /// Purpose of the reservation.
    pub concept: String,
    /// Requesting area.
    pub request_area: String,
    /// Requesting person.
    pub requested_by: String,
    /// Optional expiry date.
    pub expiry_date: Option<NaiveDate>,
    /// Header total, `None` to take the detail sum.
    pub total_amount: Option<Decimal>,
    /// Rubro amounts.
    pub lines: Vec<RubroAmount>,
}

impl CdpRequest {
    /// Creates a request without lines.
    #[must_use]
    pub fn new(date: NaiveDate, concept: impl Into<String>) -> Self {
        Self {
            date,
            concept: concept.into(),
            request_area: String::new(),
            requested_by: String::new(),
            expiry_date: None,
            total_amount: None,
            lines: Vec::new(),
        }
    }

    /// Adds a rubro amount.
    #[must_use]
    pub fn line(mut self, rubro_id: RubroId, amount: Decimal) -> Self {
        self.lines.push(RubroAmount { rubro_id, amount });
        self
    }

    /// Sets the requesting area and person.
    #[must_use]
    pub fn requested(mut self, area: impl Into<String>, person: impl Into<String>) -> Self {
        self.request_area = area.into();
        self.requested_by = person.into();
        self
    }

    /// Sets the expiry date.
    #[must_use]
    pub const fn expiring(mut self, date: NaiveDate) -> Self {
        self.expiry_date = Some(date);
        self
    }

    /// Sets the header total checked against the lines.
    #[must_use]
    pub const fn with_total(mut self, total: Decimal) -> Self {
        self.total_amount = Some(total);
        self
    }

    /// Checks the concept and requester fields.
    ///
    /// # Errors
    ///
    /// Returns `ConceptTooShort` or `MissingRequester`.
    pub fn validate_header(&self) -> Result<(), BudgetError> {
        if self.concept.trim().chars().count() < MIN_CDP_CONCEPT_CHARS {
            return Err(BudgetError::ConceptTooShort {
                minimum: MIN_CDP_CONCEPT_CHARS,
            });
        }
        if self.request_area.trim().is_empty() || self.requested_by.trim().is_empty() {
            return Err(BudgetError::MissingRequester);
        }
        Ok(())
    }
}

/// Contract backing an RP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    /// Professional services.
    Service,
    /// Supply.
    Supply,
    /// Public works.
    Work,
    /// Consulting.
    Consulting,
    /// Lease.
    Lease,
    /// Purchase order.
    PurchaseOrder,
    /// Anything else.
    Other,
}

/// Amount committed from one CDP detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdpDetailRef {
    /// Source CDP.
    pub cdp_id: CdpId,
    /// Source CDP detail.
    pub cdp_detail_id: CdpDetailId,
    /// Committed amount.
    pub amount: Decimal,
}

/// Input for committing an RP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpRequest {
    /// Document date.
    pub date: NaiveDate,
    /// Beneficiary tax id (NIT/CC).
    pub beneficiary_id: String,
    /// Beneficiary name.
    pub beneficiary_name: String,
    /// Contract type.
    pub contract_type: ContractType,
    /// Contract number, if any.
    pub contract_number: Option<String>,
    /// Purpose of the commitment.
    pub concept: String,
    /// CDP detail amounts.
    pub lines: Vec<CdpDetailRef>,
}

impl RpRequest {
    /// Creates a request without lines.
    #[must_use]
    pub fn new(
        date: NaiveDate,
        beneficiary_id: impl Into<String>,
        beneficiary_name: impl Into<String>,
        contract_type: ContractType,
    ) -> Self {
        Self {
            date,
            beneficiary_id: beneficiary_id.into(),
            beneficiary_name: beneficiary_name.into(),
            contract_type,
            contract_number: None,
            concept: String::new(),
            lines: Vec::new(),
        }
    }

    /// Adds a CDP detail amount.
    #[must_use]
    pub fn line(mut self, cdp_id: CdpId, cdp_detail_id: CdpDetailId, amount: Decimal) -> Self {
        self.lines.push(CdpDetailRef {
            cdp_id,
            cdp_detail_id,
            amount,
        });
        self
    }

    /// Sets the contract number.
    #[must_use]
    pub fn with_contract(mut self, number: impl Into<String>) -> Self {
        self.contract_number = Some(number.into());
        self
    }
}

/// Input for accruing an obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationRequest {
    /// Source RP.
    pub rp_id: RpId,
    /// Document date.
    pub date: NaiveDate,
    /// Purpose of the accrual.
    pub concept: String,
    /// Supplier invoice number, if any.
    pub invoice_number: Option<String>,
    /// Gross amount.
    pub gross_amount: Decimal,
    /// Withholdings and other deductions.
    pub deductions: Decimal,
}

impl ObligationRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(rp_id: RpId, date: NaiveDate, gross_amount: Decimal, deductions: Decimal) -> Self {
        Self {
            rp_id,
            date,
            concept: String::new(),
            invoice_number: None,
            gross_amount,
            deductions,
        }
    }

    /// Sets the invoice number.
    #[must_use]
    pub fn with_invoice(mut self, number: impl Into<String>) -> Self {
        self.invoice_number = Some(number.into());
        self
    }

    /// Net amount drawn from the RP.
    #[must_use]
    pub fn net_amount(&self) -> Decimal {
        self.gross_amount - self.deductions
    }
}

// ========== CDP ==========

/// Reservation of one rubro inside a CDP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CdpDetail {
    /// Detail identifier.
    pub id: CdpDetailId,
    /// Reserved rubro.
    pub rubro_id: RubroId,
    /// Rubro code at issuance.
    pub rubro_code: String,
    /// Reserved amount.
    pub amount: Decimal,
    /// Committed by RPs.
    pub committed_amount: Decimal,
    /// Released back to the rubro by expiry or cancellation.
    pub released_amount: Decimal,
}

impl CdpDetail {
    /// Amount still available for RPs.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.amount - self.committed_amount - self.released_amount
    }
}

/// Budget availability certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cdp {
    /// Document identifier.
    pub id: CdpId,
    /// Document number.
    pub number: String,
    /// Owning company.
    pub company_id: CompanyId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Document date.
    pub date: NaiveDate,
    /// Purpose of the reservation.
    pub concept: String,
    /// Requesting person.
    pub requested_by: String,
    /// Requesting area.
    pub request_area: String,
    /// Optional expiry date.
    pub expiry_date: Option<NaiveDate>,
    /// Sum of detail amounts.
    pub total_amount: Decimal,
    /// Sum of detail committed amounts.
    pub committed_amount: Decimal,
    /// Lifecycle state.
    pub state: DocumentState,
    /// Rubro reservations.
    pub details: Vec<CdpDetail>,
    /// Issuing actor.
    pub created_by: UserId,
    /// Approving actor.
    pub approved_by: Option<UserId>,
}

impl Cdp {
    /// Amount still available for RPs.
    #[must_use]
    pub fn available_amount(&self) -> Decimal {
        self.details.iter().map(CdpDetail::available).sum()
    }

    /// Looks a detail up.
    #[must_use]
    pub fn detail(&self, id: CdpDetailId) -> Option<&CdpDetail> {
        self.details.iter().find(|d| d.id == id)
    }

    pub(crate) fn detail_mut(&mut self, id: CdpDetailId) -> Option<&mut CdpDetail> {
        self.details.iter_mut().find(|d| d.id == id)
    }

    /// Whether the expiry date has passed on `date`.
    #[must_use]
    pub fn is_expired_on(&self, date: NaiveDate) -> bool {
        self.expiry_date.is_some_and(|expiry| date > expiry)
    }

    pub(crate) fn settle(&mut self) {
        self.state.settle(self.committed_amount, self.total_amount);
    }
}

// ========== RP ==========

/// Commitment of one CDP detail inside an RP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpDetail {
    /// Detail identifier.
    pub id: RpDetailId,
    /// Source CDP.
    pub cdp_id: CdpId,
    /// Source CDP detail.
    pub cdp_detail_id: CdpDetailId,
    /// Committed rubro.
    pub rubro_id: RubroId,
    /// Rubro code at commitment.
    pub rubro_code: String,
    /// Committed amount.
    pub amount: Decimal,
    /// Accrued by obligations.
    pub obligated_amount: Decimal,
    /// Released back to the CDP by reversal.
    pub released_amount: Decimal,
}

impl RpDetail {
    /// Amount still available for obligations.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.amount - self.obligated_amount - self.released_amount
    }
}

/// Budget commitment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rp {
    /// Document identifier.
    pub id: RpId,
    /// Document number.
    pub number: String,
    /// Owning company.
    pub company_id: CompanyId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Document date.
    pub date: NaiveDate,
    /// Beneficiary tax id.
    pub beneficiary_id: String,
    /// Beneficiary name.
    pub beneficiary_name: String,
    /// Contract type.
    pub contract_type: ContractType,
    /// Contract number, if any.
    pub contract_number: Option<String>,
    /// Purpose of the commitment.
    pub concept: String,
    /// Sum of detail amounts.
    pub total_amount: Decimal,
    /// Accrued by obligations.
    pub obligated_amount: Decimal,
    /// Released by reversal.
    pub released_amount: Decimal,
    /// Lifecycle state.
    pub state: DocumentState,
    /// CDP detail commitments.
    pub details: Vec<RpDetail>,
    /// Issuing actor.
    pub created_by: UserId,
    /// Approving actor.
    pub approved_by: Option<UserId>,
}

impl Rp {
    /// Amount still available for obligations.
    #[must_use]
    pub fn available_amount(&self) -> Decimal {
        self.total_amount - self.obligated_amount - self.released_amount
    }

    pub(crate) fn settle(&mut self) {
        self.state.settle(self.obligated_amount, self.total_amount);
    }
}

// ========== Obligation ==========

/// Share of an obligation drawn from one RP detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObligationLine {
    /// Source RP detail.
    pub rp_detail_id: RpDetailId,
    /// Accrued rubro.
    pub rubro_id: RubroId,
    /// Rubro code at accrual.
    pub rubro_code: String,
    /// Accrued amount.
    pub amount: Decimal,
    /// Paid amount.
    pub paid_amount: Decimal,
}

impl ObligationLine {
    /// Amount still payable.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.amount - self.paid_amount
    }
}

/// Accrued liability drawn against one RP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Obligation {
    /// Document identifier.
    pub id: ObligationId,
    /// Document number.
    pub number: String,
    /// Owning company.
    pub company_id: CompanyId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Document date.
    pub date: NaiveDate,
    /// Source RP.
    pub rp_id: RpId,
    /// Purpose of the accrual.
    pub concept: String,
    /// Supplier invoice number, if any.
    pub invoice_number: Option<String>,
    /// Gross amount.
    pub gross_amount: Decimal,
    /// Deductions.
    pub deductions: Decimal,
    /// `gross_amount − deductions`
    pub net_amount: Decimal,
    /// Paid amount.
    pub paid_amount: Decimal,
    /// Lifecycle state.
    pub state: DocumentState,
    /// Per-rubro spread of the net amount.
    pub lines: Vec<ObligationLine>,
    /// Linked journal entry, if the obligation was posted.
    pub journal_entry_id: Option<JournalEntryId>,
    /// Issuing actor.
    pub created_by: UserId,
    /// Approving actor.
    pub approved_by: Option<UserId>,
}

impl Obligation {
    /// Amount still payable.
    #[must_use]
    pub fn outstanding(&self) -> Decimal {
        self.net_amount - self.paid_amount
    }

    pub(crate) fn settle(&mut self) {
        self.state.settle(self.paid_amount, self.net_amount);
    }
}

// ========== Payment ==========

/// Share of a payment applied to one obligation line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLine {
    /// RP detail of the paid obligation line.
    pub rp_detail_id: RpDetailId,
    /// Paid rubro.
    pub rubro_id: RubroId,
    /// Rubro code at payment.
    pub rubro_code: String,
    /// Paid amount.
    pub amount: Decimal,
}

/// Disbursement against one obligation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    /// Document identifier.
    pub id: PaymentId,
    /// Document number.
    pub number: String,
    /// Owning company.
    pub company_id: CompanyId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Document date.
    pub date: NaiveDate,
    /// Paid obligation.
    pub obligation_id: ObligationId,
    /// Paid amount.
    pub amount: Decimal,
    /// `Approved`, or `Reversed` once undone.
    pub state: DocumentState,
    /// Per-rubro spread over the obligation lines.
    pub lines: Vec<PaymentLine>,
    /// Paying actor.
    pub created_by: UserId,
}
