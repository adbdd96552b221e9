//! Budget error types.
//!
//! Covers the rubro hierarchy, the CDP → RP → Obligation → Payment pipeline
//! and budget modifications. Every insufficient-balance variant carries the
//! requested and the available amount.

use chrono::NaiveDate;
use erario_shared::types::{CdpId, ObligationId, PaymentId, RpId, RubroId};
use erario_shared::{AppError, ErrorKind};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::hierarchy::HierarchyError;
use crate::ledger::PostingError;

/// Budget-related errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BudgetError {
    // ========== Hierarchy Errors ==========
    /// Rubro placement violates the code hierarchy.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Rubro code already exists in the fiscal period.
    #[error("Rubro code already exists in this period: {0}")]
    DuplicateRubro(String),

    // ========== Validation Errors ==========
    /// Rubro is an aggregation node, inactive, or belongs to another period.
    #[error("Rubro {0} does not accept reservations or modifications")]
    RubroNotPostable(String),

    /// Amount must be positive with at most two decimal places.
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// Document has no detail lines.
    #[error("Document must have at least one detail line")]
    EmptyDocument,

    /// Header total differs from the sum of the detail lines.
    #[error("Document total {total} does not match detail sum {details}")]
    TotalMismatch {
        /// Header total.
        total: Decimal,
        /// Sum of detail amounts.
        details: Decimal,
    },

    /// Deductions exceed the gross amount of an obligation.
    #[error("Deductions {deductions} exceed gross amount {gross}")]
    DeductionsExceedGross {
        /// Gross amount.
        gross: Decimal,
        /// Requested deductions.
        deductions: Decimal,
    },

    /// Movement direction not allowed for the modification type.
    #[error("{movement} movements are not allowed in a {modification} modification")]
    MovementNotAllowed {
        /// Modification type.
        modification: String,
        /// Rejected movement.
        movement: String,
    },

    /// Transfer debits and credits differ.
    #[error("Transfer is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedModification {
        /// Sum of debit movements.
        debit: Decimal,
        /// Sum of credit movements.
        credit: Decimal,
    },

    /// Obligation with deductions needs a withholding account to post to.
    #[error("Obligation has deductions but no withholding account")]
    MissingWithholdingAccount,

    // ========== Insufficient Budget Errors ==========
    /// Rubro has less available appropriation than requested.
    #[error("Insufficient appropriation in rubro {rubro}. \
        Requested: {requested}, Available: {available}")]
    InsufficientAppropriation {
        /// Rubro code.
        rubro: String,
        /// Requested amount.
        requested: Decimal,
        /// Available appropriation.
        available: Decimal,
    },

    /// CDP detail has less uncommitted amount than requested.
    #[error("Insufficient CDP balance in {document} for rubro {rubro}. \
        Requested: {requested}, Available: {available}")]
    InsufficientCdp {
        /// CDP number.
        document: String,
        /// Rubro code.
        rubro: String,
        /// Requested amount.
        requested: Decimal,
        /// Available amount.
        available: Decimal,
    },

    /// RP has less un-obligated amount than requested.
    #[error("Insufficient RP balance in {document}. \
        Requested: {requested}, Available: {available}")]
    InsufficientRp {
        /// RP number.
        document: String,
        /// Requested amount.
        requested: Decimal,
        /// Available amount.
        available: Decimal,
    },

    /// Obligation has less outstanding amount than requested.
    #[error("Insufficient outstanding obligation in {document}. \
        Requested: {requested}, Available: {available}")]
    InsufficientObligation {
        /// Obligation number.
        document: String,
        /// Requested amount.
        requested: Decimal,
        /// Available amount.
        available: Decimal,
    },

    /// Modification would drop the appropriation below what CDPs reserve.
    #[error("Appropriation of rubro {rubro} cannot drop below reserved amount. \
        Requested: {requested}, Available: {available}")]
    NegativeAppropriation {
        /// Rubro code.
        rubro: String,
        /// Requested decrease.
        requested: Decimal,
        /// Available appropriation.
        available: Decimal,
    },

    // ========== State Errors ==========
    /// Downstream documents already consumed part of the capacity.
    #[error("Document {document} has {consumed} already consumed downstream")]
    AlreadyConsumed {
        /// Document number.
        document: String,
        /// Consumed amount.
        consumed: Decimal,
    },

    /// CDP concept is shorter than the minimum.
    #[error("CDP concept must have at least {minimum} characters")]
    ConceptTooShort {
        /// Minimum number of characters.
        minimum: usize,
    },

    /// CDP does not name the requesting area and person.
    #[error("CDP must name the requesting area and person")]
    MissingRequester,

    /// CDP expiry date has passed.
    #[error("CDP {document} expired on {expiry_date}")]
    CdpExpired {
        /// Document number.
        document: String,
        /// Last day the CDP could be used.
        expiry_date: NaiveDate,
    },

    /// Document is in a state that does not allow the action.
    #[error("Cannot {action} document {document} in state {state}")]
    InvalidTransition {
        /// Document number.
        document: String,
        /// Current state.
        state: String,
        /// Attempted action.
        action: &'static str,
    },

    /// A rubro counter chain no longer holds.
    #[error("Invariant violated in rubro {rubro}: {detail}")]
    InvariantViolation {
        /// Rubro code.
        rubro: String,
        /// Violated relation.
        detail: String,
    },

    // ========== Not Found Errors ==========
    /// Rubro not found.
    #[error("Rubro not found: {0}")]
    RubroNotFound(String),

    /// CDP not found.
    #[error("CDP not found: {0}")]
    CdpNotFound(CdpId),

    /// RP not found.
    #[error("RP not found: {0}")]
    RpNotFound(RpId),

    /// Obligation not found.
    #[error("Obligation not found: {0}")]
    ObligationNotFound(ObligationId),

    /// Payment not found.
    #[error("Payment not found: {0}")]
    PaymentNotFound(PaymentId),

    // ========== Linked Ledger Errors ==========
    /// Posting the obligation's journal entry failed.
    #[error(transparent)]
    Posting(#[from] PostingError),

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrencyConflict,
}

impl BudgetError {
    /// Builds a `RubroNotFound` from an id.
    #[must_use]
    pub fn rubro_not_found(id: RubroId) -> Self {
        Self::RubroNotFound(id.to_string())
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Hierarchy(err) => err.error_code(),
            Self::DuplicateRubro(_) => "DUPLICATE_RUBRO",
            Self::RubroNotPostable(_) => "RUBRO_NOT_POSTABLE",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::EmptyDocument => "EMPTY_DOCUMENT",
            Self::TotalMismatch { .. } => "TOTAL_MISMATCH",
            Self::DeductionsExceedGross { .. } => "DEDUCTIONS_EXCEED_GROSS",
            Self::MovementNotAllowed { .. } => "MOVEMENT_NOT_ALLOWED",
            Self::UnbalancedModification { .. } => "UNBALANCED_MODIFICATION",
            Self::MissingWithholdingAccount => "MISSING_WITHHOLDING_ACCOUNT",
            Self::InsufficientAppropriation { .. } => "INSUFFICIENT_APPROPRIATION",
            Self::InsufficientCdp { .. } => "INSUFFICIENT_CDP",
            Self::InsufficientRp { .. } => "INSUFFICIENT_RP",
            Self::InsufficientObligation { .. } => "INSUFFICIENT_OBLIGATION",
            Self::NegativeAppropriation { .. } => "NEGATIVE_APPROPRIATION",
            Self::ConceptTooShort { .. } => "CONCEPT_TOO_SHORT",
            Self::MissingRequester => "MISSING_REQUESTER",
            Self::CdpExpired { .. } => "CDP_EXPIRED",
            Self::AlreadyConsumed { .. } => "ALREADY_CONSUMED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            Self::RubroNotFound(_) => "RUBRO_NOT_FOUND",
            Self::CdpNotFound(_) => "CDP_NOT_FOUND",
            Self::RpNotFound(_) => "RP_NOT_FOUND",
            Self::ObligationNotFound(_) => "OBLIGATION_NOT_FOUND",
            Self::PaymentNotFound(_) => "PAYMENT_NOT_FOUND",
            Self::Posting(err) => err.error_code(),
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Hierarchy(err) => err.kind(),
            Self::Posting(err) => err.kind(),

            Self::DuplicateRubro(_)
            | Self::RubroNotPostable(_)
            | Self::InvalidAmount(_)
            | Self::EmptyDocument
            | Self::TotalMismatch { .. }
            | Self::DeductionsExceedGross { .. }
            | Self::MovementNotAllowed { .. }
            | Self::UnbalancedModification { .. }
            | Self::MissingWithholdingAccount
            | Self::ConceptTooShort { .. }
            | Self::MissingRequester => ErrorKind::Validation,

            Self::InsufficientAppropriation { .. }
            | Self::InsufficientCdp { .. }
            | Self::InsufficientRp { .. }
            | Self::InsufficientObligation { .. }
            | Self::NegativeAppropriation { .. } => ErrorKind::InsufficientBudget,

            Self::AlreadyConsumed { .. }
            | Self::CdpExpired { .. }
            | Self::InvalidTransition { .. }
            | Self::InvariantViolation { .. } => ErrorKind::State,

            Self::RubroNotFound(_)
            | Self::CdpNotFound(_)
            | Self::RpNotFound(_)
            | Self::ObligationNotFound(_)
            | Self::PaymentNotFound(_) => ErrorKind::NotFound,

            Self::ConcurrencyConflict => ErrorKind::Conflict,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Posting(err) => err.is_retryable(),
            Self::ConcurrencyConflict => true,
            _ => false,
        }
    }
}

impl From<BudgetError> for AppError {
    fn from(err: BudgetError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
