//! Ledger posting errors.
//!
//! This module defines all errors that can occur while posting or reversing
//! journal entries: line validation, account, fiscal period, journal type and
//! reversal errors.

use chrono::NaiveDate;
use erario_shared::types::{FiscalPeriodId, JournalEntryId};
use erario_shared::{AppError, ErrorKind};
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostingError {
    // ========== Validation Errors ==========
    /// Entry must have at least 2 lines.
    #[error("Journal entry must have at least 2 lines")]
    InsufficientLines,

    /// Entry is not balanced (debits != credits).
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedEntry {
        /// Total debit amount.
        debit: Decimal,
        /// Total credit amount.
        credit: Decimal,
    },

    /// Line has neither a debit nor a credit.
    #[error("Line {line} has no amount")]
    ZeroAmount {
        /// 1-based line number.
        line: usize,
    },

    /// Line amount cannot be negative.
    #[error("Line {line} has a negative amount")]
    NegativeAmount {
        /// 1-based line number.
        line: usize,
    },

    /// Line must specify either debit or credit, not both.
    #[error("Line {line} has both a debit and a credit")]
    BothSides {
        /// 1-based line number.
        line: usize,
    },

    /// Line amount has more than two decimals.
    #[error("Line {line} has more than two decimal places")]
    InvalidPrecision {
        /// 1-based line number.
        line: usize,
    },

    /// Exchange rate must be positive, and 1 for the functional currency.
    #[error("Invalid exchange rate: {0}")]
    InvalidExchangeRate(Decimal),

    // ========== Account Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Aggregation accounts do not accept postings.
    #[error("Account {0} is not a detail account")]
    AccountNotPostable(String),

    /// Account is inactive and cannot be used.
    #[error("Account {0} is inactive")]
    AccountInactive(String),

    /// Account requires a cost center on every line.
    #[error("Account {0} requires a cost center")]
    MissingCostCenter(String),

    /// Account requires a project on every line.
    #[error("Account {0} requires a project")]
    MissingProject(String),

    // ========== Fiscal Period Errors ==========
    /// Fiscal period not found.
    #[error("Fiscal period not found: {0}")]
    PeriodNotFound(FiscalPeriodId),

    /// Fiscal period is closed, no posting allowed.
    #[error("Fiscal period {0} is closed, no posting allowed")]
    PeriodClosed(FiscalPeriodId),

    /// Fiscal period is already open.
    #[error("Fiscal period {0} is already open")]
    PeriodAlreadyOpen(FiscalPeriodId),

    /// Period end date precedes its start date.
    #[error("Invalid period range: {start} to {end}")]
    InvalidPeriodRange {
        /// First day of the period.
        start: NaiveDate,
        /// Last day of the period.
        end: NaiveDate,
    },

    /// Entry date falls outside the target period.
    #[error("Date {date} is outside the period {start} to {end}")]
    DateOutsidePeriod {
        /// Entry date.
        date: NaiveDate,
        /// First day of the period.
        start: NaiveDate,
        /// Last day of the period.
        end: NaiveDate,
    },

    // ========== Journal Type Errors ==========
    /// Journal type not found.
    #[error("Journal type not found: {0}")]
    JournalTypeNotFound(String),

    /// Journal type code already registered.
    #[error("Journal type already exists: {0}")]
    DuplicateJournalType(String),

    // ========== Reversal Errors ==========
    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Entry already has a reversing entry.
    #[error("Journal entry {0} has already been reversed")]
    AlreadyReversed(String),

    /// Reversing entries cannot themselves be reversed.
    #[error("Journal entry {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(String),

    // ========== Concurrency Errors ==========
    /// Company lock could not be acquired in time.
    #[error("Concurrent modification detected, please retry")]
    ConcurrencyConflict,
}

impl PostingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InsufficientLines => "INSUFFICIENT_LINES",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::ZeroAmount { .. } => "ZERO_AMOUNT",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::BothSides { .. } => "BOTH_SIDES",
            Self::InvalidPrecision { .. } => "INVALID_PRECISION",
            Self::InvalidExchangeRate(_) => "INVALID_EXCHANGE_RATE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountNotPostable(_) => "ACCOUNT_NOT_POSTABLE",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::MissingCostCenter(_) => "MISSING_COST_CENTER",
            Self::MissingProject(_) => "MISSING_PROJECT",
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::PeriodAlreadyOpen(_) => "PERIOD_ALREADY_OPEN",
            Self::InvalidPeriodRange { .. } => "INVALID_PERIOD_RANGE",
            Self::DateOutsidePeriod { .. } => "DATE_OUTSIDE_PERIOD",
            Self::JournalTypeNotFound(_) => "JOURNAL_TYPE_NOT_FOUND",
            Self::DuplicateJournalType(_) => "DUPLICATE_JOURNAL_TYPE",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::CannotReverseReversal(_) => "CANNOT_REVERSE_REVERSAL",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InsufficientLines
            | Self::UnbalancedEntry { .. }
            | Self::ZeroAmount { .. }
            | Self::NegativeAmount { .. }
            | Self::BothSides { .. }
            | Self::InvalidPrecision { .. }
            | Self::InvalidExchangeRate(_)
            | Self::AccountNotPostable(_)
            | Self::AccountInactive(_)
            | Self::MissingCostCenter(_)
            | Self::MissingProject(_)
            | Self::InvalidPeriodRange { .. }
            | Self::DateOutsidePeriod { .. }
            | Self::DuplicateJournalType(_) => ErrorKind::Validation,

            Self::PeriodClosed(_)
            | Self::PeriodAlreadyOpen(_)
            | Self::AlreadyReversed(_)
            | Self::CannotReverseReversal(_) => ErrorKind::State,

            Self::AccountNotFound(_)
            | Self::PeriodNotFound(_)
            | Self::JournalTypeNotFound(_)
            | Self::EntryNotFound(_) => ErrorKind::NotFound,

            Self::ConcurrencyConflict => ErrorKind::Conflict,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }
}

impl From<PostingError> for AppError {
    fn from(err: PostingError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
