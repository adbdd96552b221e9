//! Double-entry bookkeeping logic.
//!
//! This module implements the ledger posting engine:
//! - Journal entry drafts and posted entries
//! - Line validation and balance checks
//! - Fiscal periods and posting rules
//! - Gap-free numbering per journal type
//! - Running balances per account and period
//! - Reversing entries
//! - The per-company ledger book

pub mod balance;
pub mod book;
pub mod error;
pub mod fiscal;
pub mod reversal;
pub mod sequence;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod validation_props;

pub use balance::{AccountBalance, RunningBalance};
pub use book::LedgerBook;
pub use error::PostingError;
pub use fiscal::{FiscalPeriod, PeriodStatus};
pub use reversal::ReversalService;
pub use sequence::JournalSequence;
pub use service::LedgerService;
pub use types::{
    EntryTotals, JournalEntryDraft, JournalLineInput, JournalType, PostedEntry, PostedLine,
};
pub use validation::validate_lines;
