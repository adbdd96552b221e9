//! Repositories over the transactional store.
//!
//! Each public method runs one domain operation as a single store
//! transaction and logs its outcome.

pub mod account;
pub mod budget;
pub mod ledger;

pub use account::AccountRepository;
pub use budget::BudgetRepository;
pub use ledger::LedgerRepository;
