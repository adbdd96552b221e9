//! Chart of accounts.
//!
//! Accounts form a code-prefix tree (PUC). Only active detail accounts accept
//! postings; parents aggregate the balances of their detail descendants.

pub mod chart;
pub mod error;
pub mod types;

pub use chart::ChartOfAccounts;
pub use error::AccountError;
pub use types::{Account, AccountType, NewAccount, NormalBalance};
