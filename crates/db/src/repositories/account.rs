//! Chart of accounts repository.

use std::sync::Arc;

use erario_core::accounts::{Account, AccountError, NewAccount};
use erario_shared::OperationContext;
use tracing::{info, warn};

use crate::store::MemoryStore;

/// Account repository for chart of accounts operations.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    store: Arc<MemoryStore>,
}

fn rejected(operation: &'static str) -> impl Fn(&AccountError) {
    move |err| {
        warn!(
            operation,
            error_code = err.error_code(),
            error = %err,
            "Account operation rejected"
        );
    }
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(store: Arc<MemoryStore>) -> Self {
        Self { store }
    }

    /// Adds an account to the company's chart.
    ///
    /// # Errors
    ///
    /// Returns `Duplicate`, a `Hierarchy` error, or `ConcurrencyConflict`.
    pub async fn create_account(
        &self,
        ctx: &OperationContext,
        input: NewAccount,
    ) -> Result<Account, AccountError> {
        let account = self
            .store
            .transaction(ctx.company_id, |books| books.ledger.create_account(input))
            .await
            .inspect_err(rejected("create_account"))?;

        info!(
            company_id = %ctx.company_id,
            account_id = %account.id,
            code = %account.code,
            "Account created"
        );
        Ok(account)
    }

    /// Deactivates an account.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `ConcurrencyConflict`.
    pub async fn deactivate_account(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<Account, AccountError> {
        let account = self
            .store
            .transaction(ctx.company_id, |books| books.ledger.deactivate_account(code))
            .await
            .inspect_err(rejected("deactivate_account"))?;

        info!(company_id = %ctx.company_id, code, "Account deactivated");
        Ok(account)
    }

    /// Deletes an account without postings or children.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `HasChildren`, `HasPostings` or `ConcurrencyConflict`.
    pub async fn delete_account(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<Account, AccountError> {
        let account = self
            .store
            .transaction(ctx.company_id, |books| books.ledger.delete_account(code))
            .await
            .inspect_err(rejected("delete_account"))?;

        info!(company_id = %ctx.company_id, code, "Account deleted");
        Ok(account)
    }

    /// Looks an account up by code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `ConcurrencyConflict`.
    pub async fn account(
        &self,
        ctx: &OperationContext,
        code: &str,
    ) -> Result<Account, AccountError> {
        self.store
            .read(ctx.company_id, |books| books.ledger.chart().resolve(code).cloned())
            .await
    }
}
