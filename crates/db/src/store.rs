//! Transactional in-memory store.
//!
//! Each company owns one set of books behind an async mutex. A transaction
//! holds that lock across the whole check-and-update and works on the books
//! in place. Every book operation checks before it writes, so an operation
//! that fails leaves nothing behind.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use erario_core::accounts::AccountError;
use erario_core::budget::{BudgetBook, BudgetError};
use erario_core::ledger::{LedgerBook, PostingError};
use erario_shared::config::StoreConfig;
use erario_shared::types::CompanyId;
use erario_shared::{AppError, ErrorKind};
use rust_decimal::Decimal;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Errors raised by the store itself.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The company lock could not be acquired in time.
    #[error("Timed out after {0:?} waiting for the company books")]
    LockTimeout(Duration),
}

impl StoreError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::LockTimeout(_) => "CONCURRENCY_CONFLICT",
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        ErrorKind::Conflict
    }

    /// Returns true if the caller should retry the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        true
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

impl From<StoreError> for AccountError {
    fn from(_: StoreError) -> Self {
        Self::ConcurrencyConflict
    }
}

impl From<StoreError> for PostingError {
    fn from(_: StoreError) -> Self {
        Self::ConcurrencyConflict
    }
}

impl From<StoreError> for BudgetError {
    fn from(_: StoreError) -> Self {
        Self::ConcurrencyConflict
    }
}

/// Everything stored for one company.
#[derive(Debug)]
pub struct CompanyBooks {
    /// General ledger.
    pub ledger: LedgerBook,
    /// Budget.
    pub budget: BudgetBook,
}

impl CompanyBooks {
    fn new(tolerance: Decimal) -> Self {
        Self {
            ledger: LedgerBook::new(),
            budget: BudgetBook::with_tolerance(tolerance),
        }
    }
}

/// Store holding the books of every company.
#[derive(Debug)]
pub struct MemoryStore {
    books: RwLock<HashMap<CompanyId, Arc<Mutex<CompanyBooks>>>>,
    lock_timeout: Duration,
    tolerance: Decimal,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: &StoreConfig, tolerance: Decimal) -> Self {
        Self {
            books: RwLock::new(HashMap::new()),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
            tolerance,
        }
    }

    async fn books_for(&self, company: CompanyId) -> Arc<Mutex<CompanyBooks>> {
        if let Some(books) = self.books.read().await.get(&company) {
            return Arc::clone(books);
        }

        let mut all = self.books.write().await;
        let books = all
            .entry(company)
            .or_insert_with(|| Arc::new(Mutex::new(CompanyBooks::new(self.tolerance))));
        Arc::clone(books)
    }

    /// Runs `f` as one transaction over a company's books.
    ///
    /// The company lock is held for the whole call and `f` writes straight
    /// into the books. A closure that touches both books must finish every
    /// fallible step before its first write, as the `*_with` budget
    /// operations do.
    ///
    /// # Errors
    ///
    /// Returns the closure's error, or `StoreError::LockTimeout` converted
    /// into `E` if the lock is not acquired within the configured timeout.
    pub async fn transaction<T, E, F>(&self, company: CompanyId, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut CompanyBooks) -> Result<T, E>,
        E: From<StoreError>,
    {
        let books = self.books_for(company).await;
        let mut guard = tokio::time::timeout(self.lock_timeout, books.lock())
            .await
            .map_err(|_| StoreError::LockTimeout(self.lock_timeout))?;
        debug!(company_id = %company, "Company books locked");

        f(&mut guard)
    }

    /// Reads a company's books under its lock.
    ///
    /// # Errors
    ///
    /// Returns `LockTimeout` converted into `E`.
    pub async fn read<T, E, F>(&self, company: CompanyId, f: F) -> Result<T, E>
    where
        F: FnOnce(&CompanyBooks) -> Result<T, E>,
        E: From<StoreError>,
    {
        let books = self.books_for(company).await;
        let guard = tokio::time::timeout(self.lock_timeout, books.lock())
            .await
            .map_err(|_| StoreError::LockTimeout(self.lock_timeout))?;
        f(&guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erario_core::budget::{NewRubro, RubroType};
    use erario_shared::OperationContext;
    use erario_shared::types::{BALANCE_TOLERANCE, FiscalPeriodId, UserId};

    fn store(timeout_ms: u64) -> MemoryStore {
        MemoryStore::new(
            &StoreConfig {
                lock_timeout_ms: timeout_ms,
            },
            BALANCE_TOLERANCE,
        )
    }

    fn ctx() -> OperationContext {
        OperationContext::new(CompanyId::new(), FiscalPeriodId::new(), UserId::new())
    }

    #[tokio::test]
    async fn test_rejected_operation_leaves_books_untouched() {
        let store = store(1000);
        let ctx = ctx();
        store
            .transaction::<_, BudgetError, _>(ctx.company_id, |books| {
                books
                    .budget
                    .create_rubro(&ctx, NewRubro::new("2", "Gastos", RubroType::Expense, false))
            })
            .await
            .unwrap();

        let result = store
            .transaction::<_, BudgetError, _>(ctx.company_id, |books| {
                books.budget.create_rubro(
                    &ctx,
                    NewRubro::new("2.1", "Funcionamiento", RubroType::Expense, true)
                        .with_parent("2")
                        .with_appropriation(Decimal::NEGATIVE_ONE),
                )
            })
            .await;
        assert!(result.is_err());

        let (count, events) = store
            .read::<_, BudgetError, _>(ctx.company_id, |books| {
                Ok((
                    books.budget.rubros_in(ctx.fiscal_period_id).count(),
                    books.budget.events().len(),
                ))
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(events, 1);
    }

    #[tokio::test]
    async fn test_companies_are_isolated() {
        let store = store(1000);
        let (a, b) = (ctx(), ctx());

        store
            .transaction::<_, BudgetError, _>(a.company_id, |books| {
                books
                    .budget
                    .create_rubro(&a, NewRubro::new("2", "Gastos", RubroType::Expense, false))
            })
            .await
            .unwrap();

        let seen_by_b = store
            .read::<_, BudgetError, _>(b.company_id, |books| {
                Ok(books.budget.rubro_by_code(a.fiscal_period_id, "2").is_some())
            })
            .await
            .unwrap();
        assert!(!seen_by_b);
    }

    #[tokio::test]
    async fn test_lock_timeout_is_a_conflict() {
        let store = store(20);
        let ctx = ctx();
        let books = store.books_for(ctx.company_id).await;
        let _held = books.lock().await;

        let result = store
            .transaction::<(), BudgetError, _>(ctx.company_id, |_| Ok(()))
            .await;
        assert_eq!(result, Err(BudgetError::ConcurrencyConflict));
        assert!(result.unwrap_err().is_retryable());
    }

    #[test]
    fn test_store_error_classification() {
        let err = StoreError::LockTimeout(Duration::from_millis(5));
        assert_eq!(err.error_code(), "CONCURRENCY_CONFLICT");
        assert!(AppError::from(err).is_retryable());
    }
}
