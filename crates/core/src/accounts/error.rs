//! Chart of accounts errors.

use erario_shared::{AppError, ErrorKind};
use thiserror::Error;

use crate::hierarchy::HierarchyError;

/// Errors raised by chart of accounts maintenance.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountError {
    /// Parent/child code violation.
    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),

    /// Account code already exists within the chart.
    #[error("Account code already exists: {0}")]
    Duplicate(String),

    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(String),

    /// Accounts with postings can only be deactivated.
    #[error("Account {0} has postings and cannot be deleted")]
    HasPostings(String),

    /// Accounts with children cannot be deleted.
    #[error("Account {0} has child accounts and cannot be deleted")]
    HasChildren(String),

    /// Company lock could not be acquired in time.
    #[error("Concurrent modification detected, please retry")]
    ConcurrencyConflict,
}

impl AccountError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Hierarchy(err) => err.error_code(),
            Self::Duplicate(_) => "DUPLICATE_ACCOUNT",
            Self::NotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::HasPostings(_) => "ACCOUNT_HAS_POSTINGS",
            Self::HasChildren(_) => "ACCOUNT_HAS_CHILDREN",
            Self::ConcurrencyConflict => "CONCURRENCY_CONFLICT",
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Hierarchy(_) => ErrorKind::Hierarchy,
            Self::Duplicate(_) => ErrorKind::Validation,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::HasPostings(_) | Self::HasChildren(_) => ErrorKind::State,
            Self::ConcurrencyConflict => ErrorKind::Conflict,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrencyConflict)
    }
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchy_errors_keep_their_code() {
        let err = AccountError::from(HierarchyError::MissingParent("11".into()));
        assert_eq!(err.error_code(), "MISSING_PARENT");
        assert_eq!(err.kind(), ErrorKind::Hierarchy);
        assert_eq!(err.to_string(), "Parent not found: 11");
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AccountError::ConcurrencyConflict.is_retryable());
        assert!(!AccountError::Duplicate("1105".into()).is_retryable());
    }

    #[test]
    fn test_into_app_error() {
        let app: AppError = AccountError::HasPostings("1105".into()).into();
        assert_eq!(app.kind(), ErrorKind::State);
        assert_eq!(
            app.to_string(),
            "Invalid state: Account 1105 has postings and cannot be deleted"
        );
    }
}
