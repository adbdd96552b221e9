//! Application-wide error types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Error taxonomy shared by every engine.
///
/// Domain errors classify themselves into one of these kinds so callers can
/// decide how to react without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input.
    Validation,
    /// Requested amount exceeds the relevant available balance.
    InsufficientBudget,
    /// Invalid document state transition.
    State,
    /// Parent/child code violation.
    Hierarchy,
    /// Serialization failure; retry the whole operation.
    Conflict,
    /// Referenced record does not exist.
    NotFound,
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Insufficient budget or balance.
    #[error("Insufficient balance: {0}")]
    InsufficientBudget(String),

    /// Invalid state transition.
    #[error("Invalid state: {0}")]
    State(String),

    /// Hierarchy violation.
    #[error("Hierarchy violation: {0}")]
    Hierarchy(String),

    /// Conflict (serialization failure).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Builds an application error of the given kind.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::Validation => Self::Validation(message),
            ErrorKind::InsufficientBudget => Self::InsufficientBudget(message),
            ErrorKind::State => Self::State(message),
            ErrorKind::Hierarchy => Self::Hierarchy(message),
            ErrorKind::Conflict => Self::Conflict(message),
            ErrorKind::NotFound => Self::NotFound(message),
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InsufficientBudget(_) => ErrorKind::InsufficientBudget,
            Self::State(_) => ErrorKind::State,
            Self::Hierarchy(_) => ErrorKind::Hierarchy,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::InsufficientBudget(_) => "INSUFFICIENT_BUDGET",
            Self::State(_) => "STATE_ERROR",
            Self::Hierarchy(_) => "HIERARCHY_ERROR",
            Self::Conflict(_) => "CONCURRENCY_CONFLICT",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }

    /// Returns true if the caller should retry the whole operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}
