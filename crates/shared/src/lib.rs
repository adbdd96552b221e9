//! Shared types, errors, and configuration for Erario.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - Fixed-point amount helpers and currencies
//! - The explicit operation context threaded through every engine call
//! - Application-wide error types
//! - Configuration management

pub mod config;
pub mod context;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use context::OperationContext;
pub use error::{AppError, AppResult, ErrorKind};
