//! Storage layer for Erario.
//!
//! This crate provides:
//! - A transactional in-memory store with one serialized book per company
//! - Repositories that run each domain operation as one store transaction
//! - The `Engine` facade exposing the accounting and budget operations

pub mod engine;
pub mod repositories;
pub mod store;

pub use engine::Engine;
pub use repositories::{AccountRepository, BudgetRepository, LedgerRepository};
pub use store::{CompanyBooks, MemoryStore, StoreError};
