//! Core business logic for Erario.
//!
//! This crate contains pure ledger and budget logic with ZERO storage dependencies.
//! All domain types, validation rules, and balance arithmetic live here.
//!
//! # Modules
//!
//! - `hierarchy` - Code-prefix trees shared by accounts and budget rubros
//! - `accounts` - Chart of accounts
//! - `ledger` - Double-entry posting, fiscal periods and running balances
//! - `budget` - Rubros, the CDP → RP → Obligation → Payment pipeline and modifications

pub mod accounts;
pub mod budget;
pub mod hierarchy;
pub mod ledger;
