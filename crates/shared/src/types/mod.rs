//! Common types used across the application.

pub mod id;
pub mod money;

pub use id::*;
pub use money::{
    BALANCE_TOLERANCE, Currency, MONEY_SCALE, Money, has_money_scale, round_money, within_tolerance,
};
