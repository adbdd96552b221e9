//! Money type with decimal precision and currency.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of decimal places every monetary amount is kept at.
pub const MONEY_SCALE: u32 = 2;

/// Tolerance for sum-equality checks (detail sums vs. header totals, debit vs. credit).
///
/// Never used for ordering comparisons: `amount <= available` is always exact.
pub const BALANCE_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Represents a monetary amount with currency.
///
/// Uses `Decimal` internally to avoid floating-point precision errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    /// The amount in currency units.
    pub amount: Decimal,
    /// ISO 4217 currency code (e.g., "COP", "USD").
    pub currency: Currency,
}

/// ISO 4217 currency codes supported by the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Colombian Peso
    Cop,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
}

impl Money {
    /// Creates a new Money instance.
    #[must_use]
    pub const fn new(amount: Decimal, currency: Currency) -> Self {
        Self { amount, currency }
    }

    /// Returns true if the amount is negative.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.amount.is_sign_negative() && !self.amount.is_zero()
    }

    /// Converts into `target` by plain rate multiplication, rounded to [`MONEY_SCALE`].
    ///
    /// Uses banker's rounding. The rate is supplied by the caller; it is never fetched here.
    #[must_use]
    pub fn convert(&self, rate: Decimal, target: Currency) -> Self {
        Self {
            amount: round_money(self.amount * rate),
            currency: target,
        }
    }
}

/// Rounds an amount to [`MONEY_SCALE`] using banker's rounding.
#[must_use]
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Returns true if `a` and `b` differ by no more than `tolerance`.
#[must_use]
pub fn within_tolerance(a: Decimal, b: Decimal, tolerance: Decimal) -> bool {
    (a - b).abs() <= tolerance
}

/// Returns true if the amount carries no more than [`MONEY_SCALE`] significant decimals.
#[must_use]
pub fn has_money_scale(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cop => write!(f, "COP"),
            Self::Usd => write!(f, "USD"),
            Self::Eur => write!(f, "EUR"),
        }
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "COP" => Ok(Self::Cop),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
