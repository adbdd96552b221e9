//! Budget modifications: additions, reductions and transfers.
//!
//! A modification is a journal entry over rubros: credit movements raise a
//! rubro's appropriation, debit movements lower it. Transfers must balance.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use erario_shared::types::{
    CompanyId, FiscalPeriodId, ModificationId, RubroId, UserId, within_tolerance,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::documents::validate_amount;
use super::error::BudgetError;
use super::rubro::AppropriationChange;

/// Kind of budget modification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModificationType {
    /// Raises appropriations; credit movements only.
    Addition,
    /// Lowers appropriations; debit movements only.
    Reduction,
    /// Moves appropriation between rubros; debits equal credits.
    Transfer,
}

impl fmt::Display for ModificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Addition => write!(f, "addition"),
            Self::Reduction => write!(f, "reduction"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

/// Direction of a modification line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Movement {
    /// Lowers the appropriation.
    Debit,
    /// Raises the appropriation.
    Credit,
}

impl fmt::Display for Movement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Debit => write!(f, "debit"),
            Self::Credit => write!(f, "credit"),
        }
    }
}

/// One rubro movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationDetail {
    /// Target detail rubro.
    pub rubro_id: RubroId,
    /// Direction.
    pub movement: Movement,
    /// Amount moved.
    pub amount: Decimal,
}

/// Input for a budget modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModificationRequest {
    /// Kind of modification.
    pub modification_type: ModificationType,
    /// Document date.
    pub date: NaiveDate,
    /// Administrative act that authorizes it.
    pub act_number: String,
    /// Purpose.
    pub concept: String,
    /// Rubro movements.
    pub details: Vec<ModificationDetail>,
}

impl ModificationRequest {
    /// Creates a request without movements.
    #[must_use]
    pub fn new(
        modification_type: ModificationType,
        date: NaiveDate,
        act_number: impl Into<String>,
    ) -> Self {
        Self {
            modification_type,
            date,
            act_number: act_number.into(),
            concept: String::new(),
            details: Vec::new(),
        }
    }

    /// Adds a credit movement.
    #[must_use]
    pub fn credit(mut self, rubro_id: RubroId, amount: Decimal) -> Self {
        self.details.push(ModificationDetail {
            rubro_id,
            movement: Movement::Credit,
            amount,
        });
        self
    }

    /// Adds a debit movement.
    #[must_use]
    pub fn debit(mut self, rubro_id: RubroId, amount: Decimal) -> Self {
        self.details.push(ModificationDetail {
            rubro_id,
            movement: Movement::Debit,
            amount,
        });
        self
    }
}

/// An applied budget modification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetModification {
    /// Document identifier.
    pub id: ModificationId,
    /// Document number.
    pub number: String,
    /// Owning company.
    pub company_id: CompanyId,
    /// Fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Document date.
    pub date: NaiveDate,
    /// Kind of modification.
    pub modification_type: ModificationType,
    /// Authorizing act.
    pub act_number: String,
    /// Purpose.
    pub concept: String,
    /// Amount added, removed or moved.
    pub total_amount: Decimal,
    /// Rubro movements.
    pub details: Vec<ModificationDetail>,
    /// Applying actor.
    pub applied_by: UserId,
}

/// Stateless validation of modification requests.
pub struct ModificationService;

impl ModificationService {
    /// Validates the shape of a request and returns its total.
    ///
    /// # Errors
    ///
    /// - `EmptyDocument` without movements
    /// - `InvalidAmount` for non-positive or over-precise amounts
    /// - `MovementNotAllowed` for a debit in an addition or a credit in a reduction
    /// - `UnbalancedModification` for a transfer whose sides differ
    pub fn validate(
        request: &ModificationRequest,
        tolerance: Decimal,
    ) -> Result<Decimal, BudgetError> {
        if request.details.is_empty() {
            return Err(BudgetError::EmptyDocument);
        }

        let mut debit = Decimal::ZERO;
        let mut credit = Decimal::ZERO;
        for detail in &request.details {
            validate_amount(detail.amount)?;
            Self::change_for(request.modification_type, detail.movement)?;
            match detail.movement {
                Movement::Debit => debit += detail.amount,
                Movement::Credit => credit += detail.amount,
            }
        }

        match request.modification_type {
            ModificationType::Addition => Ok(credit),
            ModificationType::Reduction => Ok(debit),
            ModificationType::Transfer => {
                if debit.is_zero() || !within_tolerance(debit, credit, tolerance) {
                    return Err(BudgetError::UnbalancedModification { debit, credit });
                }
                Ok(credit)
            }
        }
    }

    /// Maps a movement of a modification type onto an appropriation change.
    ///
    /// # Errors
    ///
    /// Returns `MovementNotAllowed` for a debit in an addition or a credit in a reduction.
    pub fn change_for(
        modification_type: ModificationType,
        movement: Movement,
    ) -> Result<AppropriationChange, BudgetError> {
        match (modification_type, movement) {
            (ModificationType::Addition, Movement::Credit) => Ok(AppropriationChange::Addition),
            (ModificationType::Reduction, Movement::Debit) => Ok(AppropriationChange::Reduction),
            (ModificationType::Transfer, Movement::Credit) => Ok(AppropriationChange::TransferIn),
            (ModificationType::Transfer, Movement::Debit) => Ok(AppropriationChange::TransferOut),
            _ => Err(BudgetError::MovementNotAllowed {
                modification: modification_type.to_string(),
                movement: movement.to_string(),
            }),
        }
    }

    /// Net decrease requested per rubro (debits minus credits), positive entries only.
    #[must_use]
    pub fn net_decreases(details: &[ModificationDetail]) -> BTreeMap<RubroId, Decimal> {
        let mut net: BTreeMap<RubroId, Decimal> = BTreeMap::new();
        for detail in details {
            let delta = match detail.movement {
                Movement::Debit => detail.amount,
                Movement::Credit => -detail.amount,
            };
            *net.entry(detail.rubro_id).or_default() += delta;
        }
        net.retain(|_, amount| *amount > Decimal::ZERO);
        net
    }
}
