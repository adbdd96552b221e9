//! Public budget execution.
//!
//! Rubros form a code-prefix hierarchy per fiscal period. Spending moves
//! through CDP (availability certificate) → RP (commitment) → obligation
//! (accrual) → payment, each stage bounded by the one before it. Budget
//! modifications move appropriation between rubros.

pub mod accounting;
pub mod allocation;
pub mod book;
pub mod documents;
pub mod error;
pub mod events;
pub mod modification;
pub mod numbering;
pub mod rubro;

#[cfg(test)]
mod allocation_props;
#[cfg(test)]
mod pipeline_props;

pub use accounting::ObligationAccounting;
pub use allocation::{spread_proportionally, spread_weighted};
pub use book::BudgetBook;
pub use documents::{
    Cdp, CdpDetail, CdpDetailRef, CdpRequest, ContractType, DocumentState, Obligation,
    ObligationLine, ObligationRequest, Payment, PaymentLine, Rp, RpDetail, RpRequest, RubroAmount,
    validate_amount,
};
pub use error::BudgetError;
pub use events::{Availability, BudgetEvent, BudgetEventKind, RubroSnapshot};
pub use modification::{
    BudgetModification, ModificationDetail, ModificationRequest, ModificationService,
    ModificationType, Movement,
};
pub use numbering::{DocumentKind, DocumentNumbering};
pub use rubro::{AppropriationChange, BudgetRubro, NewRubro, RubroType};
