//! Budget events and rubro snapshots.
//!
//! Every committed budget mutation appends one event carrying the post-commit
//! snapshot of each rubro it touched.

use std::fmt;

use chrono::{DateTime, Utc};
use erario_shared::types::{RubroId, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::rubro::BudgetRubro;

/// Available balances of a rubro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Availability {
    /// Appropriation not reserved by CDPs.
    pub appropriation: Decimal,
    /// Reserved amount not committed by RPs.
    pub cdp: Decimal,
    /// Committed amount not accrued.
    pub rp: Decimal,
}

impl From<&BudgetRubro> for Availability {
    fn from(rubro: &BudgetRubro) -> Self {
        Self {
            appropriation: rubro.available_appropriation(),
            cdp: rubro.available_cdp(),
            rp: rubro.available_rp(),
        }
    }
}

/// Immutable copy of a rubro's counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubroSnapshot {
    /// Rubro identifier.
    pub rubro_id: RubroId,
    /// Rubro code.
    pub code: String,
    /// Current appropriation.
    pub current_appropriation: Decimal,
    /// Reserved by CDPs.
    pub cdp_amount: Decimal,
    /// Committed by RPs.
    pub rp_amount: Decimal,
    /// Accrued.
    pub obligations: Decimal,
    /// Paid.
    pub payments: Decimal,
    /// Derived availability.
    pub available: Availability,
}

impl From<&BudgetRubro> for RubroSnapshot {
    fn from(rubro: &BudgetRubro) -> Self {
        Self {
            rubro_id: rubro.id,
            code: rubro.code.clone(),
            current_appropriation: rubro.current_appropriation(),
            cdp_amount: rubro.cdp_amount,
            rp_amount: rubro.rp_amount,
            obligations: rubro.obligations,
            payments: rubro.payments,
            available: Availability::from(rubro),
        }
    }
}

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetEventKind {
    /// A rubro was created.
    RubroCreated,
    /// A rubro was deactivated.
    RubroDeactivated,
    /// A CDP reserved appropriation.
    CdpIssued,
    /// A CDP was approved.
    CdpApproved,
    /// A CDP was cancelled.
    CdpCancelled,
    /// A CDP expired.
    CdpExpired,
    /// An RP committed CDP balance.
    RpCommitted,
    /// An RP was approved.
    RpApproved,
    /// An RP was cancelled.
    RpCancelled,
    /// An RP was reversed.
    RpReversed,
    /// An obligation accrued RP balance.
    ObligationAccrued,
    /// An obligation was approved.
    ObligationApproved,
    /// An obligation was cancelled.
    ObligationCancelled,
    /// A payment was made.
    PaymentMade,
    /// A payment was reversed.
    PaymentReversed,
    /// A budget modification was applied.
    ModificationApplied,
}

impl fmt::Display for BudgetEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

/// A committed budget mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEvent {
    /// Position in the company's event log, starting at 1.
    pub sequence: u64,
    /// What happened.
    pub kind: BudgetEventKind,
    /// Number (or code) of the affected document.
    pub document_number: String,
    /// Acting user.
    pub actor: UserId,
    /// When it was committed.
    pub occurred_at: DateTime<Utc>,
    /// Post-commit state of every touched rubro.
    pub snapshots: Vec<RubroSnapshot>,
}
