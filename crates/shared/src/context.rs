//! Explicit operation context.
//!
//! Every engine call receives the tenant, the fiscal period and the acting user.
//! Nothing in the engine resolves a "current company" on its own.

use serde::{Deserialize, Serialize};

use crate::types::{CompanyId, FiscalPeriodId, UserId};

/// Tenant, period and actor for a single engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationContext {
    /// The company (tenant) whose books are read and written.
    pub company_id: CompanyId,
    /// The fiscal period the operation is booked in.
    pub fiscal_period_id: FiscalPeriodId,
    /// The user recorded as provenance on the resulting document.
    pub actor_id: UserId,
}

impl OperationContext {
    /// Creates a new context.
    #[must_use]
    pub const fn new(
        company_id: CompanyId,
        fiscal_period_id: FiscalPeriodId,
        actor_id: UserId,
    ) -> Self {
        Self {
            company_id,
            fiscal_period_id,
            actor_id,
        }
    }

    /// Returns a copy of this context acting as another user.
    #[must_use]
    pub const fn with_actor(self, actor_id: UserId) -> Self {
        Self { actor_id, ..self }
    }
}
