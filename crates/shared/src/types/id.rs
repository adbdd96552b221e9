//! Typed IDs for type-safe entity references.
//!
//! Using typed IDs prevents accidentally passing a `RubroId` where an `AccountId` is expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Macro to generate typed ID wrappers.
macro_rules! typed_id {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Creates a new random ID using UUID v7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Creates an ID from an existing UUID.
            #[must_use]
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Returns the inner UUID.
            #[must_use]
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s)?))
            }
        }
    };
}

typed_id!(UserId, "Unique identifier for the actor recorded on documents.");
typed_id!(CompanyId, "Unique identifier for a company (tenant).");
typed_id!(FiscalPeriodId, "Unique identifier for a fiscal period.");
typed_id!(
    AccountId,
    "Unique identifier for a chart of accounts entry."
);
typed_id!(JournalEntryId, "Unique identifier for a posted journal entry.");
typed_id!(RubroId, "Unique identifier for a budget rubro.");
typed_id!(CdpId, "Unique identifier for a budget availability certificate (CDP).");
typed_id!(CdpDetailId, "Unique identifier for a CDP detail line.");
typed_id!(RpId, "Unique identifier for a budget commitment (RP).");
typed_id!(RpDetailId, "Unique identifier for an RP detail line.");
typed_id!(ObligationId, "Unique identifier for a budget obligation.");
typed_id!(PaymentId, "Unique identifier for a payment.");
typed_id!(ModificationId, "Unique identifier for a budget modification.");
typed_id!(CostCenterId, "Unique identifier for a cost center tag.");
typed_id!(ProjectId, "Unique identifier for a project tag.");
