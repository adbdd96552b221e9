//! Account domain types.

use erario_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::hierarchy::HierarchyNode;

/// Account classification. Determines the normal balance side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Assets (PUC class 1).
    Asset,
    /// Liabilities (PUC class 2).
    Liability,
    /// Equity (PUC class 3).
    Equity,
    /// Income (PUC class 4).
    Income,
    /// Expenses (PUC class 5).
    Expense,
    /// Costs of sales and production (PUC classes 6 and 7).
    Cost,
}

impl AccountType {
    /// Returns the side on which this account type grows.
    #[must_use]
    pub const fn normal_balance(self) -> NormalBalance {
        match self {
            Self::Asset | Self::Expense | Self::Cost => NormalBalance::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalBalance::Credit,
        }
    }
}

/// Normal balance side of an account.
///
/// - Debit-normal: balance += debit - credit
/// - Credit-normal: balance += credit - debit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalBalance {
    /// Asset, expense and cost accounts.
    Debit,
    /// Liability, equity and income accounts.
    Credit,
}

impl NormalBalance {
    /// Calculates the balance change for a posting.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self {
            Self::Debit => debit - credit,
            Self::Credit => credit - debit,
        }
    }
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Account code (digits only).
    pub code: String,
    /// Display name.
    pub name: String,
    /// Code of the parent account, if any.
    pub parent_code: Option<String>,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether the account accepts postings.
    pub is_detail: bool,
    /// Lines posted to this account must carry a cost center.
    pub requires_cost_center: bool,
    /// Lines posted to this account must carry a project.
    pub requires_project: bool,
}

impl NewAccount {
    /// Creates a root account input.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
        is_detail: bool,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            parent_code: None,
            account_type,
            is_detail,
            requires_cost_center: false,
            requires_project: false,
        }
    }

    /// Sets the parent account code.
    #[must_use]
    pub fn with_parent(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    /// Requires a cost center on every line posted to the account.
    #[must_use]
    pub const fn requiring_cost_center(mut self) -> Self {
        self.requires_cost_center = true;
        self
    }

    /// Requires a project on every line posted to the account.
    #[must_use]
    pub const fn requiring_project(mut self) -> Self {
        self.requires_project = true;
        self
    }
}

/// A chart of accounts entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account identifier.
    pub id: AccountId,
    /// Account code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Parent account.
    pub parent_id: Option<AccountId>,
    /// Account classification.
    pub account_type: AccountType,
    /// Whether the account accepts postings.
    pub is_detail: bool,
    /// Inactive accounts reject new postings.
    pub is_active: bool,
    /// Depth in the chart, 1 for roots.
    pub level: u32,
    /// Lines must carry a cost center.
    pub requires_cost_center: bool,
    /// Lines must carry a project.
    pub requires_project: bool,
}

impl Account {
    /// Returns true only for active detail accounts.
    #[must_use]
    pub const fn is_postable(&self) -> bool {
        self.is_detail && self.is_active
    }

    /// Returns the normal balance side.
    #[must_use]
    pub const fn normal_balance(&self) -> NormalBalance {
        self.account_type.normal_balance()
    }
}

impl HierarchyNode for Account {
    type Id = AccountId;

    fn parent_id(&self) -> Option<AccountId> {
        self.parent_id
    }

    fn code(&self) -> &str {
        &self.code
    }

    fn is_detail(&self) -> bool {
        self.is_detail
    }

    fn level(&self) -> u32 {
        self.level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(AccountType::Asset, NormalBalance::Debit)]
    #[case(AccountType::Expense, NormalBalance::Debit)]
    #[case(AccountType::Cost, NormalBalance::Debit)]
    #[case(AccountType::Liability, NormalBalance::Credit)]
    #[case(AccountType::Equity, NormalBalance::Credit)]
    #[case(AccountType::Income, NormalBalance::Credit)]
    fn test_normal_balance(#[case] account_type: AccountType, #[case] expected: NormalBalance) {
        assert_eq!(account_type.normal_balance(), expected);
    }

    #[test]
    fn test_debit_normal_balance_change() {
        let side = NormalBalance::Debit;
        assert_eq!(side.balance_change(dec!(100), dec!(0)), dec!(100));
        assert_eq!(side.balance_change(dec!(0), dec!(50)), dec!(-50));
        assert_eq!(side.balance_change(dec!(100), dec!(30)), dec!(70));
    }

    #[test]
    fn test_credit_normal_balance_change() {
        let side = NormalBalance::Credit;
        assert_eq!(side.balance_change(dec!(0), dec!(100)), dec!(100));
        assert_eq!(side.balance_change(dec!(50), dec!(0)), dec!(-50));
        assert_eq!(side.balance_change(dec!(30), dec!(100)), dec!(70));
    }

    #[test]
    fn test_new_account_builder() {
        let input = NewAccount::new("510506", "Sueldos", AccountType::Expense, true)
            .with_parent("5105")
            .requiring_cost_center();
        assert_eq!(input.parent_code.as_deref(), Some("5105"));
        assert!(input.requires_cost_center);
        assert!(!input.requires_project);
    }
}
