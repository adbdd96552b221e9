//! Per-company chart of accounts.

use std::collections::{BTreeMap, HashMap};

use erario_shared::types::AccountId;

use super::error::AccountError;
use super::types::{Account, NewAccount};
use crate::hierarchy::{self, CodeFormat, HierarchyError};

/// A company's chart of accounts.
#[derive(Debug, Clone, Default)]
pub struct ChartOfAccounts {
    accounts: BTreeMap<AccountId, Account>,
    by_code: HashMap<String, AccountId>,
}

impl ChartOfAccounts {
    /// Creates an empty chart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an account under its parent.
    ///
    /// # Errors
    ///
    /// - `Duplicate` if the code already exists
    /// - `Hierarchy` if the parent is missing, is a detail account, or its
    ///   code is not a strict prefix of `input.code`
    pub fn create_account(&mut self, input: NewAccount) -> Result<Account, AccountError> {
        if self.by_code.contains_key(&input.code) {
            return Err(AccountError::Duplicate(input.code));
        }

        let parent = match input.parent_code.as_deref() {
            Some(code) => Some(
                self.find(code)
                    .ok_or_else(|| HierarchyError::MissingParent(code.to_string()))?,
            ),
            None => None,
        };
        let level = hierarchy::validate_placement(CodeFormat::Account, &input.code, parent)?;

        let account = Account {
            id: AccountId::new(),
            code: input.code,
            name: input.name,
            parent_id: parent.map(|p| p.id),
            account_type: input.account_type,
            is_detail: input.is_detail,
            is_active: true,
            level,
            requires_cost_center: input.requires_cost_center,
            requires_project: input.requires_project,
        };

        self.by_code.insert(account.code.clone(), account.id);
        self.accounts.insert(account.id, account.clone());
        Ok(account)
    }

    fn find(&self, code: &str) -> Option<&Account> {
        self.by_code.get(code).and_then(|id| self.accounts.get(id))
    }

    /// Looks an account up by code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account has that code.
    pub fn resolve(&self, code: &str) -> Result<&Account, AccountError> {
        self.find(code)
            .ok_or_else(|| AccountError::NotFound(code.to_string()))
    }

    /// Looks an account up by id.
    #[must_use]
    pub fn get(&self, id: AccountId) -> Option<&Account> {
        self.accounts.get(&id)
    }

    /// Returns true only if `code` names an active detail account.
    #[must_use]
    pub fn is_postable(&self, code: &str) -> bool {
        self.find(code).is_some_and(Account::is_postable)
    }

    /// Marks an account inactive. Existing balances are untouched.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account has that code.
    pub fn deactivate(&mut self, code: &str) -> Result<Account, AccountError> {
        let id = self.resolve(code)?.id;
        let account = self
            .accounts
            .get_mut(&id)
            .ok_or_else(|| AccountError::NotFound(code.to_string()))?;
        account.is_active = false;
        Ok(account.clone())
    }

    /// Deletes an account that has neither postings nor children.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `HasChildren` or `HasPostings`.
    pub fn remove(&mut self, code: &str, has_postings: bool) -> Result<Account, AccountError> {
        let id = self.resolve(code)?.id;
        if !hierarchy::children(&self.accounts, id).is_empty() {
            return Err(AccountError::HasChildren(code.to_string()));
        }
        if has_postings {
            return Err(AccountError::HasPostings(code.to_string()));
        }

        self.by_code.remove(code);
        self.accounts
            .remove(&id)
            .ok_or_else(|| AccountError::NotFound(code.to_string()))
    }

    /// Returns the direct children of an account, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account has that code.
    pub fn children(&self, code: &str) -> Result<Vec<&Account>, AccountError> {
        let id = self.resolve(code)?.id;
        Ok(self.collect_sorted(hierarchy::children(&self.accounts, id)))
    }

    /// Returns the detail accounts at or below an account, ordered by code.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a hierarchy error if a parent chain loops.
    pub fn detail_descendants(&self, code: &str) -> Result<Vec<&Account>, AccountError> {
        let id = self.resolve(code)?.id;
        let ids = hierarchy::detail_descendants(&self.accounts, id)?;
        Ok(self.collect_sorted(ids))
    }

    fn collect_sorted(&self, ids: Vec<AccountId>) -> Vec<&Account> {
        let mut accounts: Vec<&Account> =
            ids.iter().filter_map(|id| self.accounts.get(id)).collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        accounts
    }

    /// Iterates over all accounts, ordered by code.
    pub fn iter(&self) -> impl Iterator<Item = &Account> {
        let mut accounts: Vec<&Account> = self.accounts.values().collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        accounts.into_iter()
    }

    /// Number of accounts in the chart.
    #[must_use]
    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    /// Returns true if the chart has no accounts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accounts::AccountType;

    fn puc() -> ChartOfAccounts {
        let mut chart = ChartOfAccounts::new();
        chart
            .create_account(NewAccount::new("1", "Activo", AccountType::Asset, false))
            .unwrap();
        chart
            .create_account(
                NewAccount::new("11", "Disponible", AccountType::Asset, false).with_parent("1"),
            )
            .unwrap();
        chart
            .create_account(
                NewAccount::new("1105", "Caja", AccountType::Asset, true).with_parent("11"),
            )
            .unwrap();
        chart
            .create_account(
                NewAccount::new("1110", "Bancos", AccountType::Asset, true).with_parent("11"),
            )
            .unwrap();
        chart
    }

    #[test]
    fn test_create_assigns_levels_and_parents() {
        let chart = puc();
        let caja = chart.resolve("1105").unwrap();
        assert_eq!(caja.level, 3);
        assert_eq!(caja.parent_id, Some(chart.resolve("11").unwrap().id));
        assert!(caja.is_active);
        assert_eq!(chart.len(), 4);
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let mut chart = puc();
        let result = chart.create_account(
            NewAccount::new("1105", "Caja 2", AccountType::Asset, true).with_parent("11"),
        );
        assert_eq!(result, Err(AccountError::Duplicate("1105".into())));
    }

    #[test]
    fn test_prefix_violation_rejected() {
        let mut chart = puc();
        let result = chart.create_account(
            NewAccount::new("1205", "Inversiones", AccountType::Asset, true).with_parent("11"),
        );
        assert!(matches!(
            result,
            Err(AccountError::Hierarchy(HierarchyError::PrefixMismatch { .. }))
        ));
    }

    #[test]
    fn test_missing_parent_rejected() {
        let mut chart = puc();
        let result = chart.create_account(
            NewAccount::new("1305", "Clientes", AccountType::Asset, true).with_parent("13"),
        );
        assert_eq!(
            result,
            Err(AccountError::Hierarchy(HierarchyError::MissingParent("13".into())))
        );
    }

    #[test]
    fn test_child_of_detail_rejected() {
        let mut chart = puc();
        let result = chart.create_account(
            NewAccount::new("110505", "Caja general", AccountType::Asset, true).with_parent("1105"),
        );
        assert_eq!(
            result,
            Err(AccountError::Hierarchy(HierarchyError::ParentIsDetail("1105".into())))
        );
    }

    #[test]
    fn test_is_postable() {
        let mut chart = puc();
        assert!(chart.is_postable("1105"));
        assert!(!chart.is_postable("11"));
        assert!(!chart.is_postable("9999"));

        chart.deactivate("1105").unwrap();
        assert!(!chart.is_postable("1105"));
    }

    #[test]
    fn test_children_and_descendants_sorted_by_code() {
        let chart = puc();
        let children: Vec<&str> =
            chart.children("11").unwrap().iter().map(|a| a.code.as_str()).collect();
        assert_eq!(children, vec!["1105", "1110"]);

        let leaves: Vec<&str> = chart
            .detail_descendants("1")
            .unwrap()
            .iter()
            .map(|a| a.code.as_str())
            .collect();
        assert_eq!(leaves, vec!["1105", "1110"]);
    }

    #[test]
    fn test_remove_rules() {
        let mut chart = puc();
        assert_eq!(chart.remove("11", false), Err(AccountError::HasChildren("11".into())));
        assert_eq!(chart.remove("1105", true), Err(AccountError::HasPostings("1105".into())));

        let removed = chart.remove("1110", false).unwrap();
        assert_eq!(removed.code, "1110");
        assert!(chart.resolve("1110").is_err());
    }
}
