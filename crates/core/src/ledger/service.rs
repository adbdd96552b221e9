//! Ledger service for journal entry validation and resolution.
//!
//! This module provides the pure business logic for validating and resolving
//! journal entries before a book applies them.

use chrono::NaiveDate;
use erario_shared::config::LedgerConfig;
use erario_shared::types::{CompanyId, Money};
use rust_decimal::Decimal;
use sha2::{Digest, Sha256};

use super::error::PostingError;
use super::types::{EntryTotals, JournalEntryDraft, JournalLineInput, PostedLine};
use super::validation::validate_lines;
use crate::accounts::{Account, ChartOfAccounts};

/// Ledger service for journal entry validation and resolution.
///
/// This service contains pure business logic with no storage dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Validate and resolve a draft before posting.
    ///
    /// Steps:
    /// 1. At least 2 lines, every account an active detail account
    /// 2. Line shape and balance in the entry currency
    /// 3. Exchange rate (positive, exactly 1 for the functional currency)
    /// 4. Functional amounts with banker's rounding, balance re-checked
    ///
    /// # Errors
    ///
    /// Returns `PostingError` if validation fails.
    pub fn validate_and_resolve(
        draft: &JournalEntryDraft,
        chart: &ChartOfAccounts,
        config: &LedgerConfig,
    ) -> Result<(Vec<PostedLine>, EntryTotals), PostingError> {
        if draft.lines.len() < 2 {
            return Err(PostingError::InsufficientLines);
        }

        let accounts = draft
            .lines
            .iter()
            .map(|line| Self::resolve_account(line, chart))
            .collect::<Result<Vec<_>, _>>()?;

        validate_lines(&draft.lines, config.balance_tolerance())?;
        Self::validate_rate(draft, config)?;

        let functional = |amount| {
            Money::new(amount, draft.currency)
                .convert(draft.exchange_rate, config.functional_currency)
                .amount
        };
        let resolved: Vec<PostedLine> = draft
            .lines
            .iter()
            .zip(accounts)
            .enumerate()
            .map(|(index, (line, account))| PostedLine {
                line_number: index + 1,
                account_id: account.id,
                account_code: account.code.clone(),
                description: line.description.clone(),
                debit: line.debit,
                credit: line.credit,
                functional_debit: functional(line.debit),
                functional_credit: functional(line.credit),
                cost_center: line.cost_center,
                project: line.project,
            })
            .collect();

        let totals = Self::calculate_totals(&resolved, config.balance_tolerance());
        if !totals.is_balanced {
            return Err(PostingError::UnbalancedEntry {
                debit: totals.debit,
                credit: totals.credit,
            });
        }

        Ok((resolved, totals))
    }

    fn resolve_account<'a>(
        line: &JournalLineInput,
        chart: &'a ChartOfAccounts,
    ) -> Result<&'a Account, PostingError> {
        let account = chart
            .resolve(&line.account_code)
            .map_err(|_| PostingError::AccountNotFound(line.account_code.clone()))?;

        if !account.is_detail {
            return Err(PostingError::AccountNotPostable(account.code.clone()));
        }
        if !account.is_active {
            return Err(PostingError::AccountInactive(account.code.clone()));
        }
        if account.requires_cost_center && line.cost_center.is_none() {
            return Err(PostingError::MissingCostCenter(account.code.clone()));
        }
        if account.requires_project && line.project.is_none() {
            return Err(PostingError::MissingProject(account.code.clone()));
        }
        Ok(account)
    }

    fn validate_rate(draft: &JournalEntryDraft, config: &LedgerConfig) -> Result<(), PostingError> {
        let rate = draft.exchange_rate;
        if rate <= Decimal::ZERO
            || (draft.currency == config.functional_currency && rate != Decimal::ONE)
        {
            return Err(PostingError::InvalidExchangeRate(rate));
        }
        Ok(())
    }

    /// Calculate functional-currency totals from resolved lines.
    #[must_use]
    pub fn calculate_totals(lines: &[PostedLine], tolerance: Decimal) -> EntryTotals {
        let debit: Decimal = lines.iter().map(|l| l.functional_debit).sum();
        let credit: Decimal = lines.iter().map(|l| l.functional_credit).sum();

        EntryTotals::new(debit, credit, tolerance)
    }

    /// Integrity hash of a posted entry.
    #[must_use]
    pub fn entry_hash(
        company_id: CompanyId,
        number: &str,
        date: NaiveDate,
        totals: &EntryTotals,
    ) -> String {
        let mut hasher = Sha256::new();
        let payload = format!("{company_id}{number}{date}{}{}", totals.debit, totals.credit);
        hasher.update(payload.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erario_shared::types::{CostCenterId, Currency};
    use rust_decimal_macros::dec;

    use crate::accounts::{AccountType, NewAccount};

    fn chart() -> ChartOfAccounts {
        let mut chart = ChartOfAccounts::new();
        chart
            .create_account(NewAccount::new("1", "Activo", AccountType::Asset, false))
            .unwrap();
        chart
            .create_account(
                NewAccount::new("1105", "Caja", AccountType::Asset, true).with_parent("1"),
            )
            .unwrap();
        chart
            .create_account(NewAccount::new("4", "Ingresos", AccountType::Income, false))
            .unwrap();
        chart
            .create_account(
                NewAccount::new("4135", "Comercio", AccountType::Income, true)
                    .with_parent("4")
                    .requiring_cost_center(),
            )
            .unwrap();
        chart
    }

    fn draft(lines: Vec<JournalLineInput>) -> JournalEntryDraft {
        let mut draft = JournalEntryDraft::new(
            "CG",
            NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            "Venta",
            Currency::Cop,
        );
        draft.lines = lines;
        draft
    }

    fn sale(amount: Decimal) -> Vec<JournalLineInput> {
        vec![
            JournalLineInput::debit("1105", amount),
            JournalLineInput::credit("4135", amount).with_cost_center(CostCenterId::new()),
        ]
    }

    #[test]
    fn test_validate_balanced_entry() {
        let config = LedgerConfig::default();
        let (lines, totals) =
            LedgerService::validate_and_resolve(&draft(sale(dec!(100))), &chart(), &config)
                .unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_number, 1);
        assert_eq!(lines[1].account_code, "4135");
        assert_eq!(totals.debit, dec!(100));
        assert_eq!(totals.credit, dec!(100));
    }

    #[test]
    fn test_non_detail_account_rejected() {
        let lines = vec![
            JournalLineInput::debit("1", dec!(100)),
            JournalLineInput::credit("4135", dec!(100)).with_cost_center(CostCenterId::new()),
        ];
        assert_eq!(
            LedgerService::validate_and_resolve(&draft(lines), &chart(), &LedgerConfig::default()),
            Err(PostingError::AccountNotPostable("1".into()))
        );
    }

    #[test]
    fn test_unknown_account_rejected() {
        let lines = vec![
            JournalLineInput::debit("1110", dec!(100)),
            JournalLineInput::credit("4135", dec!(100)),
        ];
        assert_eq!(
            LedgerService::validate_and_resolve(&draft(lines), &chart(), &LedgerConfig::default()),
            Err(PostingError::AccountNotFound("1110".into()))
        );
    }

    #[test]
    fn test_inactive_account_rejected() {
        let mut chart = chart();
        chart.deactivate("1105").unwrap();
        assert_eq!(
            LedgerService::validate_and_resolve(
                &draft(sale(dec!(100))),
                &chart,
                &LedgerConfig::default()
            ),
            Err(PostingError::AccountInactive("1105".into()))
        );
    }

    #[test]
    fn test_missing_cost_center_rejected() {
        let lines = vec![
            JournalLineInput::debit("1105", dec!(100)),
            JournalLineInput::credit("4135", dec!(100)),
        ];
        assert_eq!(
            LedgerService::validate_and_resolve(&draft(lines), &chart(), &LedgerConfig::default()),
            Err(PostingError::MissingCostCenter("4135".into()))
        );
    }

    #[test]
    fn test_functional_currency_requires_unit_rate() {
        let draft = draft(sale(dec!(100))).with_exchange_rate(dec!(2));
        assert_eq!(
            LedgerService::validate_and_resolve(&draft, &chart(), &LedgerConfig::default()),
            Err(PostingError::InvalidExchangeRate(dec!(2)))
        );
    }

    #[test]
    fn test_foreign_currency_converted() {
        let mut draft = draft(sale(dec!(100.25))).with_exchange_rate(dec!(4012.345));
        draft.currency = Currency::Usd;
        let config = LedgerConfig::default();
        let (lines, totals) =
            LedgerService::validate_and_resolve(&draft, &chart(), &config).unwrap();

        assert_eq!(lines[0].debit, dec!(100.25));
        assert_eq!(lines[0].functional_debit, dec!(402237.59));
        assert_eq!(totals.debit, totals.credit);
    }

    #[test]
    fn test_hash_is_stable_and_hex() {
        let company = CompanyId::new();
        let date = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let totals = EntryTotals::new(dec!(100), dec!(100), dec!(0.01));

        let a = LedgerService::entry_hash(company, "CG000001", date, &totals);
        let b = LedgerService::entry_hash(company, "CG000001", date, &totals);
        let c = LedgerService::entry_hash(company, "CG000002", date, &totals);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
    }
}
