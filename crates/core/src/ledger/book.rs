//! A company's general ledger.
//!
//! The book owns the chart of accounts, fiscal periods, journal sequences,
//! posted entries and running balances. Every mutating method validates
//! everything up front and only then writes, so a rejected call leaves the
//! book untouched.

use std::collections::{BTreeMap, HashMap};

use chrono::{NaiveDate, Utc};
use erario_shared::config::LedgerConfig;
use erario_shared::types::{AccountId, FiscalPeriodId, JournalEntryId};
use erario_shared::OperationContext;

use super::balance::AccountBalance;
use super::error::PostingError;
use super::fiscal::{FiscalPeriod, PeriodStatus};
use super::reversal::ReversalService;
use super::sequence::JournalSequence;
use super::service::LedgerService;
use super::types::{JournalEntryDraft, JournalType, PostedEntry};
use crate::accounts::{Account, AccountError, ChartOfAccounts, NewAccount};

/// General ledger of one company.
#[derive(Debug, Clone, Default)]
pub struct LedgerBook {
    chart: ChartOfAccounts,
    periods: BTreeMap<FiscalPeriodId, FiscalPeriod>,
    journals: BTreeMap<String, JournalSequence>,
    entries: BTreeMap<JournalEntryId, PostedEntry>,
    reversed_by: HashMap<JournalEntryId, JournalEntryId>,
    balances: HashMap<(AccountId, FiscalPeriodId), AccountBalance>,
}

impl LedgerBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The chart of accounts.
    #[must_use]
    pub const fn chart(&self) -> &ChartOfAccounts {
        &self.chart
    }

    // ========== Accounts ==========

    /// Adds an account to the chart.
    ///
    /// # Errors
    ///
    /// See [`ChartOfAccounts::create_account`].
    pub fn create_account(&mut self, input: NewAccount) -> Result<Account, AccountError> {
        self.chart.create_account(input)
    }

    /// Deactivates an account; it keeps its balances but rejects new postings.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no account has that code.
    pub fn deactivate_account(&mut self, code: &str) -> Result<Account, AccountError> {
        self.chart.deactivate(code)
    }

    /// Deletes an account that was never posted to and has no children.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `HasChildren` or `HasPostings`.
    pub fn delete_account(&mut self, code: &str) -> Result<Account, AccountError> {
        let id = self.chart.resolve(code)?.id;
        let has_postings = self
            .balances
            .iter()
            .any(|((account_id, _), balance)| *account_id == id && balance.version > 0);
        self.chart.remove(code, has_postings)
    }

    // ========== Periods and journals ==========

    /// Opens a new period or reopens a closed one.
    ///
    /// # Errors
    ///
    /// Returns `PeriodAlreadyOpen` or `InvalidPeriodRange`.
    pub fn open_period(
        &mut self,
        id: FiscalPeriodId,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<FiscalPeriod, PostingError> {
        if let Some(period) = self.periods.get_mut(&id) {
            if period.allows_posting() {
                return Err(PostingError::PeriodAlreadyOpen(id));
            }
            period.status = PeriodStatus::Open;
            return Ok(period.clone());
        }

        let period = FiscalPeriod::open(id, name, start_date, end_date)?;
        self.periods.insert(id, period.clone());
        Ok(period)
    }

    /// Closes a period. Closing an already closed period is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `PeriodNotFound`.
    pub fn close_period(&mut self, id: FiscalPeriodId) -> Result<FiscalPeriod, PostingError> {
        let period = self
            .periods
            .get_mut(&id)
            .ok_or(PostingError::PeriodNotFound(id))?;
        period.status = PeriodStatus::Closed;
        Ok(period.clone())
    }

    /// Looks a period up.
    #[must_use]
    pub fn period(&self, id: FiscalPeriodId) -> Option<&FiscalPeriod> {
        self.periods.get(&id)
    }

    /// Registers a journal type with a fresh sequence.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateJournalType` if the code is taken.
    pub fn register_journal_type(&mut self, journal_type: JournalType) -> Result<(), PostingError> {
        if self.journals.contains_key(&journal_type.code) {
            return Err(PostingError::DuplicateJournalType(journal_type.code));
        }
        self.journals
            .insert(journal_type.code.clone(), JournalSequence::new(journal_type));
        Ok(())
    }

    // ========== Posting ==========

    /// Validates and posts a journal entry.
    ///
    /// The sequence number is assigned and every running balance updated in
    /// the same call, so numbers are gap-free per journal type.
    ///
    /// # Errors
    ///
    /// Returns `PostingError` if any validation fails.
    pub fn post(
        &mut self,
        ctx: &OperationContext,
        draft: &JournalEntryDraft,
        config: &LedgerConfig,
    ) -> Result<PostedEntry, PostingError> {
        self.post_with_reversal(ctx, draft, config, None)
    }

    fn post_with_reversal(
        &mut self,
        ctx: &OperationContext,
        draft: &JournalEntryDraft,
        config: &LedgerConfig,
        reverses: Option<JournalEntryId>,
    ) -> Result<PostedEntry, PostingError> {
        let (lines, totals) = LedgerService::validate_and_resolve(draft, &self.chart, config)?;

        self.periods
            .get(&ctx.fiscal_period_id)
            .ok_or(PostingError::PeriodNotFound(ctx.fiscal_period_id))?
            .validate_posting(draft.date)?;

        let sides = lines
            .iter()
            .map(|line| {
                self.chart
                    .get(line.account_id)
                    .map(Account::normal_balance)
                    .ok_or_else(|| PostingError::AccountNotFound(line.account_code.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sequence = self
            .journals
            .get_mut(&draft.journal_type)
            .ok_or_else(|| PostingError::JournalTypeNotFound(draft.journal_type.clone()))?;
        let (sequence, number) = sequence.assign();

        let entry = PostedEntry {
            id: JournalEntryId::new(),
            company_id: ctx.company_id,
            fiscal_period_id: ctx.fiscal_period_id,
            journal_type: draft.journal_type.clone(),
            sequence,
            hash: LedgerService::entry_hash(ctx.company_id, &number, draft.date, &totals),
            number,
            date: draft.date,
            description: draft.description.clone(),
            reference: draft.reference.clone(),
            currency: draft.currency,
            exchange_rate: draft.exchange_rate,
            lines,
            totals,
            reverses,
            posted_by: ctx.actor_id,
            posted_at: Utc::now(),
        };

        for (line, side) in entry.lines.iter().zip(sides) {
            self.balances
                .entry((line.account_id, ctx.fiscal_period_id))
                .or_insert_with(|| AccountBalance::new(line.account_id, ctx.fiscal_period_id))
                .apply(side, line.functional_debit, line.functional_credit);
        }

        self.entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    /// Posts the reversing entry of `entry_id`, dated `date`.
    ///
    /// # Errors
    ///
    /// - `EntryNotFound` if the entry does not exist
    /// - `AlreadyReversed` if it already has a reversal
    /// - `CannotReverseReversal` if it is itself a reversal
    /// - any posting error of the reversing entry (e.g. `PeriodClosed`)
    pub fn reverse(
        &mut self,
        ctx: &OperationContext,
        entry_id: JournalEntryId,
        date: NaiveDate,
        reason: &str,
        config: &LedgerConfig,
    ) -> Result<PostedEntry, PostingError> {
        let original = self
            .entries
            .get(&entry_id)
            .ok_or(PostingError::EntryNotFound(entry_id))?;
        if original.is_reversal() {
            return Err(PostingError::CannotReverseReversal(original.number.clone()));
        }
        if self.reversed_by.contains_key(&entry_id) {
            return Err(PostingError::AlreadyReversed(original.number.clone()));
        }

        let draft = ReversalService::reversing_draft(original, date, reason);
        let reversal = self.post_with_reversal(ctx, &draft, config, Some(entry_id))?;
        self.reversed_by.insert(entry_id, reversal.id);
        Ok(reversal)
    }

    // ========== Queries ==========

    /// Looks a posted entry up.
    #[must_use]
    pub fn entry(&self, id: JournalEntryId) -> Option<&PostedEntry> {
        self.entries.get(&id)
    }

    /// Returns the reversing entry of `id`, if any.
    #[must_use]
    pub fn reversal_of(&self, id: JournalEntryId) -> Option<&PostedEntry> {
        self.reversed_by.get(&id).and_then(|r| self.entries.get(r))
    }

    /// Posted entries of a period, in posting order per journal.
    pub fn entries_in(&self, period: FiscalPeriodId) -> impl Iterator<Item = &PostedEntry> {
        self.entries.values().filter(move |e| e.fiscal_period_id == period)
    }

    /// Balance of an account in a period.
    ///
    /// For aggregation accounts this is the sum of every detail descendant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown codes.
    pub fn account_balance(
        &self,
        code: &str,
        period: FiscalPeriodId,
    ) -> Result<AccountBalance, AccountError> {
        let account = self.chart.resolve(code)?;
        let mut total = AccountBalance::new(account.id, period);

        for detail in self.chart.detail_descendants(code)? {
            if let Some(balance) = self.balances.get(&(detail.id, period)) {
                total.absorb(balance);
            }
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use erario_shared::types::{CompanyId, Currency, UserId};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::accounts::AccountType;
    use crate::ledger::types::JournalLineInput;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, day).unwrap()
    }

    fn setup() -> (LedgerBook, OperationContext) {
        let ctx = OperationContext::new(CompanyId::new(), FiscalPeriodId::new(), UserId::new());
        let mut book = LedgerBook::new();
        book.create_account(NewAccount::new("1", "Activo", AccountType::Asset, false))
            .unwrap();
        book.create_account(
            NewAccount::new("11", "Disponible", AccountType::Asset, false).with_parent("1"),
        )
        .unwrap();
        book.create_account(
            NewAccount::new("1105", "Caja", AccountType::Asset, true).with_parent("11"),
        )
        .unwrap();
        book.create_account(
            NewAccount::new("1110", "Bancos", AccountType::Asset, true).with_parent("11"),
        )
        .unwrap();
        book.create_account(NewAccount::new("4", "Ingresos", AccountType::Income, false))
            .unwrap();
        book.create_account(
            NewAccount::new("4135", "Comercio", AccountType::Income, true).with_parent("4"),
        )
        .unwrap();
        book.open_period(ctx.fiscal_period_id, "2026-03", date(1), date(31))
            .unwrap();
        book.register_journal_type(JournalType::new("CG", "Comprobante general", "CG"))
            .unwrap();
        (book, ctx)
    }

    fn sale(debit_code: &str, amount: Decimal) -> JournalEntryDraft {
        JournalEntryDraft::new("CG", date(10), "Venta", Currency::Cop)
            .line(JournalLineInput::debit(debit_code, amount))
            .line(JournalLineInput::credit("4135", amount))
    }

    #[test]
    fn test_post_numbers_and_balances() {
        let (mut book, ctx) = setup();
        let config = LedgerConfig::default();

        let first = book.post(&ctx, &sale("1105", dec!(100)), &config).unwrap();
        let second = book.post(&ctx, &sale("1110", dec!(50)), &config).unwrap();

        assert_eq!(first.number, "CG000001");
        assert_eq!(second.number, "CG000002");
        assert_eq!(first.hash.len(), 64);

        let caja = book.account_balance("1105", ctx.fiscal_period_id).unwrap();
        assert_eq!(caja.balance, dec!(100));
        assert_eq!(caja.version, 1);

        let income = book.account_balance("4135", ctx.fiscal_period_id).unwrap();
        assert_eq!(income.balance, dec!(150));
        assert_eq!(income.credit_total, dec!(150));
    }

    #[test]
    fn test_parent_balance_is_sum_of_details() {
        let (mut book, ctx) = setup();
        let config = LedgerConfig::default();
        book.post(&ctx, &sale("1105", dec!(100)), &config).unwrap();
        book.post(&ctx, &sale("1110", dec!(250)), &config).unwrap();

        let disponible = book.account_balance("11", ctx.fiscal_period_id).unwrap();
        let activo = book.account_balance("1", ctx.fiscal_period_id).unwrap();
        assert_eq!(disponible.balance, dec!(350));
        assert_eq!(activo.balance, dec!(350));
    }

    #[test]
    fn test_failed_post_consumes_no_number() {
        let (mut book, ctx) = setup();
        let config = LedgerConfig::default();

        let unbalanced = JournalEntryDraft::new("CG", date(10), "Venta", Currency::Cop)
            .line(JournalLineInput::debit("1105", dec!(100)))
            .line(JournalLineInput::credit("4135", dec!(99)));
        assert_eq!(
            book.post(&ctx, &unbalanced, &config),
            Err(PostingError::UnbalancedEntry {
                debit: dec!(100),
                credit: dec!(99),
            })
        );

        let posted = book.post(&ctx, &sale("1105", dec!(100)), &config).unwrap();
        assert_eq!(posted.number, "CG000001");
    }

    #[test]
    fn test_closed_period_rejected() {
        let (mut book, ctx) = setup();
        book.close_period(ctx.fiscal_period_id).unwrap();
        assert_eq!(
            book.post(&ctx, &sale("1105", dec!(100)), &LedgerConfig::default()),
            Err(PostingError::PeriodClosed(ctx.fiscal_period_id))
        );

        book.open_period(ctx.fiscal_period_id, "2026-03", date(1), date(31))
            .unwrap();
        assert!(book.post(&ctx, &sale("1105", dec!(100)), &LedgerConfig::default()).is_ok());
    }

    #[test]
    fn test_unknown_journal_type_rejected() {
        let (mut book, ctx) = setup();
        let mut draft = sale("1105", dec!(100));
        draft.journal_type = "XX".into();
        assert_eq!(
            book.post(&ctx, &draft, &LedgerConfig::default()),
            Err(PostingError::JournalTypeNotFound("XX".into()))
        );
    }

    #[test]
    fn test_reverse_once() {
        let (mut book, ctx) = setup();
        let config = LedgerConfig::default();
        let original = book.post(&ctx, &sale("1105", dec!(100)), &config).unwrap();

        let reversal = book
            .reverse(&ctx, original.id, date(20), "Duplicate", &config)
            .unwrap();
        assert_eq!(reversal.reverses, Some(original.id));
        assert_eq!(reversal.number, "CG000002");
        assert_eq!(book.reversal_of(original.id).map(|e| e.id), Some(reversal.id));

        let caja = book.account_balance("1105", ctx.fiscal_period_id).unwrap();
        assert_eq!(caja.balance, Decimal::ZERO);
        assert_eq!(caja.version, 2);

        assert_eq!(
            book.reverse(&ctx, original.id, date(21), "Again", &config),
            Err(PostingError::AlreadyReversed("CG000001".into()))
        );
        assert_eq!(
            book.reverse(&ctx, reversal.id, date(21), "Undo", &config),
            Err(PostingError::CannotReverseReversal("CG000002".into()))
        );
    }

    #[test]
    fn test_delete_account_with_postings_rejected() {
        let (mut book, ctx) = setup();
        book.post(&ctx, &sale("1105", dec!(100)), &LedgerConfig::default())
            .unwrap();

        assert_eq!(
            book.delete_account("1105"),
            Err(AccountError::HasPostings("1105".into()))
        );
        assert!(book.delete_account("1110").is_ok());
    }
}
