//! Account balance calculations.
//!
//! Balances are kept per (account, fiscal period). Every applied line bumps a
//! monotonically increasing version and records the balance before and after.

use erario_shared::types::{AccountId, FiscalPeriodId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::NormalBalance;

/// Running balance of an account within one fiscal period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// The fiscal period.
    pub fiscal_period_id: FiscalPeriodId,
    /// Total debit amount.
    pub debit_total: Decimal,
    /// Total credit amount.
    pub credit_total: Decimal,
    /// Net balance, oriented by the account's normal side.
    pub balance: Decimal,
    /// Number of lines applied.
    pub version: u64,
}

impl AccountBalance {
    /// Creates a zero balance.
    #[must_use]
    pub const fn new(account_id: AccountId, fiscal_period_id: FiscalPeriodId) -> Self {
        Self {
            account_id,
            fiscal_period_id,
            debit_total: Decimal::ZERO,
            credit_total: Decimal::ZERO,
            balance: Decimal::ZERO,
            version: 0,
        }
    }

    /// Applies one posted line and returns the running balance record.
    pub fn apply(
        &mut self,
        side: NormalBalance,
        debit: Decimal,
        credit: Decimal,
    ) -> RunningBalance {
        let running = RunningBalance {
            version: self.version + 1,
            previous_balance: self.balance,
            current_balance: self.balance + side.balance_change(debit, credit),
        };

        self.debit_total += debit;
        self.credit_total += credit;
        self.balance = running.current_balance;
        self.version = running.version;

        running
    }

    /// Adds another balance into this one (used for roll-ups).
    pub fn absorb(&mut self, other: &Self) {
        self.debit_total += other.debit_total;
        self.credit_total += other.credit_total;
        self.balance += other.balance;
        self.version += other.version;
    }
}

/// Running balance information for one applied line.
///
/// - `version`: monotonically increasing counter
/// - `previous_balance`: balance before this line
/// - `current_balance`: balance after this line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningBalance {
    /// Account version after this line.
    pub version: u64,
    /// Balance before this line.
    pub previous_balance: Decimal,
    /// Balance after this line.
    pub current_balance: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    /// Strategy for one line: exactly one side non-zero.
    fn line_strategy() -> impl Strategy<Value = (Decimal, Decimal)> {
        (1i64..100_000i64, any::<bool>()).prop_map(|(cents, is_debit)| {
            let amount = Decimal::new(cents, 2);
            if is_debit {
                (amount, Decimal::ZERO)
            } else {
                (Decimal::ZERO, amount)
            }
        })
    }

    fn side_strategy() -> impl Strategy<Value = NormalBalance> {
        prop_oneof![Just(NormalBalance::Debit), Just(NormalBalance::Credit)]
    }

    fn fresh() -> AccountBalance {
        AccountBalance::new(AccountId::new(), FiscalPeriodId::new())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// **Property: Previous balance equals prior current balance**
        ///
        /// *For any* sequence of lines, each record's previous_balance SHALL equal
        /// the prior record's current_balance.
        #[test]
        fn prop_running_balance_chain(
            side in side_strategy(),
            lines in prop::collection::vec(line_strategy(), 1..20),
        ) {
            let mut balance = fresh();
            let mut last = Decimal::ZERO;
            for (debit, credit) in &lines {
                let running = balance.apply(side, *debit, *credit);
                prop_assert_eq!(running.previous_balance, last);
                last = running.current_balance;
            }
            prop_assert_eq!(balance.balance, last);
        }

        /// **Property: Version equals applied line count**
        ///
        /// *For any* N applied lines, the version SHALL be N.
        #[test]
        fn prop_version_counts_lines(
            side in side_strategy(),
            lines in prop::collection::vec(line_strategy(), 1..20),
        ) {
            let mut balance = fresh();
            for (i, (debit, credit)) in lines.iter().enumerate() {
                let running = balance.apply(side, *debit, *credit);
                prop_assert_eq!(running.version, i as u64 + 1);
            }
            prop_assert_eq!(balance.version, lines.len() as u64);
        }

        /// **Property: Balance is oriented by the normal side**
        ///
        /// *For any* sequence of lines, a debit-normal balance SHALL equal
        /// debits minus credits and a credit-normal balance the opposite.
        #[test]
        fn prop_balance_matches_totals(
            side in side_strategy(),
            lines in prop::collection::vec(line_strategy(), 1..20),
        ) {
            let mut balance = fresh();
            for (debit, credit) in &lines {
                balance.apply(side, *debit, *credit);
            }
            let expected = side.balance_change(balance.debit_total, balance.credit_total);
            prop_assert_eq!(balance.balance, expected);
        }
    }

    #[test]
    fn test_apply_chain() {
        let mut balance = fresh();

        let first = balance.apply(NormalBalance::Debit, dec!(100), dec!(0));
        assert_eq!(first.version, 1);
        assert_eq!(first.previous_balance, dec!(0));
        assert_eq!(first.current_balance, dec!(100));

        let second = balance.apply(NormalBalance::Debit, dec!(0), dec!(30));
        assert_eq!(second.version, 2);
        assert_eq!(second.previous_balance, dec!(100));
        assert_eq!(second.current_balance, dec!(70));

        assert_eq!(balance.debit_total, dec!(100));
        assert_eq!(balance.credit_total, dec!(30));
    }

    #[test]
    fn test_absorb_sums_everything() {
        let mut caja = fresh();
        caja.apply(NormalBalance::Debit, dec!(100), dec!(0));
        let mut bancos = fresh();
        bancos.apply(NormalBalance::Debit, dec!(250), dec!(0));
        bancos.apply(NormalBalance::Debit, dec!(0), dec!(50));

        let mut total = fresh();
        total.absorb(&caja);
        total.absorb(&bancos);

        assert_eq!(total.balance, dec!(300));
        assert_eq!(total.debit_total, dec!(350));
        assert_eq!(total.credit_total, dec!(50));
        assert_eq!(total.version, 3);
    }
}
