//! Budget rubros and their counters.
//!
//! A rubro holds its appropriation components and four pipeline counters.
//! Availability is never stored: it is recomputed from the counters on every
//! read.
//!
//! Invariant chain for every rubro:
//! `0 ≤ payments ≤ obligations ≤ rp_amount ≤ cdp_amount ≤ current_appropriation`

use erario_shared::types::{FiscalPeriodId, RubroId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::BudgetError;
use crate::hierarchy::HierarchyNode;

/// Budget line classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RubroType {
    /// Income line.
    Income,
    /// Operating expense line.
    Expense,
    /// Investment line.
    Investment,
}

/// Input for creating a rubro.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRubro {
    /// Rubro code; extends the parent code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Parent code, `None` for roots.
    pub parent_code: Option<String>,
    /// Classification.
    pub rubro_type: RubroType,
    /// Whether the rubro accepts reservations.
    pub is_detail: bool,
    /// Appropriation approved for the fiscal period.
    pub initial_appropriation: Decimal,
}

impl NewRubro {
    /// Creates an input with no parent and no appropriation.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        name: impl Into<String>,
        rubro_type: RubroType,
        is_detail: bool,
    ) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            parent_code: None,
            rubro_type,
            is_detail,
            initial_appropriation: Decimal::ZERO,
        }
    }

    /// Sets the parent code.
    #[must_use]
    pub fn with_parent(mut self, parent_code: impl Into<String>) -> Self {
        self.parent_code = Some(parent_code.into());
        self
    }

    /// Sets the initial appropriation.
    #[must_use]
    pub const fn with_appropriation(mut self, amount: Decimal) -> Self {
        self.initial_appropriation = amount;
        self
    }
}

/// A change to a rubro's appropriation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppropriationChange {
    /// Budget addition.
    Addition,
    /// Budget reduction.
    Reduction,
    /// Incoming side of a transfer.
    TransferIn,
    /// Outgoing side of a transfer.
    TransferOut,
}

impl AppropriationChange {
    /// Whether the change lowers the appropriation.
    #[must_use]
    pub const fn decreases(self) -> bool {
        matches!(self, Self::Reduction | Self::TransferOut)
    }
}

/// A budget line in the rubro hierarchy of one fiscal period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRubro {
    /// Rubro identifier.
    pub id: RubroId,
    /// Fiscal period the rubro belongs to.
    pub fiscal_period_id: FiscalPeriodId,
    /// Rubro code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Parent rubro.
    pub parent_id: Option<RubroId>,
    /// Classification.
    pub rubro_type: RubroType,
    /// Depth in the tree, 1 for roots.
    pub level: u32,
    /// Whether the rubro accepts reservations.
    pub is_detail: bool,
    /// Inactive rubros accept nothing new.
    pub is_active: bool,
    /// Appropriation approved at creation.
    pub initial_appropriation: Decimal,
    /// Sum of additions.
    pub additions: Decimal,
    /// Sum of reductions.
    pub reductions: Decimal,
    /// Sum of incoming transfers.
    pub transfers_in: Decimal,
    /// Sum of outgoing transfers.
    pub transfers_out: Decimal,
    /// Reserved by CDPs.
    pub cdp_amount: Decimal,
    /// Committed by RPs.
    pub rp_amount: Decimal,
    /// Accrued by obligations.
    pub obligations: Decimal,
    /// Disbursed by payments.
    pub payments: Decimal,
}

impl BudgetRubro {
    /// Creates a rubro with zero counters.
    #[must_use]
    pub fn new(
        fiscal_period_id: FiscalPeriodId,
        input: NewRubro,
        parent_id: Option<RubroId>,
        level: u32,
    ) -> Self {
        Self {
            id: RubroId::new(),
            fiscal_period_id,
            code: input.code,
            name: input.name,
            parent_id,
            rubro_type: input.rubro_type,
            level,
            is_detail: input.is_detail,
            is_active: true,
            initial_appropriation: input.initial_appropriation,
            additions: Decimal::ZERO,
            reductions: Decimal::ZERO,
            transfers_in: Decimal::ZERO,
            transfers_out: Decimal::ZERO,
            cdp_amount: Decimal::ZERO,
            rp_amount: Decimal::ZERO,
            obligations: Decimal::ZERO,
            payments: Decimal::ZERO,
        }
    }

    // ========== Derived amounts ==========

    /// `initial + additions − reductions + transfers_in − transfers_out`
    #[must_use]
    pub fn current_appropriation(&self) -> Decimal {
        self.initial_appropriation + self.additions - self.reductions + self.transfers_in
            - self.transfers_out
    }

    /// Appropriation not yet reserved by CDPs.
    #[must_use]
    pub fn available_appropriation(&self) -> Decimal {
        self.current_appropriation() - self.cdp_amount
    }

    /// Reserved amount not yet committed by RPs.
    #[must_use]
    pub fn available_cdp(&self) -> Decimal {
        self.cdp_amount - self.rp_amount
    }

    /// Committed amount not yet accrued.
    #[must_use]
    pub fn available_rp(&self) -> Decimal {
        self.rp_amount - self.obligations
    }

    /// Accrued amount not yet paid.
    #[must_use]
    pub fn pending_payment(&self) -> Decimal {
        self.obligations - self.payments
    }

    /// `obligations / current_appropriation × 100`, 0 without appropriation.
    #[must_use]
    pub fn execution_percentage(&self) -> Decimal {
        let appropriation = self.current_appropriation();
        if appropriation.is_zero() {
            Decimal::ZERO
        } else {
            (self.obligations / appropriation * Decimal::ONE_HUNDRED).round_dp(2)
        }
    }

    /// Whether the rubro accepts reservations and modifications.
    #[must_use]
    pub const fn is_postable(&self) -> bool {
        self.is_detail && self.is_active
    }

    /// Checks the counter chain.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` naming the first broken relation.
    pub fn check_invariants(&self) -> Result<(), BudgetError> {
        let chain = [
            ("payments", Decimal::ZERO, self.payments),
            ("obligations", self.payments, self.obligations),
            ("rp_amount", self.obligations, self.rp_amount),
            ("cdp_amount", self.rp_amount, self.cdp_amount),
            (
                "current_appropriation",
                self.cdp_amount,
                self.current_appropriation(),
            ),
        ];

        for (name, lower, value) in chain {
            if value < lower {
                return Err(BudgetError::InvariantViolation {
                    rubro: self.code.clone(),
                    detail: format!("{name} {value} is below {lower}"),
                });
            }
        }
        Ok(())
    }

    // ========== Appropriation ==========

    /// Applies an appropriation change.
    ///
    /// # Errors
    ///
    /// Returns `NegativeAppropriation` if a decrease exceeds the available
    /// appropriation (it would strand reserved CDPs).
    pub fn apply_modification(
        &mut self,
        change: AppropriationChange,
        amount: Decimal,
    ) -> Result<(), BudgetError> {
        if change.decreases() && amount > self.available_appropriation() {
            return Err(BudgetError::NegativeAppropriation {
                rubro: self.code.clone(),
                requested: amount,
                available: self.available_appropriation(),
            });
        }

        match change {
            AppropriationChange::Addition => self.additions += amount,
            AppropriationChange::Reduction => self.reductions += amount,
            AppropriationChange::TransferIn => self.transfers_in += amount,
            AppropriationChange::TransferOut => self.transfers_out += amount,
        }
        Ok(())
    }

    // ========== Pipeline counters ==========

    /// Reserves appropriation for a CDP.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientAppropriation`.
    pub fn reserve_cdp(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        let available = self.available_appropriation();
        if amount > available {
            return Err(BudgetError::InsufficientAppropriation {
                rubro: self.code.clone(),
                requested: amount,
                available,
            });
        }
        self.cdp_amount += amount;
        Ok(())
    }

    /// Releases a CDP reservation.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the release would drop below the RP amount.
    pub fn release_cdp(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        self.ensure_release(amount, self.available_cdp(), "cdp_amount")?;
        self.cdp_amount -= amount;
        Ok(())
    }

    /// Commits reserved amount to an RP.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the rubro has less reserved than requested.
    pub fn add_rp(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        self.ensure_release(amount, self.available_cdp(), "rp_amount")?;
        self.rp_amount += amount;
        Ok(())
    }

    /// Releases an RP commitment.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the release would drop below obligations.
    pub fn release_rp(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        self.ensure_release(amount, self.available_rp(), "rp_amount")?;
        self.rp_amount -= amount;
        Ok(())
    }

    /// Accrues committed amount.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the rubro has less committed than requested.
    pub fn add_obligation(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        self.ensure_release(amount, self.available_rp(), "obligations")?;
        self.obligations += amount;
        Ok(())
    }

    /// Releases an accrual.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the release would drop below payments.
    pub fn release_obligation(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        self.ensure_release(amount, self.pending_payment(), "obligations")?;
        self.obligations -= amount;
        Ok(())
    }

    /// Records a payment.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the rubro has less pending than requested.
    pub fn add_payment(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        self.ensure_release(amount, self.pending_payment(), "payments")?;
        self.payments += amount;
        Ok(())
    }

    /// Reverses a payment.
    ///
    /// # Errors
    ///
    /// Returns `InvariantViolation` if the rubro has paid less than requested.
    pub fn release_payment(&mut self, amount: Decimal) -> Result<(), BudgetError> {
        self.ensure_release(amount, self.payments, "payments")?;
        self.payments -= amount;
        Ok(())
    }

    fn ensure_release(
        &self,
        amount: Decimal,
        room: Decimal,
        counter: &str,
    ) -> Result<(), BudgetError> {
        if amount > room {
            return Err(BudgetError::InvariantViolation {
                rubro: self.code.clone(),
                detail: format!("moving {amount} on {counter} exceeds {room}"),
            });
        }
        Ok(())
    }

    /// Adds another rubro's components and counters into this one.
    pub fn absorb(&mut self, other: &Self) {
        self.initial_appropriation += other.initial_appropriation;
        self.additions += other.additions;
        self.reductions += other.reductions;
        self.transfers_in += other.transfers_in;
        self.transfers_out += other.transfers_out;
        self.cdp_amount += other.cdp_amount;
        self.rp_amount += other.rp_amount;
        self.obligations += other.obligations;
        self.payments += other.payments;
    }
}

impl HierarchyNode for BudgetRubro {
    type Id = RubroId;

    fn parent_id(&self) -> Option<RubroId> {
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
    use rust_decimal_macros::dec;

    fn rubro(appropriation: Decimal) -> BudgetRubro {
        BudgetRubro::new(
            FiscalPeriodId::new(),
            NewRubro::new("2.1.1", "Sueldos", RubroType::Expense, true)
                .with_appropriation(appropriation),
            None,
            1,
        )
    }

    #[test]
    fn test_availability_follows_counters() {
        let mut r = rubro(dec!(1000));
        r.reserve_cdp(dec!(400)).unwrap();
        r.add_rp(dec!(300)).unwrap();
        r.add_obligation(dec!(200)).unwrap();
        r.add_payment(dec!(50)).unwrap();

        assert_eq!(r.available_appropriation(), dec!(600));
        assert_eq!(r.available_cdp(), dec!(100));
        assert_eq!(r.available_rp(), dec!(100));
        assert_eq!(r.pending_payment(), dec!(150));
        assert_eq!(r.execution_percentage(), dec!(20));
        assert!(r.check_invariants().is_ok());
    }

    #[test]
    fn test_reserve_beyond_available_rejected() {
        let mut r = rubro(dec!(1000));
        r.reserve_cdp(dec!(400)).unwrap();
        assert_eq!(
            r.reserve_cdp(dec!(700)),
            Err(BudgetError::InsufficientAppropriation {
                rubro: "2.1.1".into(),
                requested: dec!(700),
                available: dec!(600),
            })
        );
        assert_eq!(r.cdp_amount, dec!(400));
    }

    #[test]
    fn test_current_appropriation_components() {
        let mut r = rubro(dec!(1000));
        r.apply_modification(AppropriationChange::Addition, dec!(200)).unwrap();
        r.apply_modification(AppropriationChange::Reduction, dec!(50)).unwrap();
        r.apply_modification(AppropriationChange::TransferIn, dec!(30)).unwrap();
        r.apply_modification(AppropriationChange::TransferOut, dec!(80)).unwrap();
        assert_eq!(r.current_appropriation(), dec!(1100));
    }

    #[test]
    fn test_reduction_cannot_strand_reservations() {
        let mut r = rubro(dec!(1000));
        r.reserve_cdp(dec!(900)).unwrap();
        assert_eq!(
            r.apply_modification(AppropriationChange::Reduction, dec!(150)),
            Err(BudgetError::NegativeAppropriation {
                rubro: "2.1.1".into(),
                requested: dec!(150),
                available: dec!(100),
            })
        );
        r.apply_modification(AppropriationChange::Reduction, dec!(100)).unwrap();
        assert_eq!(r.available_appropriation(), Decimal::ZERO);
    }

    #[test]
    fn test_release_below_downstream_rejected() {
        let mut r = rubro(dec!(1000));
        r.reserve_cdp(dec!(400)).unwrap();
        r.add_rp(dec!(300)).unwrap();
        assert!(matches!(
            r.release_cdp(dec!(200)),
            Err(BudgetError::InvariantViolation { .. })
        ));
        r.release_cdp(dec!(100)).unwrap();
        assert_eq!(r.cdp_amount, dec!(300));
    }

    #[test]
    fn test_check_invariants_reports_broken_chain() {
        let mut r = rubro(dec!(100));
        r.payments = dec!(10);
        assert!(matches!(
            r.check_invariants(),
            Err(BudgetError::InvariantViolation { .. })
        ));
    }

    #[test]
    fn test_execution_without_appropriation_is_zero() {
        assert_eq!(rubro(Decimal::ZERO).execution_percentage(), Decimal::ZERO);
    }
}
