//! Property-based tests for the commitment pipeline.
//!
//! Random operation sequences must keep every rubro's counter chain intact,
//! and a rejected operation must leave the book exactly as it was.

use chrono::NaiveDate;
use erario_shared::OperationContext;
use erario_shared::types::{
    CdpId, CompanyId, FiscalPeriodId, ObligationId, PaymentId, RpId, RubroId, UserId,
};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::book::BudgetBook;
use super::documents::{CdpRequest, ContractType, ObligationRequest, RpRequest};
use super::modification::{ModificationRequest, ModificationType};
use super::rubro::{BudgetRubro, NewRubro, RubroType};

#[derive(Debug, Clone)]
enum Op {
    IssueCdp { rubro: usize, cents: i64 },
    ApproveCdp(usize),
    CancelCdp(usize),
    ExpireCdp(usize),
    CommitRp { cdp: usize, cents: i64 },
    ApproveRp(usize),
    CancelRp(usize),
    ReverseRp(usize),
    Accrue { rp: usize, cents: i64 },
    ApproveObligation(usize),
    CancelObligation(usize),
    Pay { obligation: usize, cents: i64 },
    ReversePayment(usize),
    Transfer { cents: i64 },
}

fn op() -> impl Strategy<Value = Op> {
    let cents = 1i64..60_000;
    prop_oneof![
        3 => (0usize..2, cents.clone()).prop_map(|(rubro, cents)| Op::IssueCdp { rubro, cents }),
        3 => (0usize..8).prop_map(Op::ApproveCdp),
        1 => (0usize..8).prop_map(Op::CancelCdp),
        1 => (0usize..8).prop_map(Op::ExpireCdp),
        3 => (0usize..8, cents.clone()).prop_map(|(cdp, cents)| Op::CommitRp { cdp, cents }),
        3 => (0usize..8).prop_map(Op::ApproveRp),
        1 => (0usize..8).prop_map(Op::CancelRp),
        1 => (0usize..8).prop_map(Op::ReverseRp),
        3 => (0usize..8, cents.clone()).prop_map(|(rp, cents)| Op::Accrue { rp, cents }),
        3 => (0usize..8).prop_map(Op::ApproveObligation),
        1 => (0usize..8).prop_map(Op::CancelObligation),
        3 => (0usize..8, cents.clone())
            .prop_map(|(obligation, cents)| Op::Pay { obligation, cents }),
        1 => (0usize..8).prop_map(Op::ReversePayment),
        1 => cents.prop_map(|cents| Op::Transfer { cents }),
    ]
}

#[derive(Default)]
struct Issued {
    cdps: Vec<CdpId>,
    rps: Vec<RpId>,
    obligations: Vec<ObligationId>,
    payments: Vec<PaymentId>,
}

fn pick<T: Copy>(items: &[T], index: usize) -> Option<T> {
    (!items.is_empty()).then(|| items[index % items.len()])
}

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

fn setup() -> (BudgetBook, OperationContext, [RubroId; 2]) {
    let ctx = OperationContext::new(CompanyId::new(), FiscalPeriodId::new(), UserId::new());
    let mut book = BudgetBook::default();
    book.create_rubro(&ctx, NewRubro::new("2", "Gastos", RubroType::Expense, false))
        .unwrap();
    let mut ids = [RubroId::new(); 2];
    for (i, code) in ["2.1", "2.2"].into_iter().enumerate() {
        ids[i] = book
            .create_rubro(
                &ctx,
                NewRubro::new(code, code, RubroType::Expense, true)
                    .with_parent("2")
                    .with_appropriation(Decimal::new(1_000_000, 2)),
            )
            .unwrap()
            .id;
    }
    (book, ctx, ids)
}

fn rubros(book: &BudgetBook, ctx: &OperationContext) -> Vec<BudgetRubro> {
    book.rubros_in(ctx.fiscal_period_id).cloned().collect()
}

/// Applies one operation; returns whether it was accepted.
fn apply(
    book: &mut BudgetBook,
    ctx: &OperationContext,
    ids: [RubroId; 2],
    issued: &mut Issued,
    op: &Op,
) -> bool {
    let amount = |cents: i64| Decimal::new(cents, 2);
    match *op {
        Op::IssueCdp { rubro, cents } => book
            .issue_cdp(
                ctx,
                &CdpRequest::new(date(), "Contratación directa")
                    .requested("Compras", "Jefe de compras")
                    .line(ids[rubro], amount(cents)),
            )
            .map(|cdp| issued.cdps.push(cdp.id))
            .is_ok(),
        Op::ApproveCdp(i) => {
            pick(&issued.cdps, i).is_some_and(|id| book.approve_cdp(ctx, id).is_ok())
        }
        Op::CancelCdp(i) => {
            pick(&issued.cdps, i).is_some_and(|id| book.cancel_cdp(ctx, id).is_ok())
        }
        Op::ExpireCdp(i) => {
            pick(&issued.cdps, i).is_some_and(|id| book.expire_cdp(ctx, id).is_ok())
        }
        Op::CommitRp { cdp, cents } => {
            let Some(cdp) = pick(&issued.cdps, cdp).and_then(|id| book.cdp(id).cloned()) else {
                return false;
            };
            let request = RpRequest::new(date(), "1", "P", ContractType::Service)
                .line(cdp.id, cdp.details[0].id, amount(cents));
            book.commit_rp(ctx, &request).map(|rp| issued.rps.push(rp.id)).is_ok()
        }
        Op::ApproveRp(i) => pick(&issued.rps, i).is_some_and(|id| book.approve_rp(ctx, id).is_ok()),
        Op::CancelRp(i) => pick(&issued.rps, i).is_some_and(|id| book.cancel_rp(ctx, id).is_ok()),
        Op::ReverseRp(i) => pick(&issued.rps, i).is_some_and(|id| book.reverse_rp(ctx, id).is_ok()),
        Op::Accrue { rp, cents } => pick(&issued.rps, rp).is_some_and(|id| {
            let request = ObligationRequest::new(id, date(), amount(cents), Decimal::ZERO);
            book.accrue_obligation(ctx, &request)
                .map(|o| issued.obligations.push(o.id))
                .is_ok()
        }),
        Op::ApproveObligation(i) => {
            pick(&issued.obligations, i).is_some_and(|id| book.approve_obligation(ctx, id).is_ok())
        }
        Op::CancelObligation(i) => {
            pick(&issued.obligations, i).is_some_and(|id| book.cancel_obligation(ctx, id).is_ok())
        }
        Op::Pay { obligation, cents } => pick(&issued.obligations, obligation).is_some_and(|id| {
            book.pay_obligation(ctx, id, date(), amount(cents))
                .map(|p| issued.payments.push(p.id))
                .is_ok()
        }),
        Op::ReversePayment(i) => {
            pick(&issued.payments, i).is_some_and(|id| book.reverse_payment(ctx, id).is_ok())
        }
        Op::Transfer { cents } => {
            let request = ModificationRequest::new(ModificationType::Transfer, date(), "T")
                .debit(ids[0], amount(cents))
                .credit(ids[1], amount(cents));
            book.apply_modification(ctx, &request).is_ok()
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: the counter chain survives any operation sequence.
    ///
    /// *For any* sequence of pipeline operations, every rubro SHALL satisfy
    /// `0 ≤ payments ≤ obligations ≤ rp ≤ cdp ≤ appropriation` after each step.
    #[test]
    fn prop_invariant_chain_holds(ops in prop::collection::vec(op(), 1..40)) {
        let (mut book, ctx, ids) = setup();
        let mut issued = Issued::default();
        for op in &ops {
            apply(&mut book, &ctx, ids, &mut issued, op);
            prop_assert!(book.check_invariants().is_ok(), "Broken after {:?}", op);
        }
    }

    /// Property: rejected operations change nothing.
    ///
    /// *For any* sequence, an operation that returns an error SHALL leave
    /// every rubro and the event log untouched.
    #[test]
    fn prop_rejection_is_atomic(ops in prop::collection::vec(op(), 1..40)) {
        let (mut book, ctx, ids) = setup();
        let mut issued = Issued::default();
        for op in &ops {
            let before = rubros(&book, &ctx);
            let events = book.events().len();
            if apply(&mut book, &ctx, ids, &mut issued, op) {
                prop_assert_eq!(book.events().len(), events + 1);
            } else {
                prop_assert_eq!(rubros(&book, &ctx), before);
                prop_assert_eq!(book.events().len(), events);
            }
        }
    }

    /// Property: document balances agree with the rubro counters.
    ///
    /// *For any* sequence, a rubro's CDP amount SHALL equal what its CDP
    /// details still hold, and its RP amount what its RP details still hold,
    /// whatever state the documents ended in.
    #[test]
    fn prop_documents_match_rubros(ops in prop::collection::vec(op(), 1..40)) {
        let (mut book, ctx, ids) = setup();
        let mut issued = Issued::default();
        for op in &ops {
            apply(&mut book, &ctx, ids, &mut issued, op);
        }
        for id in ids {
            let held_by_cdps: Decimal = issued
                .cdps
                .iter()
                .filter_map(|cdp| book.cdp(*cdp))
                .flat_map(|cdp| &cdp.details)
                .filter(|d| d.rubro_id == id)
                .map(|d| d.amount - d.released_amount)
                .sum();
            let held_by_rps: Decimal = issued
                .rps
                .iter()
                .filter_map(|rp| book.rp(*rp))
                .flat_map(|rp| &rp.details)
                .filter(|d| d.rubro_id == id)
                .map(|d| d.amount - d.released_amount)
                .sum();
            let rubro = book.rubro(id).unwrap();
            prop_assert_eq!(rubro.cdp_amount, held_by_cdps);
            prop_assert_eq!(rubro.rp_amount, held_by_rps);
        }
    }

    /// Property: the parent roll-up equals the sum of its details.
    #[test]
    fn prop_rollup_matches_details(ops in prop::collection::vec(op(), 1..30)) {
        let (mut book, ctx, ids) = setup();
        let mut issued = Issued::default();
        for op in &ops {
            apply(&mut book, &ctx, ids, &mut issued, op);
        }
        let parent = book.rubro_by_code(ctx.fiscal_period_id, "2").unwrap().id;
        let rollup = book.rubro_rollup(parent).unwrap();
        let [a, b] = ids.map(|id| book.rubro(id).unwrap().clone());
        prop_assert_eq!(rollup.cdp_amount, a.cdp_amount + b.cdp_amount);
        prop_assert_eq!(rollup.payments, a.payments + b.payments);
        prop_assert_eq!(
            rollup.current_appropriation(),
            a.current_appropriation() + b.current_appropriation()
        );
    }
}
