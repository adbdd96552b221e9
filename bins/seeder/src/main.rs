//! Demo seeder for Erario.
//!
//! Builds a demo company in memory, runs one expense through the whole
//! commitment pipeline and prints JSON snapshots of the result.
//!
//! Usage: cargo run --bin seeder

use anyhow::Context;
use chrono::NaiveDate;
use rust_decimal_macros::dec;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use erario_core::accounts::{AccountType, NewAccount};
use erario_core::budget::{
    CdpRequest, ContractType, ModificationRequest, ModificationType, NewRubro,
    ObligationAccounting, ObligationRequest, RpRequest, RubroType,
};
use erario_core::ledger::JournalType;
use erario_db::Engine;
use erario_shared::types::{CompanyId, FiscalPeriodId, RubroId, UserId};
use erario_shared::{AppConfig, OperationContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.filter));
    if config.logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let engine = Engine::new(&config);
    let ctx = OperationContext::new(CompanyId::new(), FiscalPeriodId::new(), UserId::new());
    info!(company_id = %ctx.company_id, "Seeding demo company");

    let (honorarios, papeleria) = seed_books(&engine, &ctx).await?;
    run_pipeline(&engine, &ctx, honorarios, papeleria).await?;

    for (label, id) in [("honorarios", honorarios), ("papeleria", papeleria)] {
        let rubro = engine.rubro(&ctx, id).await?;
        println!("{label}: {}", serde_json::to_string_pretty(&rubro)?);
    }
    let parent = engine.rubro(&ctx, honorarios).await?.parent_id;
    if let Some(parent) = parent {
        let rollup = engine.rubro_rollup(&ctx, parent).await?;
        println!("rollup: {}", serde_json::to_string_pretty(&rollup)?);
    }
    let events = engine.budget_events(&ctx).await?;
    println!("events: {}", serde_json::to_string_pretty(&events)?);

    info!(events = events.len(), "Seeding complete");
    Ok(())
}

fn date(month: u32, day: u32) -> anyhow::Result<NaiveDate> {
    NaiveDate::from_ymd_opt(2026, month, day).context("invalid seed date")
}

/// Opens the 2026 period and creates the chart of accounts and rubros.
async fn seed_books(engine: &Engine, ctx: &OperationContext) -> anyhow::Result<(RubroId, RubroId)> {
    engine
        .open_period(ctx, "Vigencia 2026", date(1, 1)?, date(12, 31)?)
        .await?;
    engine
        .create_journal_type(ctx, JournalType::new("CA", "Causaciones", "CA"))
        .await?;

    for account in [
        NewAccount::new("1", "Activo", AccountType::Asset, false),
        NewAccount::new("1110", "Bancos", AccountType::Asset, true).with_parent("1"),
        NewAccount::new("2", "Pasivo", AccountType::Liability, false),
        NewAccount::new("2335", "Costos y gastos por pagar", AccountType::Liability, true)
            .with_parent("2"),
        NewAccount::new("2365", "Retención en la fuente", AccountType::Liability, true)
            .with_parent("2"),
        NewAccount::new("5", "Gastos", AccountType::Expense, false),
        NewAccount::new("5110", "Honorarios", AccountType::Expense, true).with_parent("5"),
    ] {
        engine.create_account(ctx, account).await?;
    }

    engine
        .create_rubro(ctx, NewRubro::new("2", "Gastos", RubroType::Expense, false))
        .await?;
    engine
        .create_rubro(
            ctx,
            NewRubro::new("2.1", "Funcionamiento", RubroType::Expense, false).with_parent("2"),
        )
        .await?;
    let honorarios = engine
        .create_rubro(
            ctx,
            NewRubro::new("2.1.1", "Honorarios", RubroType::Expense, true)
                .with_parent("2.1")
                .with_appropriation(dec!(50000000)),
        )
        .await?;
    let papeleria = engine
        .create_rubro(
            ctx,
            NewRubro::new("2.1.2", "Papelería", RubroType::Expense, true)
                .with_parent("2.1")
                .with_appropriation(dec!(8000000)),
        )
        .await?;

    Ok((honorarios.id, papeleria.id))
}

/// CDP, RP, obligation and payment for a consulting contract, plus a transfer.
async fn run_pipeline(
    engine: &Engine,
    ctx: &OperationContext,
    honorarios: RubroId,
    papeleria: RubroId,
) -> anyhow::Result<()> {
    let transfer = ModificationRequest::new(
        ModificationType::Transfer,
        date(2, 1)?,
        "Resolución 015",
    )
    .debit(papeleria, dec!(3000000))
    .credit(honorarios, dec!(3000000));
    engine.apply_budget_modification(ctx, &transfer).await?;

    let cdp = engine
        .issue_cdp(
            ctx,
            &CdpRequest::new(date(2, 10)?, "Asesoría jurídica")
                .requested("Secretaría General", "Jefe de oficina")
                .line(honorarios, dec!(24000000)),
        )
        .await?;
    engine.approve_cdp(ctx, cdp.id).await?;

    let detail = cdp.details.first().context("CDP without details")?.id;
    let rp = engine
        .commit_rp(
            ctx,
            &RpRequest::new(date(2, 15)?, "900123456", "Consultores SAS", ContractType::Consulting)
                .with_contract("CT-2026-014")
                .line(cdp.id, detail, dec!(24000000)),
        )
        .await?;
    engine.approve_rp(ctx, rp.id).await?;

    let accounting = ObligationAccounting::new("CA", "5110", "2335").with_withholding("2365");
    let obligation = engine
        .accrue_obligation(
            ctx,
            &ObligationRequest::new(rp.id, date(3, 31)?, dec!(2000000), dec!(200000))
                .with_invoice("FE-1021"),
            Some(&accounting),
        )
        .await?;
    engine.approve_obligation(ctx, obligation.id).await?;

    let payment = engine
        .pay_obligation(ctx, obligation.id, date(4, 5)?, obligation.net_amount)
        .await?;
    info!(
        payment = %payment.number,
        paid = %payment.amount,
        "Pipeline complete"
    );

    if let Some(entry_id) = obligation.journal_entry_id {
        let entry = engine.journal_entry(ctx, entry_id).await?;
        println!("obligation entry: {}", serde_json::to_string_pretty(&entry)?);
    }
    Ok(())
}
