/// quick start - minimal example to get started
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use loan_lifecycle_rs::serialization::LoanView;
use loan_lifecycle_rs::{
    EngineConfig, FundingOrchestrator, MemoryNotifier, MemoryStore, Money, Rate,
    SafeTimeProvider, SettlementService, StaticAdminDirectory, TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
    ));
    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let admin = Uuid::new_v4();
    let config = EngineConfig::standard();

    let funding = FundingOrchestrator::new(
        store.clone(),
        notifier.clone(),
        Arc::new(StaticAdminDirectory::new(vec![admin])),
        config.clone(),
    );
    let settlement = SettlementService::new(store, notifier, config);

    // a borrower asks for $500 over 4 months at 12%
    let borrower = Uuid::new_v4();
    let lender = Uuid::new_v4();
    let loan = funding.submit_request(
        borrower,
        Money::from_major(500),
        Rate::from_percentage(12),
        4,
        "market stall inventory",
        &time,
    )?;

    // a lender funds it and the escrow is released to the borrower
    funding.wallets().credit(lender, Money::from_major(500), "deposit", &time)?;
    let outcome = funding.fund_loan(loan.id, lender, borrower, Money::from_major(500), &time)?;
    funding.approve_escrow(outcome.escrow_id, &time)?;
    funding.release_escrow(outcome.escrow_id, &time)?;

    // first installment comes in
    settlement.mark_paid(outcome.schedule_id, 1, &time)?;

    // print current state
    println!("{}", LoanView::from_loan(&funding.get_loan(loan.id)?).to_json_pretty()?);

    Ok(())
}
