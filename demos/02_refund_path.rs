/// refund path - a declined escrow puts the lender's money back
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use loan_lifecycle_rs::serialization::EscrowView;
use loan_lifecycle_rs::{
    EngineConfig, EscrowStatus, FundingOrchestrator, MemoryNotifier, MemoryStore, Money,
    NotificationKind, Rate, SafeTimeProvider, SettlementService, StaticAdminDirectory,
    TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== escrow refund ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(MemoryNotifier::new());
    let admin = Uuid::new_v4();
    let borrower = Uuid::new_v4();
    let lender = Uuid::new_v4();
    let config = EngineConfig::standard();

    let funding = FundingOrchestrator::new(
        store.clone(),
        notifier.clone(),
        Arc::new(StaticAdminDirectory::new(vec![admin])),
        config.clone(),
    );
    let settlement = SettlementService::new(store, notifier.clone(), config);

    // a loan gets funded and waits for admin review
    let loan = funding.submit_request(
        borrower,
        Money::from_major(800),
        Rate::from_percentage(10),
        8,
        "irrigation pump",
        &time,
    )?;
    funding
        .wallets()
        .credit(lender, Money::from_major(800), "deposit", &time)?;
    let outcome = funding.fund_loan(loan.id, lender, borrower, Money::from_major(800), &time)?;
    println!("lender balance while escrowed: ${}", funding.wallets().balance(lender)?);
    println!("open requests: {}", funding.open_requests()?.len());

    // review does not go the borrower's way
    controller.advance(Duration::days(2));
    let escrow = funding.refund_escrow(outcome.escrow_id, &time)?;
    let view = EscrowView::from_escrow(&escrow);
    println!("\nescrow status: {:?}", view.status);
    assert_eq!(view.status, EscrowStatus::Refunded);
    println!("resolved at: {}", view.resolved_at.unwrap().format("%Y-%m-%d"));

    // the money is back and the request is on the book again
    println!("\nlender balance after refund: ${}", funding.wallets().balance(lender)?);
    println!("borrower balance: ${}", funding.wallets().balance(borrower)?);
    println!("open requests: {}", funding.open_requests()?.len());

    let refund_notes = notifier
        .sent_to(lender)
        .iter()
        .filter(|n| n.kind == NotificationKind::EscrowRefunded)
        .count();
    println!("refund notifications to lender: {}", refund_notes);

    // the orphaned schedule is gone, settling against it fails
    let err = settlement
        .mark_paid(outcome.schedule_id, 1, &time)
        .unwrap_err();
    println!("\nsettling the dead schedule: {}", err);

    // a second lender can fund the reopened request
    let second_lender = Uuid::new_v4();
    funding
        .wallets()
        .credit(second_lender, Money::from_major(800), "deposit", &time)?;
    let second = funding.fund_loan(loan.id, second_lender, borrower, Money::from_major(800), &time)?;
    funding.approve_escrow(second.escrow_id, &time)?;
    funding.release_escrow(second.escrow_id, &time)?;
    println!(
        "\nreopened loan funded by a new lender, status: {:?}",
        funding.get_loan(loan.id)?.status
    );

    Ok(())
}
