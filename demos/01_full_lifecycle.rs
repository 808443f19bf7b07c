/// full lifecycle - request, funding, escrow, repayment and completion
use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use loan_lifecycle_rs::serialization::{LoanView, ScheduleView};
use loan_lifecycle_rs::{
    EngineConfig, FundingOrchestrator, LoanStatus, MemoryNotifier, MemoryStore, Money,
    NotificationKind, Rate, SafeTimeProvider, SettlementService, StaticAdminDirectory,
    TimeSource, Uuid,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    println!("=== loan lifecycle ===\n");

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap(),
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
    let settlement = SettlementService::new(store, notifier.clone(), config.clone());

    // 1. request
    println!("1. request phase");
    println!("----------------");
    let loan = funding.submit_request(
        borrower,
        Money::from_major(600),
        Rate::from_percentage(12),
        6,
        "sewing machine",
        &time,
    )?;
    println!("  date: {}", time.now().format("%Y-%m-%d"));
    println!("  open requests: {}", funding.open_requests()?.len());
    println!("  status: {:?}", loan.status);

    // 2. funding
    println!("\n2. funding phase");
    println!("----------------");
    funding
        .wallets()
        .credit(lender, Money::from_major(1_000), "deposit", &time)?;
    let outcome = funding.fund_loan(loan.id, lender, borrower, Money::from_major(600), &time)?;
    println!("  ✓ funded: ${}", outcome.funded_amount);
    println!("  lender balance after debit: ${}", outcome.wallet_balance);
    let admin_alerts = notifier
        .sent_to(admin)
        .iter()
        .filter(|n| n.kind == NotificationKind::EscrowPending)
        .count();
    println!("  admin approval requests: {}", admin_alerts);

    // 3. escrow resolution
    println!("\n3. escrow resolution phase");
    println!("--------------------------");
    funding.approve_escrow(outcome.escrow_id, &time)?;
    println!("  ✓ escrow approved");
    funding.release_escrow(outcome.escrow_id, &time)?;
    println!(
        "  ✓ released, borrower balance: ${}",
        funding.wallets().balance(borrower)?
    );
    println!("  status: {:?}", funding.get_loan(loan.id)?.status);

    // 4. servicing (three on-time payments)
    println!("\n4. servicing phase");
    println!("------------------");
    for number in 1..=3 {
        controller.advance(Duration::days(28));
        let paid = settlement.mark_paid(outcome.schedule_id, number, &time)?;
        println!(
            "  installment {} paid on {} ({} days late)",
            number,
            time.now().format("%Y-%m-%d"),
            paid.days_late
        );
    }

    // 5. one late payment
    println!("\n5. late payment phase");
    println!("---------------------");
    controller.advance(Duration::days(40));
    let schedule = settlement.schedule(outcome.schedule_id)?;
    let view = ScheduleView::from_schedule(&schedule, &config.repayment, &time);
    println!("  date: {}", time.now().format("%Y-%m-%d"));
    println!(
        "  installment 4 shows as: {:?}",
        view.installments[3].status
    );
    let paid = settlement.mark_paid(outcome.schedule_id, 4, &time)?;
    println!("  ✓ settled {} days late", paid.days_late);

    // 6. completion
    println!("\n6. completion phase");
    println!("-------------------");
    controller.advance(Duration::days(10));
    settlement.mark_paid(outcome.schedule_id, 5, &time)?;
    controller.advance(Duration::days(28));
    let last = settlement.mark_paid(outcome.schedule_id, 6, &time)?;
    println!("  loan completed: {}", last.loan_completed);

    let finished = funding.get_loan(loan.id)?;
    assert_eq!(finished.status, LoanStatus::Completed);
    let schedule = settlement.schedule(outcome.schedule_id)?;
    println!("  total returned: ${}", schedule.total_return());
    println!("  interest earned: ${}", schedule.interest_earned());
    println!(
        "  lender milestones reached: {:?}",
        settlement.milestones().reached(lender)?
    );

    // 7. final state
    println!("\n7. final state");
    println!("--------------");
    println!(
        "{}",
        LoanView::from_loan(&finished).to_json_pretty()?
    );

    Ok(())
}
