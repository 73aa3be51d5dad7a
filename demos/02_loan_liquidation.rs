/// loan liquidation - finance a rental, then pay it off early
use rental_credit_engine::{
    Automobile, Directory, EngineConfig, InMemoryCatalog, Money, Principal, RequestStatus,
    SafeTimeProvider, TimeSource, VehicleCatalog, WorkflowOrchestrator,
};
use chrono::{Duration, TimeZone, Utc};
use rust_decimal_macros::dec;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== loan liquidation ===\n");

    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2026, 1, 10, 9, 0, 0).unwrap(),
    )));
    let controller = time.test_control().unwrap();
    let directory = Arc::new(Directory::new());
    let catalog = Arc::new(InMemoryCatalog::new());

    let customer = Principal::customer("ana.souza");
    let bank = Principal::bank("banco-sul");
    let agent = Principal::bank_agent("banco-sul-frota");
    for principal in [&customer, &bank, &agent] {
        directory.register(principal.clone())?;
    }
    let car = catalog.insert(Automobile::new("Volvo XC40 2025", Money::from_major(1_000), agent.id, agent.role))?;

    let engine = WorkflowOrchestrator::new(
        EngineConfig::default(),
        Arc::clone(&time),
        directory,
        catalog as Arc<dyn VehicleCatalog>,
    )?;
    engine.set_credit_limit(&agent, customer.id, Money::from_major(20_000))?;

    let today = time.now().date_naive();
    let request = engine.submit_request(&customer, car, today + Duration::days(1), today + Duration::days(11), None)?;
    engine.decide_request(&agent, request.id, RequestStatus::Approved, None)?;

    // 1% per month over 12 months
    let loan = engine.grant_loan(&bank, request.id, bank.id, dec!(1), 12)?;
    println!("principal:    {}", loan.principal.to_cents());
    println!("installment:  {}", loan.installment().to_cents());
    println!("total:        {}", loan.total_payable().to_cents());
    println!("interest:     {}", loan.total_interest().to_cents());
    println!("annual rate:  {}%", loan.effective_annual_rate());

    println!("\nschedule:");
    for payment in loan.schedule().iter().take(3) {
        println!(
            "  #{:>2} {}  interest {:>8}  principal {:>9}  balance {:>9}",
            payment.payment_number,
            payment.due_date,
            payment.interest_portion.to_cents(),
            payment.principal_portion.to_cents(),
            payment.ending_balance.to_cents(),
        );
    }

    // four months later
    controller.advance(Duration::days(121));
    let summary = engine.loan_summary(loan.id)?;
    println!(
        "\non {}: {} periods left, {} to settle",
        summary.as_of, summary.position.remaining_periods, summary.position.remaining_debt
    );

    if let Err(err) = engine.liquidate_early(&customer, loan.id, Money::from_major(5_000)) {
        println!("partial payment refused: {}", err.user_message());
    }

    let settled = engine.liquidate_early(&customer, loan.id, summary.position.remaining_debt + Money::ONE)?;
    println!("liquidated on {:?}", settled.liquidation_date);
    println!("\n{}", engine.loan_summary(loan.id)?.to_json_pretty()?);

    Ok(())
}
