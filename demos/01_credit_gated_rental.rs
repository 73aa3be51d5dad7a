/// credit-gated rental - a bank-owned car draws on the customer's credit limit
use rental_credit_engine::{
    Automobile, Directory, EngineConfig, InMemoryCatalog, LedgerView, Money, Principal,
    RequestStatus, SafeTimeProvider, TimeSource, VehicleCatalog, WorkflowOrchestrator,
};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    println!("=== credit-gated rental ===\n");

    let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
    )));
    let controller = time.test_control().unwrap();
    let directory = Arc::new(Directory::new());
    let catalog = Arc::new(InMemoryCatalog::new());

    let customer = Principal::customer("ana.souza");
    let bank = Principal::bank_agent("banco-sul");
    directory.register(customer.clone())?;
    directory.register(bank.clone())?;

    let sedan = catalog.insert(Automobile::new("Toyota Corolla 2025", Money::from_major(100), bank.id, bank.role))?;
    let suv = catalog.insert(Automobile::new("Jeep Compass 2025", Money::from_major(150), bank.id, bank.role))?;

    let engine = WorkflowOrchestrator::new(
        EngineConfig::default(),
        Arc::clone(&time),
        directory,
        Arc::clone(&catalog) as Arc<dyn VehicleCatalog>,
    )?;

    engine.set_credit_limit(&bank, customer.id, Money::from_major(1_500))?;
    let show_ledger = |label: &str| -> Result<(), Box<dyn std::error::Error>> {
        if let Some(entry) = engine.credit_entry(customer.id, bank.id)? {
            let view = LedgerView::from_entry(&entry);
            println!(
                "{}: limit {} available {} used {}%",
                label, view.credit_limit, view.available_limit, view.usage_percentage
            );
        }
        Ok(())
    };
    show_ledger("opened")?;

    let today = time.now().date_naive();
    let first = engine.submit_request(&customer, sedan, today + Duration::days(1), today + Duration::days(11), None)?;
    println!("\nsubmitted sedan for {} days: {}", first.rental_days, first.total_value);
    show_ledger("after submission")?;

    engine.decide_request(&bank, first.id, RequestStatus::Approved, None)?;
    show_ledger("after approval")?;

    // 4 days of the suv cost 600, more than the 500 left
    match engine.submit_request(&customer, suv, today + Duration::days(1), today + Duration::days(5), None) {
        Ok(_) => println!("\nsuv accepted"),
        Err(err) => println!("\nsuv refused: {}", err.user_message()),
    }

    let contract = engine.materialize_contract(&bank, first.id)?;
    println!("\ncontract signed, value {}", contract.value);

    controller.advance(Duration::days(11));
    engine.finalize_contract(&bank, contract.id, "vehicle returned")?;
    println!("contract finalized on {}", time.now().format("%Y-%m-%d"));
    show_ledger("after return")?;

    println!("\nevents:");
    for event in engine.take_events() {
        println!("  {:?}", event);
    }

    Ok(())
}
