/// quick start - rent a car from a rental company, no credit involved
use rental_credit_engine::{
    Automobile, Directory, EngineConfig, InMemoryCatalog, Money, Principal, RequestStatus,
    RequestView, SafeTimeProvider, TimeSource, VehicleCatalog, WorkflowOrchestrator,
};
use chrono::Duration;
use std::sync::Arc;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let time = Arc::new(SafeTimeProvider::new(TimeSource::System));
    let directory = Arc::new(Directory::new());
    let catalog = Arc::new(InMemoryCatalog::new());

    let customer = Principal::customer("ana.souza");
    let agent = Principal::company_agent("locadora-centro");
    directory.register(customer.clone())?;
    directory.register(agent.clone())?;

    let car = catalog.insert(Automobile::new(
        "Fiat Argo 2024",
        Money::from_major(120),
        agent.id,
        agent.role,
    ))?;

    let engine = WorkflowOrchestrator::new(
        EngineConfig::default(),
        Arc::clone(&time),
        directory,
        catalog as Arc<dyn VehicleCatalog>,
    )?;

    // five days starting tomorrow
    let today = time.now().date_naive();
    let request = engine.submit_request(
        &customer,
        car,
        today + Duration::days(1),
        today + Duration::days(6),
        None,
    )?;

    // the agent approves and signs
    engine.decide_request(&agent, request.id, RequestStatus::Approved, None)?;
    let contract = engine.materialize_contract(&agent, request.id)?;

    println!("{}", RequestView::from_request(&engine.request(request.id)?).to_json_pretty()?);
    println!("\n{}", contract.terms);

    Ok(())
}
