#![allow(dead_code)]

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use rental_credit_engine::{
    Automobile, AutomobileId, ContractId, ContractRepository, Directory, EngineConfig,
    InMemoryCatalog, InMemoryContracts, InMemoryLoans, InMemoryRequests, Money, Principal,
    PrincipalId, RentalContract, RentalRequest, RequestId, RequestRepository, RequestStatus,
    SafeTimeProvider, TimeSource, VehicleCatalog, WorkflowError, WorkflowOrchestrator,
};

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// engine wired to in-memory collaborators with a controllable clock
pub struct Harness {
    pub time: Arc<SafeTimeProvider>,
    pub directory: Arc<Directory>,
    pub catalog: Arc<InMemoryCatalog>,
    pub engine: WorkflowOrchestrator,
    pub customer: Principal,
    pub bank: Principal,
    pub company: Principal,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, None)
    }

    /// engine persisting through the given stores
    pub fn with_repositories(
        requests: Arc<dyn RequestRepository>,
        contracts: Arc<dyn ContractRepository>,
    ) -> Self {
        Self::build(EngineConfig::default(), Some((requests, contracts)))
    }

    fn build(
        config: EngineConfig,
        repositories: Option<(Arc<dyn RequestRepository>, Arc<dyn ContractRepository>)>,
    ) -> Self {
        init_tracing();

        let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap(),
        )));
        let directory = Arc::new(Directory::new());
        let catalog = Arc::new(InMemoryCatalog::new());

        let customer = Principal::customer("ana.souza");
        let bank = Principal::bank_agent("banco-sul");
        let company = Principal::company_agent("locadora-centro");
        for principal in [&customer, &bank, &company] {
            directory.register(principal.clone()).unwrap();
        }

        let mut engine = WorkflowOrchestrator::new(
            config,
            Arc::clone(&time),
            Arc::clone(&directory),
            Arc::clone(&catalog) as Arc<dyn VehicleCatalog>,
        )
        .unwrap();
        if let Some((requests, contracts)) = repositories {
            engine = engine.with_repositories(requests, contracts, Arc::new(InMemoryLoans::new()));
        }

        Self {
            time,
            directory,
            catalog,
            engine,
            customer,
            bank,
            company,
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    /// date `days` from today
    pub fn day(&self, days: i64) -> NaiveDate {
        self.today() + Duration::days(days)
    }

    pub fn advance_days(&self, days: i64) {
        self.time.test_control().unwrap().advance(Duration::days(days));
    }

    pub fn register_customer(&self, username: &str) -> Principal {
        let customer = Principal::customer(username);
        self.directory.register(customer.clone()).unwrap();
        customer
    }

    pub fn automobile(&self, owner: &Principal, daily_rate: i64) -> AutomobileId {
        self.catalog
            .insert(Automobile::new(
                format!("car of {}", owner.username),
                Money::from_major(daily_rate),
                owner.id,
                owner.role,
            ))
            .unwrap()
    }

    pub fn is_available(&self, automobile_id: AutomobileId) -> bool {
        self.catalog.automobile(automobile_id).unwrap().unwrap().available
    }

    /// available credit the bank extends to the customer
    pub fn available_credit(&self) -> Money {
        self.engine
            .credit_entry(self.customer.id, self.bank.id)
            .unwrap()
            .unwrap()
            .available_limit
    }
}

pub fn money(amount: i64) -> Money {
    Money::from_major(amount)
}

fn disk_full() -> WorkflowError {
    WorkflowError::Storage {
        message: "disk full".to_string(),
    }
}

/// request store that refuses to save requests entering a chosen status
#[derive(Default)]
pub struct FailingRequests {
    inner: InMemoryRequests,
    refuse: Mutex<Option<RequestStatus>>,
}

impl FailingRequests {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_saves_of(&self, status: Option<RequestStatus>) {
        *self.refuse.lock().unwrap() = status;
    }
}

impl RequestRepository for FailingRequests {
    fn get(&self, id: RequestId) -> rental_credit_engine::Result<Option<RentalRequest>> {
        self.inner.get(id)
    }

    fn save(&self, request: &RentalRequest) -> rental_credit_engine::Result<()> {
        if *self.refuse.lock().unwrap() == Some(request.status) {
            return Err(disk_full());
        }
        self.inner.save(request)
    }

    fn delete(&self, id: RequestId) -> rental_credit_engine::Result<bool> {
        self.inner.delete(id)
    }

    fn for_customer(&self, customer_id: PrincipalId) -> rental_credit_engine::Result<Vec<RentalRequest>> {
        self.inner.for_customer(customer_id)
    }

    fn with_status(&self, status: RequestStatus) -> rental_credit_engine::Result<Vec<RentalRequest>> {
        self.inner.with_status(status)
    }

    fn for_automobiles(&self, automobile_ids: &[AutomobileId]) -> rental_credit_engine::Result<Vec<RentalRequest>> {
        self.inner.for_automobiles(automobile_ids)
    }
}

/// contract store whose saves can be switched off
#[derive(Default)]
pub struct FailingContracts {
    inner: InMemoryContracts,
    refuse: AtomicBool,
}

impl FailingContracts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refuse_saves(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }
}

impl ContractRepository for FailingContracts {
    fn get(&self, id: ContractId) -> rental_credit_engine::Result<Option<RentalContract>> {
        self.inner.get(id)
    }

    fn save(&self, contract: &RentalContract) -> rental_credit_engine::Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(disk_full());
        }
        self.inner.save(contract)
    }

    fn delete(&self, id: ContractId) -> rental_credit_engine::Result<bool> {
        self.inner.delete(id)
    }

    fn for_request(&self, request_id: RequestId) -> rental_credit_engine::Result<Option<RentalContract>> {
        self.inner.for_request(request_id)
    }

    fn ending_between(&self, from: NaiveDate, to: NaiveDate) -> rental_credit_engine::Result<Vec<RentalContract>> {
        self.inner.ending_between(from, to)
    }
}
