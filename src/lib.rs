pub mod catalog;
pub mod config;
pub mod credit;
pub mod decimal;
pub mod directory;
pub mod errors;
pub mod events;
pub mod rental;
pub mod store;
pub mod types;
pub mod views;
pub mod workflow;

// re-export key types
pub use catalog::{Automobile, InMemoryCatalog, VehicleCatalog};
pub use config::{EngineConfig, LoanPolicy, RenewalPolicy, RequestPolicy};
pub use credit::{AmortizationEngine, CreditContract, CreditLedger, LedgerEntry, ScheduledPayment};
pub use decimal::{Money, Rate};
pub use directory::Directory;
pub use errors::{ErrorKind, Result, WorkflowError};
pub use events::{Event, EventStore};
pub use rental::{ContractLifecycle, RentalContract, RentalRequest, RequestStateMachine};
pub use store::{
    ContractRepository, InMemoryContracts, InMemoryLoans, InMemoryRequests, LoanRepository,
    RequestRepository,
};
pub use types::{
    AutomobileId, ContractId, ContractStatus, CreditId, LedgerStatus, LoanStatus, Principal,
    PrincipalId, RequestId, RequestStatus, Role,
};
pub use views::{ContractView, LedgerView, LoanView, RequestView};
pub use workflow::{RequestChanges, WorkflowOrchestrator};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
