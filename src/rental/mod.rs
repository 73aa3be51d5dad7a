pub mod contract;
pub mod request;

pub use contract::{ContractLifecycle, RentalContract};
pub use request::{
    validate_dates, CreditEffect, CreditReservation, RentalRequest, RequestStateMachine, Transition,
};
