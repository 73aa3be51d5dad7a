//! multi-step rental and credit use cases.
//!
//! Every operation takes the acting [`Principal`] as supplied by the
//! identity layer. Per-entity keyed locks make status changes linearizable;
//! when several are needed they are taken in the order
//! contract, request, automobile (the ledger row lock is innermost).

mod contracts;
mod credit;
mod requests;

use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use std::sync::{Arc, Mutex};
use tracing::{debug, error, info, warn};

use crate::catalog::{Automobile, VehicleCatalog};
use crate::config::EngineConfig;
use crate::credit::CreditLedger;
use crate::decimal::Money;
use crate::directory::Directory;
use crate::errors::{Result, WorkflowError};
use crate::events::{Event, EventStore};
use crate::rental::{
    CreditEffect, CreditReservation, RentalContract, RentalRequest, RequestStateMachine, Transition,
};
use crate::store::{
    ContractRepository, InMemoryContracts, InMemoryLoans, InMemoryRequests, KeyedLocks,
    LoanRepository, RequestRepository,
};
use crate::types::{
    AutomobileId, ContractId, CreditId, Principal, PrincipalId, RequestId, RequestStatus, Role,
};

pub use requests::RequestChanges;

pub struct WorkflowOrchestrator {
    config: EngineConfig,
    time: Arc<SafeTimeProvider>,
    directory: Arc<Directory>,
    catalog: Arc<dyn VehicleCatalog>,
    requests: Arc<dyn RequestRepository>,
    contracts: Arc<dyn ContractRepository>,
    loans: Arc<dyn LoanRepository>,
    ledger: CreditLedger,
    request_locks: KeyedLocks<RequestId>,
    automobile_locks: KeyedLocks<AutomobileId>,
    contract_locks: KeyedLocks<ContractId>,
    loan_locks: KeyedLocks<CreditId>,
    events: Mutex<EventStore>,
}

impl WorkflowOrchestrator {
    /// orchestrator backed by in-memory repositories
    pub fn new(
        config: EngineConfig,
        time: Arc<SafeTimeProvider>,
        directory: Arc<Directory>,
        catalog: Arc<dyn VehicleCatalog>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            ledger: CreditLedger::new(Arc::clone(&directory), Arc::clone(&time)),
            config,
            time,
            directory,
            catalog,
            requests: Arc::new(InMemoryRequests::new()),
            contracts: Arc::new(InMemoryContracts::new()),
            loans: Arc::new(InMemoryLoans::new()),
            request_locks: KeyedLocks::new("request"),
            automobile_locks: KeyedLocks::new("automobile"),
            contract_locks: KeyedLocks::new("contract"),
            loan_locks: KeyedLocks::new("loan"),
            events: Mutex::new(EventStore::new()),
        })
    }

    /// swap in other persistence
    pub fn with_repositories(
        mut self,
        requests: Arc<dyn RequestRepository>,
        contracts: Arc<dyn ContractRepository>,
        loans: Arc<dyn LoanRepository>,
    ) -> Self {
        self.requests = requests;
        self.contracts = contracts;
        self.loans = loans;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &CreditLedger {
        &self.ledger
    }

    pub fn directory(&self) -> &Directory {
        &self.directory
    }

    pub fn catalog(&self) -> &dyn VehicleCatalog {
        self.catalog.as_ref()
    }

    /// drain events emitted since the last call
    pub fn take_events(&self) -> Vec<Event> {
        match self.events.lock() {
            Ok(mut store) => store.take_events(),
            Err(poisoned) => poisoned.into_inner().take_events(),
        }
    }

    fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    fn emit(&self, event: Event) {
        match self.events.lock() {
            Ok(mut store) => store.emit(event),
            Err(poisoned) => poisoned.into_inner().emit(event),
        }
    }

    fn load_request(&self, id: RequestId) -> Result<RentalRequest> {
        self.requests
            .get(id)?
            .ok_or_else(|| WorkflowError::not_found("rental request", id))
    }

    fn load_automobile(&self, id: AutomobileId) -> Result<Automobile> {
        self.catalog
            .automobile(id)?
            .ok_or_else(|| WorkflowError::not_found("automobile", id))
    }

    fn set_availability(&self, automobile_id: AutomobileId, available: bool) -> Result<()> {
        self.catalog.set_available(automobile_id, available)?;
        self.emit(Event::AvailabilityChanged {
            automobile_id,
            available,
        });
        Ok(())
    }

    /// the one place a request changes status.
    ///
    /// Credit is reserved or released and the automobile's availability is
    /// set in the same step as the status change. A failure part way puts
    /// the request, the ledger and the automobile back as they were; credit
    /// is only released once the new status is stored. The caller holds the
    /// request and automobile locks.
    fn apply_transition(
        &self,
        request: &mut RentalRequest,
        automobile: &Automobile,
        to: RequestStatus,
        actor: &Principal,
        rejection_reason: Option<&str>,
    ) -> Result<Transition> {
        let transition = RequestStateMachine::plan(request, to, rejection_reason)?;
        let today = self.today();
        let previous = request.clone();

        let mut reserved = None;
        let mut to_release = None;
        match transition.credit {
            CreditEffect::Reserve if automobile.is_lender_owned() && request.reservation.is_none() => {
                let entry = self.ledger.try_reserve(
                    request.customer_id,
                    automobile.owner_id,
                    request.total_value,
                )?;
                let reservation = CreditReservation {
                    lender_id: automobile.owner_id,
                    amount: request.total_value,
                };
                request.reservation = Some(reservation);
                reserved = Some((reservation, entry.available_limit));
            }
            CreditEffect::Release => to_release = request.reservation.take(),
            _ => {}
        }

        RequestStateMachine::apply(request, &transition, actor, rejection_reason, today);
        if let Err(err) = self.store_transition(request, &previous, automobile, &transition) {
            if let Some((reservation, _)) = reserved {
                self.undo_reservation(request.id, request.customer_id, reservation);
            }
            *request = previous;
            warn!(request_id = %request.id, to = %to, error = %err, "request status change rolled back");
            return Err(err);
        }

        if let Some((reservation, available)) = reserved {
            self.emit(Event::CreditReserved {
                request_id: request.id,
                customer_id: request.customer_id,
                lender_id: reservation.lender_id,
                amount: reservation.amount,
                available,
            });
        }
        if let Some(reservation) = to_release {
            let entry = self.ledger.release(
                request.customer_id,
                reservation.lender_id,
                reservation.amount,
            )?;
            self.emit(Event::CreditReleased {
                request_id: request.id,
                customer_id: request.customer_id,
                lender_id: reservation.lender_id,
                amount: reservation.amount,
                available: entry.map(|e| e.available_limit).unwrap_or(Money::ZERO),
            });
        }
        if let Some(available) = transition.availability {
            self.emit(Event::AvailabilityChanged {
                automobile_id: automobile.id,
                available,
            });
        }

        info!(
            request_id = %request.id,
            from = %transition.from,
            to = %transition.to,
            actor = %actor.username,
            "request status changed"
        );
        self.emit(Event::RequestStatusChanged {
            request_id: request.id,
            old_status: transition.from,
            new_status: transition.to,
            actor: actor.username.clone(),
            date: today,
        });

        Ok(transition)
    }

    /// save the request, then flip availability; if the flip fails the
    /// stored request goes back to `previous`
    fn store_transition(
        &self,
        request: &RentalRequest,
        previous: &RentalRequest,
        automobile: &Automobile,
        transition: &Transition,
    ) -> Result<()> {
        self.requests.save(request)?;
        if let Some(available) = transition.availability {
            if let Err(err) = self.catalog.set_available(automobile.id, available) {
                self.restore_request(previous);
                return Err(err);
            }
        }
        Ok(())
    }

    fn undo_reservation(&self, request_id: RequestId, customer_id: PrincipalId, reservation: CreditReservation) {
        match self
            .ledger
            .release(customer_id, reservation.lender_id, reservation.amount)
        {
            Ok(_) => debug!(request_id = %request_id, amount = %reservation.amount, "credit reservation undone"),
            Err(err) => error!(
                request_id = %request_id,
                amount = %reservation.amount,
                error = %err,
                "could not undo credit reservation"
            ),
        }
    }

    /// write back a request whose follow-up step failed
    fn restore_request(&self, previous: &RentalRequest) {
        if let Err(err) = self.requests.save(previous) {
            error!(request_id = %previous.id, error = %err, "could not restore rental request");
        }
    }

    /// drop a request whose follow-up step failed
    fn discard_request(&self, request_id: RequestId) {
        if let Err(err) = self.requests.delete(request_id) {
            error!(request_id = %request_id, error = %err, "could not discard rental request");
        }
    }

    /// write back a contract whose follow-up step failed
    fn restore_contract(&self, previous: &RentalContract) {
        if let Err(err) = self.contracts.save(previous) {
            error!(contract_id = %previous.id, error = %err, "could not restore rental contract");
        }
    }

    /// drop a contract whose follow-up step failed
    fn discard_contract(&self, contract_id: ContractId) {
        if let Err(err) = self.contracts.delete(contract_id) {
            error!(contract_id = %contract_id, error = %err, "could not discard rental contract");
        }
    }
}

/// agent who owns the automobile
fn authorize_agent(actor: &Principal, automobile: &Automobile) -> Result<()> {
    if !actor.role.is_agent() || automobile.owner_id != actor.id {
        return Err(WorkflowError::unauthorized(
            &actor.username,
            "does not manage this automobile",
        ));
    }
    Ok(())
}

/// customer who owns the request
fn authorize_customer(actor: &Principal, request: &RentalRequest) -> Result<()> {
    if actor.role != Role::Customer || !request.is_owned_by(actor) {
        return Err(WorkflowError::unauthorized(
            &actor.username,
            "does not own this rental request",
        ));
    }
    Ok(())
}

fn invalid_state(current: impl std::fmt::Display, expected: &str) -> WorkflowError {
    WorkflowError::InvalidState {
        current: current.to_string(),
        expected: expected.to_string(),
    }
}
