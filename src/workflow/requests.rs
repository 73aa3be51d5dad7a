use chrono::NaiveDate;
use tracing::{info, warn};

use super::{authorize_agent, authorize_customer, invalid_state, WorkflowOrchestrator};
use crate::catalog::Automobile;
use crate::decimal::Money;
use crate::errors::{Result, WorkflowError};
use crate::events::Event;
use crate::rental::{validate_dates, RentalRequest};
use crate::types::{AutomobileId, Principal, PrincipalId, RequestId, RequestStatus, Role};

/// fields a customer may change while the request is still modifiable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestChanges {
    pub pickup_date: Option<NaiveDate>,
    pub return_date: Option<NaiveDate>,
    pub observations: Option<String>,
}

impl WorkflowOrchestrator {
    /// file a new request as PENDING and take the automobile off the market
    pub fn submit_request(
        &self,
        actor: &Principal,
        automobile_id: AutomobileId,
        pickup_date: NaiveDate,
        return_date: NaiveDate,
        observations: Option<String>,
    ) -> Result<RentalRequest> {
        if actor.role != Role::Customer {
            return Err(WorkflowError::unauthorized(
                &actor.username,
                "only customers can request rentals",
            ));
        }
        self.directory
            .require(actor.id, "customer", |role| role == Role::Customer)?;

        let today = self.today();
        validate_dates(
            pickup_date,
            return_date,
            today,
            self.config.requests.allow_past_pickup,
        )?;

        self.automobile_locks.with(automobile_id, || {
            let automobile = self.load_automobile(automobile_id)?;
            if !automobile.available {
                warn!(automobile_id = %automobile_id, customer = %actor.username, "automobile not available");
                return Err(WorkflowError::Unavailable { automobile_id });
            }

            let request = RentalRequest::new(
                actor,
                automobile_id,
                pickup_date,
                return_date,
                automobile.daily_rate,
                observations,
                today,
            )?;
            self.check_credit(&request, &automobile)?;

            self.requests.save(&request)?;
            if let Err(err) = self.set_availability(automobile_id, false) {
                self.discard_request(request.id);
                return Err(err);
            }

            info!(
                request_id = %request.id,
                customer = %actor.username,
                automobile_id = %automobile_id,
                total_value = %request.total_value,
                "rental request submitted"
            );
            self.emit(Event::RequestSubmitted {
                request_id: request.id,
                customer_id: request.customer_id,
                automobile_id,
                total_value: request.total_value,
                date: today,
            });
            Ok(request)
        })
    }

    /// agent decision on a request: analysis, approval, rejection, activation,
    /// completion or cancellation.
    ///
    /// Once a rental contract is signed the request only completes through
    /// [`Self::finalize_contract`] or [`Self::cancel_contract`].
    pub fn decide_request(
        &self,
        actor: &Principal,
        request_id: RequestId,
        new_status: RequestStatus,
        rejection_reason: Option<&str>,
    ) -> Result<RentalRequest> {
        self.request_locks.with(request_id, || {
            let mut request = self.load_request(request_id)?;
            let automobile = self.load_automobile(request.automobile_id)?;
            authorize_agent(actor, &automobile)?;

            if matches!(new_status, RequestStatus::Active | RequestStatus::Completed) {
                if let Some(contract) = self.contracts.for_request(request_id)? {
                    warn!(
                        request_id = %request_id,
                        contract_id = %contract.id,
                        to = %new_status,
                        "request is held by a rental contract"
                    );
                    return Err(invalid_state(
                        format!("{} under rental contract {}", request.status, contract.id),
                        "no rental contract",
                    ));
                }
            }

            self.automobile_locks.with(automobile.id, || {
                self.apply_transition(&mut request, &automobile, new_status, actor, rejection_reason)
                    .map_err(|err| {
                        warn!(request_id = %request_id, to = %new_status, error = %err, "decision refused");
                        err
                    })
            })?;
            Ok(request)
        })
    }

    /// customer edits dates or observations while the request is modifiable
    pub fn update_request(
        &self,
        actor: &Principal,
        request_id: RequestId,
        changes: RequestChanges,
    ) -> Result<RentalRequest> {
        self.request_locks.with(request_id, || {
            let mut request = self.load_request(request_id)?;
            authorize_customer(actor, &request)?;
            if !request.can_be_modified() {
                return Err(invalid_state(request.status, "pending or under analysis"));
            }

            let pickup_date = changes.pickup_date.unwrap_or(request.pickup_date);
            let return_date = changes.return_date.unwrap_or(request.return_date);
            validate_dates(
                pickup_date,
                return_date,
                self.today(),
                self.config.requests.allow_past_pickup,
            )?;

            let automobile = self.load_automobile(request.automobile_id)?;
            let mut updated = request.clone();
            updated.pickup_date = pickup_date;
            updated.return_date = return_date;
            if changes.observations.is_some() {
                updated.observations = changes.observations;
            }
            updated.recalculate(automobile.daily_rate)?;
            self.check_credit(&updated, &automobile)?;

            self.requests.save(&updated)?;
            request = updated;

            info!(request_id = %request_id, total_value = %request.total_value, "rental request updated");
            self.emit(Event::RequestUpdated {
                request_id,
                pickup_date,
                return_date,
                total_value: request.total_value,
            });
            Ok(request)
        })
    }

    /// customer withdraws a request that has not started
    pub fn cancel_request(&self, actor: &Principal, request_id: RequestId) -> Result<RentalRequest> {
        self.request_locks.with(request_id, || {
            let mut request = self.load_request(request_id)?;
            authorize_customer(actor, &request)?;
            if !request.can_be_cancelled() {
                return Err(invalid_state(request.status, "pending, under analysis or approved"));
            }

            let automobile = self.load_automobile(request.automobile_id)?;
            self.automobile_locks.with(automobile.id, || {
                self.apply_transition(&mut request, &automobile, RequestStatus::Cancelled, actor, None)
            })?;
            Ok(request)
        })
    }

    /// customer removes a request nobody has looked at yet
    pub fn delete_request(&self, actor: &Principal, request_id: RequestId) -> Result<()> {
        self.request_locks.with(request_id, || {
            let request = self.load_request(request_id)?;
            authorize_customer(actor, &request)?;
            if request.status != RequestStatus::Pending {
                return Err(invalid_state(request.status, "pending"));
            }

            self.automobile_locks.with(request.automobile_id, || {
                self.requests.delete(request_id)?;
                if let Err(err) = self.set_availability(request.automobile_id, true) {
                    self.restore_request(&request);
                    return Err(err);
                }
                Ok(())
            })?;

            info!(request_id = %request_id, customer = %actor.username, "rental request deleted");
            self.emit(Event::RequestDeleted { request_id });
            Ok(())
        })
    }

    pub fn request(&self, request_id: RequestId) -> Result<RentalRequest> {
        self.load_request(request_id)
    }

    pub fn requests_for_customer(&self, username: &str) -> Result<Vec<RentalRequest>> {
        let customer = self
            .directory
            .by_username(username)?
            .filter(|p| p.role == Role::Customer)
            .ok_or_else(|| WorkflowError::not_found("customer", username))?;
        self.requests.for_customer(customer.id)
    }

    pub fn pending_requests(&self) -> Result<Vec<RentalRequest>> {
        self.requests.with_status(RequestStatus::Pending)
    }

    /// requests on automobiles the agent owns
    pub fn requests_for_agent(&self, agent_id: PrincipalId) -> Result<Vec<RentalRequest>> {
        let owned: Vec<AutomobileId> = self
            .catalog
            .owned_by(agent_id)?
            .into_iter()
            .map(|a| a.id)
            .collect();
        if owned.is_empty() {
            return Ok(Vec::new());
        }
        self.requests.for_automobiles(&owned)
    }

    /// lender-owned automobiles need enough open credit for the whole rental
    fn check_credit(&self, request: &RentalRequest, automobile: &Automobile) -> Result<()> {
        if !automobile.is_lender_owned() {
            return Ok(());
        }

        let (customer_id, lender_id) = (request.customer_id, automobile.owner_id);
        if self.ledger.has_available(customer_id, lender_id, request.total_value)? {
            return Ok(());
        }

        let available = self
            .ledger
            .entry(customer_id, lender_id)?
            .filter(|e| e.is_active())
            .map(|e| e.available_limit)
            .unwrap_or(Money::ZERO);
        warn!(
            customer_id = %customer_id,
            lender_id = %lender_id,
            available = %available,
            requested = %request.total_value,
            "insufficient credit"
        );
        Err(WorkflowError::InsufficientCredit {
            available,
            requested: request.total_value,
        })
    }
}
