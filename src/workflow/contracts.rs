use chrono::{Duration, NaiveDate};
use tracing::{info, warn};

use super::{authorize_agent, invalid_state, WorkflowOrchestrator};
use crate::credit::amortization::add_months;
use crate::decimal::Money;
use crate::errors::{Result, WorkflowError};
use crate::events::Event;
use crate::rental::{ContractLifecycle, RentalContract};
use crate::types::{ContractId, Principal, RequestId, RequestStatus};

/// how an open contract is closed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Closing {
    Finalize,
    Cancel,
}

impl WorkflowOrchestrator {
    /// sign the contract for an approved request and mark the request active
    pub fn materialize_contract(&self, actor: &Principal, request_id: RequestId) -> Result<RentalContract> {
        self.request_locks.with(request_id, || {
            let mut request = self.load_request(request_id)?;
            let automobile = self.load_automobile(request.automobile_id)?;
            authorize_agent(actor, &automobile)?;

            if request.status != RequestStatus::Approved {
                return Err(invalid_state(request.status, "approved"));
            }
            if self.contracts.for_request(request_id)?.is_some() {
                return Err(WorkflowError::AlreadyExists {
                    entity: "rental contract",
                    request_id: request_id.to_string(),
                });
            }

            let contract = ContractLifecycle::sign(&request, &automobile, self.today());
            self.contracts.save(&contract)?;
            let activated = self.automobile_locks.with(automobile.id, || {
                self.apply_transition(&mut request, &automobile, RequestStatus::Active, actor, None)
            });
            if let Err(err) = activated {
                self.discard_contract(contract.id);
                return Err(err);
            }

            info!(
                contract_id = %contract.id,
                request_id = %request_id,
                value = %contract.value,
                end_date = %contract.end_date,
                "rental contract signed"
            );
            self.emit(Event::ContractSigned {
                contract_id: contract.id,
                request_id,
                value: contract.value,
                start_date: contract.start_date,
                end_date: contract.end_date,
            });
            Ok(contract)
        })
    }

    pub fn renew_contract(
        &self,
        actor: &Principal,
        contract_id: ContractId,
        new_end_date: NaiveDate,
    ) -> Result<RentalContract> {
        self.contract_locks.with(contract_id, || {
            let contract = self.load_contract(contract_id)?;
            let automobile = self.load_automobile(contract.automobile_id)?;
            authorize_agent(actor, &automobile)?;
            self.renew_locked(contract, new_end_date)
        })
    }

    /// close the contract normally; the request completes and the automobile returns
    pub fn finalize_contract(
        &self,
        actor: &Principal,
        contract_id: ContractId,
        reason: &str,
    ) -> Result<RentalContract> {
        self.close_contract(actor, contract_id, reason, Closing::Finalize)
    }

    /// terminate the contract early; settlement is [`Self::settlement_value`]
    pub fn cancel_contract(
        &self,
        actor: &Principal,
        contract_id: ContractId,
        reason: &str,
    ) -> Result<RentalContract> {
        self.close_contract(actor, contract_id, reason, Closing::Cancel)
    }

    /// day-prorated value earned as of today
    pub fn settlement_value(&self, contract_id: ContractId) -> Result<Money> {
        let contract = self.load_contract(contract_id)?;
        ContractLifecycle::proportional_value(&contract, self.today())
    }

    pub fn contract(&self, contract_id: ContractId) -> Result<RentalContract> {
        self.load_contract(contract_id)
    }

    pub fn contract_for_request(&self, request_id: RequestId) -> Result<Option<RentalContract>> {
        self.contracts.for_request(request_id)
    }

    /// open contracts ending within `days` from today
    pub fn expiring_contracts(&self, days: u32) -> Result<Vec<RentalContract>> {
        let today = self.today();
        let until = today
            .checked_add_signed(Duration::days(i64::from(days)))
            .unwrap_or(NaiveDate::MAX);
        self.contracts.ending_between(today, until)
    }

    /// renew every open contract ending inside the renewal window that has
    /// not reached the renewal cap; one failure does not stop the sweep
    pub fn process_renewals(&self) -> Result<Vec<RentalContract>> {
        let policy = self.config.renewal.clone();
        let candidates: Vec<RentalContract> = self
            .expiring_contracts(policy.window_days)?
            .into_iter()
            .filter(|c| c.renewal_count < policy.max_renewals)
            .collect();

        let mut renewed = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let outcome = self.contract_locks.with(candidate.id, || {
                // re-read under the lock, another sweep may have got here first
                let contract = self.load_contract(candidate.id)?;
                if !contract.status.is_open()
                    || contract.renewal_count >= policy.max_renewals
                    || contract.end_date != candidate.end_date
                {
                    return Ok(None);
                }
                let new_end_date = add_months(contract.end_date, policy.period_months);
                self.renew_locked(contract, new_end_date).map(Some)
            });

            match outcome {
                Ok(Some(contract)) => renewed.push(contract),
                Ok(None) => {}
                Err(err) => {
                    warn!(contract_id = %candidate.id, error = %err, "automatic renewal failed");
                }
            }
        }

        info!(renewed = renewed.len(), "renewal sweep finished");
        Ok(renewed)
    }

    fn load_contract(&self, contract_id: ContractId) -> Result<RentalContract> {
        self.contracts
            .get(contract_id)?
            .ok_or_else(|| WorkflowError::not_found("rental contract", contract_id))
    }

    /// caller holds the contract lock
    fn renew_locked(&self, mut contract: RentalContract, new_end_date: NaiveDate) -> Result<RentalContract> {
        let additional_value = ContractLifecycle::renew(&mut contract, new_end_date, self.today())?;
        self.contracts.save(&contract)?;

        info!(
            contract_id = %contract.id,
            new_end_date = %new_end_date,
            renewal_count = contract.renewal_count,
            "rental contract renewed"
        );
        self.emit(Event::ContractRenewed {
            contract_id: contract.id,
            new_end_date,
            additional_value,
            renewal_count: contract.renewal_count,
        });
        Ok(contract)
    }

    /// close the contract, then complete its request.
    ///
    /// The automobile is only handed back through the request, so a car that
    /// has since moved on to another rental is left alone.
    fn close_contract(
        &self,
        actor: &Principal,
        contract_id: ContractId,
        reason: &str,
        closing: Closing,
    ) -> Result<RentalContract> {
        self.contract_locks.with(contract_id, || {
            let original = self.load_contract(contract_id)?;
            let automobile = self.load_automobile(original.automobile_id)?;
            authorize_agent(actor, &automobile)?;

            let today = self.today();
            let mut contract = original.clone();
            match closing {
                Closing::Finalize => ContractLifecycle::finalize(&mut contract, reason, today)?,
                Closing::Cancel => ContractLifecycle::cancel(&mut contract, reason, today)?,
            }
            self.contracts.save(&contract)?;

            let completed = self.request_locks.with(contract.request_id, || {
                let mut request = self.load_request(contract.request_id)?;
                if request.status != RequestStatus::Active {
                    warn!(
                        contract_id = %contract_id,
                        request_id = %request.id,
                        status = %request.status,
                        "request no longer active, automobile left as is"
                    );
                    return Ok(());
                }
                self.automobile_locks.with(automobile.id, || {
                    self.apply_transition(&mut request, &automobile, RequestStatus::Completed, actor, None)
                        .map(|_| ())
                })
            });
            if let Err(err) = completed {
                self.restore_contract(&original);
                return Err(err);
            }

            let event = match closing {
                Closing::Finalize => {
                    info!(contract_id = %contract_id, reason, "rental contract finalized");
                    Event::ContractFinalized {
                        contract_id,
                        reason: reason.to_string(),
                        date: today,
                    }
                }
                Closing::Cancel => {
                    info!(contract_id = %contract_id, reason, "rental contract cancelled");
                    Event::ContractCancelled {
                        contract_id,
                        reason: reason.to_string(),
                        date: today,
                    }
                }
            };
            self.emit(event);
            Ok(contract)
        })
    }
}
