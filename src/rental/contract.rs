use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::Automobile;
use crate::decimal::Money;
use crate::errors::{Result, WorkflowError};
use crate::rental::request::RentalRequest;
use crate::types::{AutomobileId, ContractId, ContractStatus, RequestId};

/// signed rental contract materialized from an approved request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalContract {
    pub id: ContractId,
    pub request_id: RequestId,
    pub automobile_id: AutomobileId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub value: Money,
    /// rate in force at signing, used to price renewals
    pub daily_rate: Money,
    pub signing_date: NaiveDate,
    pub status: ContractStatus,
    pub renewal_count: u32,
    pub terms: String,
    pub observations: Option<String>,
}

impl RentalContract {
    pub fn duration_days(&self) -> i64 {
        (self.end_date - self.start_date).num_days()
    }

    /// days left until the end date, zero once it has passed
    pub fn days_remaining(&self, as_of: NaiveDate) -> i64 {
        (self.end_date - as_of).num_days().max(0)
    }

    pub fn is_expired(&self, as_of: NaiveDate) -> bool {
        as_of > self.end_date
    }

    /// open and within its period
    pub fn is_currently_active(&self, as_of: NaiveDate) -> bool {
        self.status.is_open() && as_of >= self.start_date && as_of <= self.end_date
    }

    fn append_note(&mut self, title: &str, lines: &[String]) {
        self.terms.push_str("\n\n--- ");
        self.terms.push_str(title);
        self.terms.push_str(" ---");
        for line in lines {
            self.terms.push('\n');
            self.terms.push_str(line);
        }
    }

    fn require_open(&self) -> Result<()> {
        if self.status.is_terminal() {
            return Err(WorkflowError::InvalidState {
                current: format!("{:?}", self.status),
                expected: "Active or Renewed".to_string(),
            });
        }
        Ok(())
    }
}

/// operations over a rental contract's lifecycle:
/// ACTIVE -> RENEWED (repeatable) -> FINALIZED | CANCELLED
pub struct ContractLifecycle;

impl ContractLifecycle {
    /// sign a contract for the request's period and value
    pub fn sign(request: &RentalRequest, automobile: &Automobile, today: NaiveDate) -> RentalContract {
        RentalContract {
            id: Uuid::new_v4(),
            request_id: request.id,
            automobile_id: automobile.id,
            start_date: request.pickup_date,
            end_date: request.return_date,
            value: request.total_value,
            daily_rate: automobile.daily_rate,
            signing_date: today,
            status: ContractStatus::Active,
            renewal_count: 0,
            terms: Self::terms(request, automobile, today),
            observations: request.observations.clone(),
        }
    }

    /// extend the end date, pricing the added days at the contract's daily rate.
    ///
    /// Returns the value added.
    pub fn renew(contract: &mut RentalContract, new_end_date: NaiveDate, today: NaiveDate) -> Result<Money> {
        contract.require_open()?;
        if new_end_date < contract.end_date {
            return Err(WorkflowError::InvalidDate {
                message: format!("new end date must not precede current end date {}", contract.end_date),
                date: new_end_date,
            });
        }

        let additional_days = u32::try_from((new_end_date - contract.end_date).num_days())
            .map_err(|_| WorkflowError::invalid_argument("renewal period too long"))?;
        let additional_value = contract
            .daily_rate
            .checked_times(additional_days)
            .filter(|extra| contract.value.as_decimal().checked_add(extra.as_decimal()).is_some())
            .ok_or_else(|| {
                WorkflowError::invalid_argument(format!(
                    "renewal value out of range: {} a day for {} days",
                    contract.daily_rate, additional_days
                ))
            })?;

        contract.end_date = new_end_date;
        contract.value += additional_value;
        contract.renewal_count += 1;
        contract.status = ContractStatus::Renewed;
        contract.append_note(
            "CONTRACT RENEWAL",
            &[
                format!("Renewal date: {}", today),
                format!("New end date: {}", new_end_date),
                format!("Additional days: {}", additional_days),
                format!("Additional value: {}", additional_value.to_cents()),
            ],
        );

        Ok(additional_value)
    }

    pub fn finalize(contract: &mut RentalContract, reason: &str, today: NaiveDate) -> Result<()> {
        contract.require_open()?;
        contract.status = ContractStatus::Finalized;
        contract.append_note(
            "CONTRACT FINALIZATION",
            &[format!("Finalization date: {}", today), format!("Reason: {}", reason)],
        );
        Ok(())
    }

    pub fn cancel(contract: &mut RentalContract, reason: &str, today: NaiveDate) -> Result<()> {
        contract.require_open()?;
        contract.status = ContractStatus::Cancelled;
        contract.append_note(
            "CONTRACT CANCELLATION",
            &[format!("Cancellation date: {}", today), format!("Reason: {}", reason)],
        );
        let note = format!("Contract cancelled on {}. Reason: {}", today, reason);
        contract.observations = Some(match contract.observations.take() {
            Some(existing) => format!("{}\n{}", existing, note),
            None => note,
        });
        Ok(())
    }

    /// day-prorated share of the value earned by `as_of`, for early termination
    pub fn proportional_value(contract: &RentalContract, as_of: NaiveDate) -> Result<Money> {
        if as_of < contract.start_date {
            return Ok(Money::ZERO);
        }
        if as_of > contract.end_date {
            return Ok(contract.value);
        }

        let total_days = contract.duration_days();
        if total_days == 0 {
            return Ok(contract.value);
        }
        let used_days = (as_of - contract.start_date).num_days();
        contract
            .value
            .checked_prorate(used_days, total_days)
            .ok_or_else(|| {
                WorkflowError::invalid_argument(format!(
                    "settlement of {} out of range",
                    contract.value
                ))
            })
    }

    fn terms(request: &RentalRequest, automobile: &Automobile, today: NaiveDate) -> String {
        let mut lines = vec![
            "VEHICLE RENTAL CONTRACT".to_string(),
            String::new(),
            format!("LESSEE: {}", request.customer_username),
            String::new(),
            "VEHICLE:".to_string(),
            automobile.description.clone(),
            String::new(),
            "RENTAL PERIOD:".to_string(),
            format!("Start date: {}", request.pickup_date),
            format!("End date: {}", request.return_date),
            format!("Total days: {}", request.rental_days),
            String::new(),
            "AMOUNTS:".to_string(),
            format!("Daily rate: {}", automobile.daily_rate.to_cents()),
            format!("Total value: {}", request.total_value.to_cents()),
            String::new(),
            "TERMS AND CONDITIONS:".to_string(),
            "1. The vehicle must be returned in the condition it was delivered.".to_string(),
            "2. The lessee is liable for any damage caused to the vehicle.".to_string(),
            "3. Payment is due as agreed between the parties.".to_string(),
            "4. The contract may be renewed by agreement between the parties.".to_string(),
        ];

        if let Some(observations) = request.observations.as_deref().map(str::trim) {
            if !observations.is_empty() {
                lines.push(String::new());
                lines.push("SPECIAL OBSERVATIONS:".to_string());
                lines.push(observations.to_string());
            }
        }

        lines.push(String::new());
        lines.push(format!("Signing date: {}", today));
        lines.join("\n")
    }
}
