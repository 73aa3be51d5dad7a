/// serializable read views for the request-routing layer
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::credit::{CreditContract, LedgerEntry};
use crate::decimal::{Money, Rate};
use crate::rental::{ContractLifecycle, RentalContract, RentalRequest};
use crate::types::{
    AutomobileId, ContractId, ContractStatus, CreditId, LedgerStatus, LoanStatus, PrincipalId,
    RequestId, RequestStatus,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct RequestView {
    pub id: RequestId,
    pub customer_username: String,
    pub automobile_id: AutomobileId,
    pub pickup_date: NaiveDate,
    pub return_date: NaiveDate,
    pub rental_days: u32,
    pub total_value: Money,
    pub status: RequestStatus,
    pub status_description: String,
    pub created_at: NaiveDate,
    pub observations: Option<String>,
    pub processed_by: Option<String>,
    pub processed_at: Option<NaiveDate>,
    pub rejection_reason: Option<String>,
    pub can_be_modified: bool,
    pub can_be_cancelled: bool,
}

impl RequestView {
    pub fn from_request(request: &RentalRequest) -> Self {
        RequestView {
            id: request.id,
            customer_username: request.customer_username.clone(),
            automobile_id: request.automobile_id,
            pickup_date: request.pickup_date,
            return_date: request.return_date,
            rental_days: request.rental_days,
            total_value: request.total_value.to_cents(),
            status: request.status,
            status_description: request.status.description().to_string(),
            created_at: request.created_at,
            observations: request.observations.clone(),
            processed_by: request.processed_by_agent_username.clone(),
            processed_at: request.processed_at,
            rejection_reason: request.rejection_reason.clone(),
            can_be_modified: request.can_be_modified(),
            can_be_cancelled: request.can_be_cancelled(),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerView {
    pub customer_id: PrincipalId,
    pub lender_id: PrincipalId,
    pub credit_limit: Money,
    pub available_limit: Money,
    pub used_limit: Money,
    /// percent of the limit in use
    pub usage_percentage: Decimal,
    pub status: LedgerStatus,
    pub updated_at: NaiveDate,
}

impl LedgerView {
    pub fn from_entry(entry: &LedgerEntry) -> Self {
        LedgerView {
            customer_id: entry.customer_id,
            lender_id: entry.lender_id,
            credit_limit: entry.credit_limit.to_cents(),
            available_limit: entry.available_limit.to_cents(),
            used_limit: entry.used_limit().to_cents(),
            usage_percentage: entry.usage_percentage(),
            status: entry.status,
            updated_at: entry.updated_at,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// loan with every derived figure computed as of a date
#[derive(Debug, Serialize, Deserialize)]
pub struct LoanView {
    pub id: CreditId,
    pub request_id: RequestId,
    pub lender_id: PrincipalId,
    pub as_of: NaiveDate,
    pub status: LoanStatus,
    pub terms: LoanTermsView,
    pub position: LoanPositionView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanTermsView {
    pub principal: Money,
    pub rate: Rate,
    pub term: u32,
    pub grant_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub installment: Money,
    pub total_payable: Money,
    pub total_interest: Money,
    pub effective_annual_rate: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoanPositionView {
    pub remaining_periods: u32,
    pub remaining_debt: Money,
    pub overdue: bool,
    pub last_payment_date: Option<NaiveDate>,
    pub liquidation_date: Option<NaiveDate>,
}

impl LoanView {
    pub fn from_loan(loan: &CreditContract, as_of: NaiveDate) -> Self {
        LoanView {
            id: loan.id,
            request_id: loan.request_id,
            lender_id: loan.lender_id,
            as_of,
            status: loan.check_status(as_of),
            terms: LoanTermsView {
                principal: loan.principal.to_cents(),
                rate: loan.rate,
                term: loan.term,
                grant_date: loan.grant_date,
                maturity_date: loan.maturity_date(),
                installment: loan.installment().to_cents(),
                total_payable: loan.total_payable().to_cents(),
                total_interest: loan.total_interest().to_cents(),
                effective_annual_rate: loan.effective_annual_rate(),
            },
            position: LoanPositionView {
                remaining_periods: loan.remaining_periods(as_of),
                remaining_debt: loan.remaining_debt(as_of).to_cents(),
                overdue: loan.is_overdue(as_of),
                last_payment_date: loan.last_payment_date,
                liquidation_date: loan.liquidation_date,
            },
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ContractView {
    pub id: ContractId,
    pub request_id: RequestId,
    pub automobile_id: AutomobileId,
    pub status: ContractStatus,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub signing_date: NaiveDate,
    pub value: Money,
    pub renewal_count: u32,
    pub duration_days: i64,
    pub days_remaining: i64,
    pub expired: bool,
    pub currently_active: bool,
    /// value earned so far, due on early termination
    pub settlement_value: Money,
}

impl ContractView {
    pub fn from_contract(contract: &RentalContract, as_of: NaiveDate) -> crate::errors::Result<Self> {
        Ok(ContractView {
            id: contract.id,
            request_id: contract.request_id,
            automobile_id: contract.automobile_id,
            status: contract.status,
            start_date: contract.start_date,
            end_date: contract.end_date,
            signing_date: contract.signing_date,
            value: contract.value.to_cents(),
            renewal_count: contract.renewal_count,
            duration_days: contract.duration_days(),
            days_remaining: contract.days_remaining(as_of),
            expired: contract.is_expired(as_of),
            currently_active: contract.is_currently_active(as_of),
            settlement_value: ContractLifecycle::proportional_value(contract, as_of)?.to_cents(),
        })
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
