use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// identifier of a customer, agent or bank
pub type PrincipalId = Uuid;

pub type AutomobileId = Uuid;

pub type RequestId = Uuid;

pub type ContractId = Uuid;

/// identifier of a credit (loan) contract
pub type CreditId = Uuid;

/// role a principal acts under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Customer,
    CompanyAgent,
    BankAgent,
    Bank,
}

impl Role {
    /// lenders gate credit for the vehicles they own
    pub fn is_lender(&self) -> bool {
        matches!(self, Role::BankAgent | Role::Bank)
    }

    /// agents process rental requests
    pub fn is_agent(&self) -> bool {
        matches!(self, Role::CompanyAgent | Role::BankAgent)
    }
}

/// authenticated identity handed to every workflow operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub username: String,
    pub role: Role,
}

impl Principal {
    pub fn new(username: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            role,
        }
    }

    pub fn customer(username: impl Into<String>) -> Self {
        Self::new(username, Role::Customer)
    }

    pub fn company_agent(username: impl Into<String>) -> Self {
        Self::new(username, Role::CompanyAgent)
    }

    pub fn bank_agent(username: impl Into<String>) -> Self {
        Self::new(username, Role::BankAgent)
    }

    pub fn bank(username: impl Into<String>) -> Self {
        Self::new(username, Role::Bank)
    }
}

/// rental request status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    /// submitted, waiting for an agent
    Pending,
    /// picked up by an agent
    UnderAnalysis,
    Approved,
    Rejected,
    /// contract signed, vehicle out
    Active,
    Completed,
    Cancelled,
}

impl RequestStatus {
    /// no further transitions possible
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Rejected | RequestStatus::Completed | RequestStatus::Cancelled
        )
    }

    pub fn can_be_modified(&self) -> bool {
        matches!(self, RequestStatus::Pending | RequestStatus::UnderAnalysis)
    }

    pub fn can_be_cancelled(&self) -> bool {
        matches!(
            self,
            RequestStatus::Pending | RequestStatus::UnderAnalysis | RequestStatus::Approved
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::UnderAnalysis => "under analysis",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Active => "active",
            RequestStatus::Completed => "completed",
            RequestStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// credit ledger entry status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LedgerStatus {
    Active,
    Inactive,
    Suspended,
}

/// credit (loan) contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoanStatus {
    Active,
    /// term elapsed while still active
    Overdue,
    Liquidated,
}

/// rental contract status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContractStatus {
    Active,
    Renewed,
    Finalized,
    Cancelled,
}

impl ContractStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ContractStatus::Finalized | ContractStatus::Cancelled)
    }

    /// still binding: active or renewed
    pub fn is_open(&self) -> bool {
        matches!(self, ContractStatus::Active | ContractStatus::Renewed)
    }
}
