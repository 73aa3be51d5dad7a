use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{
    AutomobileId, ContractId, CreditId, LedgerStatus, PrincipalId, RequestId, RequestStatus,
};

/// all events that can be emitted by the workflow engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // request events
    RequestSubmitted {
        request_id: RequestId,
        customer_id: PrincipalId,
        automobile_id: AutomobileId,
        total_value: Money,
        date: NaiveDate,
    },
    RequestUpdated {
        request_id: RequestId,
        pickup_date: NaiveDate,
        return_date: NaiveDate,
        total_value: Money,
    },
    RequestStatusChanged {
        request_id: RequestId,
        old_status: RequestStatus,
        new_status: RequestStatus,
        actor: String,
        date: NaiveDate,
    },
    RequestDeleted {
        request_id: RequestId,
    },

    // vehicle events
    AvailabilityChanged {
        automobile_id: AutomobileId,
        available: bool,
    },

    // ledger events
    CreditLimitSet {
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        old_limit: Option<Money>,
        new_limit: Money,
        available: Money,
    },
    CreditLedgerStatusChanged {
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        status: LedgerStatus,
    },
    CreditReserved {
        request_id: RequestId,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        amount: Money,
        available: Money,
    },
    CreditReleased {
        request_id: RequestId,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        amount: Money,
        available: Money,
    },

    // rental contract events
    ContractSigned {
        contract_id: ContractId,
        request_id: RequestId,
        value: Money,
        start_date: NaiveDate,
        end_date: NaiveDate,
    },
    ContractRenewed {
        contract_id: ContractId,
        new_end_date: NaiveDate,
        additional_value: Money,
        renewal_count: u32,
    },
    ContractFinalized {
        contract_id: ContractId,
        reason: String,
        date: NaiveDate,
    },
    ContractCancelled {
        contract_id: ContractId,
        reason: String,
        date: NaiveDate,
    },

    // credit contract events
    LoanGranted {
        credit_id: CreditId,
        request_id: RequestId,
        lender_id: PrincipalId,
        principal: Money,
        rate: Rate,
        term: u32,
        installment: Money,
    },
    LoanLiquidated {
        credit_id: CreditId,
        paid_amount: Money,
        remaining_debt: Money,
        date: NaiveDate,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }
}
