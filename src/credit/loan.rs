use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::credit::amortization::{AmortizationEngine, ScheduledPayment};
use crate::decimal::{Money, Rate};
use crate::errors::{Result, WorkflowError};
use crate::types::{CreditId, LoanStatus, PrincipalId, RequestId};

/// loan granted by a lender against an approved rental request.
///
/// Only the contractual inputs are stored. Installment, totals, remaining
/// periods and the overdue flag are derived through [`AmortizationEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditContract {
    pub id: CreditId,
    pub request_id: RequestId,
    pub lender_id: PrincipalId,
    pub principal: Money,
    /// per-period rate
    pub rate: Rate,
    /// number of monthly periods
    pub term: u32,
    pub grant_date: NaiveDate,
    pub status: LoanStatus,
    pub last_payment_date: Option<NaiveDate>,
    pub liquidation_date: Option<NaiveDate>,
    pub observations: Option<String>,
}

impl CreditContract {
    pub fn new(
        request_id: RequestId,
        lender_id: PrincipalId,
        principal: Money,
        rate: Rate,
        term: u32,
        grant_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            request_id,
            lender_id,
            principal,
            rate,
            term,
            grant_date,
            status: LoanStatus::Active,
            last_payment_date: None,
            liquidation_date: None,
            observations: None,
        }
    }

    pub fn engine(&self) -> AmortizationEngine {
        AmortizationEngine::new(self.principal, self.rate, self.term)
    }

    pub fn installment(&self) -> Money {
        self.engine().installment()
    }

    pub fn total_payable(&self) -> Money {
        self.engine().total_payable()
    }

    pub fn total_interest(&self) -> Money {
        self.engine().total_interest()
    }

    pub fn effective_annual_rate(&self) -> Decimal {
        self.engine().effective_annual_rate()
    }

    pub fn maturity_date(&self) -> NaiveDate {
        self.engine().maturity_date(self.grant_date)
    }

    pub fn remaining_periods(&self, as_of: NaiveDate) -> u32 {
        self.engine().remaining_periods(self.grant_date, as_of)
    }

    pub fn remaining_debt(&self, as_of: NaiveDate) -> Money {
        self.engine().remaining_debt(self.grant_date, as_of)
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.engine().is_overdue(self.status, self.grant_date, today)
    }

    /// stored status adjusted for liquidation and overdue term
    pub fn check_status(&self, today: NaiveDate) -> LoanStatus {
        self.engine()
            .check_status(self.status, self.liquidation_date, self.grant_date, today)
    }

    pub fn schedule(&self) -> Vec<ScheduledPayment> {
        self.engine().schedule(self.grant_date)
    }

    /// settle the remaining debt in one payment.
    ///
    /// Returns the debt that was outstanding. Fails without touching the loan
    /// when it is not active or the payment falls short.
    pub fn liquidate(&mut self, paid_amount: Money, today: NaiveDate) -> Result<Money> {
        if paid_amount.is_negative() {
            return Err(WorkflowError::invalid_argument(format!(
                "paid amount cannot be negative: {}",
                paid_amount
            )));
        }
        if self.status != LoanStatus::Active || self.liquidation_date.is_some() {
            return Err(WorkflowError::InvalidState {
                current: format!("{:?}", self.check_status(today)),
                expected: "Active".to_string(),
            });
        }

        let remaining_debt = self.remaining_debt(today);
        if paid_amount < remaining_debt {
            return Err(WorkflowError::InsufficientAmount {
                required: remaining_debt,
                provided: paid_amount,
            });
        }

        self.status = LoanStatus::Liquidated;
        self.liquidation_date = Some(today);
        self.last_payment_date = Some(today);
        Ok(remaining_debt)
    }
}
