use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{invalid_state, WorkflowOrchestrator};
use crate::credit::{CreditContract, LedgerEntry};
use crate::decimal::{Money, Rate};
use crate::errors::{Result, WorkflowError};
use crate::events::Event;
use crate::types::{CreditId, LedgerStatus, Principal, PrincipalId, RequestId, RequestStatus};
use crate::views::LoanView;

impl WorkflowOrchestrator {
    /// lender opens or changes the limit it extends to a customer
    pub fn set_credit_limit(
        &self,
        actor: &Principal,
        customer_id: PrincipalId,
        new_limit: Money,
    ) -> Result<LedgerEntry> {
        require_lender(actor)?;
        let update = self
            .ledger
            .create_or_update_limit(customer_id, actor.id, new_limit)?;

        self.emit(Event::CreditLimitSet {
            customer_id,
            lender_id: actor.id,
            old_limit: update.previous_limit,
            new_limit,
            available: update.entry.available_limit,
        });
        Ok(update.entry)
    }

    pub fn set_credit_status(
        &self,
        actor: &Principal,
        customer_id: PrincipalId,
        status: LedgerStatus,
    ) -> Result<LedgerEntry> {
        require_lender(actor)?;
        let entry = self.ledger.set_status(customer_id, actor.id, status)?;
        self.emit(Event::CreditLedgerStatusChanged {
            customer_id,
            lender_id: actor.id,
            status,
        });
        Ok(entry)
    }

    pub fn credit_entry(&self, customer_id: PrincipalId, lender_id: PrincipalId) -> Result<Option<LedgerEntry>> {
        self.ledger.entry(customer_id, lender_id)
    }

    /// lender finances an approved or active rental.
    ///
    /// `rate_percent` is the percent charged per monthly period and `term`
    /// the number of periods. The principal is the request's total value.
    pub fn grant_loan(
        &self,
        actor: &Principal,
        request_id: RequestId,
        lender_id: PrincipalId,
        rate_percent: Decimal,
        term: u32,
    ) -> Result<CreditContract> {
        require_lender(actor)?;
        if actor.id != lender_id {
            return Err(WorkflowError::unauthorized(
                &actor.username,
                "cannot grant credit on behalf of another lender",
            ));
        }
        self.directory.require(lender_id, "lender", |role| role.is_lender())?;

        let policy = &self.config.loans;
        if rate_percent < Decimal::ZERO || rate_percent > policy.max_rate_percent {
            return Err(WorkflowError::invalid_argument(format!(
                "interest rate must be between 0 and {}: {}",
                policy.max_rate_percent, rate_percent
            )));
        }
        if term < policy.min_term || term > policy.max_term {
            return Err(WorkflowError::invalid_argument(format!(
                "term must be between {} and {} periods: {}",
                policy.min_term, policy.max_term, term
            )));
        }

        self.request_locks.with(request_id, || {
            let request = self.load_request(request_id)?;
            if !matches!(request.status, RequestStatus::Approved | RequestStatus::Active) {
                return Err(invalid_state(request.status, "approved or active"));
            }
            if self.loans.for_request(request_id)?.is_some() {
                return Err(WorkflowError::AlreadyExists {
                    entity: "credit contract",
                    request_id: request_id.to_string(),
                });
            }

            let loan = CreditContract::new(
                request_id,
                lender_id,
                request.total_value,
                Rate::from_percent(rate_percent),
                term,
                self.today(),
            );
            if loan.engine().checked_installment().is_none() {
                return Err(WorkflowError::invalid_argument(format!(
                    "{} cannot be financed at {} over {} periods",
                    loan.principal, loan.rate, term
                )));
            }
            self.loans.save(&loan)?;

            let installment = loan.installment();
            info!(
                credit_id = %loan.id,
                request_id = %request_id,
                principal = %loan.principal,
                rate = %loan.rate,
                term,
                installment = %installment,
                "credit contract granted"
            );
            self.emit(Event::LoanGranted {
                credit_id: loan.id,
                request_id,
                lender_id,
                principal: loan.principal,
                rate: loan.rate,
                term,
                installment,
            });
            Ok(loan)
        })
    }

    /// pay off the remaining debt in one go; the customer of the financed
    /// request or the granting lender may settle
    pub fn liquidate_early(
        &self,
        actor: &Principal,
        credit_id: CreditId,
        paid_amount: Money,
    ) -> Result<CreditContract> {
        self.loan_locks.with(credit_id, || {
            let mut loan = self.load_loan(credit_id)?;
            if actor.id != loan.lender_id {
                let request = self.load_request(loan.request_id)?;
                if !request.is_owned_by(actor) {
                    return Err(WorkflowError::unauthorized(
                        &actor.username,
                        "is not a party to this credit contract",
                    ));
                }
            }

            let today = self.today();
            let remaining_debt = loan.liquidate(paid_amount, today).map_err(|err| {
                warn!(credit_id = %credit_id, paid = %paid_amount, error = %err, "liquidation refused");
                err
            })?;
            self.loans.save(&loan)?;

            info!(
                credit_id = %credit_id,
                paid = %paid_amount,
                remaining_debt = %remaining_debt,
                "credit contract liquidated"
            );
            self.emit(Event::LoanLiquidated {
                credit_id,
                paid_amount,
                remaining_debt,
                date: today,
            });
            Ok(loan)
        })
    }

    /// loan with derived figures as of today
    pub fn loan_summary(&self, credit_id: CreditId) -> Result<LoanView> {
        let loan = self.load_loan(credit_id)?;
        Ok(LoanView::from_loan(&loan, self.today()))
    }

    pub fn loan(&self, credit_id: CreditId) -> Result<CreditContract> {
        self.load_loan(credit_id)
    }

    pub fn loan_for_request(&self, request_id: RequestId) -> Result<Option<CreditContract>> {
        self.loans.for_request(request_id)
    }

    fn load_loan(&self, credit_id: CreditId) -> Result<CreditContract> {
        self.loans
            .get(credit_id)?
            .ok_or_else(|| WorkflowError::not_found("credit contract", credit_id))
    }
}

fn require_lender(actor: &Principal) -> Result<()> {
    if !actor.role.is_lender() {
        return Err(WorkflowError::unauthorized(
            &actor.username,
            "only banks can manage credit",
        ));
    }
    Ok(())
}
