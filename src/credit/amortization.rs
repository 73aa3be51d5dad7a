use chrono::{Datelike, Months, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::LoanStatus;

/// scheduled payment in an amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub payment_number: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
}

/// equal-installment arithmetic over a loan's principal, per-period rate and term.
///
/// All figures are derived on demand; nothing here is stored. Inputs are
/// validated upstream, so degenerate values (zero term, negative rate or
/// principal) yield zero amounts instead of errors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmortizationEngine {
    principal: Money,
    rate: Rate,
    term: u32,
}

impl AmortizationEngine {
    pub fn new(principal: Money, rate: Rate, term: u32) -> Self {
        Self {
            principal,
            rate,
            term,
        }
    }

    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn rate(&self) -> Rate {
        self.rate
    }

    pub fn term(&self) -> u32 {
        self.term
    }

    /// installment = P * r * (1 + r)^n / ((1 + r)^n - 1)
    pub fn installment(&self) -> Money {
        self.checked_installment().unwrap_or(Money::ZERO)
    }

    /// installment, or None when it or the total payable over the term
    /// does not fit a decimal
    pub fn checked_installment(&self) -> Option<Money> {
        if self.term == 0 || self.principal.is_negative() || self.rate.is_negative() {
            return Some(Money::ZERO);
        }

        if self.rate.is_zero() {
            return Some(self.principal / Decimal::from(self.term));
        }

        // same formula with the discount factor v = 1 / (1 + r):
        // P * r / (1 - v^n), which stays bounded for long terms and high rates
        let r = self.rate.as_decimal();
        let v = Decimal::ONE / (Decimal::ONE + r);
        let mut discount = Decimal::ONE;
        for _ in 0..self.term {
            discount *= v;
        }

        let denominator = Decimal::ONE - discount;
        if denominator.is_zero() {
            return Some(self.principal / Decimal::from(self.term));
        }

        let installment = Money::from_decimal(
            self.principal
                .as_decimal()
                .checked_mul(r.checked_div(denominator)?)?,
        );
        installment.checked_times(self.term)?;
        Some(installment)
    }

    pub fn total_payable(&self) -> Money {
        self.installment().saturating_times(self.term)
    }

    pub fn total_interest(&self) -> Money {
        if self.term == 0 {
            return Money::ZERO;
        }
        self.total_payable() - self.principal
    }

    /// (1 + r)^12 - 1, as a percentage
    pub fn effective_annual_rate(&self) -> Decimal {
        let base = Decimal::ONE + self.rate.as_decimal();
        let mut factor = Decimal::ONE;
        for _ in 0..12 {
            factor *= base;
        }
        ((factor - Decimal::ONE) * Decimal::from(100)).round_dp(4)
    }

    /// date the last installment falls due
    pub fn maturity_date(&self, grant_date: NaiveDate) -> NaiveDate {
        add_months(grant_date, self.term)
    }

    pub fn periods_elapsed(&self, grant_date: NaiveDate, as_of: NaiveDate) -> u32 {
        months_between(grant_date, as_of).max(0) as u32
    }

    pub fn remaining_periods(&self, grant_date: NaiveDate, as_of: NaiveDate) -> u32 {
        self.term
            .saturating_sub(self.periods_elapsed(grant_date, as_of))
    }

    /// installment times remaining periods; zero once the term has elapsed
    pub fn remaining_debt(&self, grant_date: NaiveDate, as_of: NaiveDate) -> Money {
        self.installment()
            .saturating_times(self.remaining_periods(grant_date, as_of))
    }

    pub fn is_overdue(&self, status: LoanStatus, grant_date: NaiveDate, today: NaiveDate) -> bool {
        status == LoanStatus::Active && today > self.maturity_date(grant_date)
    }

    /// effective status as of `today`
    pub fn check_status(
        &self,
        status: LoanStatus,
        liquidation_date: Option<NaiveDate>,
        grant_date: NaiveDate,
        today: NaiveDate,
    ) -> LoanStatus {
        if liquidation_date.is_some() {
            return LoanStatus::Liquidated;
        }
        if self.is_overdue(status, grant_date, today) {
            return LoanStatus::Overdue;
        }
        status
    }

    /// full per-period schedule starting one period after the grant date
    pub fn schedule(&self, grant_date: NaiveDate) -> Vec<ScheduledPayment> {
        let installment = self.installment();
        if installment.is_zero() {
            return Vec::new();
        }

        let rate = self.rate.as_decimal();
        let mut payments = Vec::with_capacity(self.term as usize);
        let mut balance = self.principal;

        for i in 1..=self.term {
            let interest_portion = balance * rate;
            let principal_portion = (installment - interest_portion).min(balance);
            let ending_balance = (balance - principal_portion).max(Money::ZERO);

            payments.push(ScheduledPayment {
                payment_number: i,
                due_date: add_months(grant_date, i),
                beginning_balance: balance,
                payment_amount: installment,
                principal_portion,
                interest_portion,
                ending_balance,
            });

            balance = ending_balance;
        }

        // last payment absorbs the rounding residue
        if let Some(last) = payments.last_mut() {
            if last.ending_balance > Money::ZERO {
                last.principal_portion += last.ending_balance;
                last.payment_amount += last.ending_balance;
                last.ending_balance = Money::ZERO;
            }
        }

        payments
    }
}

/// add calendar months, clamping to the end of shorter months
pub(crate) fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// whole calendar months from `start` to `end`, negative when `end` precedes `start`
pub(crate) fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let start_index = start.year() as i64 * 12 + start.month0() as i64;
    let end_index = end.year() as i64 * 12 + end.month0() as i64;
    let mut months = end_index - start_index;
    let day_delta = end.day() as i64 - start.day() as i64;

    if months > 0 && day_delta < 0 {
        months -= 1;
    } else if months < 0 && day_delta > 0 {
        months += 1;
    }
    months
}
