use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::decimal::Money;
use crate::errors::{Result, WorkflowError};
use crate::types::{AutomobileId, Principal, PrincipalId, RequestId, RequestStatus};

/// credit held against a lender's ledger while the request is approved or active
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditReservation {
    pub lender_id: PrincipalId,
    pub amount: Money,
}

/// customer's request to rent an automobile for a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalRequest {
    // identification
    pub id: RequestId,
    pub customer_id: PrincipalId,
    pub customer_username: String,
    pub automobile_id: AutomobileId,

    // period and value
    pub pickup_date: NaiveDate,
    pub return_date: NaiveDate,
    pub rental_days: u32,
    pub total_value: Money,

    // lifecycle
    pub status: RequestStatus,
    pub created_at: NaiveDate,
    pub observations: Option<String>,

    // processing
    pub processed_by_agent_id: Option<PrincipalId>,
    pub processed_by_agent_username: Option<String>,
    pub processed_at: Option<NaiveDate>,
    pub rejection_reason: Option<String>,

    // credit held for this request, released exactly once
    pub reservation: Option<CreditReservation>,
}

impl RentalRequest {
    pub fn new(
        customer: &Principal,
        automobile_id: AutomobileId,
        pickup_date: NaiveDate,
        return_date: NaiveDate,
        daily_rate: Money,
        observations: Option<String>,
        today: NaiveDate,
    ) -> Result<Self> {
        let mut request = Self {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            customer_username: customer.username.clone(),
            automobile_id,
            pickup_date,
            return_date,
            rental_days: 0,
            total_value: Money::ZERO,
            status: RequestStatus::Pending,
            created_at: today,
            observations,
            processed_by_agent_id: None,
            processed_by_agent_username: None,
            processed_at: None,
            rejection_reason: None,
            reservation: None,
        };
        request.recalculate(daily_rate)?;
        Ok(request)
    }

    /// recompute days and total from the dates; never negative.
    ///
    /// Leaves the request untouched when the total does not fit.
    pub fn recalculate(&mut self, daily_rate: Money) -> Result<()> {
        let days = u32::try_from((self.return_date - self.pickup_date).num_days().max(0))
            .map_err(|_| WorkflowError::invalid_argument("rental period too long"))?;
        let total_value = daily_rate
            .max(Money::ZERO)
            .checked_times(days)
            .ok_or_else(|| {
                WorkflowError::invalid_argument(format!(
                    "rental value out of range: {} a day for {} days",
                    daily_rate, days
                ))
            })?;
        self.rental_days = days;
        self.total_value = total_value;
        Ok(())
    }

    pub fn is_owned_by(&self, principal: &Principal) -> bool {
        self.customer_id == principal.id
    }

    pub fn can_be_modified(&self) -> bool {
        self.status.can_be_modified()
    }

    pub fn can_be_cancelled(&self) -> bool {
        self.status.can_be_cancelled()
    }
}

/// check `return >= pickup` and, unless past pickups are allowed, `pickup >= today`
pub fn validate_dates(
    pickup_date: NaiveDate,
    return_date: NaiveDate,
    today: NaiveDate,
    allow_past_pickup: bool,
) -> Result<()> {
    if return_date < pickup_date {
        return Err(WorkflowError::InvalidDate {
            message: format!("return date must not precede pickup date {}", pickup_date),
            date: return_date,
        });
    }
    if !allow_past_pickup && pickup_date < today {
        return Err(WorkflowError::InvalidDate {
            message: format!("pickup date must not precede today {}", today),
            date: pickup_date,
        });
    }
    Ok(())
}

/// effect a transition has on the lender's credit ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditEffect {
    None,
    Reserve,
    Release,
}

/// a legal status change together with the side effects it carries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: RequestStatus,
    pub to: RequestStatus,
    /// availability the automobile must take, if any
    pub availability: Option<bool>,
    pub credit: CreditEffect,
}

/// rental request status graph.
///
/// ```text
/// PENDING -> UNDER_ANALYSIS -> APPROVED -> ACTIVE -> COMPLETED
///    |             |              |
///    |             +-> REJECTED   |
///    +-> APPROVED / REJECTED      |
///    +-------------+--------------+-> CANCELLED
/// ```
pub struct RequestStateMachine;

impl RequestStateMachine {
    pub fn can_transition(from: RequestStatus, to: RequestStatus) -> bool {
        use RequestStatus::*;
        match from {
            Pending => matches!(to, UnderAnalysis | Approved | Rejected | Cancelled),
            UnderAnalysis => matches!(to, Approved | Rejected | Cancelled),
            Approved => matches!(to, Active | Cancelled),
            Active => matches!(to, Completed),
            Rejected | Completed | Cancelled => false,
        }
    }

    /// validate a status change without touching the request
    pub fn plan(
        request: &RentalRequest,
        to: RequestStatus,
        rejection_reason: Option<&str>,
    ) -> Result<Transition> {
        let from = request.status;
        if !Self::can_transition(from, to) {
            return Err(WorkflowError::InvalidTransition { from, to });
        }

        if to == RequestStatus::Rejected
            && rejection_reason.map(str::trim).unwrap_or_default().is_empty()
        {
            return Err(WorkflowError::invalid_argument(
                "a rejection reason is required",
            ));
        }

        Ok(Transition {
            from,
            to,
            availability: Self::availability_for(to),
            credit: Self::credit_effect(from, to),
        })
    }

    /// apply a planned transition, recording who processed it and when
    pub fn apply(
        request: &mut RentalRequest,
        transition: &Transition,
        actor: &Principal,
        rejection_reason: Option<&str>,
        today: NaiveDate,
    ) {
        request.status = transition.to;
        request.processed_by_agent_id = Some(actor.id);
        request.processed_by_agent_username = Some(actor.username.clone());
        request.processed_at = Some(today);
        if transition.to == RequestStatus::Rejected {
            request.rejection_reason = rejection_reason.map(|r| r.trim().to_string());
        }
    }

    /// plan then apply in one step
    pub fn transition(
        request: &mut RentalRequest,
        to: RequestStatus,
        actor: &Principal,
        rejection_reason: Option<&str>,
        today: NaiveDate,
    ) -> Result<Transition> {
        let transition = Self::plan(request, to, rejection_reason)?;
        Self::apply(request, &transition, actor, rejection_reason, today);
        Ok(transition)
    }

    fn availability_for(to: RequestStatus) -> Option<bool> {
        use RequestStatus::*;
        match to {
            UnderAnalysis | Approved | Active => Some(false),
            Rejected | Cancelled | Completed => Some(true),
            Pending => None,
        }
    }

    fn credit_effect(from: RequestStatus, to: RequestStatus) -> CreditEffect {
        use RequestStatus::*;
        match (from, to) {
            (Pending | UnderAnalysis, Approved | Active) => CreditEffect::Reserve,
            (Approved | Active | UnderAnalysis, Rejected | Cancelled | Completed) => {
                CreditEffect::Release
            }
            _ => CreditEffect::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RequestStatus::*;

    const ALL: [RequestStatus; 7] = [
        Pending,
        UnderAnalysis,
        Approved,
        Rejected,
        Active,
        Completed,
        Cancelled,
    ];

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn request() -> RentalRequest {
        RentalRequest::new(
            &Principal::customer("ana"),
            Uuid::new_v4(),
            date(2026, 5, 1),
            date(2026, 5, 11),
            Money::from_major(100),
            None,
            date(2026, 4, 20),
        )
        .unwrap()
    }

    #[test]
    fn test_total_value_is_rate_times_days() {
        let mut request = request();
        assert_eq!(request.rental_days, 10);
        assert_eq!(request.total_value, Money::from_major(1_000));

        request.return_date = date(2026, 5, 4);
        request.recalculate(Money::from_major(80)).unwrap();
        assert_eq!(request.rental_days, 3);
        assert_eq!(request.total_value, Money::from_major(240));

        // same-day rental costs nothing
        request.return_date = request.pickup_date;
        request.recalculate(Money::from_major(80)).unwrap();
        assert_eq!(request.total_value, Money::ZERO);
    }

    #[test]
    fn test_total_value_out_of_range() {
        let mut request = request();
        let err = request
            .recalculate(Money::from_decimal(rust_decimal::Decimal::MAX))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument { .. }));
        assert_eq!(request.total_value, Money::from_major(1_000));
        assert_eq!(request.rental_days, 10);
    }

    #[test]
    fn test_validate_dates() {
        let today = date(2026, 4, 20);
        assert!(validate_dates(today, today, today, false).is_ok());
        assert!(matches!(
            validate_dates(date(2026, 5, 2), date(2026, 5, 1), today, false),
            Err(WorkflowError::InvalidDate { .. })
        ));
        assert!(validate_dates(date(2026, 4, 19), date(2026, 5, 1), today, false).is_err());
        assert!(validate_dates(date(2026, 4, 19), date(2026, 5, 1), today, true).is_ok());
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in [Rejected, Completed, Cancelled] {
            for to in ALL {
                assert!(!RequestStateMachine::can_transition(from, to), "{from} -> {to}");
            }
        }
    }

    #[test]
    fn test_illegal_shortcuts() {
        assert!(!RequestStateMachine::can_transition(Pending, Completed));
        assert!(!RequestStateMachine::can_transition(Pending, Active));
        assert!(!RequestStateMachine::can_transition(Approved, Rejected));
        assert!(!RequestStateMachine::can_transition(Active, Cancelled));
        assert!(!RequestStateMachine::can_transition(UnderAnalysis, Pending));
    }

    #[test]
    fn test_cancellable_states_match_graph() {
        for from in ALL {
            assert_eq!(
                RequestStateMachine::can_transition(from, Cancelled),
                from.can_be_cancelled(),
                "{from}"
            );
        }
    }

    #[test]
    fn test_side_effects_are_paired() {
        let mut request = request();
        let agent = Principal::bank_agent("banco-sul");
        let today = date(2026, 4, 21);

        let t = RequestStateMachine::transition(&mut request, UnderAnalysis, &agent, None, today).unwrap();
        assert_eq!(t.availability, Some(false));
        assert_eq!(t.credit, CreditEffect::None);
        assert_eq!(request.processed_by_agent_username.as_deref(), Some("banco-sul"));
        assert_eq!(request.processed_at, Some(today));

        let t = RequestStateMachine::transition(&mut request, Approved, &agent, None, today).unwrap();
        assert_eq!(t.credit, CreditEffect::Reserve);

        let t = RequestStateMachine::transition(&mut request, Active, &agent, None, today).unwrap();
        assert_eq!(t.credit, CreditEffect::None);
        assert_eq!(t.availability, Some(false));

        let t = RequestStateMachine::transition(&mut request, Completed, &agent, None, today).unwrap();
        assert_eq!(t.credit, CreditEffect::Release);
        assert_eq!(t.availability, Some(true));
    }

    #[test]
    fn test_rejection_needs_reason() {
        let mut request = request();
        let agent = Principal::company_agent("locadora");
        let today = date(2026, 4, 21);

        let err = RequestStateMachine::transition(&mut request, Rejected, &agent, Some("  "), today)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidArgument { .. }));
        assert_eq!(request.status, Pending);
        assert_eq!(request.processed_by_agent_id, None);

        RequestStateMachine::transition(&mut request, Rejected, &agent, Some(" no documents "), today)
            .unwrap();
        assert_eq!(request.rejection_reason.as_deref(), Some("no documents"));
    }

    #[test]
    fn test_second_decision_fails() {
        let mut request = request();
        let agent = Principal::company_agent("locadora");
        let today = date(2026, 4, 21);

        RequestStateMachine::transition(&mut request, Approved, &agent, None, today).unwrap();
        let err = RequestStateMachine::transition(&mut request, Approved, &agent, None, today)
            .unwrap_err();
        assert_eq!(err, WorkflowError::InvalidTransition { from: Approved, to: Approved });
    }
}
