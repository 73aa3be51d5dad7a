mod common;

use std::sync::Arc;

use common::{money, FailingContracts, FailingRequests, Harness};
use rental_credit_engine::{
    ContractRepository, ContractStatus, ErrorKind, Event, InMemoryContracts, Money,
    RentalRequest, RequestRepository, RequestStatus,
};

fn with_failing_requests() -> (Harness, Arc<FailingRequests>) {
    let requests = Arc::new(FailingRequests::new());
    let h = Harness::with_repositories(
        Arc::clone(&requests) as Arc<dyn RequestRepository>,
        Arc::new(InMemoryContracts::new()),
    );
    h.engine.set_credit_limit(&h.bank, h.customer.id, money(1_000)).unwrap();
    (h, requests)
}

/// pending request worth the whole limit on a bank-owned car
fn pending(h: &Harness) -> RentalRequest {
    let car = h.automobile(&h.bank, 100);
    h.engine
        .submit_request(&h.customer, car, h.day(1), h.day(11), None)
        .unwrap()
}

#[test]
fn test_failed_approval_returns_the_credit() {
    let (h, requests) = with_failing_requests();
    let request = pending(&h);
    h.engine.take_events();

    requests.refuse_saves_of(Some(RequestStatus::Approved));
    let err = h
        .engine
        .decide_request(&h.bank, request.id, RequestStatus::Approved, None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    let stored = h.engine.request(request.id).unwrap();
    assert_eq!(stored.status, RequestStatus::Pending);
    assert!(stored.reservation.is_none());
    assert_eq!(h.available_credit(), money(1_000));
    assert!(!h.is_available(request.automobile_id));
    assert!(h.engine.take_events().is_empty());

    requests.refuse_saves_of(None);
    h.engine
        .decide_request(&h.bank, request.id, RequestStatus::Approved, None)
        .unwrap();
    assert_eq!(h.available_credit(), Money::ZERO);
}

#[test]
fn test_failed_cancellation_keeps_the_reservation() {
    let (h, requests) = with_failing_requests();
    let request = pending(&h);
    h.engine
        .decide_request(&h.bank, request.id, RequestStatus::Approved, None)
        .unwrap();

    requests.refuse_saves_of(Some(RequestStatus::Cancelled));
    let err = h.engine.cancel_request(&h.customer, request.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    let stored = h.engine.request(request.id).unwrap();
    assert_eq!(stored.status, RequestStatus::Approved);
    assert!(stored.reservation.is_some());
    assert_eq!(h.available_credit(), Money::ZERO);
    assert!(!h.is_available(request.automobile_id));

    requests.refuse_saves_of(None);
    h.engine.cancel_request(&h.customer, request.id).unwrap();
    assert_eq!(h.available_credit(), money(1_000));
    assert!(h.is_available(request.automobile_id));
}

#[test]
fn test_failed_activation_discards_the_contract() {
    let (h, requests) = with_failing_requests();
    let request = pending(&h);
    h.engine
        .decide_request(&h.bank, request.id, RequestStatus::Approved, None)
        .unwrap();

    requests.refuse_saves_of(Some(RequestStatus::Active));
    let err = h.engine.materialize_contract(&h.bank, request.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);

    assert!(h.engine.contract_for_request(request.id).unwrap().is_none());
    assert_eq!(h.engine.request(request.id).unwrap().status, RequestStatus::Approved);
    assert_eq!(h.available_credit(), Money::ZERO);
    assert!(!h.is_available(request.automobile_id));

    requests.refuse_saves_of(None);
    let contract = h.engine.materialize_contract(&h.bank, request.id).unwrap();
    assert_eq!(
        h.engine.contract_for_request(request.id).unwrap().map(|c| c.id),
        Some(contract.id)
    );
    assert_eq!(h.available_credit(), Money::ZERO);
}

#[test]
fn test_failed_contract_save_leaves_the_request_approved() {
    let contracts = Arc::new(FailingContracts::new());
    let h = Harness::with_repositories(
        Arc::new(FailingRequests::new()),
        Arc::clone(&contracts) as Arc<dyn ContractRepository>,
    );
    h.engine.set_credit_limit(&h.bank, h.customer.id, money(1_000)).unwrap();
    let request = pending(&h);
    h.engine
        .decide_request(&h.bank, request.id, RequestStatus::Approved, None)
        .unwrap();

    contracts.refuse_saves(true);
    let err = h.engine.materialize_contract(&h.bank, request.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(h.engine.request(request.id).unwrap().status, RequestStatus::Approved);
    assert_eq!(h.available_credit(), Money::ZERO);
    assert!(!h.is_available(request.automobile_id));
}

#[test]
fn test_failed_completion_keeps_the_contract_open() {
    let contracts = Arc::new(FailingContracts::new());
    let requests = Arc::new(FailingRequests::new());
    let h = Harness::with_repositories(
        Arc::clone(&requests) as Arc<dyn RequestRepository>,
        Arc::clone(&contracts) as Arc<dyn ContractRepository>,
    );
    h.engine.set_credit_limit(&h.bank, h.customer.id, money(1_000)).unwrap();
    let request = pending(&h);
    h.engine
        .decide_request(&h.bank, request.id, RequestStatus::Approved, None)
        .unwrap();
    let contract = h.engine.materialize_contract(&h.bank, request.id).unwrap();
    h.engine.take_events();

    // the request cannot be completed
    requests.refuse_saves_of(Some(RequestStatus::Completed));
    let err = h
        .engine
        .finalize_contract(&h.bank, contract.id, "returned")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(h.engine.contract(contract.id).unwrap().status, ContractStatus::Active);
    assert_eq!(h.engine.request(request.id).unwrap().status, RequestStatus::Active);
    assert_eq!(h.available_credit(), Money::ZERO);
    assert!(!h.is_available(request.automobile_id));

    // the contract itself cannot be stored
    requests.refuse_saves_of(None);
    contracts.refuse_saves(true);
    let err = h
        .engine
        .cancel_contract(&h.bank, contract.id, "customer moved")
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(h.engine.request(request.id).unwrap().status, RequestStatus::Active);
    assert_eq!(h.available_credit(), Money::ZERO);
    assert!(!h.is_available(request.automobile_id));
    assert!(!h
        .engine
        .take_events()
        .iter()
        .any(|e| matches!(e, Event::CreditReleased { .. } | Event::ContractFinalized { .. })));

    contracts.refuse_saves(false);
    h.engine.finalize_contract(&h.bank, contract.id, "returned").unwrap();
    assert_eq!(h.engine.request(request.id).unwrap().status, RequestStatus::Completed);
    assert_eq!(h.available_credit(), money(1_000));
    assert!(h.is_available(request.automobile_id));
}

#[test]
fn test_rental_value_out_of_range_is_refused() {
    let h = Harness::new();
    let car = h
        .catalog
        .insert(rental_credit_engine::Automobile::new(
            "priceless",
            Money::from_decimal(rental_credit_engine::Decimal::MAX),
            h.company.id,
            h.company.role,
        ))
        .unwrap();

    let err = h
        .engine
        .submit_request(&h.customer, car, h.day(1), h.day(3), None)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    assert!(h.is_available(car));
    assert!(h.engine.requests_for_customer("ana.souza").unwrap().is_empty());
}
