use chrono::NaiveDate;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, RwLock};

use crate::credit::CreditContract;
use crate::errors::{Result, WorkflowError};
use crate::rental::{RentalContract, RentalRequest};
use crate::types::{AutomobileId, ContractId, CreditId, PrincipalId, RequestId, RequestStatus};

/// persistence for rental requests
pub trait RequestRepository: Send + Sync {
    fn get(&self, id: RequestId) -> Result<Option<RentalRequest>>;

    fn save(&self, request: &RentalRequest) -> Result<()>;

    /// true when a request was removed
    fn delete(&self, id: RequestId) -> Result<bool>;

    fn for_customer(&self, customer_id: PrincipalId) -> Result<Vec<RentalRequest>>;

    fn with_status(&self, status: RequestStatus) -> Result<Vec<RentalRequest>>;

    fn for_automobiles(&self, automobile_ids: &[AutomobileId]) -> Result<Vec<RentalRequest>>;
}

/// persistence for rental contracts
pub trait ContractRepository: Send + Sync {
    fn get(&self, id: ContractId) -> Result<Option<RentalContract>>;

    fn save(&self, contract: &RentalContract) -> Result<()>;

    /// true when a contract was removed
    fn delete(&self, id: ContractId) -> Result<bool>;

    fn for_request(&self, request_id: RequestId) -> Result<Option<RentalContract>>;

    /// open contracts whose end date lies in `from..=to`
    fn ending_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<RentalContract>>;
}

/// persistence for credit contracts
pub trait LoanRepository: Send + Sync {
    fn get(&self, id: CreditId) -> Result<Option<CreditContract>>;

    fn save(&self, loan: &CreditContract) -> Result<()>;

    fn for_request(&self, request_id: RequestId) -> Result<Option<CreditContract>>;
}

#[derive(Debug, Default)]
pub struct InMemoryRequests {
    rows: RwLock<HashMap<RequestId, RentalRequest>>,
}

impl InMemoryRequests {
    pub fn new() -> Self {
        Self::default()
    }

    fn select(&self, keep: impl Fn(&RentalRequest) -> bool) -> Result<Vec<RentalRequest>> {
        let mut found: Vec<RentalRequest> = self
            .rows
            .read()
            .map_err(|_| poisoned("requests"))?
            .values()
            .filter(|r| keep(r))
            .cloned()
            .collect();
        found.sort_by_key(|r| (r.created_at, r.id));
        Ok(found)
    }
}

impl RequestRepository for InMemoryRequests {
    fn get(&self, id: RequestId) -> Result<Option<RentalRequest>> {
        Ok(self.rows.read().map_err(|_| poisoned("requests"))?.get(&id).cloned())
    }

    fn save(&self, request: &RentalRequest) -> Result<()> {
        self.rows
            .write()
            .map_err(|_| poisoned("requests"))?
            .insert(request.id, request.clone());
        Ok(())
    }

    fn delete(&self, id: RequestId) -> Result<bool> {
        Ok(self
            .rows
            .write()
            .map_err(|_| poisoned("requests"))?
            .remove(&id)
            .is_some())
    }

    fn for_customer(&self, customer_id: PrincipalId) -> Result<Vec<RentalRequest>> {
        self.select(|r| r.customer_id == customer_id)
    }

    fn with_status(&self, status: RequestStatus) -> Result<Vec<RentalRequest>> {
        self.select(|r| r.status == status)
    }

    fn for_automobiles(&self, automobile_ids: &[AutomobileId]) -> Result<Vec<RentalRequest>> {
        self.select(|r| automobile_ids.contains(&r.automobile_id))
    }
}

#[derive(Debug, Default)]
pub struct InMemoryContracts {
    rows: RwLock<HashMap<ContractId, RentalContract>>,
}

impl InMemoryContracts {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ContractRepository for InMemoryContracts {
    fn get(&self, id: ContractId) -> Result<Option<RentalContract>> {
        Ok(self.rows.read().map_err(|_| poisoned("contracts"))?.get(&id).cloned())
    }

    fn save(&self, contract: &RentalContract) -> Result<()> {
        self.rows
            .write()
            .map_err(|_| poisoned("contracts"))?
            .insert(contract.id, contract.clone());
        Ok(())
    }

    fn delete(&self, id: ContractId) -> Result<bool> {
        Ok(self
            .rows
            .write()
            .map_err(|_| poisoned("contracts"))?
            .remove(&id)
            .is_some())
    }

    fn for_request(&self, request_id: RequestId) -> Result<Option<RentalContract>> {
        Ok(self
            .rows
            .read()
            .map_err(|_| poisoned("contracts"))?
            .values()
            .find(|c| c.request_id == request_id)
            .cloned())
    }

    fn ending_between(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<RentalContract>> {
        let mut found: Vec<RentalContract> = self
            .rows
            .read()
            .map_err(|_| poisoned("contracts"))?
            .values()
            .filter(|c| c.status.is_open() && c.end_date >= from && c.end_date <= to)
            .cloned()
            .collect();
        found.sort_by_key(|c| (c.end_date, c.id));
        Ok(found)
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLoans {
    rows: RwLock<HashMap<CreditId, CreditContract>>,
}

impl InMemoryLoans {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoanRepository for InMemoryLoans {
    fn get(&self, id: CreditId) -> Result<Option<CreditContract>> {
        Ok(self.rows.read().map_err(|_| poisoned("loans"))?.get(&id).cloned())
    }

    fn save(&self, loan: &CreditContract) -> Result<()> {
        self.rows
            .write()
            .map_err(|_| poisoned("loans"))?
            .insert(loan.id, loan.clone());
        Ok(())
    }

    fn for_request(&self, request_id: RequestId) -> Result<Option<CreditContract>> {
        Ok(self
            .rows
            .read()
            .map_err(|_| poisoned("loans"))?
            .values()
            .find(|l| l.request_id == request_id)
            .cloned())
    }
}

/// one mutex per key, created on first use and dropped by the last user.
///
/// Operations on the same key run one at a time; callers nesting several
/// keys must always acquire them in the same order.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    name: &'static str,
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K: Eq + Hash + Copy> KeyedLocks<K> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(HashMap::new()),
        }
    }

    /// run `f` while holding the lock for `key`
    pub fn with<T>(&self, key: K, f: impl FnOnce() -> Result<T>) -> Result<T> {
        let slot = {
            let mut slots = self.slots.lock().map_err(|_| poisoned(self.name))?;
            Arc::clone(slots.entry(key).or_default())
        };
        let outcome = match slot.lock() {
            Ok(_guard) => f(),
            Err(_) => Err(poisoned(self.name)),
        };
        self.release(key, slot);
        outcome
    }

    /// number of keys currently holding a mutex
    pub fn len(&self) -> usize {
        self.slots.lock().map(|slots| slots.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // every clone of a slot is dropped under the map lock, so the last user
    // sees the map's reference as the only one left
    fn release(&self, key: K, slot: Arc<Mutex<()>>) {
        let mut slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        drop(slot);
        if slots.get(&key).is_some_and(|held| Arc::strong_count(held) == 1) {
            slots.remove(&key);
        }
    }
}

fn poisoned(what: &str) -> WorkflowError {
    WorkflowError::Storage {
        message: format!("{} lock poisoned", what),
    }
}
