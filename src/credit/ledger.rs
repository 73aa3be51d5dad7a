use chrono::NaiveDate;
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};
use tracing::{debug, info, warn};

use crate::decimal::Money;
use crate::directory::Directory;
use crate::errors::{Result, WorkflowError};
use crate::types::{LedgerStatus, PrincipalId, Role};

/// one ledger row per (customer, lender) pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LedgerKey {
    pub customer_id: PrincipalId,
    pub lender_id: PrincipalId,
}

impl LedgerKey {
    pub fn new(customer_id: PrincipalId, lender_id: PrincipalId) -> Self {
        Self {
            customer_id,
            lender_id,
        }
    }
}

/// revolving credit limit a lender extends to a customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub customer_id: PrincipalId,
    pub lender_id: PrincipalId,
    pub credit_limit: Money,
    pub available_limit: Money,
    pub status: LedgerStatus,
    pub created_at: NaiveDate,
    pub updated_at: NaiveDate,
}

impl LedgerEntry {
    fn open(key: LedgerKey, limit: Money, today: NaiveDate) -> Self {
        Self {
            customer_id: key.customer_id,
            lender_id: key.lender_id,
            credit_limit: limit,
            available_limit: limit,
            status: LedgerStatus::Active,
            created_at: today,
            updated_at: today,
        }
    }

    pub fn used_limit(&self) -> Money {
        self.credit_limit - self.available_limit
    }

    /// used share of the limit, in percent with 2 decimals
    pub fn usage_percentage(&self) -> Decimal {
        self.used_limit().percentage_of(self.credit_limit)
    }

    pub fn is_active(&self) -> bool {
        self.status == LedgerStatus::Active
    }

    pub fn has_available(&self, amount: Money) -> bool {
        self.is_active() && self.available_limit >= amount
    }

    /// lower the available limit, never below zero
    fn reserve(&mut self, amount: Money) {
        self.available_limit = (self.available_limit - amount).max(Money::ZERO);
    }

    /// raise the available limit, never above the credit limit
    fn release(&mut self, amount: Money) {
        self.available_limit = (self.available_limit + amount).min(self.credit_limit);
    }

    fn set_limit(&mut self, limit: Money) {
        self.credit_limit = limit;
        self.available_limit = self.available_limit.min(limit);
    }
}

/// result of creating or updating a limit
#[derive(Debug, Clone, PartialEq)]
pub struct LimitUpdate {
    pub previous_limit: Option<Money>,
    pub entry: LedgerEntry,
}

type Row = Arc<Mutex<LedgerEntry>>;

/// per-customer-per-lender credit ledger.
///
/// Every mutation of `available_limit` happens while holding the row's own
/// mutex, so concurrent reservations against the same pair serialize while
/// unrelated pairs proceed independently. `0 <= available_limit <= credit_limit`
/// holds after every operation.
pub struct CreditLedger {
    rows: RwLock<HashMap<LedgerKey, Row>>,
    directory: Arc<Directory>,
    time: Arc<SafeTimeProvider>,
}

impl CreditLedger {
    pub fn new(directory: Arc<Directory>, time: Arc<SafeTimeProvider>) -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            directory,
            time,
        }
    }

    /// create the entry, or update its limit clamping the available portion
    pub fn create_or_update_limit(
        &self,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        new_limit: Money,
    ) -> Result<LimitUpdate> {
        if new_limit.is_negative() {
            return Err(WorkflowError::invalid_argument(format!(
                "credit limit cannot be negative: {}",
                new_limit
            )));
        }
        self.directory
            .require(customer_id, "customer", |role| role == Role::Customer)?;
        self.directory
            .require(lender_id, "lender", |role| role.is_lender())?;

        let key = LedgerKey::new(customer_id, lender_id);
        let today = self.today();

        let row = {
            let mut rows = self.rows.write().map_err(|_| poisoned())?;
            if let Some(row) = rows.get(&key) {
                Arc::clone(row)
            } else {
                let entry = LedgerEntry::open(key, new_limit, today);
                rows.insert(key, Arc::new(Mutex::new(entry.clone())));
                info!(
                    customer_id = %customer_id,
                    lender_id = %lender_id,
                    limit = %new_limit,
                    "credit ledger opened"
                );
                return Ok(LimitUpdate {
                    previous_limit: None,
                    entry,
                });
            }
        };

        let mut entry = lock(&row)?;
        let previous_limit = entry.credit_limit;
        entry.set_limit(new_limit);
        entry.updated_at = today;
        info!(
            customer_id = %customer_id,
            lender_id = %lender_id,
            old_limit = %previous_limit,
            new_limit = %new_limit,
            available = %entry.available_limit,
            "credit limit updated"
        );

        Ok(LimitUpdate {
            previous_limit: Some(previous_limit),
            entry: entry.clone(),
        })
    }

    pub fn set_status(
        &self,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        status: LedgerStatus,
    ) -> Result<LedgerEntry> {
        let key = LedgerKey::new(customer_id, lender_id);
        let row = self
            .row(&key)?
            .ok_or_else(|| WorkflowError::not_found("credit ledger", format_key(&key)))?;

        let mut entry = lock(&row)?;
        entry.status = status;
        entry.updated_at = self.today();
        info!(customer_id = %customer_id, lender_id = %lender_id, ?status, "credit ledger status changed");
        Ok(entry.clone())
    }

    pub fn entry(&self, customer_id: PrincipalId, lender_id: PrincipalId) -> Result<Option<LedgerEntry>> {
        match self.row(&LedgerKey::new(customer_id, lender_id))? {
            Some(row) => Ok(Some(lock(&row)?.clone())),
            None => Ok(None),
        }
    }

    pub fn entries_for_lender(&self, lender_id: PrincipalId) -> Result<Vec<LedgerEntry>> {
        let rows: Vec<Row> = self
            .rows
            .read()
            .map_err(|_| poisoned())?
            .iter()
            .filter(|(key, _)| key.lender_id == lender_id)
            .map(|(_, row)| Arc::clone(row))
            .collect();

        rows.iter().map(|row| Ok(lock(row)?.clone())).collect()
    }

    /// true iff an active entry exists with at least `amount` available;
    /// a missing entry means no credit relationship and answers false
    pub fn has_available(
        &self,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        amount: Money,
    ) -> Result<bool> {
        check_amount(amount)?;
        let available = match self.entry(customer_id, lender_id)? {
            Some(entry) => entry.has_available(amount),
            None => {
                warn!(customer_id = %customer_id, lender_id = %lender_id, "no credit ledger for pair");
                false
            }
        };
        debug!(customer_id = %customer_id, lender_id = %lender_id, %amount, available, "credit check");
        Ok(available)
    }

    /// clamp-reserve; a missing entry is silently ignored
    pub fn reserve(
        &self,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        amount: Money,
    ) -> Result<Option<LedgerEntry>> {
        check_amount(amount)?;
        self.mutate(LedgerKey::new(customer_id, lender_id), |entry| {
            entry.reserve(amount);
            Ok(())
        })
    }

    /// clamp-release; a missing entry is silently ignored
    pub fn release(
        &self,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        amount: Money,
    ) -> Result<Option<LedgerEntry>> {
        check_amount(amount)?;
        self.mutate(LedgerKey::new(customer_id, lender_id), |entry| {
            entry.release(amount);
            Ok(())
        })
    }

    /// check and reserve as one unit under the row lock; used to gate approvals
    pub fn try_reserve(
        &self,
        customer_id: PrincipalId,
        lender_id: PrincipalId,
        amount: Money,
    ) -> Result<LedgerEntry> {
        check_amount(amount)?;
        let key = LedgerKey::new(customer_id, lender_id);
        let reserved = self.mutate(key, |entry| {
            if !entry.has_available(amount) {
                let available = if entry.is_active() {
                    entry.available_limit
                } else {
                    Money::ZERO
                };
                return Err(WorkflowError::InsufficientCredit {
                    available,
                    requested: amount,
                });
            }
            entry.reserve(amount);
            Ok(())
        })?;

        reserved.ok_or(WorkflowError::InsufficientCredit {
            available: Money::ZERO,
            requested: amount,
        })
    }

    fn mutate(
        &self,
        key: LedgerKey,
        apply: impl FnOnce(&mut LedgerEntry) -> Result<()>,
    ) -> Result<Option<LedgerEntry>> {
        let row = match self.row(&key)? {
            Some(row) => row,
            None => {
                debug!(ledger = %format_key(&key), "no ledger entry, mutation skipped");
                return Ok(None);
            }
        };

        let mut entry = lock(&row)?;
        let before = entry.available_limit;
        apply(&mut *entry)?;
        entry.updated_at = self.today();
        debug!(
            ledger = %format_key(&key),
            before = %before,
            after = %entry.available_limit,
            limit = %entry.credit_limit,
            "available limit changed"
        );
        Ok(Some(entry.clone()))
    }

    fn row(&self, key: &LedgerKey) -> Result<Option<Row>> {
        Ok(self.rows.read().map_err(|_| poisoned())?.get(key).cloned())
    }

    fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }
}

fn check_amount(amount: Money) -> Result<()> {
    if amount.is_negative() {
        return Err(WorkflowError::invalid_argument(format!(
            "credit amount cannot be negative: {}",
            amount
        )));
    }
    Ok(())
}

fn lock(row: &Row) -> Result<MutexGuard<'_, LedgerEntry>> {
    row.lock().map_err(|_| poisoned())
}

fn poisoned() -> WorkflowError {
    WorkflowError::Storage {
        message: "credit ledger lock poisoned".to_string(),
    }
}

fn format_key(key: &LedgerKey) -> String {
    format!("{}/{}", key.customer_id, key.lender_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Principal;
    use chrono::{TimeZone, Utc};
    use hourglass_rs::TimeSource;
    use rust_decimal_macros::dec;

    struct Fixture {
        ledger: CreditLedger,
        customer: Principal,
        lender: Principal,
    }

    fn fixture() -> Fixture {
        let time = Arc::new(SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        )));
        let directory = Arc::new(Directory::new());
        let customer = Principal::customer("ana");
        let lender = Principal::bank_agent("banco-sul");
        directory.register(customer.clone()).unwrap();
        directory.register(lender.clone()).unwrap();

        Fixture {
            ledger: CreditLedger::new(directory, time),
            customer,
            lender,
        }
    }

    fn money(amount: i64) -> Money {
        Money::from_major(amount)
    }

    #[test]
    fn test_create_then_update_clamps_available() {
        let f = fixture();
        let created = f
            .ledger
            .create_or_update_limit(f.customer.id, f.lender.id, money(1_000))
            .unwrap();
        assert_eq!(created.previous_limit, None);
        assert_eq!(created.entry.available_limit, money(1_000));

        f.ledger.reserve(f.customer.id, f.lender.id, money(300)).unwrap();

        // lowering the limit below the available portion clamps it
        let updated = f
            .ledger
            .create_or_update_limit(f.customer.id, f.lender.id, money(500))
            .unwrap();
        assert_eq!(updated.previous_limit, Some(money(1_000)));
        assert_eq!(updated.entry.credit_limit, money(500));
        assert_eq!(updated.entry.available_limit, money(500));

        // one entry per pair
        assert_eq!(f.ledger.entries_for_lender(f.lender.id).unwrap().len(), 1);
    }

    #[test]
    fn test_raising_limit_keeps_available() {
        let f = fixture();
        f.ledger.create_or_update_limit(f.customer.id, f.lender.id, money(1_000)).unwrap();
        f.ledger.reserve(f.customer.id, f.lender.id, money(400)).unwrap();

        let updated = f
            .ledger
            .create_or_update_limit(f.customer.id, f.lender.id, money(2_000))
            .unwrap();
        assert_eq!(updated.entry.available_limit, money(600));
        assert_eq!(updated.entry.used_limit(), money(1_400));
        assert_eq!(updated.entry.usage_percentage(), dec!(70));
    }

    #[test]
    fn test_unknown_parties_are_not_found() {
        let f = fixture();
        let stranger = Principal::customer("nobody");

        let err = f
            .ledger
            .create_or_update_limit(stranger.id, f.lender.id, money(100))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { entity: "customer", .. }));

        // a customer is not a lender
        let err = f
            .ledger
            .create_or_update_limit(f.customer.id, f.customer.id, money(100))
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotFound { entity: "lender", .. }));
    }

    #[test]
    fn test_has_available() {
        let f = fixture();
        assert!(!f.ledger.has_available(f.customer.id, f.lender.id, money(1)).unwrap());

        f.ledger.create_or_update_limit(f.customer.id, f.lender.id, money(1_000)).unwrap();
        assert!(f.ledger.has_available(f.customer.id, f.lender.id, money(1_000)).unwrap());
        assert!(!f.ledger.has_available(f.customer.id, f.lender.id, money(1_001)).unwrap());
        assert!(f.ledger.has_available(f.customer.id, f.lender.id, money(-1)).is_err());

        f.ledger
            .set_status(f.customer.id, f.lender.id, LedgerStatus::Suspended)
            .unwrap();
        assert!(!f.ledger.has_available(f.customer.id, f.lender.id, money(1)).unwrap());
    }

    #[test]
    fn test_reserve_release_stay_in_bounds() {
        let f = fixture();
        f.ledger.create_or_update_limit(f.customer.id, f.lender.id, money(1_000)).unwrap();

        let steps: [(bool, i64); 8] = [
            (true, 300),
            (true, 900),
            (false, 200),
            (false, 5_000),
            (true, 1),
            (true, 0),
            (false, 999),
            (true, 2_500),
        ];
        for (reserve, amount) in steps {
            let entry = if reserve {
                f.ledger.reserve(f.customer.id, f.lender.id, money(amount))
            } else {
                f.ledger.release(f.customer.id, f.lender.id, money(amount))
            }
            .unwrap()
            .unwrap();
            assert!(entry.available_limit >= Money::ZERO);
            assert!(entry.available_limit <= entry.credit_limit);
        }
    }

    #[test]
    fn test_reserve_then_release_restores() {
        let f = fixture();
        f.ledger.create_or_update_limit(f.customer.id, f.lender.id, money(1_000)).unwrap();
        f.ledger.reserve(f.customer.id, f.lender.id, money(200)).unwrap();

        f.ledger.reserve(f.customer.id, f.lender.id, money(350)).unwrap();
        let entry = f.ledger.release(f.customer.id, f.lender.id, money(350)).unwrap().unwrap();
        assert_eq!(entry.available_limit, money(800));
    }

    #[test]
    fn test_missing_entry_is_noop() {
        let f = fixture();
        assert_eq!(f.ledger.reserve(f.customer.id, f.lender.id, money(10)).unwrap(), None);
        assert_eq!(f.ledger.release(f.customer.id, f.lender.id, money(10)).unwrap(), None);
        assert_eq!(f.ledger.entry(f.customer.id, f.lender.id).unwrap(), None);
    }

    #[test]
    fn test_try_reserve_refuses_shortfall() {
        let f = fixture();
        let err = f.ledger.try_reserve(f.customer.id, f.lender.id, money(10)).unwrap_err();
        assert!(matches!(err, WorkflowError::InsufficientCredit { .. }));

        f.ledger.create_or_update_limit(f.customer.id, f.lender.id, money(1_000)).unwrap();
        let entry = f.ledger.try_reserve(f.customer.id, f.lender.id, money(1_000)).unwrap();
        assert_eq!(entry.available_limit, Money::ZERO);

        let err = f.ledger.try_reserve(f.customer.id, f.lender.id, money(1)).unwrap_err();
        assert_eq!(
            err,
            WorkflowError::InsufficientCredit {
                available: Money::ZERO,
                requested: money(1),
            }
        );
    }

    #[test]
    fn test_concurrent_try_reserve_never_overdraws() {
        let f = fixture();
        f.ledger.create_or_update_limit(f.customer.id, f.lender.id, money(1_000)).unwrap();

        let (ledger, customer_id, lender_id) = (&f.ledger, f.customer.id, f.lender.id);
        let successes = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(move |_| {
                    scope.spawn(move || ledger.try_reserve(customer_id, lender_id, money(300)).is_ok())
                })
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count()
        });

        assert_eq!(successes, 3);
        let entry = f.ledger.entry(f.customer.id, f.lender.id).unwrap().unwrap();
        assert_eq!(entry.available_limit, money(100));
    }
}
