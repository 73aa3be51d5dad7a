pub mod amortization;
pub mod ledger;
pub mod loan;

pub use amortization::{AmortizationEngine, ScheduledPayment};
pub use ledger::{CreditLedger, LedgerEntry, LedgerKey, LimitUpdate};
pub use loan::CreditContract;
