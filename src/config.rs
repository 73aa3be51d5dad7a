use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, WorkflowError};

/// engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub renewal: RenewalPolicy,
    pub loans: LoanPolicy,
    pub requests: RequestPolicy,
}

/// automatic renewal sweep parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenewalPolicy {
    /// contracts ending within this many days are candidates
    pub window_days: u32,
    /// contracts renewed this many times are left alone
    pub max_renewals: u32,
    /// extension applied per renewal, in calendar months
    pub period_months: u32,
}

impl Default for RenewalPolicy {
    fn default() -> Self {
        Self {
            window_days: 7,
            max_renewals: 2,
            period_months: 1,
        }
    }
}

/// bounds for granting credit contracts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoanPolicy {
    /// percent per period
    pub max_rate_percent: Decimal,
    pub min_term: u32,
    pub max_term: u32,
}

impl Default for LoanPolicy {
    fn default() -> Self {
        Self {
            max_rate_percent: dec!(50),
            min_term: 1,
            max_term: 240,
        }
    }
}

/// rental request intake rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RequestPolicy {
    /// accept pickup dates before today (back-office imports)
    pub allow_past_pickup: bool,
}

impl EngineConfig {
    /// parse from json, missing fields take their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json).map_err(|e| {
            WorkflowError::invalid_argument(format!("malformed engine config: {}", e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.renewal.period_months == 0 {
            return Err(WorkflowError::invalid_argument(
                "renewal period must be at least one month",
            ));
        }
        if self.loans.max_rate_percent < Decimal::ZERO {
            return Err(WorkflowError::invalid_argument(
                "maximum loan rate cannot be negative",
            ));
        }
        if self.loans.min_term == 0 || self.loans.min_term > self.loans.max_term {
            return Err(WorkflowError::invalid_argument(format!(
                "loan term bounds are inconsistent: {}..={}",
                self.loans.min_term, self.loans.max_term
            )));
        }
        Ok(())
    }
}
