use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul, Sub};
use std::str::FromStr;

/// Money type with 8 decimal places of internal precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Money = Money(Decimal::ZERO);
    pub const ONE: Money = Money(Decimal::ONE);

    /// create from decimal
    pub fn from_decimal(d: Decimal) -> Self {
        Money(d.round_dp(8))
    }

    /// create from string with exact parsing
    pub fn from_str_exact(s: &str) -> Result<Self, rust_decimal::Error> {
        Ok(Money(Decimal::from_str(s)?.round_dp(8)))
    }

    /// create from integer amount (reais, dollars, ...)
    pub fn from_major(amount: i64) -> Self {
        Money(Decimal::from(amount))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// round to specified decimal places
    pub fn round_dp(&self, dp: u32) -> Self {
        Money(self.0.round_dp(dp))
    }

    /// presentation value, rounded to cents
    pub fn to_cents(&self) -> Self {
        self.round_dp(2)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// strictly negative; a zero with a negative sign bit is not negative
    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    pub fn min(self, other: Self) -> Self {
        Money(self.0.min(other.0))
    }

    pub fn max(self, other: Self) -> Self {
        Money(self.0.max(other.0))
    }

    /// amount times a whole count (days, periods), None on overflow
    pub fn checked_times(&self, count: u32) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(count))
            .map(Money::from_decimal)
    }

    /// amount times a whole count, capped at the largest representable amount
    pub fn saturating_times(&self, count: u32) -> Self {
        Money::from_decimal(self.0.saturating_mul(Decimal::from(count)))
    }

    /// linear share: self * numerator / denominator.
    ///
    /// Zero when the denominator is zero, None on overflow.
    pub fn checked_prorate(&self, numerator: i64, denominator: i64) -> Option<Self> {
        if denominator == 0 {
            return Some(Money::ZERO);
        }
        self.0
            .checked_mul(Decimal::from(numerator))?
            .checked_div(Decimal::from(denominator))
            .map(Money::from_decimal)
    }

    /// share of `whole` expressed as a percentage with 2 decimals
    pub fn percentage_of(&self, whole: Money) -> Decimal {
        if whole.is_zero() {
            return Decimal::ZERO;
        }
        (self.0 / whole.0 * Decimal::from(100)).round_dp(2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Money {
    type Err = rust_decimal::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Money::from_str_exact(s)
    }
}

impl From<Decimal> for Money {
    fn from(d: Decimal) -> Self {
        Money::from_decimal(d)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money((self.0 + other.0).round_dp(8))
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 = (self.0 + other.0).round_dp(8);
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money((self.0 - other.0).round_dp(8))
    }
}

impl Mul<Decimal> for Money {
    type Output = Money;

    fn mul(self, other: Decimal) -> Money {
        Money((self.0 * other).round_dp(8))
    }
}

impl Div<Decimal> for Money {
    type Output = Money;

    fn div(self, other: Decimal) -> Money {
        Money((self.0 / other).round_dp(8))
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, x| acc + x)
    }
}

/// per-period interest rate stored as a fraction (0.01 == 1% per period)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Rate(Decimal);

impl Rate {
    pub const ZERO: Rate = Rate(Decimal::ZERO);

    /// create from a quoted percent figure (e.g., 1.5 for 1.5% per period)
    pub fn from_percent(p: Decimal) -> Self {
        Rate(p / Decimal::from(100))
    }

    /// create from whole percentage (e.g., 5 for 5%)
    pub fn from_percentage(p: u32) -> Self {
        Rate(Decimal::from(p) / Decimal::from(100))
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn as_percentage(&self) -> Decimal {
        self.0 * Decimal::from(100)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl fmt::Display for Rate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.as_percentage().normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_precision() {
        let m = Money::from_str_exact("100.123456789").unwrap();
        assert_eq!(m.to_string(), "100.12345679"); // rounded to 8 places
        assert_eq!(m.to_cents(), Money::from_str_exact("100.12").unwrap());
    }

    #[test]
    fn test_times_and_prorate() {
        let daily = Money::from_major(100);
        assert_eq!(daily.checked_times(10), Some(Money::from_major(1_000)));
        assert_eq!(daily.saturating_times(10), Money::from_major(1_000));

        let value = Money::from_major(1_000);
        assert_eq!(value.checked_prorate(3, 10), Some(Money::from_major(300)));
        assert_eq!(value.checked_prorate(5, 0), Some(Money::ZERO));
    }

    #[test]
    fn test_overflow_is_reported_not_panicked() {
        let huge = Money::from_decimal(Decimal::MAX);
        assert_eq!(huge.checked_times(2), None);
        assert_eq!(huge.checked_times(1), Some(huge));
        assert_eq!(huge.saturating_times(3), huge);
        assert_eq!(huge.checked_prorate(3, 1), None);
    }

    #[test]
    fn test_percentage_of() {
        let used = Money::from_major(250);
        assert_eq!(used.percentage_of(Money::from_major(1_000)), dec!(25));
        assert_eq!(used.percentage_of(Money::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_rate_from_percent() {
        let rate = Rate::from_percent(dec!(1.5));
        assert_eq!(rate.as_decimal(), dec!(0.015));
        assert_eq!(rate.to_string(), "1.5%");
        assert!(Rate::from_percent(dec!(-1)).is_negative());
    }

    #[test]
    fn test_negative_zero_is_not_negative() {
        let zero = Money::from_major(5) - Money::from_major(5);
        assert!(!zero.is_negative());
        assert!(zero.is_zero());
    }
}
