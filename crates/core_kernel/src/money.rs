//! Fixed-point money for claim amounts and case fees
//!
//! Amounts are held as `rust_decimal::Decimal` rounded to two decimal places
//! (minor units), so fee and claim arithmetic never drifts the way plain
//! floating-point numbers do.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use std::str::FromStr;
use thiserror::Error;

/// Number of decimal places kept for every amount
pub const MONEY_SCALE: u32 = 2;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Overflow during calculation")]
    Overflow,
}

/// A monetary amount stored with two decimal places
///
/// Serialized transparently as the underlying decimal, so JSON payloads carry
/// a plain amount without any wrapper object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a new amount, rounding half-to-even to two decimal places
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointNearestEven))
    }

    /// Creates an amount from integer minor units (e.g., cents)
    pub fn from_minor(minor_units: i64) -> Self {
        Self(Decimal::new(minor_units, MONEY_SCALE))
    }

    /// Zero amount
    pub fn zero() -> Self {
        Self(Decimal::ZERO)
    }

    /// Returns the decimal amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns the amount in minor units
    pub fn to_minor(&self) -> Result<i64, MoneyError> {
        (self.0 * Decimal::ONE_HUNDRED)
            .trunc()
            .to_i64()
            .ok_or(MoneyError::Overflow)
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_sign_positive() && !self.0.is_zero()
    }

    /// Checked addition
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Checked subtraction
    pub fn checked_sub(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_sub(other.0)
            .map(Self::new)
            .ok_or(MoneyError::Overflow)
    }

    /// Rejects negative amounts; used for claim amounts and fee schedules
    pub fn non_negative(self, field: &str) -> Result<Money, MoneyError> {
        if self.is_negative() {
            return Err(MoneyError::InvalidAmount(format!(
                "{} must not be negative, got {}",
                field, self
            )));
        }
        Ok(self)
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Decimal {
        money.0
    }
}

impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Decimal::from_str(s.trim())
            .map(Self::new)
            .map_err(|_| MoneyError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0 + other.0)
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0 - other.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_money_rounds_to_cents() {
        assert_eq!(Money::new(dec!(100.125)).amount(), dec!(100.12));
        assert_eq!(Money::new(dec!(100.135)).amount(), dec!(100.14));
    }

    #[test]
    fn test_money_from_minor() {
        assert_eq!(Money::from_minor(10050).amount(), dec!(100.50));
    }

    #[test]
    fn test_float_drift_does_not_leak() {
        let total: Money = [dec!(0.1), dec!(0.2)].into_iter().map(Money::new).sum();
        assert_eq!(total, Money::new(dec!(0.3)));
    }

    #[test]
    fn test_non_negative_guard() {
        assert!(Money::new(dec!(-1)).non_negative("claimAmount").is_err());
        assert!(Money::zero().non_negative("claimAmount").is_ok());
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn minor_units_round_trip(minor in -1_000_000_000i64..1_000_000_000i64) {
            prop_assert_eq!(Money::from_minor(minor).to_minor().unwrap(), minor);
        }

        #[test]
        fn addition_is_associative(
            a in -1_000_000i64..1_000_000i64,
            b in -1_000_000i64..1_000_000i64,
            c in -1_000_000i64..1_000_000i64
        ) {
            let (ma, mb, mc) = (Money::from_minor(a), Money::from_minor(b), Money::from_minor(c));
            prop_assert_eq!((ma + mb) + mc, ma + (mb + mc));
        }
    }
}
