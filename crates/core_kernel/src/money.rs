//! Money types with precise decimal arithmetic
//!
//! The ledger bills in a single currency, so amounts carry no currency tag.
//! Unit prices are stored with exactly two fractional digits and at most
//! twelve digits overall, matching the `NUMERIC(12, 2)` column they live in.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, Sub};
use thiserror::Error;

/// Number of fractional digits kept for prices and amounts
pub const PRICE_DECIMAL_PLACES: u32 = 2;

/// Maximum number of digits (integer and fractional) in a unit price
pub const PRICE_MAX_DIGITS: u32 = 12;

/// Errors that can occur during money operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    #[error("Amount must be greater than zero, got {0}")]
    NonPositive(Decimal),

    #[error("Amount {value} has more than {max} decimal places")]
    TooManyDecimals { value: Decimal, max: u32 },

    #[error("Amount {value} has more than {max} digits")]
    TooManyDigits { value: Decimal, max: u32 },

    #[error("Overflow during calculation")]
    Overflow,
}

/// A positive price per liter with two decimal places
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct UnitPrice(Decimal);

impl UnitPrice {
    /// Validates and creates a unit price
    ///
    /// # Errors
    ///
    /// - `MoneyError::NonPositive` if the value is zero or negative
    /// - `MoneyError::TooManyDecimals` if finer than 0.01
    /// - `MoneyError::TooManyDigits` if it would not fit in twelve digits
    pub fn new(value: Decimal) -> Result<Self, MoneyError> {
        if value <= Decimal::ZERO {
            return Err(MoneyError::NonPositive(value));
        }

        if value.normalize().scale() > PRICE_DECIMAL_PLACES {
            return Err(MoneyError::TooManyDecimals {
                value,
                max: PRICE_DECIMAL_PLACES,
            });
        }

        let integer_limit = Decimal::from(10_i64.pow(PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES));
        if value.trunc() >= integer_limit {
            return Err(MoneyError::TooManyDigits {
                value,
                max: PRICE_MAX_DIGITS,
            });
        }

        let mut price = value;
        price.rescale(PRICE_DECIMAL_PLACES);
        Ok(Self(price))
    }

    /// Returns the price as a decimal
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Price of `liters` liters at this unit price
    pub fn times_liters(&self, liters: i64) -> Result<Money, MoneyError> {
        self.0
            .checked_mul(Decimal::from(liters))
            .map(Money::new)
            .ok_or(MoneyError::Overflow)
    }
}

impl TryFrom<Decimal> for UnitPrice {
    type Error = MoneyError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UnitPrice> for Decimal {
    fn from(price: UnitPrice) -> Decimal {
        price.0
    }
}

impl fmt::Display for UnitPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

/// A monetary amount in the ledger currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Creates a new amount, rounded to two decimal places
    pub fn new(amount: Decimal) -> Self {
        let mut amount = amount.round_dp(PRICE_DECIMAL_PLACES);
        amount.rescale(PRICE_DECIMAL_PLACES);
        Self(amount)
    }

    /// Zero amount
    pub fn zero() -> Self {
        Self::new(Decimal::ZERO)
    }

    /// Returns the amount
    pub fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if the amount is zero
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Checked addition
    pub fn checked_add(&self, other: &Money) -> Result<Money, MoneyError> {
        self.0
            .checked_add(other.0)
            .map(Money::new)
            .ok_or(MoneyError::Overflow)
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
