//! Monetary amounts in integer euro cents.
//!
//! Carry-over settlement must be bit-for-bit reproducible across repeated
//! replays, so every sum, cap comparison, and excess computation runs on an
//! `i64` count of cents. [`rust_decimal::Decimal`] only appears at the
//! presentation boundary: parsing admin input and rendering amounts.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Errors converting external decimal amounts into [`Money`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MoneyError {
    /// The amount does not fit into 64-bit cents.
    #[error("amount {0} does not fit into 64-bit cents")]
    OutOfRange(Decimal),

    /// A negative amount where only non-negative ones are meaningful.
    #[error("amount must not be negative, got {0}")]
    Negative(Decimal),
}

/// An amount of money as a whole number of euro cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// Parse a decimal euro amount, rounding half-up to whole cents.
    pub fn from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        let cents = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .ok_or(MoneyError::OutOfRange(amount))?
            .round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero);
        cents.to_i64().map(Money).ok_or(MoneyError::OutOfRange(amount))
    }

    /// Like [`Money::from_decimal`], but rejects negative amounts.
    ///
    /// Entry earnings and cap limits are non-negative by contract; this is
    /// the conversion to use for them.
    pub fn non_negative_from_decimal(amount: Decimal) -> Result<Self, MoneyError> {
        if amount < Decimal::ZERO {
            return Err(MoneyError::Negative(amount));
        }
        Self::from_decimal(amount)
    }

    /// The euro value, exact to the cent.
    pub fn to_decimal(self) -> Decimal {
        Decimal::new(self.0, 2)
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// The part of `self` above `cap`, or zero.
    pub fn excess_over(self, cap: Money) -> Money {
        Money((self.0 - cap.0).max(0))
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Money) {
        self.0 += rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, Add::add)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

// On the wire an amount is a decimal euro value, not a cent count.
impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Serialize::serialize(&self.to_decimal(), serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let amount = <Decimal as Deserialize>::deserialize(deserializer)?;
        Money::from_decimal(amount).map_err(serde::de::Error::custom)
    }
}
