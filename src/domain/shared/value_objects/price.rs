//! Price value object for order and market-data amounts.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};

use crate::domain::shared::DomainError;

/// A real-valued price (order limit/stop price, market quote, execution
/// price). Represented as a `Decimal` for exact comparisons — float
/// arithmetic has no place in an order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Create a new Price from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Price from an `f64`.
    ///
    /// # Panics
    ///
    /// Panics if the `f64` cannot be converted to `Decimal` (NaN/infinite).
    #[must_use]
    pub fn from_f64(amount: f64) -> Self {
        Self(Decimal::try_from(amount).expect("finite price"))
    }

    /// Zero price.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this price is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Round to 2 decimal places.
    #[must_use]
    pub fn round(&self) -> Self {
        Self(self.0.round_dp(2))
    }

    /// Validate a price supplied for order submission: must be positive and
    /// within a sane ceiling.
    ///
    /// # Errors
    ///
    /// Returns an error if the price is zero/negative or implausibly large.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if !self.is_positive() {
            return Err(DomainError::InvalidValue {
                field: "price".to_string(),
                message: "order price must be positive".to_string(),
            });
        }
        let max = Decimal::new(10_000_000, 0);
        if self.0 > max {
            return Err(DomainError::InvalidValue {
                field: "price".to_string(),
                message: format!("order price exceeds maximum: {max}"),
            });
        }
        Ok(())
    }

    /// Relative difference `|self - other| / other`, as a fraction (0.10 =
    /// 10%). Used for price-band and drift checks throughout the submit and
    /// process use-cases.
    ///
    /// Returns `Decimal::ZERO` if `other` is zero, to avoid a division
    /// panic; callers validate market prices are positive before reaching
    /// here.
    #[must_use]
    pub fn relative_difference(&self, other: Self) -> Decimal {
        if other.0.is_zero() {
            return Decimal::ZERO;
        }
        ((self.0 - other.0) / other.0).abs()
    }
}

impl Default for Price {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Price {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Price {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Price {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Price {
    type Output = Self;

    fn mul(self, rhs: Decimal) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl From<Decimal> for Price {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<Price> for Decimal {
    fn from(value: Price) -> Self {
        value.0
    }
}
