//! Quantity value object for order sizes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Sub};

use crate::domain::shared::DomainError;

/// A share quantity for an order.
///
/// Represented as a `Decimal` rather than an integer so fractional-share
/// quantities are representable without a separate type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    /// Create a new Quantity from a Decimal.
    #[must_use]
    pub const fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    /// Create a Quantity from an integer.
    #[must_use]
    pub fn from_i64(amount: i64) -> Self {
        Self(Decimal::new(amount, 0))
    }

    /// Zero quantity.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Get the inner Decimal value.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Returns true if this quantity is positive.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Returns true if this quantity is zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0 == Decimal::ZERO
    }

    /// Validate quantity for order submission: must be strictly positive.
    /// Asset-specific min/max bounds are enforced separately against the
    /// market-data asset details (§4.3 step 4), not baked into the value
    /// object itself.
    ///
    /// # Errors
    ///
    /// Returns an error if the quantity is zero or negative.
    pub fn validate_for_order(&self) -> Result<(), DomainError> {
        if self.0 <= Decimal::ZERO {
            return Err(DomainError::InvalidValue {
                field: "quantity".to_string(),
                message: "order quantity must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Returns true if this quantity falls within `[min, max]` inclusive.
    #[must_use]
    pub fn within_bounds(&self, min: Self, max: Self) -> bool {
        self.0 >= min.0 && self.0 <= max.0
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract().is_zero() {
            write!(f, "{}", self.0.trunc())
        } else {
            write!(f, "{:.4}", self.0)
        }
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Quantity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl Add for Quantity {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Quantity {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<Decimal> for Quantity {
    type Output = Decimal;

    fn mul(self, rhs: Decimal) -> Self::Output {
        self.0 * rhs
    }
}

impl From<Decimal> for Quantity {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

impl From<i64> for Quantity {
    fn from(value: i64) -> Self {
        Self::from_i64(value)
    }
}

impl From<Quantity> for Decimal {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_new_and_display() {
        let q = Quantity::new(Decimal::new(100, 0));
        assert_eq!(format!("{q}"), "100");
    }

    #[test]
    fn quantity_with_decimals_display() {
        let q = Quantity::new(Decimal::new(1005, 1)); // 100.5
        assert_eq!(format!("{q}"), "100.5000");
    }

    #[test]
    fn quantity_from_i64() {
        let q = Quantity::from_i64(500);
        assert_eq!(q.amount(), Decimal::new(500, 0));
    }

    #[test]
    fn quantity_zero() {
        assert!(Quantity::ZERO.is_zero());
        assert!(!Quantity::ZERO.is_positive());
    }

    #[test]
    fn quantity_validate_for_order_zero() {
        assert!(Quantity::ZERO.validate_for_order().is_err());
    }

    #[test]
    fn quantity_validate_for_order_negative() {
        assert!(Quantity::from_i64(-10).validate_for_order().is_err());
    }

    #[test]
    fn quantity_validate_for_order_valid() {
        assert!(Quantity::from_i64(100).validate_for_order().is_ok());
    }

    #[test]
    fn quantity_within_bounds() {
        let q = Quantity::from_i64(50);
        assert!(q.within_bounds(Quantity::from_i64(1), Quantity::from_i64(100)));
        assert!(!q.within_bounds(Quantity::from_i64(51), Quantity::from_i64(100)));
        assert!(!q.within_bounds(Quantity::from_i64(1), Quantity::from_i64(49)));
    }

    #[test]
    fn quantity_arithmetic() {
        let a = Quantity::from_i64(100);
        let b = Quantity::from_i64(30);

        assert_eq!(a + b, Quantity::from_i64(130));
        assert_eq!(a - b, Quantity::from_i64(70));
    }

    #[test]
    fn quantity_multiply_by_decimal_yields_notional() {
        let q = Quantity::from_i64(100);
        let notional = q * Decimal::new(15050, 2);
        assert_eq!(notional, Decimal::new(1505000, 2));
    }

    #[test]
    fn quantity_ordering() {
        let a = Quantity::from_i64(100);
        let b = Quantity::from_i64(50);

        assert!(a > b);
        assert!(b < a);
    }

    #[test]
    fn quantity_serde_roundtrip() {
        let q = Quantity::from_i64(100);
        let json = serde_json::to_string(&q).unwrap();
        let parsed: Quantity = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, q);
    }

    #[test]
    fn quantity_default() {
        let q = Quantity::default();
        assert!(q.is_zero());
        assert_eq!(q, Quantity::ZERO);
    }
}
