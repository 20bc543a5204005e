//! Order type (market, limit, stop-loss, stop-limit).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order type specifying execution behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Market order — execute at the current price.
    Market,
    /// Limit order — execute only at `price` or better.
    Limit,
    /// Stop-loss order — becomes a market order once `stop_price` triggers.
    StopLoss,
    /// Stop-limit order — becomes a limit order at `price` once `stop_price`
    /// triggers. Carries both fields (see `DESIGN.md` open question 2).
    StopLimit,
}

impl OrderType {
    /// Returns true if this order type requires a limit `price` field.
    #[must_use]
    pub const fn requires_limit_price(&self) -> bool {
        matches!(self, Self::Limit | Self::StopLimit)
    }

    /// Returns true if this order type requires a `stop_price` field.
    #[must_use]
    pub const fn requires_stop_price(&self) -> bool {
        matches!(self, Self::StopLoss | Self::StopLimit)
    }

    /// Returns true if this is a market order.
    #[must_use]
    pub const fn is_market(&self) -> bool {
        matches!(self, Self::Market)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Market => write!(f, "MARKET"),
            Self::Limit => write!(f, "LIMIT"),
            Self::StopLoss => write!(f, "STOP_LOSS"),
            Self::StopLimit => write!(f, "STOP_LIMIT"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_requires_limit_price() {
        assert!(!OrderType::Market.requires_limit_price());
        assert!(OrderType::Limit.requires_limit_price());
        assert!(!OrderType::StopLoss.requires_limit_price());
        assert!(OrderType::StopLimit.requires_limit_price());
    }

    #[test]
    fn order_type_requires_stop_price() {
        assert!(!OrderType::Market.requires_stop_price());
        assert!(!OrderType::Limit.requires_stop_price());
        assert!(OrderType::StopLoss.requires_stop_price());
        assert!(OrderType::StopLimit.requires_stop_price());
    }

    #[test]
    fn order_type_is_market() {
        assert!(OrderType::Market.is_market());
        assert!(!OrderType::Limit.is_market());
    }

    #[test]
    fn order_type_display() {
        assert_eq!(format!("{}", OrderType::Market), "MARKET");
        assert_eq!(format!("{}", OrderType::Limit), "LIMIT");
        assert_eq!(format!("{}", OrderType::StopLoss), "STOP_LOSS");
        assert_eq!(format!("{}", OrderType::StopLimit), "STOP_LIMIT");
    }

    #[test]
    fn order_type_serde() {
        let json = serde_json::to_string(&OrderType::StopLimit).unwrap();
        assert_eq!(json, "\"STOP_LIMIT\"");

        let parsed: OrderType = serde_json::from_str("\"MARKET\"").unwrap();
        assert_eq!(parsed, OrderType::Market);
    }

    #[test_case::test_case(OrderType::Market, false, false; "market")]
    #[test_case::test_case(OrderType::Limit, true, false; "limit")]
    #[test_case::test_case(OrderType::StopLoss, false, true; "stop_loss")]
    #[test_case::test_case(OrderType::StopLimit, true, true; "stop_limit")]
    fn order_type_field_requirements(order_type: OrderType, needs_limit: bool, needs_stop: bool) {
        assert_eq!(order_type.requires_limit_price(), needs_limit);
        assert_eq!(order_type.requires_stop_price(), needs_stop);
    }
}
