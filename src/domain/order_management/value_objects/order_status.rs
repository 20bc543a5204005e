//! Order status in the OMS lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order status.
///
/// Transition graph: `Pending -> {Processing, Cancelled, Failed}`,
/// `Processing -> {Executed, Failed, Cancelled}`; `Executed`, `Failed`, and
/// `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order admitted, not yet picked up by a worker.
    Pending,
    /// Order claimed by a worker and undergoing execution.
    Processing,
    /// Order executed successfully.
    Executed,
    /// Order failed validation, market conditions, or risk checks.
    Failed,
    /// Order cancelled by its owner.
    Cancelled,
}

impl OrderStatus {
    /// Returns true if this is one of the three terminal states.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Executed | Self::Failed | Self::Cancelled)
    }

    /// Returns true if a transition to `target` is permitted by the graph in
    /// spec §3 invariant 3.
    #[must_use]
    pub const fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Pending, Self::Processing)
                | (Self::Pending, Self::Cancelled)
                | (Self::Pending, Self::Failed)
                | (Self::Processing, Self::Executed)
                | (Self::Processing, Self::Failed)
                | (Self::Processing, Self::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Processing => write!(f, "PROCESSING"),
            Self::Executed => write!(f, "EXECUTED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_status_is_terminal() {
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
        assert!(OrderStatus::Executed.is_terminal());
        assert!(OrderStatus::Failed.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn pending_transitions() {
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Processing));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Cancelled));
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Failed));
        assert!(!OrderStatus::Pending.can_transition_to(OrderStatus::Executed));
    }

    #[test]
    fn processing_transitions() {
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Executed));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Failed));
        assert!(OrderStatus::Processing.can_transition_to(OrderStatus::Cancelled));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn terminal_states_have_no_outgoing_transitions() {
        for terminal in [
            OrderStatus::Executed,
            OrderStatus::Failed,
            OrderStatus::Cancelled,
        ] {
            for target in [
                OrderStatus::Pending,
                OrderStatus::Processing,
                OrderStatus::Executed,
                OrderStatus::Failed,
                OrderStatus::Cancelled,
            ] {
                assert!(!terminal.can_transition_to(target));
            }
        }
    }

    #[test]
    fn order_status_display() {
        assert_eq!(format!("{}", OrderStatus::Pending), "PENDING");
        assert_eq!(format!("{}", OrderStatus::Executed), "EXECUTED");
    }

    #[test]
    fn order_status_serde() {
        let json = serde_json::to_string(&OrderStatus::Processing).unwrap();
        assert_eq!(json, "\"PROCESSING\"");

        let parsed: OrderStatus = serde_json::from_str("\"EXECUTED\"").unwrap();
        assert_eq!(parsed, OrderStatus::Executed);
    }
}
