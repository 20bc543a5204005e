//! Tagged errors for the order aggregate and its repository contract.
//!
//! These are domain-level: no HTTP status or gRPC code lives here. The
//! application layer lifts them into [`crate::error::OmsError`] at the
//! use-case boundary.

use thiserror::Error;

use crate::domain::shared::value_objects::OrderId;
use crate::domain::order_management::value_objects::OrderStatus;

/// Errors raised constructing or transitioning an [`crate::domain::order_management::aggregate::Order`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OrderError {
    /// A constructor or mutator argument failed validation.
    #[error("invalid order parameter '{field}': {message}")]
    InvalidParameters {
        /// Offending field name.
        field: String,
        /// Human-readable explanation.
        message: String,
    },

    /// A mutator attempted a transition the state graph forbids.
    #[error("cannot transition order from {from} to {to}: {reason}")]
    InvalidStateTransition {
        /// Current status.
        from: OrderStatus,
        /// Attempted status.
        to: OrderStatus,
        /// Reason the transition is illegal.
        reason: String,
    },

    /// Cancel was attempted outside the permitted window/status.
    #[error("order {order_id} cannot be cancelled (status={status})")]
    CannotCancel {
        /// The order's id.
        order_id: OrderId,
        /// The order's current status.
        status: OrderStatus,
    },

    /// The order has already reached a terminal status and cannot execute.
    #[error("order {order_id} cannot be processed (status={status})")]
    CannotExecute {
        /// The order's id.
        order_id: OrderId,
        /// The order's current status.
        status: OrderStatus,
    },

    /// No order exists for the given id.
    #[error("order {order_id} not found")]
    NotFound {
        /// The order's id.
        order_id: OrderId,
    },

    /// `save` was called with an id already present in the repository.
    #[error("order {order_id} already exists")]
    DuplicateOrderId {
        /// The order's id.
        order_id: OrderId,
    },

    /// `update_status` observed a status other than the one the caller
    /// expected — another writer won the race (spec §4.2 linearizability).
    #[error("order {order_id} status conflict: expected {expected}, found {actual}")]
    StatusConflict {
        /// The order's id.
        order_id: OrderId,
        /// Status the caller's transition required as a precondition.
        expected: OrderStatus,
        /// Status actually stored.
        actual: OrderStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_parameters_display() {
        let err = OrderError::InvalidParameters {
            field: "quantity".to_string(),
            message: "must be positive".to_string(),
        };
        assert!(err.to_string().contains("quantity"));
    }

    #[test]
    fn cannot_cancel_display() {
        let err = OrderError::CannotCancel {
            order_id: OrderId::new("ord-1"),
            status: OrderStatus::Executed,
        };
        let msg = err.to_string();
        assert!(msg.contains("cannot be cancelled"));
        assert!(msg.contains("EXECUTED"));
    }

    #[test]
    fn status_conflict_display() {
        let err = OrderError::StatusConflict {
            order_id: OrderId::new("ord-1"),
            expected: OrderStatus::Pending,
            actual: OrderStatus::Cancelled,
        };
        let msg = err.to_string();
        assert!(msg.contains("conflict"));
    }
}
