//! Generic domain errors shared by value objects.
//!
//! These are independent of infrastructure concerns and of the richer,
//! use-case-facing [`crate::error::OmsError`] taxonomy built on top of them.

use std::fmt;

/// Domain-level errors raised while constructing or validating value objects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Invalid value for a field.
    InvalidValue {
        /// Field name.
        field: String,
        /// Error message.
        message: String,
    },

    /// Aggregate invariant violated.
    InvariantViolation {
        /// Aggregate type.
        aggregate: String,
        /// Invariant that was violated.
        invariant: String,
        /// Current state description.
        state: String,
    },
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidValue { field, message } => {
                write!(f, "invalid value for '{field}': {message}")
            }
            Self::InvariantViolation {
                aggregate,
                invariant,
                state,
            } => {
                write!(
                    f,
                    "invariant violation in {aggregate}: {invariant} (state: {state})"
                )
            }
        }
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_invalid_value_display() {
        let err = DomainError::InvalidValue {
            field: "quantity".to_string(),
            message: "must be positive".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("quantity"));
        assert!(msg.contains("positive"));
    }

    #[test]
    fn domain_error_invariant_display() {
        let err = DomainError::InvariantViolation {
            aggregate: "Order".to_string(),
            invariant: "quantity > 0".to_string(),
            state: "quantity=-5".to_string(),
        };
        let msg = format!("{err}");
        assert!(msg.contains("quantity > 0"));
    }

    #[test]
    fn domain_error_is_std_error() {
        let err: Box<dyn std::error::Error> = Box::new(DomainError::InvalidValue {
            field: "test".to_string(),
            message: "test".to_string(),
        });
        assert!(!err.to_string().is_empty());
    }
}
