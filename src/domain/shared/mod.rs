//! Shared Domain Types
//!
//! Value objects and errors shared across the order-management bounded
//! context and its collaborators.

pub mod errors;
pub mod value_objects;

pub use errors::DomainError;
pub use value_objects::{
    BatchId, CorrelationId, MessageId, OrderId, Price, ProcessingId, Quantity, Symbol,
    Timestamp, UserId, WorkerId,
};
