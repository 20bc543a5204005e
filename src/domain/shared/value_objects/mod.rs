//! Shared Value Objects
//!
//! Immutable domain types used across the order-management bounded context.
//! Value objects are compared by value, not identity.

mod identifiers;
mod price;
mod quantity;
mod symbol;
mod timestamp;

pub use identifiers::{
    BatchId, CorrelationId, MessageId, OrderId, ProcessingId, UserId, WorkerId,
};
pub use price::Price;
pub use quantity::Quantity;
pub use symbol::Symbol;
pub use timestamp::Timestamp;
