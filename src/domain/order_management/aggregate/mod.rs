//! Order Aggregate
//!
//! The Order aggregate is the root entity for order lifecycle management.

mod order;

pub use order::{CreateOrderCommand, Order, CANCEL_GRACE_PERIOD};
