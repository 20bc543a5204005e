//! Order Management Bounded Context
//!
//! The core of the brokerage back end: the Order aggregate and the
//! submit -> enqueue -> process -> execute lifecycle it drives.

pub mod aggregate;
pub mod errors;
pub mod repository;
pub mod value_objects;

pub use aggregate::{CreateOrderCommand, Order, CANCEL_GRACE_PERIOD};
pub use errors::OrderError;
pub use repository::OrderRepository;
pub use value_objects::{MarketDataContext, OrderSide, OrderStatus, OrderType};
