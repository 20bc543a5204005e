//! Persistence Adapters
//!
//! Repository implementations.

pub mod order_management_in_memory;

pub use order_management_in_memory::InMemoryOrderRepository;

// A durable (PostgreSQL) adapter is out of scope; the in-memory repository
// is this crate's only shipped `OrderRepository` implementation.
