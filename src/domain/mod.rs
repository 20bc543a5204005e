//! Domain Layer
//!
//! The innermost layer containing business logic with zero infrastructure dependencies.
//! This layer defines:
//!
//! - **Aggregates**: Consistency boundaries with invariants
//! - **Value Objects**: Immutable domain types with equality by value
//! - **Domain Services**: Stateless business logic
//! - **Repository Traits**: Persistence abstractions (implemented in adapters)
//!
//! # Bounded Contexts
//!
//! - [`order_management`]: Order lifecycle management (submit -> enqueue ->
//!   process -> execute)

pub mod order_management;
pub mod shared;
