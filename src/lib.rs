// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::match_same_arms,
        clippy::needless_pass_by_value,
        clippy::needless_collect,
        clippy::option_if_let_else,
        clippy::default_trait_access,
        clippy::items_after_statements,
        clippy::or_fun_call
    )
)]

//! Order Management Subsystem - Rust Core Library
//!
//! The admission, queueing, and execution pipeline at the center of a
//! brokerage back-end monolith: submit -> enqueue -> process -> execute,
//! with idempotent admission, priority-weighted queueing, bounded-concurrency
//! workers, TTL-based retry with backoff, and dead-letter handling.
//!
//! # Architecture (Clean Architecture + DDD + Hexagonal)
//!
//! ## Layers (inside -> outside)
//!
//! - **Domain**: Core business logic (aggregates, value objects, domain events)
//!   - `order_management`: Order aggregate, status lifecycle, admission rules
//!
//! - **Application**: Use cases and orchestration
//!   - `ports`: Interfaces for external systems (`OrderRepository`,
//!     `MarketDataPort`, `MessageTransportPort`)
//!   - `use_cases`: `SubmitOrder`, `CancelOrder`, `ProcessOrder`, `OrderStatus`
//!   - `dto`: Data transfer objects for API boundaries
//!
//! - **Infrastructure**: Adapters (implementations)
//!   - `messaging`: Queue topology, producer/consumer, worker pool with
//!     auto-scaling and health monitoring
//!   - `marketdata`: HTTP-shaped and in-memory `MarketDataPort` adapters
//!   - `persistence`: Order repository (in-memory)
//!   - `http` / `grpc`: Thin driver adapters over the use cases above
//!
//! # Coverage
//!
//! Coverage threshold: 90% (Critical tier)

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Clean Architecture Layers
// =============================================================================

/// Domain layer - Core business logic with no external dependencies.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Layered YAML configuration with environment-variable interpolation.
pub mod config;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

/// Tagged, sum-typed error model shared across use cases and adapters.
pub mod error;

/// OpenTelemetry tracing setup for the binary entrypoint.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{load_config, Config, ConfigError};
pub use domain::order_management::{Order, OrderSide, OrderStatus, OrderType};
pub use domain::shared::{OrderId, Price, Quantity, Symbol, Timestamp, UserId};

pub use application::dto::{
    CancelOrderCommand, GetOrderStatusQuery, OrderHistoryPage, OrderHistoryQuery, OrderSortField,
    OrderView, SortDirection, SubmitOrderCommand, SubmitOrderResult,
};
pub use application::ports::{MarketDataPort, MessageTransportPort};
pub use application::use_cases::{CancelOrderUseCase, OrderStatusUseCase, ProcessOrderUseCase, SubmitOrderUseCase};

pub use error::{ErrorCode, OmsError};

pub use infrastructure::grpc::{create_order_management_service, OrderManagementServiceAdapter};
pub use infrastructure::http::{create_oms_router, OmsAppState};
pub use infrastructure::marketdata::{HttpMarketDataAdapter, InMemoryMarketDataAdapter};
pub use infrastructure::messaging::{Consumer, Producer, Worker, WorkerManager, WorkerManagerConfig};
pub use infrastructure::persistence::order_management_in_memory::InMemoryOrderRepository;
