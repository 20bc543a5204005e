//! Infrastructure Layer
//!
//! This module contains all adapters (implementations) for the ports defined
//! in the application layer.
//!
//! - **Driven Adapters (Outbound)**: Implement ports for external systems
//!   - `persistence/`: Order repository (in-memory)
//!   - `marketdata/`: Market-data adapters (HTTP-shaped stub, in-memory fake)
//!   - `messaging/`: Queue topology, producer/consumer, worker pool
//!
//! - **Driver Adapters (Inbound)**: Expose application to external world
//!   - `http/`: REST API controllers
//!   - `grpc/`: gRPC service implementations

pub mod grpc;
pub mod http;
pub mod marketdata;
pub mod messaging;
pub mod persistence;
