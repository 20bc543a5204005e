//! gRPC Adapter (Driver Adapter)
//!
//! Tonic-based gRPC service that delegates to the order-management use
//! cases, mirroring the HTTP adapter one module over.

mod oms_service;

pub use oms_service::{create_order_management_service, OrderManagementServiceAdapter};

/// Generated protobuf/gRPC code for the order-management service.
#[allow(
    dead_code,
    missing_docs,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::unwrap_used,
    clippy::expect_used
)]
pub mod proto {
    pub mod oms {
        pub mod v1 {
            include!(concat!(env!("OUT_DIR"), "/oms.v1.rs"));
        }
    }
}
