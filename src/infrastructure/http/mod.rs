//! HTTP/REST API adapter.
//!
//! Inbound adapter implementing REST endpoints that delegate to application use cases.

mod oms_controller;

pub use oms_controller::{create_oms_router, OmsAppState};
