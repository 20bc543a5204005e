//! Messaging Adapter
//!
//! Reproduces the abstract broker's queue/TTL/DLX/priority topology
//! in-process, without linking an actual AMQP client:
//! - `queue_manager`: TTL table, retry ladder, and DLX routing constants.
//! - `in_memory_transport`: the [`crate::application::ports::MessageTransportPort`]
//!   implementation built on those constants.
//! - `producer`: builds and publishes envelopes for each pipeline stage.
//! - `consumer`: dispatches order messages to the process-order use case
//!   (classifying failures into retry or dead-letter) and status-update
//!   messages to an audit-log handler; drives a standalone loop over
//!   `orders.status` and is driven directly by the worker pool for
//!   `orders.submit` / `orders.processing`.
//! - `worker`: one semaphore-bounded processing unit with its own health and
//!   heartbeat tasks.
//! - `worker_manager`: owns a pool of workers, auto-scaling it against queue
//!   depth and monitoring worker health.

pub mod consumer;
pub mod in_memory_transport;
pub mod producer;
pub mod queue_manager;
pub mod worker;
pub mod worker_manager;

pub use consumer::{spawn_status_queue_consumer, Consumer};
pub use in_memory_transport::InMemoryTransport;
pub use producer::Producer;
pub use worker::{Worker, WorkerConfig, WorkerHealth, WorkerMetrics};
pub use worker_manager::{WorkerManager, WorkerManagerConfig, WorkerPoolHealth};
