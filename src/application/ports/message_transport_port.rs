//! Message Transport Port (Driven Port)
//!
//! Interface for the abstract, AMQP-compatible message broker the OMS
//! publishes order and status-update messages through. This is a secondary
//! port: the shipped adapter reproduces the queue/TTL/DLX/priority topology
//! in-process with `tokio` primitives rather than linking a broker client
//! (see `infrastructure::messaging::in_memory_transport`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::shared::{CorrelationId, MessageId, OrderId, Price, Quantity, Symbol, Timestamp, UserId};
use crate::domain::order_management::{OrderSide, OrderStatus, OrderType};

/// Durable queue names. All six queues are durable, non-exclusive, and
/// non-auto-delete.
pub mod queues {
    /// New orders awaiting their first processing attempt.
    pub const SUBMIT: &str = "orders.submit";
    /// Orders claimed by a worker for execution.
    pub const PROCESSING: &str = "orders.processing";
    /// Orders that executed and are awaiting settlement (out of scope
    /// beyond routing — no settlement logic runs against this queue).
    pub const SETTLEMENT: &str = "orders.settlement";
    /// Status-update (priority) messages.
    pub const STATUS: &str = "orders.status";
    /// TTL-delayed retry holding queue.
    pub const RETRY: &str = "orders.retry";
    /// Terminal destination for non-retryable or retry-exhausted messages.
    pub const DLQ: &str = "orders.dlq";
}

/// Per-message envelope metadata, carried alongside every payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageMetadata {
    /// Unique id for this message instance.
    pub message_id: MessageId,
    /// Correlates a chain of messages back to one order.
    pub correlation_id: CorrelationId,
    /// Time the message was produced.
    pub timestamp: Timestamp,
    /// Retry attempt index (0 for the first attempt).
    pub retry_attempt: u32,
    /// Dequeue priority, 0-9, higher dequeues first within a queue.
    pub priority: u8,
    /// Producing component's name, for tracing.
    pub source: String,
    /// Discriminates `OrderMessage` from `OrderStatusUpdate` payloads.
    pub message_type: String,
    /// Pipeline stage this message represents (e.g. "submit", "retry").
    pub processing_stage: String,
}

/// Full projection of order fields carried on `orders.submit` /
/// `orders.processing` / `orders.retry` messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderMessage {
    /// Order id.
    pub order_id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Symbol.
    pub symbol: Symbol,
    /// Side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Quantity.
    pub quantity: Quantity,
    /// Limit price, if any.
    pub price: Option<Price>,
    /// Stop-trigger price, if any.
    pub stop_price: Option<Price>,
    /// Envelope metadata.
    pub metadata: MessageMetadata,
}

/// Status-transition notification carried on `orders.status`, published at
/// priority 8 so it overtakes in-flight normal processing traffic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderStatusUpdate {
    /// Order id.
    pub order_id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Status before this transition.
    pub previous_status: OrderStatus,
    /// Status after this transition.
    pub current_status: OrderStatus,
    /// When the transition was recorded.
    pub updated_at: Timestamp,
    /// Execution time, if the transition was to `Executed`.
    pub executed_at: Option<Timestamp>,
    /// Execution price, if the transition was to `Executed`.
    pub execution_price: Option<Price>,
    /// Envelope metadata.
    pub metadata: MessageMetadata,
}

/// A message as delivered to a consumer: payload plus enough context to
/// acknowledge, requeue to retry, or dead-letter it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum QueueMessage {
    /// An `OrderMessage` payload.
    Order(OrderMessage),
    /// An `OrderStatusUpdate` payload.
    StatusUpdate(OrderStatusUpdate),
    /// A message that exhausted its retry budget or failed non-retryably,
    /// wrapped with processing context for manual investigation.
    DeadLetter(DeadLetterRecord),
}

impl QueueMessage {
    /// Get the envelope metadata, regardless of payload variant.
    #[must_use]
    pub fn metadata(&self) -> &MessageMetadata {
        match self {
            Self::Order(m) => &m.metadata,
            Self::StatusUpdate(m) => &m.metadata,
            Self::DeadLetter(d) => &d.metadata,
        }
    }
}

/// Wraps a message routed to `orders.dlq`, carrying why it ended up there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterRecord {
    /// The message as it existed at the point of failure.
    pub original: Box<QueueMessage>,
    /// Human-readable description of the failure that caused dead-lettering.
    pub processing_error: String,
    /// When the message was dead-lettered.
    pub failed_at: Timestamp,
    /// `message_id` of the original message, for correlation.
    pub original_message_id: MessageId,
    /// Number of processing attempts made before giving up.
    pub retry_attempts: u32,
    /// Envelope metadata for this dead-letter entry itself.
    pub metadata: MessageMetadata,
}

/// Transport error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The named queue has not been declared.
    #[error("queue not declared: {queue}")]
    QueueNotDeclared {
        /// The queue name.
        queue: String,
    },

    /// The broker connection is down or erroring. Retryable.
    #[error("broker unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// The message failed to serialize/deserialize.
    #[error("message codec error: {message}")]
    Codec {
        /// Error details.
        message: String,
    },
}

/// Port for the abstract message broker.
#[async_trait]
pub trait MessageTransportPort: Send + Sync {
    /// Declare the six durable queues and their TTL/DLX topology. Called
    /// once at startup; implementations should be idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Unavailable`] if the broker cannot be
    /// reached.
    async fn declare_topology(&self) -> Result<(), TransportError>;

    /// Publish `message` to `queue`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::QueueNotDeclared`] if `queue` was never
    /// declared, or [`TransportError::Unavailable`] for a transient broker
    /// failure.
    async fn publish(&self, queue: &str, message: QueueMessage) -> Result<(), TransportError>;

    /// Pop the next message from `queue` in priority order, or `None` if
    /// the queue is empty right now. Non-blocking; consumers poll this in
    /// a loop with a backoff sleep between empty polls.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::QueueNotDeclared`] if `queue` was never
    /// declared.
    async fn consume(&self, queue: &str) -> Result<Option<QueueMessage>, TransportError>;

    /// Current depth of `queue`, used by the auto-scaler's
    /// `queueDepthRatio` calculation.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::QueueNotDeclared`] if `queue` was never
    /// declared.
    async fn queue_depth(&self, queue: &str) -> Result<usize, TransportError>;

    /// True if the transport is reachable and its topology is declared.
    async fn health(&self) -> bool;
}

/// Assigns `OrderMessage` dequeue priority 0-9 (higher dequeues first).
///
/// Base 5; `Market` orders raise it to 8; `StopLoss`/`StopLimit` orders
/// raise it to 7; a notional value over 100,000 raises it to (at least) 7,
/// over 10,000 to (at least) 6. These are tiers, not additive bonuses — the
/// final priority is the highest tier the order qualifies for.
#[must_use]
pub fn calculate_order_priority(order_type: OrderType, notional: Price) -> u8 {
    let mut priority: u8 = 5;

    if matches!(order_type, OrderType::StopLoss | OrderType::StopLimit) {
        priority = priority.max(7);
    }
    if matches!(order_type, OrderType::Market) {
        priority = priority.max(8);
    }

    if notional.amount() > rust_decimal::Decimal::new(100_000, 0) {
        priority = priority.max(7);
    } else if notional.amount() > rust_decimal::Decimal::new(10_000, 0) {
        priority = priority.max(6);
    }

    priority.min(9)
}
