//! Producer: builds and publishes `OrderMessage` / `OrderStatusUpdate`
//! envelopes onto the transport.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::application::ports::{
    calculate_order_priority, queues, DeadLetterRecord, MessageMetadata, MessageTransportPort, OrderMessage,
    OrderStatusUpdate, QueueMessage, TransportError,
};
use crate::domain::order_management::{Order, OrderStatus};
use crate::domain::shared::{CorrelationId, MessageId, Timestamp};

/// Publishes order lifecycle messages to the transport.
pub struct Producer {
    transport: Arc<dyn MessageTransportPort>,
}

impl Producer {
    /// Create a new producer over `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn MessageTransportPort>) -> Self {
        Self { transport }
    }

    fn next_message_id(message_type: &str, order_id: &str) -> MessageId {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        MessageId::new(format!("{message_type}_{order_id}_{nanos}"))
    }

    /// Publish a newly-admitted order to `orders.submit`, carrying the
    /// priority the submit use case assigns it.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the publish.
    pub async fn publish_submitted(&self, order: &Order, retry_attempt: u32) -> Result<(), TransportError> {
        self.publish_order(order, queues::SUBMIT, "submit", retry_attempt)
            .await
    }

    /// Re-publish an order onto `orders.retry`, carrying the next retry
    /// attempt index. The transport's TTL for that attempt drives the
    /// delay before it is dead-lettered back to `orders.processing`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the publish.
    pub async fn publish_retry(&self, order: &Order, retry_attempt: u32) -> Result<(), TransportError> {
        self.publish_order(order, queues::RETRY, "retry", retry_attempt)
            .await
    }

    /// Dead-letter an order directly, bypassing the retry queue (used when
    /// a failure is classified non-retryable).
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the publish.
    pub async fn publish_dead_letter(&self, order: &Order, retry_attempt: u32) -> Result<(), TransportError> {
        self.publish_order(order, queues::DLQ, "dead_letter", retry_attempt)
            .await
    }

    async fn publish_order(
        &self,
        order: &Order,
        queue: &str,
        stage: &str,
        retry_attempt: u32,
    ) -> Result<(), TransportError> {
        let priority = calculate_order_priority(order.order_type(), order.calculate_order_value());

        let message = QueueMessage::Order(OrderMessage {
            order_id: order.id().clone(),
            user_id: order.user_id().clone(),
            symbol: order.symbol().clone(),
            side: order.side(),
            order_type: order.order_type(),
            quantity: order.quantity(),
            price: order.price(),
            stop_price: order.stop_price(),
            metadata: MessageMetadata {
                message_id: Self::next_message_id("order", order.id().as_str()),
                correlation_id: CorrelationId::new(order.id().as_str()),
                timestamp: Timestamp::now(),
                retry_attempt,
                priority,
                source: "producer".to_string(),
                message_type: "OrderMessage".to_string(),
                processing_stage: stage.to_string(),
            },
        });

        self.transport.publish(queue, message).await
    }

    /// Wrap `original` with the reason it exhausted retries (or failed
    /// non-retryably) and publish it to `orders.dlq` for manual
    /// investigation.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the publish.
    pub async fn publish_dead_letter_record(
        &self,
        original: QueueMessage,
        processing_error: impl Into<String>,
        retry_attempts: u32,
    ) -> Result<(), TransportError> {
        let original_message_id = original.metadata().message_id.clone();
        let message = QueueMessage::DeadLetter(DeadLetterRecord {
            original: Box::new(original),
            processing_error: processing_error.into(),
            failed_at: Timestamp::now(),
            original_message_id: original_message_id.clone(),
            retry_attempts,
            metadata: MessageMetadata {
                message_id: Self::next_message_id("dead_letter", original_message_id.as_str()),
                correlation_id: CorrelationId::new(original_message_id.as_str()),
                timestamp: Timestamp::now(),
                retry_attempt: retry_attempts,
                priority: 5,
                source: "producer".to_string(),
                message_type: "DeadLetterRecord".to_string(),
                processing_stage: "dead_letter".to_string(),
            },
        });

        self.transport.publish(queues::DLQ, message).await
    }

    /// Publish a status-update notification at priority 8, ahead of
    /// regular processing traffic.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the publish.
    pub async fn publish_status_update(
        &self,
        order: &Order,
        previous_status: OrderStatus,
    ) -> Result<(), TransportError> {
        let message = QueueMessage::StatusUpdate(OrderStatusUpdate {
            order_id: order.id().clone(),
            user_id: order.user_id().clone(),
            previous_status,
            current_status: order.status(),
            updated_at: order.updated_at(),
            executed_at: order.executed_at(),
            execution_price: order.execution_price(),
            metadata: MessageMetadata {
                message_id: Self::next_message_id("status", order.id().as_str()),
                correlation_id: CorrelationId::new(order.id().as_str()),
                timestamp: Timestamp::now(),
                retry_attempt: 0,
                priority: 8,
                source: "producer".to_string(),
                message_type: "OrderStatusUpdate".to_string(),
                processing_stage: "status".to_string(),
            },
        });

        self.transport.publish(queues::STATUS, message).await
    }
}
