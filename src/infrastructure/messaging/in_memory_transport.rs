//! In-process `MessageTransportPort` adapter.
//!
//! Reproduces the AMQP-compatible queue/TTL/DLX/priority topology entirely
//! with `tokio` primitives: each declared queue is a priority-ordered
//! buffer; publishing a message onto a queue with a TTL spawns a timer
//! task that dead-letters the message to its configured target if it is
//! still sitting there (unconsumed) when the timer fires.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{
    queues, MessageTransportPort, QueueMessage, TransportError,
};

use super::queue_manager::{retry_ttl_for_attempt, ttl_for_queue};

/// DLX routing target for a queue whose TTL just expired. `orders.retry`
/// routes back to `orders.processing` (a reinjected retry); `orders.submit`,
/// `orders.processing`, and `orders.settlement` route to the dead-letter
/// queue. `orders.status` and `orders.dlq` have no DLX — an expired message
/// there is simply evicted (`orders.dlq` is manual-investigation only).
fn dlx_target(queue: &str) -> Option<&'static str> {
    match queue {
        q if q == queues::RETRY => Some(queues::PROCESSING),
        q if q == queues::SUBMIT || q == queues::PROCESSING || q == queues::SETTLEMENT => {
            Some(queues::DLQ)
        }
        _ => None,
    }
}

struct Envelope {
    id: u64,
    seq: u64,
    priority: u8,
    message: QueueMessage,
}

struct Inner {
    queues: Mutex<HashMap<&'static str, Vec<Envelope>>>,
    seq: AtomicU64,
    envelope_id: AtomicU64,
    declared: AtomicBool,
}

/// In-memory, in-process message transport.
#[derive(Clone)]
pub struct InMemoryTransport {
    inner: Arc<Inner>,
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTransport {
    /// Create a new transport with no topology declared yet.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                queues: Mutex::new(HashMap::new()),
                seq: AtomicU64::new(0),
                envelope_id: AtomicU64::new(0),
                declared: AtomicBool::new(false),
            }),
        }
    }

    fn resolve_queue_name(queue: &str) -> Option<&'static str> {
        super::queue_manager::all_queues()
            .into_iter()
            .find(|q| *q == queue)
    }

    async fn expire_envelope(inner: Arc<Inner>, origin: &'static str, envelope_id: u64) {
        let moved = {
            let mut queues = inner.queues.lock().await;
            let Some(bucket) = queues.get_mut(origin) else {
                return;
            };
            let position = bucket.iter().position(|e| e.id == envelope_id);
            position.map(|idx| bucket.remove(idx))
        };

        let Some(envelope) = moved else {
            return;
        };

        let Some(target) = dlx_target(origin) else {
            return;
        };

        let mut queues = inner.queues.lock().await;
        if let Some(bucket) = queues.get_mut(target) {
            bucket.push(Envelope {
                id: inner.envelope_id.fetch_add(1, Ordering::Relaxed),
                seq: inner.seq.fetch_add(1, Ordering::Relaxed),
                priority: envelope.priority,
                message: envelope.message,
            });
        }
    }
}

#[async_trait]
impl MessageTransportPort for InMemoryTransport {
    async fn declare_topology(&self) -> Result<(), TransportError> {
        let mut queues = self.inner.queues.lock().await;
        for name in super::queue_manager::all_queues() {
            queues.entry(name).or_default();
        }
        self.inner.declared.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, queue: &str, message: QueueMessage) -> Result<(), TransportError> {
        let name = Self::resolve_queue_name(queue).ok_or_else(|| TransportError::QueueNotDeclared {
            queue: queue.to_string(),
        })?;

        let priority = message.metadata().priority;
        let envelope_id = self.inner.envelope_id.fetch_add(1, Ordering::Relaxed);
        let seq = self.inner.seq.fetch_add(1, Ordering::Relaxed);
        let retry_attempt = message.metadata().retry_attempt;

        {
            let mut queues = self.inner.queues.lock().await;
            let bucket = queues
                .get_mut(name)
                .ok_or_else(|| TransportError::QueueNotDeclared {
                    queue: queue.to_string(),
                })?;
            bucket.push(Envelope {
                id: envelope_id,
                seq,
                priority,
                message,
            });
        }

        let ttl = if name == queues::RETRY {
            // `retry_attempt` on the message is already the post-increment
            // count (1 for the first retry); `retry_ttl_for_attempt` indexes
            // the backoff ladder from 0, so step back one position.
            Some(retry_ttl_for_attempt(retry_attempt.saturating_sub(1)))
        } else {
            ttl_for_queue(name)
        };

        if let Some(ttl) = ttl {
            let inner = Arc::clone(&self.inner);
            tokio::spawn(async move {
                tokio::time::sleep(ttl).await;
                Self::expire_envelope(inner, name, envelope_id).await;
            });
        }

        Ok(())
    }

    async fn consume(&self, queue: &str) -> Result<Option<QueueMessage>, TransportError> {
        let name = Self::resolve_queue_name(queue).ok_or_else(|| TransportError::QueueNotDeclared {
            queue: queue.to_string(),
        })?;

        let mut queues = self.inner.queues.lock().await;
        let bucket = queues
            .get_mut(name)
            .ok_or_else(|| TransportError::QueueNotDeclared {
                queue: queue.to_string(),
            })?;

        let best = bucket
            .iter()
            .enumerate()
            .max_by_key(|(_, e)| (e.priority, std::cmp::Reverse(e.seq)))
            .map(|(idx, _)| idx);

        Ok(best.map(|idx| bucket.remove(idx).message))
    }

    async fn queue_depth(&self, queue: &str) -> Result<usize, TransportError> {
        let name = Self::resolve_queue_name(queue).ok_or_else(|| TransportError::QueueNotDeclared {
            queue: queue.to_string(),
        })?;
        let queues = self.inner.queues.lock().await;
        Ok(queues.get(name).map_or(0, Vec::len))
    }

    async fn health(&self) -> bool {
        self.inner.declared.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{MessageMetadata, OrderMessage};
    use crate::domain::order_management::{OrderSide, OrderType};
    use crate::domain::shared::{CorrelationId, MessageId, OrderId, Quantity, Symbol, Timestamp, UserId};

    fn make_message(priority: u8) -> QueueMessage {
        QueueMessage::Order(OrderMessage {
            order_id: OrderId::generate(),
            user_id: UserId::new("u1"),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(1),
            price: None,
            stop_price: None,
            metadata: MessageMetadata {
                message_id: MessageId::generate(),
                correlation_id: CorrelationId::new("corr"),
                timestamp: Timestamp::now(),
                retry_attempt: 0,
                priority,
                source: "test".to_string(),
                message_type: "OrderMessage".to_string(),
                processing_stage: "submit".to_string(),
            },
        })
    }

    #[test]
    fn publish_to_undeclared_queue_fails() {
        tokio_test::block_on(async {
            let transport = InMemoryTransport::new();
            let result = transport.publish(queues::SUBMIT, make_message(5)).await;
            assert!(matches!(result, Err(TransportError::QueueNotDeclared { .. })));
        });
    }

    #[tokio::test]
    async fn declare_then_publish_and_consume() {
        let transport = InMemoryTransport::new();
        transport.declare_topology().await.unwrap();

        transport.publish(queues::SUBMIT, make_message(3)).await.unwrap();
        assert_eq!(transport.queue_depth(queues::SUBMIT).await.unwrap(), 1);

        let received = transport.consume(queues::SUBMIT).await.unwrap();
        assert!(received.is_some());
        assert_eq!(transport.queue_depth(queues::SUBMIT).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn consume_empty_queue_returns_none() {
        let transport = InMemoryTransport::new();
        transport.declare_topology().await.unwrap();
        assert!(transport.consume(queues::SUBMIT).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn higher_priority_dequeues_first() {
        let transport = InMemoryTransport::new();
        transport.declare_topology().await.unwrap();

        transport.publish(queues::SUBMIT, make_message(2)).await.unwrap();
        transport.publish(queues::SUBMIT, make_message(8)).await.unwrap();
        transport.publish(queues::SUBMIT, make_message(5)).await.unwrap();

        let first = transport.consume(queues::SUBMIT).await.unwrap().unwrap();
        assert_eq!(first.metadata().priority, 8);

        let second = transport.consume(queues::SUBMIT).await.unwrap().unwrap();
        assert_eq!(second.metadata().priority, 5);
    }

    #[tokio::test]
    async fn fifo_within_same_priority() {
        let transport = InMemoryTransport::new();
        transport.declare_topology().await.unwrap();

        let first_id = {
            let msg = make_message(5);
            let id = msg.metadata().message_id.clone();
            transport.publish(queues::SUBMIT, msg).await.unwrap();
            id
        };
        transport.publish(queues::SUBMIT, make_message(5)).await.unwrap();

        let dequeued = transport.consume(queues::SUBMIT).await.unwrap().unwrap();
        assert_eq!(dequeued.metadata().message_id, first_id);
    }

    #[tokio::test]
    async fn health_false_until_declared() {
        let transport = InMemoryTransport::new();
        assert!(!transport.health().await);
        transport.declare_topology().await.unwrap();
        assert!(transport.health().await);
    }
}
