//! Queue consumer.
//!
//! Runs one polling loop per queue that needs one. `orders.submit` and
//! `orders.processing` are drained by [`super::worker::WorkerManager`]'s
//! auto-scaled worker pool, which calls [`Consumer::dispatch`] directly;
//! `orders.status` gets its own standalone [`Consumer::run`] loop (spawned
//! by [`spawn_status_queue_consumer`]) since nothing else drains it.
//! `OrderMessage`s dispatch to the process-order use case and classify
//! failures into a retry (requeue with the next attempt index) or a
//! dead-letter (retry budget exhausted, or the failure is not retryable at
//! all); `OrderStatusUpdate`s dispatch to [`Consumer::handle_status_update`].
//! `orders.retry` is not polled directly: the transport's own per-message
//! TTL carries the delay and dead-letters straight back onto
//! `orders.processing` when it expires, so there is nothing for a consumer
//! loop to add there.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::application::ports::{queues, MarketDataPort, MessageTransportPort, OrderMessage, QueueMessage};
use crate::application::use_cases::ProcessOrderUseCase;
use crate::domain::order_management::repository::OrderRepository;

use super::queue_manager::MAX_RETRY_ATTEMPTS;
use super::producer::Producer;

/// How long a consumer sleeps between empty polls of a queue.
const EMPTY_POLL_BACKOFF: Duration = Duration::from_millis(50);

/// Classification of a processing failure, driving the retry-vs-dead-letter
/// decision. Built from [`crate::error::OmsError::is_retryable`] rather than
/// matching on error text: the OMS already tags every error with a
/// retryability bit at the point it's constructed, so there is no need to
/// re-derive the taxonomy from a rendered message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureClass {
    /// Transient: republish to `orders.retry` if attempts remain.
    Retryable,
    /// Permanent: dead-letter immediately regardless of attempt count.
    NonRetryable,
}

fn classify(error: &crate::error::OmsError) -> FailureClass {
    if error.is_retryable() {
        FailureClass::Retryable
    } else {
        FailureClass::NonRetryable
    }
}

/// Polls one or more queues and drives them through the process-order use
/// case.
pub struct Consumer<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    transport: Arc<dyn MessageTransportPort>,
    producer: Arc<Producer>,
    order_repo: Arc<O>,
    process_order: Arc<ProcessOrderUseCase<O, M>>,
    running: Arc<AtomicBool>,
}

impl<O, M> Consumer<O, M>
where
    O: OrderRepository,
    M: MarketDataPort,
{
    /// Build a new consumer over `transport`, dispatching through
    /// `process_order`.
    pub fn new(
        transport: Arc<dyn MessageTransportPort>,
        producer: Arc<Producer>,
        order_repo: Arc<O>,
        process_order: Arc<ProcessOrderUseCase<O, M>>,
    ) -> Self {
        Self {
            transport,
            producer,
            order_repo,
            process_order,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Run the polling loop for `queue` until [`Self::stop`] is called.
    /// Intended to be spawned as its own task per queue.
    pub async fn run(&self, queue: &'static str) {
        while self.running.load(Ordering::SeqCst) {
            match self.transport_consume(queue).await {
                Some(message) => {
                    self.dispatch(message).await;
                }
                None => tokio::time::sleep(EMPTY_POLL_BACKOFF).await,
            }
        }
    }

    /// Signal every running [`Self::run`] loop to stop after its current
    /// iteration. Idempotent: calling it more than once is a no-op.
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Pop the next message from `queue`, or `None` if it's empty or the
    /// transport errored. Exposed so [`super::worker::Worker`] can drive its
    /// own semaphore-bounded fan-out over the same transport.
    pub(crate) async fn transport_consume(&self, queue: &str) -> Option<QueueMessage> {
        self.transport.consume(queue).await.ok().flatten()
    }

    /// Dispatch one message through the appropriate handler: order messages
    /// go through the process-order use case, routing any failure to retry
    /// or dead-letter; status updates go through [`Self::handle_status_update`]
    /// (an `OrderStatusHandler` in spec terms). Returns `true` if the
    /// message was handled (executed, logged, or a dead-letter record is a
    /// terminal no-op), `false` if an order failed and was routed to retry
    /// or the DLQ.
    pub(crate) async fn dispatch(&self, message: QueueMessage) -> bool {
        let order_message = match &message {
            QueueMessage::Order(m) => m.clone(),
            QueueMessage::StatusUpdate(update) => {
                self.handle_status_update(update);
                return true;
            }
            QueueMessage::DeadLetter(_) => return true,
        };

        match self.process_order.execute(&order_message.order_id).await {
            Ok(_) => true,
            Err(error) => {
                self.handle_failure(message, order_message, error).await;
                false
            }
        }
    }

    /// Record a status-transition notification. This is the `orders.status`
    /// queue's `OrderStatusHandler`: the transition itself was already
    /// applied to the order aggregate by whichever use case produced it, so
    /// there is nothing left to mutate here — only an audit trail to emit
    /// for whatever downstream log sink or alerting pipeline consumes it.
    fn handle_status_update(&self, update: &crate::application::ports::OrderStatusUpdate) {
        tracing::info!(
            order_id = %update.order_id,
            user_id = %update.user_id,
            previous_status = ?update.previous_status,
            current_status = ?update.current_status,
            "order status transition"
        );
    }

    async fn handle_failure(
        &self,
        original: QueueMessage,
        order_message: OrderMessage,
        error: crate::error::OmsError,
    ) {
        let attempt = order_message.metadata.retry_attempt;

        let should_retry = classify(&error) == FailureClass::Retryable && attempt < MAX_RETRY_ATTEMPTS;

        if should_retry {
            if let Ok(Some(order)) = self.order_repo.find_by_id(&order_message.order_id).await {
                let _ = self.producer.publish_retry(&order, attempt + 1).await;
                return;
            }
        }

        let _ = self
            .producer
            .publish_dead_letter_record(original, error.to_string(), attempt + 1)
            .await;
    }
}

/// Spawn the `orders.status` listener as a background task, returning its
/// handle. `orders.submit`/`orders.processing` are drained by the
/// [`super::worker::WorkerManager`] pool instead of [`Consumer::run`]: that
/// pool already owns bounded concurrency and auto-scaling over those two
/// queues, so a second independent consumer loop over the same queues would
/// race it for messages rather than add a listener spec §4.9 asks for.
pub fn spawn_status_queue_consumer<O, M>(consumer: Arc<Consumer<O, M>>) -> tokio::task::JoinHandle<()>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    tokio::spawn(async move { consumer.run(queues::STATUS).await })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{AssetDetails, MarketDataError, MarketSnapshot, TradingHours};
    use crate::domain::order_management::aggregate::CreateOrderCommand;
    use crate::domain::order_management::value_objects::{OrderSide, OrderStatus, OrderType};
    use crate::domain::order_management::Order;
    use crate::domain::shared::{Price, Quantity, Symbol, Timestamp, UserId};
    use crate::infrastructure::messaging::in_memory_transport::InMemoryTransport;
    use crate::infrastructure::persistence::order_management_in_memory::InMemoryOrderRepository;
    use async_trait::async_trait;

    struct StubMarketData {
        open: bool,
        price: Price,
    }

    #[async_trait]
    impl MarketDataPort for StubMarketData {
        async fn get_snapshot(&self, _symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError> {
            Ok(MarketSnapshot {
                price: self.price,
                timestamp: Timestamp::now(),
                asset: AssetDetails {
                    tradeable: true,
                    min_order_size: Quantity::from_i64(1),
                    max_order_size: Quantity::from_i64(10_000),
                    price_step: Price::from_f64(0.01),
                },
                trading_hours: TradingHours { is_open: self.open },
            })
        }

        async fn validate_symbol(&self, _symbol: &Symbol) -> Result<bool, MarketDataError> {
            Ok(true)
        }
    }

    async fn harness(
        price: f64,
    ) -> (
        Arc<Consumer<InMemoryOrderRepository, StubMarketData>>,
        Arc<InMemoryTransport>,
        Arc<InMemoryOrderRepository>,
    ) {
        let transport = Arc::new(InMemoryTransport::new());
        transport.declare_topology().await.unwrap();
        let producer = Arc::new(Producer::new(transport.clone()));
        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let market_data = Arc::new(StubMarketData { open: true, price: Price::from_f64(price) });
        let process_order =
            Arc::new(ProcessOrderUseCase::new(order_repo.clone(), market_data, producer.clone()));
        let consumer = Arc::new(Consumer::new(
            transport.clone() as Arc<dyn MessageTransportPort>,
            producer,
            order_repo.clone(),
            process_order,
        ));
        (consumer, transport, order_repo)
    }

    async fn seed_market_order(repo: &InMemoryOrderRepository, submission_price: f64) -> crate::domain::shared::OrderId {
        let mut order = Order::new(CreateOrderCommand {
            user_id: UserId::new("u1"),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(10),
            price: None,
            stop_price: None,
        })
        .unwrap();
        order.set_market_data_context(Price::from_f64(submission_price), Timestamp::now());
        repo.save(&order).await.unwrap();
        order.id().clone()
    }

    #[tokio::test]
    async fn successful_processing_leaves_no_retry_or_dlq_trace() {
        let (consumer, transport, repo) = harness(150.0).await;
        let order_id = seed_market_order(&repo, 150.0).await;
        let producer = Producer::new(transport.clone());
        let order = repo.find_by_id(&order_id).await.unwrap().unwrap();
        producer.publish_submitted(&order, 0).await.unwrap();

        let message = transport.consume(queues::SUBMIT).await.unwrap().unwrap();
        consumer.dispatch(message).await;

        assert_eq!(transport.queue_depth(queues::RETRY).await.unwrap(), 0);
        assert_eq!(transport.queue_depth(queues::DLQ).await.unwrap(), 0);
        let order = repo.find_by_id(&order_id).await.unwrap().unwrap();
        assert_eq!(order.status(), OrderStatus::Executed);
    }

    #[tokio::test]
    async fn retryable_failure_requeues_with_incremented_attempt() {
        // Drift beyond tolerance surfaces as a business failure (not
        // retryable), so exercise the retry path through a market-data
        // outage instead: swap in a market data stub that errors.
        struct FlakyMarketData;
        #[async_trait]
        impl MarketDataPort for FlakyMarketData {
            async fn get_snapshot(&self, _symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError> {
                Err(MarketDataError::Unavailable { message: "down".to_string() })
            }
            async fn validate_symbol(&self, _symbol: &Symbol) -> Result<bool, MarketDataError> {
                Ok(true)
            }
        }

        let transport = Arc::new(InMemoryTransport::new());
        transport.declare_topology().await.unwrap();
        let producer = Arc::new(Producer::new(transport.clone()));
        let order_repo = Arc::new(InMemoryOrderRepository::new());
        let process_order = Arc::new(ProcessOrderUseCase::new(
            order_repo.clone(),
            Arc::new(FlakyMarketData),
            producer.clone(),
        ));
        let consumer = Consumer::new(
            transport.clone() as Arc<dyn MessageTransportPort>,
            producer.clone(),
            order_repo.clone(),
            process_order,
        );

        let order_id = seed_market_order(&order_repo, 150.0).await;
        let order = order_repo.find_by_id(&order_id).await.unwrap().unwrap();
        producer.publish_submitted(&order, 0).await.unwrap();

        let message = transport.consume(queues::SUBMIT).await.unwrap().unwrap();
        consumer.dispatch(message).await;

        assert_eq!(transport.queue_depth(queues::RETRY).await.unwrap(), 1);
        let requeued = transport.consume(queues::RETRY).await.unwrap().unwrap();
        assert_eq!(requeued.metadata().retry_attempt, 1);
    }

    #[tokio::test]
    async fn non_retryable_failure_goes_straight_to_dlq() {
        let (consumer, transport, repo) = harness(150.0).await;
        // Publish a submit message for an order id that was never saved:
        // the use case's repository lookup fails with OrderNotFound, which
        // is not in the retryable set.
        let unknown_order = Order::new(CreateOrderCommand {
            user_id: UserId::new("u1"),
            symbol: Symbol::new("AAPL"),
            side: OrderSide::Buy,
            order_type: OrderType::Market,
            quantity: Quantity::from_i64(10),
            price: None,
            stop_price: None,
        })
        .unwrap();
        let producer = Producer::new(transport.clone());
        producer.publish_submitted(&unknown_order, 0).await.unwrap();

        let message = transport.consume(queues::SUBMIT).await.unwrap().unwrap();
        consumer.dispatch(message).await;

        assert_eq!(transport.queue_depth(queues::DLQ).await.unwrap(), 1);
        assert_eq!(transport.queue_depth(queues::RETRY).await.unwrap(), 0);
        let _ = repo.find_by_id(unknown_order.id()).await.unwrap();
    }

    #[tokio::test]
    async fn status_update_messages_are_handled_without_reaching_process_order() {
        let (consumer, transport, repo) = harness(150.0).await;
        let order_id = seed_market_order(&repo, 150.0).await;
        let order = repo.find_by_id(&order_id).await.unwrap().unwrap();
        let producer = Producer::new(transport.clone());
        producer.publish_status_update(&order, OrderStatus::Pending).await.unwrap();

        let message = transport.consume(queues::STATUS).await.unwrap().unwrap();
        let handled = consumer.dispatch(message).await;

        assert!(handled);
        assert_eq!(transport.queue_depth(queues::RETRY).await.unwrap(), 0);
        assert_eq!(transport.queue_depth(queues::DLQ).await.unwrap(), 0);
    }
}
