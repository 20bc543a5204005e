//! Worker: one logical processing unit bounding concurrent order execution,
//! reporting heartbeats, and tracking its own health.
//!
//! A worker owns three cooperative tasks: the processing loop itself (a
//! semaphore-bounded fan-out over `orders.processing`, each claim wrapped in
//! a per-order timeout), a heartbeat tick, and a periodic health check. All
//! three stop together when [`Worker::shutdown`] is called.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Semaphore};

use crate::application::ports::{queues, MarketDataPort};
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::shared::{Timestamp, WorkerId};

use super::consumer::Consumer;

/// Tunables for a single worker. Mirrors the fields the health check and
/// processing loop reason about.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Maximum orders this worker processes concurrently.
    pub max_concurrent_orders: usize,
    /// Per-order processing budget before the claim is abandoned.
    pub processing_timeout: Duration,
    /// Interval between heartbeat timestamp updates.
    pub heartbeat_interval: Duration,
    /// Maximum retry attempts before an order is dead-lettered (mirrors
    /// [`super::queue_manager::MAX_RETRY_ATTEMPTS`]; kept here too since a
    /// worker's health check reasons about it independent of the consumer).
    pub max_retries: u32,
    /// Base delay for local backoff calculations.
    pub retry_backoff_base: Duration,
    /// Interval between health-check evaluations.
    pub health_check_interval: Duration,
    /// Maximum time to wait for in-flight work to drain during shutdown.
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_orders: 10,
            processing_timeout: Duration::from_secs(30),
            heartbeat_interval: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(5),
            health_check_interval: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(60),
        }
    }
}

/// Worker health, reported by the periodic health-check task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerHealth {
    /// No health check has run yet.
    Unknown,
    /// Consumer running, error rate acceptable.
    Healthy,
    /// Running but the error rate has crossed the warning threshold.
    Degraded,
    /// Running but the error rate is unacceptable, or the consumer stopped
    /// unexpectedly.
    Unhealthy,
    /// Shut down deliberately.
    Stopped,
}

/// Error rate at or above this fraction of processed orders degrades a
/// worker's health from `Healthy`.
const ERROR_RATE_DEGRADED_THRESHOLD: f64 = 0.10;

/// Atomic counters snapshotted by the health check and exposed to callers.
#[derive(Default)]
struct Counters {
    processed: AtomicU64,
    failed: AtomicU64,
}

/// Point-in-time copy of a worker's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerMetrics {
    /// Orders claimed and completed (successfully or not) since start.
    pub processed: u64,
    /// Of those, how many ended in a non-`Executed` terminal status or
    /// infrastructure error.
    pub failed: u64,
}

/// A single worker instance.
pub struct Worker<O, M>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    id: WorkerId,
    config: WorkerConfig,
    consumer: Arc<Consumer<O, M>>,
    semaphore: Arc<Semaphore>,
    counters: Arc<Counters>,
    health: Arc<Mutex<WorkerHealth>>,
    last_heartbeat: Arc<Mutex<Timestamp>>,
    running: Arc<AtomicBool>,
}

impl<O, M> Worker<O, M>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    /// Build a new worker, identified by `id`, dispatching through
    /// `consumer`.
    pub fn new(id: WorkerId, config: WorkerConfig, consumer: Arc<Consumer<O, M>>) -> Self {
        Self {
            id,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_orders)),
            config,
            consumer,
            counters: Arc::new(Counters::default()),
            health: Arc::new(Mutex::new(WorkerHealth::Unknown)),
            last_heartbeat: Arc::new(Mutex::new(Timestamp::now())),
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    /// This worker's identifier.
    #[must_use]
    pub fn id(&self) -> &WorkerId {
        &self.id
    }

    /// Current health status.
    pub async fn health(&self) -> WorkerHealth {
        *self.health.lock().await
    }

    /// Snapshot of processing counters.
    pub fn metrics(&self) -> WorkerMetrics {
        WorkerMetrics {
            processed: self.counters.processed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }

    /// Run the worker's processing, heartbeat, and health-check tasks until
    /// [`Self::shutdown`] is called. Each claimed order's execution is
    /// wrapped in [`WorkerConfig::processing_timeout`]; a semaphore permit
    /// bounds how many run at once.
    pub async fn run(self: Arc<Self>) {
        let processing = tokio::spawn(self.clone().run_processing_loop());
        let heartbeat = tokio::spawn(self.clone().run_heartbeat_loop());
        let health_check = tokio::spawn(self.clone().run_health_check_loop());

        let _ = tokio::join!(processing, heartbeat, health_check);
    }

    async fn run_processing_loop(self: Arc<Self>) {
        while self.running.load(Ordering::SeqCst) {
            let Ok(permit) = Arc::clone(&self.semaphore).acquire_owned().await else {
                break;
            };

            let message = match self.consumer.transport_consume(queues::PROCESSING).await {
                Some(message) => Some(message),
                None => self.consumer.transport_consume(queues::SUBMIT).await,
            };

            match message {
                Some(message) => {
                    let worker = Arc::clone(&self);
                    tokio::spawn(async move {
                        let _permit = permit;
                        let outcome =
                            tokio::time::timeout(worker.config.processing_timeout, worker.consumer.dispatch(message))
                                .await;
                        worker.counters.processed.fetch_add(1, Ordering::Relaxed);
                        metrics::counter!("oms_worker_orders_processed_total", "worker_id" => worker.id.to_string())
                            .increment(1);
                        if !matches!(outcome, Ok(true)) {
                            worker.counters.failed.fetch_add(1, Ordering::Relaxed);
                            metrics::counter!("oms_worker_orders_failed_total", "worker_id" => worker.id.to_string())
                                .increment(1);
                        }
                    });
                }
                None => {
                    drop(permit);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
    }

    async fn run_heartbeat_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.heartbeat_interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            *self.last_heartbeat.lock().await = Timestamp::now();
        }
    }

    async fn run_health_check_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.health_check_interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            self.evaluate_health().await;
        }
    }

    async fn evaluate_health(&self) {
        let processed = self.counters.processed.load(Ordering::Relaxed);
        let failed = self.counters.failed.load(Ordering::Relaxed);

        let status = if processed == 0 {
            WorkerHealth::Healthy
        } else {
            let error_rate = failed as f64 / processed as f64;
            if error_rate >= ERROR_RATE_DEGRADED_THRESHOLD * 3.0 {
                WorkerHealth::Unhealthy
            } else if error_rate >= ERROR_RATE_DEGRADED_THRESHOLD {
                WorkerHealth::Degraded
            } else {
                WorkerHealth::Healthy
            }
        };

        *self.health.lock().await = status;

        let health_value = match status {
            WorkerHealth::Unknown => 0.0,
            WorkerHealth::Healthy => 1.0,
            WorkerHealth::Degraded => 2.0,
            WorkerHealth::Unhealthy => 3.0,
            WorkerHealth::Stopped => 4.0,
        };
        metrics::gauge!("oms_worker_health", "worker_id" => self.id.to_string()).set(health_value);
    }

    /// Stop all three tasks and mark the worker `Stopped`. Waits up to
    /// [`WorkerConfig::shutdown_timeout`] for in-flight permits to drain
    /// before returning regardless.
    pub async fn shutdown(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.consumer.stop();

        let _ = tokio::time::timeout(
            self.config.shutdown_timeout,
            self.semaphore.acquire_many(self.config.max_concurrent_orders as u32),
        )
        .await;

        *self.health.lock().await = WorkerHealth::Stopped;
    }
}
