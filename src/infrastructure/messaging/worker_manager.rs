//! Worker manager: owns a pool of [`Worker`]s keyed by id, auto-scales it
//! against queue depth, and aggregates worker health into one pool-wide
//! status.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};

use crate::application::ports::{queues, MarketDataPort, MessageTransportPort};
use crate::domain::order_management::repository::OrderRepository;
use crate::domain::shared::WorkerId;

use super::consumer::Consumer;
use super::worker::{Worker, WorkerConfig, WorkerHealth};

/// Tunables for the pool's size bounds and auto-scaler thresholds.
#[derive(Debug, Clone, Copy)]
pub struct WorkerManagerConfig {
    /// Floor the pool never scales below.
    pub min_workers: usize,
    /// Ceiling the pool never scales above.
    pub max_workers: usize,
    /// Workers started at pool creation.
    pub default_workers: usize,
    /// Whether the auto-scaler loop runs at all.
    pub auto_scaling_enabled: bool,
    /// `queueDepthRatio` above which the pool scales up by one.
    pub scale_up_threshold: f64,
    /// `queueDepthRatio` below which the pool scales down by one.
    pub scale_down_threshold: f64,
    /// Minimum time between consecutive scale-up operations.
    pub scale_up_cooldown: Duration,
    /// Minimum time between consecutive scale-down operations.
    pub scale_down_cooldown: Duration,
    /// Interval between auto-scaler evaluations.
    pub auto_scale_interval: Duration,
    /// Interval between pool-wide health-check evaluations.
    pub health_check_interval: Duration,
    /// Per-worker config used for every worker the pool creates.
    pub worker_config: WorkerConfig,
}

impl Default for WorkerManagerConfig {
    fn default() -> Self {
        Self {
            min_workers: 2,
            max_workers: 20,
            default_workers: 4,
            auto_scaling_enabled: true,
            scale_up_threshold: 0.8,
            scale_down_threshold: 0.2,
            scale_up_cooldown: Duration::from_secs(120),
            scale_down_cooldown: Duration::from_secs(300),
            auto_scale_interval: Duration::from_secs(15),
            health_check_interval: Duration::from_secs(30),
            worker_config: WorkerConfig::default(),
        }
    }
}

/// Aggregate health of the whole pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPoolHealth {
    /// At least `DefaultWorkers` running, none degraded or unhealthy.
    Healthy,
    /// Below `DefaultWorkers`, or a worker is degraded, but no worker is
    /// unhealthy and the pool is at or above `MinWorkers`.
    Degraded,
    /// A worker is unhealthy, or the pool has fallen below `MinWorkers`.
    Unhealthy,
}

const MAX_RECOVERY_ATTEMPTS: u32 = 3;
const RECOVERY_RETRY_DELAY: Duration = Duration::from_secs(30);

struct ManagedWorker<O, M>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    worker: Arc<Worker<O, M>>,
    handle: tokio::task::JoinHandle<()>,
    recovery_attempts: u32,
}

/// Owns a pool of workers, auto-scaling it against queue depth and
/// monitoring worker health.
pub struct WorkerManager<O, M>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    config: WorkerManagerConfig,
    transport: Arc<dyn MessageTransportPort>,
    consumer_factory: Arc<dyn Fn() -> Arc<Consumer<O, M>> + Send + Sync>,
    workers: RwLock<HashMap<WorkerId, ManagedWorker<O, M>>>,
    next_worker_seq: std::sync::atomic::AtomicU64,
    running: Arc<AtomicBool>,
    scale_lock: Mutex<()>,
    last_scale_up: Mutex<Option<std::time::Instant>>,
    last_scale_down: Mutex<Option<std::time::Instant>>,
}

impl<O, M> WorkerManager<O, M>
where
    O: OrderRepository + 'static,
    M: MarketDataPort + 'static,
{
    /// Build a manager that creates new workers via `consumer_factory`
    /// (invoked once per worker, so each gets its own [`Consumer`] sharing
    /// the same repository/market-data/transport underneath).
    pub fn new(
        config: WorkerManagerConfig,
        transport: Arc<dyn MessageTransportPort>,
        consumer_factory: Arc<dyn Fn() -> Arc<Consumer<O, M>> + Send + Sync>,
    ) -> Self {
        Self {
            config,
            transport,
            consumer_factory,
            workers: RwLock::new(HashMap::new()),
            next_worker_seq: std::sync::atomic::AtomicU64::new(0),
            running: Arc::new(AtomicBool::new(false)),
            scale_lock: Mutex::new(()),
            last_scale_up: Mutex::new(None),
            last_scale_down: Mutex::new(None),
        }
    }

    /// Start `DefaultWorkers` workers and, if enabled, the health-checker
    /// and auto-scaler background loops.
    pub async fn start(self: &Arc<Self>) {
        self.running.store(true, Ordering::SeqCst);
        for _ in 0..self.config.default_workers {
            self.spawn_worker().await;
        }

        let health_checker = Arc::clone(self);
        tokio::spawn(async move { health_checker.run_health_checker().await });

        if self.config.auto_scaling_enabled {
            let auto_scaler = Arc::clone(self);
            tokio::spawn(async move { auto_scaler.run_auto_scaler().await });
        }
    }

    /// Stop every worker, waiting up to its `shutdown_timeout` each.
    /// Idempotent: a second call observes an empty worker map and returns
    /// immediately.
    pub async fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        let mut workers = self.workers.write().await;
        for (_, managed) in workers.drain() {
            managed.worker.shutdown().await;
            managed.handle.abort();
        }
    }

    /// Number of workers currently in the pool.
    pub async fn worker_count(&self) -> usize {
        self.workers.read().await.len()
    }

    /// Aggregate health across all workers, per the manager's rollup rule:
    /// unhealthy if any worker is unhealthy or the pool is below
    /// `MinWorkers`; degraded if any worker is degraded or the pool is
    /// below `DefaultWorkers`; healthy otherwise.
    pub async fn health_status(&self) -> WorkerPoolHealth {
        let workers = self.workers.read().await;
        let count = workers.len();

        let mut any_unhealthy = false;
        let mut any_degraded = false;
        for managed in workers.values() {
            match managed.worker.health().await {
                WorkerHealth::Unhealthy => any_unhealthy = true,
                WorkerHealth::Degraded => any_degraded = true,
                WorkerHealth::Healthy | WorkerHealth::Unknown | WorkerHealth::Stopped => {}
            }
        }

        if any_unhealthy || count < self.config.min_workers {
            WorkerPoolHealth::Unhealthy
        } else if any_degraded || count < self.config.default_workers {
            WorkerPoolHealth::Degraded
        } else {
            WorkerPoolHealth::Healthy
        }
    }

    /// Add `count` workers, bounded by `MaxWorkers`. Returns the number
    /// actually started.
    pub async fn scale_up(self: &Arc<Self>, count: usize) -> usize {
        let _guard = self.scale_lock.lock().await;
        let current = self.workers.read().await.len();
        let room = self.config.max_workers.saturating_sub(current);
        let to_start = count.min(room);
        for _ in 0..to_start {
            self.spawn_worker().await;
        }
        *self.last_scale_up.lock().await = Some(std::time::Instant::now());
        to_start
    }

    /// Remove `count` workers, bounded by `MinWorkers`, preferring
    /// `Unhealthy` candidates, then `Degraded`, then `Healthy`. Returns the
    /// number actually removed.
    pub async fn scale_down(&self, count: usize) -> usize {
        let _guard = self.scale_lock.lock().await;
        let mut workers = self.workers.write().await;
        let current = workers.len();
        let floor = self.config.min_workers;
        let to_remove = count.min(current.saturating_sub(floor));
        if to_remove == 0 {
            return 0;
        }

        let mut ranked: Vec<(WorkerId, WorkerHealth)> = Vec::with_capacity(workers.len());
        for (id, managed) in workers.iter() {
            ranked.push((id.clone(), managed.worker.health().await));
        }
        ranked.sort_by_key(|(_, health)| removal_rank(*health));

        for (id, _) in ranked.into_iter().take(to_remove) {
            if let Some(managed) = workers.remove(&id) {
                managed.worker.shutdown().await;
                managed.handle.abort();
            }
        }

        *self.last_scale_down.lock().await = Some(std::time::Instant::now());
        to_remove
    }

    async fn spawn_worker(&self) {
        let id = WorkerId::new(format!(
            "worker-{}",
            self.next_worker_seq.fetch_add(1, Ordering::Relaxed)
        ));
        let consumer = (self.consumer_factory)();
        let worker = Arc::new(Worker::new(id.clone(), self.config.worker_config, consumer));
        let handle = tokio::spawn(Arc::clone(&worker).run());
        self.workers.write().await.insert(id, ManagedWorker { worker, handle, recovery_attempts: 0 });
    }

    async fn run_health_checker(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.health_check_interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            self.recover_unhealthy_workers().await;
        }
    }

    async fn recover_unhealthy_workers(&self) {
        let unhealthy_ids: Vec<WorkerId> = {
            let workers = self.workers.read().await;
            let mut ids = Vec::new();
            for (id, managed) in workers.iter() {
                if managed.worker.health().await == WorkerHealth::Unhealthy {
                    ids.push(id.clone());
                }
            }
            ids
        };

        for id in unhealthy_ids {
            let attempts = {
                let mut workers = self.workers.write().await;
                match workers.get_mut(&id) {
                    Some(managed) => {
                        managed.recovery_attempts += 1;
                        managed.recovery_attempts
                    }
                    None => continue,
                }
            };

            if attempts > MAX_RECOVERY_ATTEMPTS {
                let mut workers = self.workers.write().await;
                if let Some(managed) = workers.remove(&id) {
                    managed.worker.shutdown().await;
                    managed.handle.abort();
                }
                continue;
            }

            tokio::time::sleep(RECOVERY_RETRY_DELAY).await;
            let recovered = {
                let workers = self.workers.read().await;
                match workers.get(&id) {
                    Some(managed) => managed.worker.health().await != WorkerHealth::Unhealthy,
                    None => true,
                }
            };
            if recovered {
                if let Some(managed) = self.workers.write().await.get_mut(&id) {
                    managed.recovery_attempts = 0;
                }
            }
        }
    }

    async fn run_auto_scaler(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.config.auto_scale_interval);
        while self.running.load(Ordering::SeqCst) {
            ticker.tick().await;
            self.evaluate_auto_scale().await;
        }
    }

    async fn evaluate_auto_scale(self: &Arc<Self>) {
        let active = self.workers.read().await.len();
        if active == 0 {
            return;
        }

        let queue_depth = match self.transport.queue_depth(queues::PROCESSING).await {
            Ok(depth) => depth,
            Err(_) => return,
        };

        let ratio = queue_depth as f64 / (active as f64 * 10.0);

        if ratio > self.config.scale_up_threshold {
            if self.cooldown_elapsed(&self.last_scale_up, self.config.scale_up_cooldown).await {
                self.scale_up(1).await;
            }
        } else if ratio < self.config.scale_down_threshold
            && self.cooldown_elapsed(&self.last_scale_down, self.config.scale_down_cooldown).await
        {
            self.scale_down(1).await;
        }
    }

    async fn cooldown_elapsed(&self, last: &Mutex<Option<std::time::Instant>>, cooldown: Duration) -> bool {
        match *last.lock().await {
            Some(instant) => instant.elapsed() >= cooldown,
            None => true,
        }
    }
}

fn removal_rank(health: WorkerHealth) -> u8 {
    match health {
        WorkerHealth::Unhealthy => 0,
        WorkerHealth::Degraded => 1,
        WorkerHealth::Unknown | WorkerHealth::Stopped => 2,
        WorkerHealth::Healthy => 3,
    }
}
