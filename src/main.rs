//! Order Management Subsystem Binary
//!
//! Starts the OMS HTTP and gRPC surfaces, the background worker pool that
//! drains `orders.submit`/`orders.processing`, and a standalone consumer
//! loop over `orders.status`.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin oms-engine
//! ```
//!
//! # Configuration
//!
//! Settings are loaded from a YAML file (see [`oms_engine::config`]) with
//! `${VAR}`/`${VAR:-default}` environment-variable interpolation. When no
//! file is found, built-in defaults apply.
//!
//! - `OMS_CONFIG_PATH`: path to the config file (default: `config.yaml`)
//! - `MARKET_DATA_URL`: overrides `market_data.url` from the config file.
//!   When both are unset, an in-memory fake seeded with a handful of
//!   symbols is used instead.
//! - `RUST_LOG`: log level (default: info)
//!
//! Prometheus metrics are exposed via `metrics-exporter-prometheus`'s
//! built-in HTTP listener (default `127.0.0.1:9000/metrics`).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use oms_engine::application::dto::{CancelOrderCommand, GetOrderStatusQuery, OrderHistoryQuery, SubmitOrderCommand};
use oms_engine::application::ports::{AssetDetails, MarketSnapshot, TradingHours};
use oms_engine::application::use_cases::{CancelOrderUseCase, OrderStatusUseCase, ProcessOrderUseCase, SubmitOrderUseCase};
use oms_engine::config::{self, Config};
use oms_engine::domain::shared::{Price, Quantity, Symbol, Timestamp};
use oms_engine::infrastructure::grpc::create_order_management_service;
use oms_engine::infrastructure::http::{create_oms_router, OmsAppState};
use oms_engine::infrastructure::marketdata::{HttpMarketDataAdapter, InMemoryMarketDataAdapter};
use oms_engine::infrastructure::messaging::{
    spawn_status_queue_consumer, Consumer, InMemoryTransport, Producer, WorkerManager, WorkerManagerConfig,
};
use oms_engine::infrastructure::persistence::order_management_in_memory::InMemoryOrderRepository;
use oms_engine::{MarketDataPort, MessageTransportPort};

/// Graceful shutdown timeout, mirrored by `WorkerManagerConfig`'s per-worker
/// shutdown budget.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

async fn seed_in_memory_market_data(adapter: &InMemoryMarketDataAdapter) {
    for symbol in ["AAPL", "MSFT", "GOOG", "TSLA", "SPY"] {
        adapter
            .seed(
                &Symbol::new(symbol),
                MarketSnapshot {
                    price: Price::from_f64(100.0),
                    timestamp: Timestamp::now(),
                    asset: AssetDetails {
                        tradeable: true,
                        min_order_size: Quantity::from_i64(1),
                        max_order_size: Quantity::from_i64(100_000),
                        price_step: Price::from_f64(0.01),
                    },
                    trading_hours: TradingHours { is_open: true },
                },
            )
            .await;
    }
}

#[tokio::main]
#[allow(clippy::too_many_lines)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }

    let _telemetry_guard = oms_engine::telemetry::init_telemetry();

    tracing::info!("Starting order management subsystem");

    let config_path = std::env::var("OMS_CONFIG_PATH").ok();
    let config = match config::load_config(config_path.as_deref()) {
        Ok(config) => config,
        Err(config::ConfigError::ReadError { .. }) => {
            tracing::info!("no config file found; using built-in defaults");
            Config::default()
        }
        Err(e) => {
            tracing::error!("failed to load config: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = metrics_exporter_prometheus::PrometheusBuilder::new().install() {
        tracing::warn!("failed to install Prometheus exporter: {e}");
    }

    let http_port = config.server.http_port;
    let grpc_port = config.server.grpc_port;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(1);

    let order_repo = Arc::new(InMemoryOrderRepository::new());

    let market_data_url = config.market_data.url.clone().or_else(|| std::env::var("MARKET_DATA_URL").ok());
    let market_data = match market_data_url {
        Some(url) => {
            tracing::info!(%url, "Using HTTP market-data adapter");
            match HttpMarketDataAdapter::new(url, config.market_data.timeout()) {
                Ok(adapter) => Either::Http(Arc::new(adapter)),
                Err(e) => {
                    tracing::error!("Failed to build market-data client: {e}");
                    std::process::exit(1);
                }
            }
        }
        None => {
            tracing::info!("MARKET_DATA_URL unset; using in-memory market-data fake");
            let adapter = InMemoryMarketDataAdapter::new();
            seed_in_memory_market_data(&adapter).await;
            Either::InMemory(Arc::new(adapter))
        }
    };

    match market_data {
        Either::Http(market_data) => run(order_repo, market_data, &config, http_port, grpc_port, shutdown_tx).await,
        Either::InMemory(market_data) => run(order_repo, market_data, &config, http_port, grpc_port, shutdown_tx).await,
    }
}

/// Disambiguates the two `MarketDataPort` implementations chosen at
/// startup, since `run` is generic over a single concrete type.
enum Either<H, I> {
    Http(H),
    InMemory(I),
}

async fn run<M>(
    order_repo: Arc<InMemoryOrderRepository>,
    market_data: Arc<M>,
    config: &Config,
    http_port: u16,
    grpc_port: u16,
    shutdown_tx: tokio::sync::broadcast::Sender<()>,
) -> Result<(), Box<dyn std::error::Error>>
where
    M: MarketDataPort + 'static,
{
    let transport = Arc::new(InMemoryTransport::new());
    transport.declare_topology().await?;
    let producer = Arc::new(Producer::new(transport.clone() as Arc<dyn MessageTransportPort>));

    let process_order = Arc::new(ProcessOrderUseCase::new(order_repo.clone(), market_data.clone(), producer.clone()));
    let submit_order = Arc::new(SubmitOrderUseCase::new(order_repo.clone(), market_data.clone(), producer.clone()));
    let cancel_order = Arc::new(CancelOrderUseCase::new(order_repo.clone(), producer.clone()));
    let order_status = Arc::new(OrderStatusUseCase::new(order_repo.clone(), market_data.clone()));

    let status_consumer = Arc::new(Consumer::new(
        transport.clone() as Arc<dyn MessageTransportPort>,
        producer.clone(),
        order_repo.clone(),
        process_order.clone(),
    ));
    let status_consumer_handle = spawn_status_queue_consumer(status_consumer.clone());

    let consumer_transport = transport.clone() as Arc<dyn MessageTransportPort>;
    let consumer_producer = producer.clone();
    let consumer_order_repo = order_repo.clone();
    let consumer_process_order = process_order.clone();
    let consumer_factory = Arc::new(move || {
        Arc::new(Consumer::new(
            consumer_transport.clone(),
            consumer_producer.clone(),
            consumer_order_repo.clone(),
            consumer_process_order.clone(),
        ))
    });

    let worker_manager_config = WorkerManagerConfig {
        min_workers: config.worker_pool.min_workers,
        max_workers: config.worker_pool.max_workers,
        default_workers: config.worker_pool.default_workers,
        ..WorkerManagerConfig::default()
    };
    let worker_manager =
        Arc::new(WorkerManager::new(worker_manager_config, transport.clone() as Arc<dyn MessageTransportPort>, consumer_factory));
    worker_manager.start().await;

    let expiry_sweep_cancel = cancel_order.clone();
    let expiry_after = config.orders.expiry_after();
    let expiry_sweep_interval = config.orders.expiry_sweep_interval();
    let mut expiry_shutdown_rx = shutdown_tx.subscribe();
    let expiry_sweep_handle = tokio::spawn(async move {
        let mut interval = tokio::time::interval(expiry_sweep_interval);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    match expiry_sweep_cancel.cancel_expired(expiry_after).await {
                        Ok(results) => {
                            let failed = results.iter().filter(|r| r.is_err()).count();
                            if !results.is_empty() {
                                tracing::info!(swept = results.len(), failed, "expired-order sweep completed");
                            }
                        }
                        Err(e) => tracing::error!("expired-order sweep query failed: {e}"),
                    }
                }
                _ = expiry_shutdown_rx.recv() => break,
            }
        }
    });

    let http_state = OmsAppState { submit_order: submit_order.clone(), cancel_order: cancel_order.clone(), order_status: order_status.clone() };
    let app = create_oms_router(http_state);
    let http_addr: SocketAddr = format!("0.0.0.0:{http_port}").parse()?;
    tracing::info!(%http_addr, "HTTP server starting");
    let listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_tx.clone()));
    let http_handle = tokio::spawn(async move {
        if let Err(e) = http_server.await {
            tracing::error!("HTTP server error: {e}");
        }
    });

    let grpc_addr: SocketAddr = format!("0.0.0.0:{grpc_port}").parse()?;
    tracing::info!(%grpc_addr, "gRPC server starting");
    let grpc_shutdown_tx = shutdown_tx.clone();
    let grpc_handle = tokio::spawn(async move {
        let mut shutdown_rx = grpc_shutdown_tx.subscribe();
        let service = create_order_management_service(submit_order, cancel_order, order_status);
        let server = tonic::transport::Server::builder().add_service(service).serve_with_shutdown(grpc_addr, async move {
            let _ = shutdown_rx.recv().await;
            tracing::info!("gRPC server shutting down");
        });
        if let Err(e) = server.await {
            tracing::error!("gRPC server error: {e}");
        }
    });

    tracing::info!("Order management subsystem ready");

    tokio::select! {
        _ = http_handle => tracing::info!("HTTP server stopped"),
        _ = grpc_handle => tracing::info!("gRPC server stopped"),
    }

    worker_manager.stop().await;
    status_consumer.stop();
    let _ = status_consumer_handle.await;
    let _ = expiry_sweep_handle.await;
    tracing::info!("Order management subsystem stopped");
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv_from_ancestors() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn shutdown_signal(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C, initiating shutdown"),
        () = terminate => tracing::info!("Received SIGTERM, initiating shutdown"),
    }

    let _ = shutdown_tx.send(());
    tracing::info!(timeout_secs = SHUTDOWN_TIMEOUT.as_secs(), "Graceful shutdown started");
}
