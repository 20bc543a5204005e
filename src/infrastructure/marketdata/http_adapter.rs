//! HTTP-shaped market-data adapter.
//!
//! Calls an external market-data service over REST: one round trip per
//! `get_snapshot`/`validate_symbol` call, request = symbol string. This is a
//! production-shaped stub — the service it talks to is out of scope, so the
//! wire format below is the contract this adapter assumes rather than a
//! vendor-specific schema.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::application::ports::{AssetDetails, MarketDataError, MarketDataPort, MarketSnapshot, TradingHours};
use crate::domain::shared::{Price, Quantity, Symbol, Timestamp};

/// Default per-request timeout, matching the config default documented in
/// spec.md §5.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn decimal_from_f64(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Deserialize)]
struct SnapshotResponse {
    price: f64,
    tradeable: bool,
    min_order_size: f64,
    max_order_size: f64,
    price_step: f64,
    market_open: bool,
}

/// Talks to an external market-data service over HTTP.
///
/// Safe for concurrent use: `reqwest::Client` clones share a connection
/// pool, and every call here is stateless beyond that.
pub struct HttpMarketDataAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpMarketDataAdapter {
    /// Build an adapter against `base_url`, bounding every request by
    /// `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client fails to build.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MarketDataError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketDataError::Unavailable { message: e.to_string() })?;
        Ok(Self { client, base_url: base_url.into() })
    }

    fn snapshot_url(&self, symbol: &Symbol) -> String {
        format!("{}/v1/symbols/{}/snapshot", self.base_url, symbol.as_str())
    }
}

#[async_trait]
impl MarketDataPort for HttpMarketDataAdapter {
    async fn get_snapshot(&self, symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError> {
        let response = self.client.get(self.snapshot_url(symbol)).send().await.map_err(|e| {
            if e.is_timeout() {
                MarketDataError::Timeout { timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64 }
            } else {
                MarketDataError::Unavailable { message: e.to_string() }
            }
        })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::UnknownSymbol { symbol: symbol.as_str().to_string() });
        }
        if !response.status().is_success() {
            return Err(MarketDataError::Unavailable {
                message: format!("market-data service returned {}", response.status()),
            });
        }

        let body: SnapshotResponse = response
            .json()
            .await
            .map_err(|e| MarketDataError::Unavailable { message: format!("malformed snapshot body: {e}") })?;

        Ok(MarketSnapshot {
            price: Price::from_f64(body.price),
            timestamp: Timestamp::now(),
            asset: AssetDetails {
                tradeable: body.tradeable,
                min_order_size: Quantity::new(decimal_from_f64(body.min_order_size)),
                max_order_size: Quantity::new(decimal_from_f64(body.max_order_size)),
                price_step: Price::from_f64(body.price_step),
            },
            trading_hours: TradingHours { is_open: body.market_open },
        })
    }

    async fn validate_symbol(&self, symbol: &Symbol) -> Result<bool, MarketDataError> {
        match self.get_snapshot(symbol).await {
            Ok(_) => Ok(true),
            Err(MarketDataError::UnknownSymbol { .. }) => Ok(false),
            Err(other) => Err(other),
        }
    }
}
