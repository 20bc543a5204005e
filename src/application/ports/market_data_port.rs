//! Market Data Port (Driven Port)
//!
//! Interface for the abstract market-data client the OMS consumes during
//! admission (submit) and execution (process): current price, asset
//! details, and trading hours for a single symbol. This is a secondary/
//! outbound port; the infrastructure layer ships one mock adapter and one
//! production-shaped stub (real network access is out of scope).

use async_trait::async_trait;

use crate::domain::shared::{Price, Quantity, Symbol, Timestamp};

/// Tradeability and sizing constraints for a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetDetails {
    /// Whether the asset currently accepts new orders.
    pub tradeable: bool,
    /// Smallest order size accepted.
    pub min_order_size: Quantity,
    /// Largest order size accepted.
    pub max_order_size: Quantity,
    /// Minimum price increment.
    pub price_step: Price,
}

/// Market session state for a symbol's primary exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingHours {
    /// True if the market is open for regular trading right now.
    pub is_open: bool,
}

/// A full snapshot of everything the submit and process use cases need
/// about a symbol in one round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketSnapshot {
    /// Current price.
    pub price: Price,
    /// Time the snapshot was taken.
    pub timestamp: Timestamp,
    /// Tradeability/sizing constraints.
    pub asset: AssetDetails,
    /// Trading-session state.
    pub trading_hours: TradingHours,
}

impl MarketSnapshot {
    /// True if `quantity` falls within the asset's accepted order-size
    /// range.
    #[must_use]
    pub fn quantity_within_bounds(&self, quantity: Quantity) -> bool {
        quantity.within_bounds(self.asset.min_order_size, self.asset.max_order_size)
    }
}

/// Market-data client error.
#[derive(Debug, Clone, thiserror::Error)]
pub enum MarketDataError {
    /// Symbol is not known to the market-data service.
    #[error("unknown symbol: {symbol}")]
    UnknownSymbol {
        /// The unrecognized symbol.
        symbol: String,
    },

    /// The client call exceeded its configured timeout.
    #[error("market-data request timed out after {timeout_ms}ms")]
    Timeout {
        /// Configured timeout, in milliseconds.
        timeout_ms: u64,
    },

    /// The market-data service is transiently unreachable or erroring.
    /// Retryable.
    #[error("market data unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },
}

/// Port for the abstract market-data client.
///
/// Implementations must be safe for concurrent use: many workers may call
/// this for different orders at once.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataPort: Send + Sync {
    /// Fetch the current price, asset details, and trading-hours state for
    /// `symbol` in one call.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::UnknownSymbol`] if the symbol does not
    /// exist, or [`MarketDataError::Timeout`]/[`MarketDataError::Unavailable`]
    /// for transient failures.
    async fn get_snapshot(&self, symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError>;

    /// Check whether `symbol` is a valid, known instrument, independent of
    /// its current tradeability.
    ///
    /// # Errors
    ///
    /// Returns [`MarketDataError::Timeout`]/[`MarketDataError::Unavailable`]
    /// for transient failures.
    async fn validate_symbol(&self, symbol: &Symbol) -> Result<bool, MarketDataError>;
}
