//! Market Data Adapters
//!
//! Implementations of `MarketDataPort`: an HTTP-shaped production stub and
//! an in-memory fake used by tests and local wiring. Real market-data
//! service internals are out of scope (see `application::ports::market_data_port`).

mod http_adapter;
mod in_memory_adapter;

pub use http_adapter::HttpMarketDataAdapter;
pub use in_memory_adapter::InMemoryMarketDataAdapter;
