//! In-memory market-data fake.
//!
//! Backs local development and the test suite: snapshots are seeded ahead
//! of time rather than fetched over the network. An unseeded symbol looks
//! unknown, matching how the real service would answer for an unlisted
//! instrument.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::application::ports::{MarketDataError, MarketDataPort, MarketSnapshot};
use crate::domain::shared::Symbol;

/// A market-data port backed by an in-memory, test-seeded map.
#[derive(Default)]
pub struct InMemoryMarketDataAdapter {
    snapshots: RwLock<HashMap<String, MarketSnapshot>>,
}

impl InMemoryMarketDataAdapter {
    /// An adapter with no symbols seeded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed (or replace) the snapshot for `symbol`.
    pub async fn seed(&self, symbol: &Symbol, snapshot: MarketSnapshot) {
        self.snapshots.write().await.insert(symbol.as_str().to_string(), snapshot);
    }
}

#[async_trait]
impl MarketDataPort for InMemoryMarketDataAdapter {
    async fn get_snapshot(&self, symbol: &Symbol) -> Result<MarketSnapshot, MarketDataError> {
        self.snapshots
            .read()
            .await
            .get(symbol.as_str())
            .copied()
            .ok_or_else(|| MarketDataError::UnknownSymbol { symbol: symbol.as_str().to_string() })
    }

    async fn validate_symbol(&self, symbol: &Symbol) -> Result<bool, MarketDataError> {
        Ok(self.snapshots.read().await.contains_key(symbol.as_str()))
    }
}
