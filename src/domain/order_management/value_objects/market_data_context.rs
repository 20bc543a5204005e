//! Market-data snapshot captured at order submission.

use serde::{Deserialize, Serialize};

use crate::domain::shared::{Price, Timestamp};

/// Snapshot of price and time captured at submission, retained on the order
/// for later drift comparison during processing (spec §4.4 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketDataContext {
    /// Market price at the moment of capture.
    pub price: Price,
    /// Time the snapshot was taken.
    pub timestamp: Timestamp,
}

impl MarketDataContext {
    /// Create a new snapshot.
    #[must_use]
    pub const fn new(price: Price, timestamp: Timestamp) -> Self {
        Self { price, timestamp }
    }
}
