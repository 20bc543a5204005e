//! Timestamp value object for order and message temporal data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// A UTC timestamp for order lifecycle and queue-message tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from a DateTime<Utc>.
    #[must_use]
    pub const fn new(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Get the current timestamp.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Parse from an ISO 8601 string.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not a valid ISO 8601 timestamp.
    pub fn parse(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = DateTime::parse_from_rfc3339(s)?;
        Ok(Self(dt.with_timezone(&Utc)))
    }

    /// Get the inner DateTime<Utc>.
    #[must_use]
    pub const fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }

    /// Format as ISO 8601 / RFC 3339 string.
    #[must_use]
    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }

    /// Get the Unix timestamp in seconds.
    #[must_use]
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Calculate duration since another (earlier) timestamp.
    #[must_use]
    pub fn duration_since(&self, other: Self) -> chrono::Duration {
        self.0 - other.0
    }

    /// Returns true if less than `window` has elapsed between `self` and
    /// `now`. Used for the 30-second cancellation grace period (§3 invariant
    /// 6) and similar bounded-recency checks.
    #[must_use]
    pub fn within_window(&self, now: Self, window: Duration) -> bool {
        let elapsed = now.duration_since(*self);
        elapsed >= chrono::Duration::zero()
            && elapsed <= chrono::Duration::from_std(window).unwrap_or(chrono::Duration::MAX)
    }

    /// Returns true if `now` is at least `age` past `self`. Used for
    /// order-expiry checks (`find_expired_orders`).
    #[must_use]
    pub fn is_older_than(&self, now: Self, age: Duration) -> bool {
        let elapsed = now.duration_since(*self);
        elapsed >= chrono::Duration::from_std(age).unwrap_or(chrono::Duration::MAX)
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }
}

impl From<Timestamp> for DateTime<Utc> {
    fn from(ts: Timestamp) -> Self {
        ts.0
    }
}
