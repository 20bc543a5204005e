//! Queue topology and retry-ladder constants.
//!
//! The queue manager doesn't own a connection of its own here — the
//! in-process transport is both the broker and the topology owner — but
//! the retry ladder and per-queue TTLs are shared by the producer,
//! consumer, and transport, so they live in one place.

use std::time::Duration;

use crate::application::ports::queues;

/// TTL applied to messages sitting in `orders.submit`.
pub const SUBMIT_TTL: Duration = Duration::from_secs(24 * 3600);
/// TTL applied to messages sitting in `orders.processing`.
pub const PROCESSING_TTL: Duration = Duration::from_secs(2 * 3600);
/// TTL applied to messages sitting in `orders.settlement`.
pub const SETTLEMENT_TTL: Duration = Duration::from_secs(4 * 3600);
/// TTL applied to messages sitting in `orders.status`.
pub const STATUS_TTL: Duration = Duration::from_secs(3600);
/// TTL applied to messages sitting in `orders.dlq`, past which they are
/// evicted with no further routing (manual investigation only).
pub const DLQ_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Per-message TTL selected by retry-attempt index: `[5, 15, 60, 360]`
/// minutes. Attempts beyond the table length reuse the last entry.
const RETRY_LADDER_MINUTES: [u64; 4] = [5, 15, 60, 360];

/// Maximum retry attempts before a message is dead-lettered instead of
/// being requeued.
pub const MAX_RETRY_ATTEMPTS: u32 = 3;

/// TTL for a message re-published to `orders.retry` at `attempt`.
#[must_use]
pub fn retry_ttl_for_attempt(attempt: u32) -> Duration {
    let index = (attempt as usize).min(RETRY_LADDER_MINUTES.len() - 1);
    Duration::from_secs(RETRY_LADDER_MINUTES[index] * 60)
}

/// Local (non-broker-driven) exponential backoff: `base * 2^attempt`,
/// capped at one hour. Used by callers that want a delay estimate without
/// going through the retry queue's TTL (e.g. client-side UI hints).
#[must_use]
pub fn calculate_retry_delay(base: Duration, attempt: u32) -> Duration {
    let capped_attempt = attempt.min(16);
    let multiplier = 1u64.checked_shl(capped_attempt).unwrap_or(u64::MAX);
    let scaled = base
        .as_millis()
        .saturating_mul(u128::from(multiplier))
        .min(u128::from(u64::MAX));
    Duration::from_millis(scaled as u64).min(Duration::from_secs(3600))
}

/// TTL for a named durable queue, or `None` for `orders.retry` (which uses
/// [`retry_ttl_for_attempt`] per-message instead).
#[must_use]
pub fn ttl_for_queue(queue: &str) -> Option<Duration> {
    match queue {
        queues::SUBMIT => Some(SUBMIT_TTL),
        queues::PROCESSING => Some(PROCESSING_TTL),
        queues::SETTLEMENT => Some(SETTLEMENT_TTL),
        queues::STATUS => Some(STATUS_TTL),
        queues::DLQ => Some(DLQ_TTL),
        _ => None,
    }
}

/// All six durable queue names, for topology declaration.
#[must_use]
pub fn all_queues() -> [&'static str; 6] {
    [
        queues::SUBMIT,
        queues::PROCESSING,
        queues::SETTLEMENT,
        queues::STATUS,
        queues::RETRY,
        queues::DLQ,
    ]
}
