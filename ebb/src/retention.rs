//! Retention filtering applied on every commit.
//!
//! The cutoff is `now - ttl`, evaluated at commit time. Records older than
//! the cutoff are dropped silently: stale samples are an expected outcome
//! (slow producers, backfill) and are only visible through counters.

use std::time::{Duration, SystemTime};

use crate::clock::unix_millis;
use crate::record::Record;

/// Result of filtering one batch.
#[derive(Debug, Default)]
pub struct Retained {
    /// Records at or after the cutoff, in their original relative order.
    pub kept: Vec<Record>,
    /// Number of records dropped as stale.
    pub dropped: usize,
}

/// Computes the retention cutoff in milliseconds since the Unix epoch.
///
/// Saturates instead of overflowing, so a TTL longer than the epoch offset
/// yields a cutoff that keeps everything.
pub fn cutoff(now: SystemTime, ttl: Duration) -> i64 {
    let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
    unix_millis(now).saturating_sub(ttl_ms)
}

/// Keeps records whose timestamp is `>= cutoff_ms`.
pub fn retain_fresh(batch: Vec<Record>, cutoff_ms: i64) -> Retained {
    let total = batch.len();
    let kept: Vec<Record> = batch
        .into_iter()
        .filter(|r| r.timestamp_ms() >= cutoff_ms)
        .collect();
    Retained {
        dropped: total - kept.len(),
        kept,
    }
}
