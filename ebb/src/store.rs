//! The persistent store contract consumed by a [`Component`](crate::component::Component).
//!
//! A store is an embedded, sequence-keyed, TTL-aware durable engine. The
//! component is its sole owner: it is opened once, written to only through
//! commits, and closed once. [`LogStore`](crate::log::LogStore) is the
//! bundled implementation; other engines plug in by implementing
//! [`PersistentStore`] and handing the value to
//! [`Component::from_store`](crate::component::Component::from_store).

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::Serialize;

use crate::error::StoreWriteError;
use crate::record::{Record, StoredSample};
use crate::series::Labels;

/// Outcome of a successful [`PersistentStore::write`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteReceipt {
    /// Number of records made durable.
    pub written: usize,
    /// Sequence numbers assigned to the batch, first to last.
    pub sequences: Option<RangeInclusive<u64>>,
}

/// Outcome of one maintenance pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaintenanceReport {
    /// Entries reclaimed because their TTL passed.
    pub expired: usize,
    /// Whether the on-disk log was rewritten.
    pub compacted: bool,
    /// Live entries remaining.
    pub live: usize,
}

/// Which series a read selects.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Exactly this label set.
    Exact(Labels),
    /// Every series with this metric name.
    Metric(String),
    /// Every series.
    All,
}

impl Selector {
    /// Selects a single series by its full label set.
    pub fn exact(labels: Labels) -> Self {
        Self::Exact(labels)
    }

    /// Selects every series with the given metric name.
    pub fn metric(name: impl Into<String>) -> Self {
        Self::Metric(name.into())
    }

    /// Returns true if `labels` is selected.
    pub fn matches(&self, labels: &Labels) -> bool {
        match self {
            Self::Exact(expected) => expected == labels,
            Self::Metric(name) => labels.metric_name() == Some(name.as_str()),
            Self::All => true,
        }
    }
}

/// Narrow write/read/close contract required from the durable store.
///
/// Implementations must tolerate concurrent `write` calls and must assign
/// sequence numbers (through [`Sequenced`](crate::record::Sequenced)) that
/// are strictly increasing across the store's lifetime and never reused.
pub trait PersistentStore: Send + Sync + 'static {
    /// Makes `records` durable, each expiring `ttl` after the write.
    ///
    /// The batch is all-or-nothing from the caller's point of view.
    ///
    /// # Errors
    ///
    /// Returns [`StoreWriteError`] if the batch could not be persisted, in
    /// which case none of it is visible to readers.
    fn write(&self, records: Vec<Record>, ttl: Duration) -> Result<WriteReceipt, StoreWriteError>;

    /// Periodic housekeeping (flush, expiry, compaction). No-op by default.
    ///
    /// # Errors
    ///
    /// Returns [`StoreWriteError`] if housekeeping I/O fails.
    fn maintain(&self) -> Result<MaintenanceReport, StoreWriteError> {
        Ok(MaintenanceReport::default())
    }

    /// Returns live samples of the selected series within `[start_ms, end_ms]`,
    /// ordered by series, timestamp and sequence.
    ///
    /// # Errors
    ///
    /// Returns [`StoreWriteError::Closed`] if the store has been closed.
    fn select(
        &self,
        selector: &Selector,
        start_ms: i64,
        end_ms: i64,
    ) -> Result<Vec<StoredSample>, StoreWriteError>;

    /// Returns the label sets of all series with live samples.
    fn series(&self) -> Vec<Labels>;

    /// Flushes and releases the store. Further writes fail.
    ///
    /// # Errors
    ///
    /// Returns [`StoreWriteError`] if the final flush fails.
    fn close(&self) -> Result<(), StoreWriteError>;
}
