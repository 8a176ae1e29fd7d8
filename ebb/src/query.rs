//! Query result type for reading samples back out of a component.
//!
//! There is no query language: a read selects series with a
//! [`Selector`](crate::store::Selector) and a closed millisecond time range,
//! and gets back the live samples in series, timestamp, sequence order.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! # use ebb::{Component, RetentionConfig, Selector};
//! # let component = Component::open("./data", RetentionConfig::default())?;
//! let result = component.query(&Selector::metric("cpu_usage"), 0, i64::MAX)?;
//! println!("{} samples in {:?}", result.len(), result.range());
//! for sample in result {
//!     println!("{} @ {} = {}", sample.labels, sample.timestamp_ms, sample.value);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::record::StoredSample;

/// Samples returned by [`Component::query`](crate::component::Component::query).
///
/// The result implements `Iterator` over [`StoredSample`]s while keeping the
/// requested range available for reporting.
#[derive(Debug)]
pub struct QueryResult {
    samples: std::vec::IntoIter<StoredSample>,
    start_ms: i64,
    end_ms: i64,
}

impl QueryResult {
    pub(crate) fn new(samples: Vec<StoredSample>, start_ms: i64, end_ms: i64) -> Self {
        Self {
            samples: samples.into_iter(),
            start_ms,
            end_ms,
        }
    }

    /// Returns the requested `(start_ms, end_ms)` range.
    pub fn range(&self) -> (i64, i64) {
        (self.start_ms, self.end_ms)
    }

    /// Returns the number of samples not yet consumed.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Returns true if no samples remain.
    pub fn is_empty(&self) -> bool {
        self.samples.len() == 0
    }

    /// Collects the remaining samples into a vector.
    pub fn collect_all(self) -> Vec<StoredSample> {
        self.samples.collect()
    }

    /// Collects the remaining samples as `(timestamp_ms, value)` pairs.
    pub fn points(self) -> Vec<(i64, f64)> {
        self.samples.map(|s| (s.timestamp_ms, s.value)).collect()
    }
}

impl Iterator for QueryResult {
    type Item = StoredSample;

    fn next(&mut self) -> Option<Self::Item> {
        self.samples.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.samples.size_hint()
    }
}

impl ExactSizeIterator for QueryResult {}
