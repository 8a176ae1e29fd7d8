//! The record: one timestamped sample plus its store sequence number.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::series::{Labels, SeriesRef};

/// A single metric observation exchanged between appenders and the store.
///
/// The sequence number starts unassigned. The store attaches it through the
/// [`Sequenced`] capability as the last step before the record becomes
/// durable; it disambiguates records sharing a series and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    series: Arc<Labels>,
    series_ref: SeriesRef,
    timestamp_ms: i64,
    value: f64,
    sequence: Option<u64>,
}

impl Record {
    /// Creates an unsequenced record.
    pub fn new(series: Arc<Labels>, timestamp_ms: i64, value: f64) -> Self {
        let series_ref = series.fingerprint();
        Self::with_ref(series, series_ref, timestamp_ms, value)
    }

    /// Creates a record whose series fingerprint is already known.
    pub(crate) fn with_ref(
        series: Arc<Labels>,
        series_ref: SeriesRef,
        timestamp_ms: i64,
        value: f64,
    ) -> Self {
        Self {
            series,
            series_ref,
            timestamp_ms,
            value,
            sequence: None,
        }
    }

    /// Returns the series labels.
    pub fn labels(&self) -> &Labels {
        &self.series
    }

    /// Returns the shared series labels.
    pub fn series(&self) -> &Arc<Labels> {
        &self.series
    }

    /// Returns the series reference.
    pub fn series_ref(&self) -> SeriesRef {
        self.series_ref
    }

    /// Returns the sample timestamp in milliseconds since the Unix epoch.
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Returns the sample value.
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Returned when a sequence number is attached to a record that already has one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceAlreadySet {
    /// The sequence number already attached.
    pub existing: u64,
}

impl fmt::Display for SequenceAlreadySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sequence number already set to {}", self.existing)
    }
}

impl std::error::Error for SequenceAlreadySet {}

/// Capability of carrying a write-once sequence number.
///
/// Store implementations use this to key records; nothing else about a
/// record can be changed through it.
pub trait Sequenced {
    /// Returns the attached sequence number, if any.
    fn sequence(&self) -> Option<u64>;

    /// Attaches a sequence number.
    ///
    /// # Errors
    ///
    /// Returns [`SequenceAlreadySet`] if a sequence number is already
    /// attached; the existing number is kept.
    fn attach_sequence(&mut self, sequence: u64) -> Result<(), SequenceAlreadySet>;
}

impl Sequenced for Record {
    fn sequence(&self) -> Option<u64> {
        self.sequence
    }

    fn attach_sequence(&mut self, sequence: u64) -> Result<(), SequenceAlreadySet> {
        match self.sequence {
            Some(existing) => Err(SequenceAlreadySet { existing }),
            None => {
                self.sequence = Some(sequence);
                Ok(())
            }
        }
    }
}

/// A durable sample as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredSample {
    /// Series labels.
    pub labels: Arc<Labels>,
    /// Sample timestamp in milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    /// Sample value.
    pub value: f64,
    /// Sequence number assigned at write time.
    pub sequence: u64,
    /// Wall-clock time (ms) after which the store reclaims the sample.
    pub expires_at_ms: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> Record {
        Record::new(Arc::new(Labels::metric("up", [("job", "agent")])), 1_000, 1.0)
    }

    #[test]
    fn test_new_record_is_unsequenced() {
        let r = record();
        assert_eq!(r.sequence(), None);
        assert_eq!(r.series_ref(), r.labels().fingerprint());
        assert_eq!(r.timestamp_ms(), 1_000);
        assert_eq!(r.value(), 1.0);
    }

    #[test]
    fn test_sequence_attaches_once() {
        let mut r = record();
        r.attach_sequence(7).unwrap();
        assert_eq!(r.sequence(), Some(7));

        let err = r.attach_sequence(8).unwrap_err();
        assert_eq!(err, SequenceAlreadySet { existing: 7 });
        assert_eq!(r.sequence(), Some(7));
    }
}
