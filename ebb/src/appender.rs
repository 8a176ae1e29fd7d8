//! Appenders: single-use write sessions that buffer samples until commit.
//!
//! An appender is created by [`Component::new_appender`] and is owned by one
//! producer. Samples are buffered locally; nothing is visible to readers or
//! written to disk until [`Appender::commit`]. Both [`commit`](Appender::commit)
//! and [`rollback`](Appender::rollback) close the appender, after which every
//! operation fails with [`AppenderError::Closed`].
//!
//! Dropping an open appender discards its buffer, same as a rollback.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::component::{CommitOutcome, Component};
use crate::error::{AppenderError, Result};
use crate::log::LogStore;
use crate::record::Record;
use crate::series::{Labels, SeriesRef};
use crate::store::PersistentStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Open,
    Committed,
    RolledBack,
}

/// A write session accumulating samples for one atomic commit.
pub struct Appender<S: PersistentStore = LogStore> {
    component: Component<S>,
    records: Vec<Record>,
    series: HashMap<SeriesRef, Arc<Labels>>,
    state: State,
}

impl<S: PersistentStore> Appender<S> {
    pub(crate) fn new(component: Component<S>) -> Self {
        Self {
            component,
            records: Vec::new(),
            series: HashMap::new(),
            state: State::Open,
        }
    }

    fn ensure_open(&self) -> std::result::Result<(), AppenderError> {
        match self.state {
            State::Open => Ok(()),
            State::Committed | State::RolledBack => Err(AppenderError::Closed),
        }
    }

    /// Buffers a sample for the series identified by `labels`.
    ///
    /// Returns the series reference, which can be passed to
    /// [`add_fast`](Self::add_fast) for further samples of the same series.
    /// Samples of any age are accepted here; staleness is judged at commit.
    ///
    /// # Errors
    ///
    /// - [`AppenderError::Closed`] if the appender was committed or rolled back
    /// - [`AppenderError::InvalidSeries`] if `labels` is not a valid series
    pub fn add(&mut self, labels: &Labels, timestamp_ms: i64, value: f64) -> Result<SeriesRef> {
        self.ensure_open()?;
        let series_ref = labels.fingerprint();
        let series = match self.series.get(&series_ref) {
            Some(known) if known.as_ref() == labels => Arc::clone(known),
            _ => {
                labels.validate().map_err(AppenderError::from)?;
                let series = Arc::new(labels.clone());
                self.series.insert(series_ref, Arc::clone(&series));
                series
            }
        };
        self.records
            .push(Record::with_ref(series, series_ref, timestamp_ms, value));
        Ok(series_ref)
    }

    /// Buffers a sample for a series previously added to this appender.
    ///
    /// Returns `series` so that it can be chained like [`add`](Self::add).
    ///
    /// # Errors
    ///
    /// - [`AppenderError::Closed`] if the appender was committed or rolled back
    /// - [`AppenderError::UnknownSeries`] if `series` was not returned by
    ///   [`add`](Self::add) on this appender
    pub fn add_fast(&mut self, series: SeriesRef, timestamp_ms: i64, value: f64) -> Result<SeriesRef> {
        self.ensure_open()?;
        let labels = self
            .series
            .get(&series)
            .ok_or(AppenderError::UnknownSeries { series })?;
        self.records
            .push(Record::with_ref(Arc::clone(labels), series, timestamp_ms, value));
        Ok(series)
    }

    /// Filters the buffer against the component's current retention window
    /// and persists the survivors as one batch.
    ///
    /// The appender is closed afterwards whether or not the write succeeded.
    ///
    /// # Errors
    ///
    /// - [`AppenderError::Closed`] if the appender was already closed
    /// - [`StoreWriteError`](crate::error::StoreWriteError) if the store
    ///   rejected the batch or the component is closed
    pub fn commit(&mut self) -> Result<CommitOutcome> {
        self.ensure_open()?;
        self.state = State::Committed;
        self.series.clear();
        let batch = std::mem::take(&mut self.records);
        self.component.commit(batch)
    }

    /// Discards the buffer and closes the appender.
    ///
    /// # Errors
    ///
    /// Returns [`AppenderError::Closed`] if the appender was already closed.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.state = State::RolledBack;
        self.records.clear();
        self.series.clear();
        self.component.record_rollback();
        Ok(())
    }

    /// Number of buffered samples.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns true until the appender is committed or rolled back.
    pub fn is_open(&self) -> bool {
        self.state == State::Open
    }
}

impl<S: PersistentStore> Drop for Appender<S> {
    fn drop(&mut self) {
        if self.state == State::Open && !self.records.is_empty() {
            tracing::debug!(
                samples = self.records.len(),
                "discarding uncommitted appender"
            );
        }
    }
}

impl<S: PersistentStore> fmt::Debug for Appender<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Appender")
            .field("state", &self.state)
            .field("buffered", &self.records.len())
            .field("series", &self.series.len())
            .finish_non_exhaustive()
    }
}
