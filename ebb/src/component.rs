//! The managing component: owns the store, the retention configuration and
//! the counters, hands out appenders, and runs the maintenance loop.
//!
//! A [`Component`] is a cheap, cloneable handle. Every clone refers to the
//! same store and configuration, so the handle itself is what gets published
//! to the host through the state-change hook as the "receiver" export.
//!
//! # Concurrency
//!
//! The retention configuration sits behind a reader-writer lock. A commit
//! copies the TTL under a short read guard and releases it before touching
//! the store, so [`Component::update_configuration`] never waits on store
//! I/O, and a commit already past that point finishes with the TTL it read.

use std::fmt;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use serde::Serialize;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;

use crate::appender::Appender;
use crate::clock::{Clock, SystemClock};
use crate::config::{Durability, RetentionConfig};
use crate::error::{EbbError, Result, StoreWriteError};
use crate::log::{LogStore, LogStoreOptions};
use crate::query::QueryResult;
use crate::record::Record;
use crate::retention::{cutoff, retain_fresh};
use crate::series::Labels;
use crate::store::{MaintenanceReport, PersistentStore, Selector};

/// Subdirectory of the data path that holds the store.
pub const STORE_DIR: &str = "metrics";

/// Period of the maintenance loop.
pub const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(1);

/// Callback invoked with the component's exports after it is opened and
/// after every configuration update.
pub type StateChangeHook<S = LogStore> = Arc<dyn Fn(Exports<S>) + Send + Sync>;

/// Values the component publishes to its host.
pub struct Exports<S: PersistentStore = LogStore> {
    /// Handle producers use to create appenders.
    pub receiver: Component<S>,
}

impl<S: PersistentStore> fmt::Debug for Exports<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exports")
            .field("receiver", &self.receiver)
            .finish()
    }
}

/// Options for [`Component::open_with`].
#[derive(Clone)]
pub struct ComponentOptions {
    /// Directory owned by the component; the store lives in `data_path/metrics`.
    pub data_path: PathBuf,
    /// When committed batches are fsynced.
    pub durability: Durability,
    /// Time source for retention cutoffs and store expiry.
    pub clock: Arc<dyn Clock>,
    /// Optional host callback receiving the exports.
    pub on_state_change: Option<StateChangeHook>,
}

impl ComponentOptions {
    /// Options with defaults for everything but the data path.
    pub fn new<P: Into<PathBuf>>(data_path: P) -> Self {
        Self {
            data_path: data_path.into(),
            durability: Durability::default(),
            clock: Arc::new(SystemClock),
            on_state_change: None,
        }
    }

    /// Sets the durability mode.
    pub fn with_durability(mut self, durability: Durability) -> Self {
        self.durability = durability;
        self
    }

    /// Sets the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the state-change hook.
    pub fn on_state_change(mut self, hook: StateChangeHook) -> Self {
        self.on_state_change = Some(hook);
        self
    }
}

impl fmt::Debug for ComponentOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentOptions")
            .field("data_path", &self.data_path)
            .field("durability", &self.durability)
            .field("on_state_change", &self.on_state_change.is_some())
            .finish_non_exhaustive()
    }
}

/// Outcome of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// Records handed to the store.
    pub written: usize,
    /// Records dropped as older than the cutoff.
    pub dropped: usize,
    /// The retention cutoff applied, in ms since the Unix epoch.
    pub cutoff_ms: i64,
    /// Sequence numbers assigned to the written records.
    pub sequences: Option<RangeInclusive<u64>>,
}

/// Snapshot of the component's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    /// Successful commits, including ones where every record was stale.
    pub commits: u64,
    /// Rollbacks.
    pub rollbacks: u64,
    /// Records persisted.
    pub samples_written: u64,
    /// Records dropped by the retention filter.
    pub samples_dropped_stale: u64,
    /// Commits whose store write failed.
    pub write_failures: u64,
    /// Maintenance passes that completed.
    pub maintenance_runs: u64,
    /// Maintenance passes that failed.
    pub maintenance_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    commits: AtomicU64,
    rollbacks: AtomicU64,
    samples_written: AtomicU64,
    samples_dropped_stale: AtomicU64,
    write_failures: AtomicU64,
    maintenance_runs: AtomicU64,
    maintenance_failures: AtomicU64,
}

impl Counters {
    fn add(counter: &AtomicU64, n: usize) {
        counter.fetch_add(n as u64, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            commits: self.commits.load(Ordering::Relaxed),
            rollbacks: self.rollbacks.load(Ordering::Relaxed),
            samples_written: self.samples_written.load(Ordering::Relaxed),
            samples_dropped_stale: self.samples_dropped_stale.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            maintenance_runs: self.maintenance_runs.load(Ordering::Relaxed),
            maintenance_failures: self.maintenance_failures.load(Ordering::Relaxed),
        }
    }
}

struct Shared<S: PersistentStore> {
    config: RwLock<RetentionConfig>,
    store: S,
    clock: Arc<dyn Clock>,
    counters: Counters,
    on_state_change: Option<StateChangeHook<S>>,
    closed: AtomicBool,
}

/// Handle to a running retention store.
///
/// # Example
///
/// ```rust,no_run
/// use ebb::{Component, Labels, RetentionConfig};
/// use std::time::Duration;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let component = Component::open("./agent-data", RetentionConfig::new(Duration::from_secs(300))?)?;
///
/// let mut app = component.new_appender();
/// let cpu = app.add(&Labels::metric("cpu_usage", [("host", "web1")]), 1_700_000_000_000, 0.42)?;
/// app.add_fast(cpu, 1_700_000_001_000, 0.43)?;
/// let outcome = app.commit()?;
/// println!("wrote {} dropped {}", outcome.written, outcome.dropped);
///
/// component.close()?;
/// # Ok(())
/// # }
/// ```
pub struct Component<S: PersistentStore = LogStore> {
    shared: Arc<Shared<S>>,
}

impl<S: PersistentStore> Clone for Component<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: PersistentStore> fmt::Debug for Component<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("config", &self.configuration())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Component<LogStore> {
    /// Opens the component with default options, storing data under
    /// `data_path/metrics`.
    ///
    /// # Errors
    ///
    /// Returns [`EbbError::Config`] for an invalid configuration or
    /// [`EbbError::StoreOpen`] if the store can't be opened.
    pub fn open<P: AsRef<Path>>(data_path: P, config: RetentionConfig) -> Result<Self> {
        Self::open_with(ComponentOptions::new(data_path.as_ref()), config)
    }

    /// Opens the component with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`EbbError::Config`] for an invalid configuration or
    /// [`EbbError::StoreOpen`] if the store can't be opened.
    pub fn open_with(options: ComponentOptions, config: RetentionConfig) -> Result<Self> {
        config.validate()?;
        let dir = options.data_path.join(STORE_DIR);
        let store = LogStore::open(
            &dir,
            LogStoreOptions {
                durability: options.durability,
                clock: Arc::clone(&options.clock),
            },
        )?;
        tracing::info!(path = %dir.display(), ttl = ?config.ttl, "opened retention store");
        Self::from_store(store, config, options.clock, options.on_state_change)
    }
}

impl<S: PersistentStore> Component<S> {
    /// Wraps an already-open store.
    ///
    /// The hook, if any, is invoked once with the new exports before this
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`EbbError::Config`] for an invalid configuration.
    pub fn from_store(
        store: S,
        config: RetentionConfig,
        clock: Arc<dyn Clock>,
        on_state_change: Option<StateChangeHook<S>>,
    ) -> Result<Self> {
        config.validate()?;
        let component = Self {
            shared: Arc::new(Shared {
                config: RwLock::new(config),
                store,
                clock,
                counters: Counters::default(),
                on_state_change,
                closed: AtomicBool::new(false),
            }),
        };
        component.publish();
        Ok(component)
    }

    /// Creates an empty appender bound to this component.
    pub fn new_appender(&self) -> Appender<S> {
        Appender::new(self.clone())
    }

    /// Filters `batch` against the current TTL and persists what survives.
    pub(crate) fn commit(&self, batch: Vec<Record>) -> Result<CommitOutcome> {
        if self.is_closed() {
            return Err(StoreWriteError::Closed.into());
        }

        let ttl = self.ttl();
        let cutoff_ms = cutoff(self.shared.clock.now(), ttl);
        let retained = retain_fresh(batch, cutoff_ms);
        let counters = &self.shared.counters;
        Counters::add(&counters.samples_dropped_stale, retained.dropped);

        if retained.kept.is_empty() {
            counters.commits.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(dropped = retained.dropped, cutoff_ms, "commit had no fresh records");
            return Ok(CommitOutcome {
                written: 0,
                dropped: retained.dropped,
                cutoff_ms,
                sequences: None,
            });
        }

        match self.shared.store.write(retained.kept, ttl) {
            Ok(receipt) => {
                counters.commits.fetch_add(1, Ordering::Relaxed);
                Counters::add(&counters.samples_written, receipt.written);
                tracing::debug!(
                    written = receipt.written,
                    dropped = retained.dropped,
                    cutoff_ms,
                    "committed batch"
                );
                Ok(CommitOutcome {
                    written: receipt.written,
                    dropped: retained.dropped,
                    cutoff_ms,
                    sequences: receipt.sequences,
                })
            }
            Err(e) => {
                counters.write_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(error = %e, "failed to persist committed batch");
                Err(e.into())
            }
        }
    }

    pub(crate) fn record_rollback(&self) {
        self.shared.counters.rollbacks.fetch_add(1, Ordering::Relaxed);
    }

    fn ttl(&self) -> Duration {
        self.shared
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ttl
    }

    /// Replaces the retention configuration.
    ///
    /// Commits that already read the TTL finish with the old value; every
    /// commit that starts after this returns uses the new one. The
    /// state-change hook is invoked afterwards with the unchanged receiver.
    ///
    /// # Errors
    ///
    /// Returns [`EbbError::Config`] if `config` is invalid; the previous
    /// configuration stays in effect.
    pub fn update_configuration(&self, config: RetentionConfig) -> Result<()> {
        config.validate()?;
        let previous = {
            let mut current = self
                .shared
                .config
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *current, config)
        };
        tracing::info!(from = ?previous.ttl, to = ?config.ttl, "updated retention");
        self.publish();
        Ok(())
    }

    /// Returns the current retention configuration.
    pub fn configuration(&self) -> RetentionConfig {
        *self
            .shared
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self) {
        if let Some(hook) = &self.shared.on_state_change {
            hook(Exports {
                receiver: self.clone(),
            });
        }
    }

    /// Runs store maintenance every [`MAINTENANCE_INTERVAL`] until `cancel`
    /// fires.
    ///
    /// Failed passes are logged and counted; they do not end the loop.
    ///
    /// # Errors
    ///
    /// Currently never fails; cancellation returns `Ok(())`.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let mut ticker = interval_at(Instant::now() + MAINTENANCE_INTERVAL, MAINTENANCE_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!("maintenance loop started");

        loop {
            tokio::select! {
                biased;

                () = cancel.cancelled() => {
                    tracing::debug!("maintenance loop stopped");
                    return Ok(());
                }

                _ = ticker.tick() => {
                    if self.is_closed() {
                        continue;
                    }
                    let this = self.clone();
                    match tokio::task::spawn_blocking(move || this.maintain()).await {
                        Ok(Ok(report)) if report.expired > 0 || report.compacted => {
                            tracing::debug!(
                                expired = report.expired,
                                compacted = report.compacted,
                                live = report.live,
                                "maintenance pass"
                            );
                        }
                        Ok(Ok(_)) => {}
                        Ok(Err(e)) => tracing::warn!("maintenance error: {e}"),
                        Err(e) => tracing::warn!("maintenance task failed: {e}"),
                    }
                }
            }
        }
    }

    /// Runs one maintenance pass synchronously.
    ///
    /// # Errors
    ///
    /// Returns [`EbbError::StoreWrite`] if the store's housekeeping fails or
    /// the component is closed.
    pub fn maintain(&self) -> Result<MaintenanceReport> {
        let counters = &self.shared.counters;
        match self.shared.store.maintain() {
            Ok(report) => {
                counters.maintenance_runs.fetch_add(1, Ordering::Relaxed);
                Ok(report)
            }
            Err(e) => {
                counters.maintenance_failures.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    /// Reads live samples of the selected series within `[start_ms, end_ms]`.
    ///
    /// # Errors
    ///
    /// Returns [`EbbError::StoreWrite`] if the store is closed.
    pub fn query(&self, selector: &Selector, start_ms: i64, end_ms: i64) -> Result<QueryResult> {
        let samples = self.shared.store.select(selector, start_ms, end_ms)?;
        Ok(QueryResult::new(samples, start_ms, end_ms))
    }

    /// Returns the label sets of all series with live samples.
    pub fn series(&self) -> Vec<Labels> {
        self.shared.store.series()
    }

    /// Returns a snapshot of the counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.shared.counters.snapshot()
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.shared.store
    }

    /// Returns true once [`close`](Self::close) has succeeded.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Closes the store. Idempotent; later commits fail with
    /// [`StoreWriteError::Closed`].
    ///
    /// The component only counts as closed once the store has closed, so a
    /// failed close leaves it usable and can be retried.
    ///
    /// # Errors
    ///
    /// Returns [`EbbError::StoreWrite`] if the final flush fails.
    pub fn close(&self) -> Result<()> {
        if self.is_closed() {
            return Ok(());
        }
        if let Err(e) = self.shared.store.close() {
            tracing::warn!(error = %e, "failed to close retention store");
            return Err(EbbError::from(e));
        }
        self.shared.closed.store(true, Ordering::Release);
        tracing::info!("closed retention store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::clock::MockClock;
    use crate::record::Sequenced;

    /// In-memory store that records every batch and can be told to fail.
    #[derive(Default)]
    struct MemoryStore {
        batches: Mutex<Vec<(Vec<Record>, Duration)>>,
        next: AtomicU64,
        fail: AtomicBool,
        fail_close: AtomicBool,
        maintained: AtomicUsize,
    }

    impl PersistentStore for MemoryStore {
        fn write(
            &self,
            mut records: Vec<Record>,
            ttl: Duration,
        ) -> std::result::Result<crate::store::WriteReceipt, StoreWriteError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(StoreWriteError::Io {
                    path: "memory".to_string(),
                    source: std::io::Error::other("disk full"),
                });
            }
            let first = self.next.fetch_add(records.len() as u64, Ordering::SeqCst);
            for (i, r) in records.iter_mut().enumerate() {
                r.attach_sequence(first + i as u64).unwrap();
            }
            let written = records.len();
            self.batches.lock().unwrap().push((records, ttl));
            Ok(crate::store::WriteReceipt {
                written,
                sequences: Some(first..=first + written as u64 - 1),
            })
        }

        fn maintain(&self) -> std::result::Result<MaintenanceReport, StoreWriteError> {
            self.maintained.fetch_add(1, Ordering::SeqCst);
            Ok(MaintenanceReport::default())
        }

        fn select(
            &self,
            _selector: &Selector,
            _start_ms: i64,
            _end_ms: i64,
        ) -> std::result::Result<Vec<crate::record::StoredSample>, StoreWriteError> {
            Ok(Vec::new())
        }

        fn series(&self) -> Vec<Labels> {
            Vec::new()
        }

        fn close(&self) -> std::result::Result<(), StoreWriteError> {
            if self.fail_close.load(Ordering::SeqCst) {
                return Err(StoreWriteError::Io {
                    path: "memory".to_string(),
                    source: std::io::Error::other("flush failed"),
                });
            }
            Ok(())
        }
    }

    fn component(ttl_secs: u64, now_ms: u64) -> (Component<MemoryStore>, Arc<MockClock>) {
        let clock = Arc::new(MockClock::at_millis(now_ms));
        let config = RetentionConfig::new(Duration::from_secs(ttl_secs)).unwrap();
        let component = Component::from_store(MemoryStore::default(), config, clock.clone(), None).unwrap();
        (component, clock)
    }

    fn labels() -> Labels {
        Labels::metric("up", [("job", "agent")])
    }

    #[test]
    fn test_commit_filters_and_passes_ttl() {
        let (component, _clock) = component(300, 410_000);
        let mut app = component.new_appender();
        app.add(&labels(), 0, 1.0).unwrap();
        app.add(&labels(), 400_000, 2.0).unwrap();

        let outcome = app.commit().unwrap();
        assert_eq!(outcome.written, 1);
        assert_eq!(outcome.dropped, 1);
        assert_eq!(outcome.cutoff_ms, 110_000);

        let batches = component.store().batches.lock().unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].0[0].timestamp_ms(), 400_000);
        assert_eq!(batches[0].1, Duration::from_secs(300));
    }

    #[test]
    fn test_all_stale_commit_skips_store() {
        let (component, _clock) = component(60, 1_000_000);
        let mut app = component.new_appender();
        app.add(&labels(), 1, 1.0).unwrap();

        let outcome = app.commit().unwrap();
        assert_eq!(outcome.written, 0);
        assert_eq!(outcome.sequences, None);
        assert!(component.store().batches.lock().unwrap().is_empty());

        let stats = component.stats();
        assert_eq!(stats.commits, 1);
        assert_eq!(stats.samples_dropped_stale, 1);
    }

    #[test]
    fn test_write_failure_surfaces_and_counts() {
        let (component, _clock) = component(60, 1_000_000);
        component.store().fail.store(true, Ordering::SeqCst);

        let mut app = component.new_appender();
        app.add(&labels(), 999_000, 1.0).unwrap();
        let err = app.commit().unwrap_err();
        assert!(matches!(err, EbbError::StoreWrite(StoreWriteError::Io { .. })));
        assert!(!app.is_open());

        let stats = component.stats();
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.commits, 0);
    }

    #[test]
    fn test_update_configuration_applies_to_next_commit() {
        let (component, _clock) = component(600, 1_000_000);
        let samples_at = 1_000_000 - 300_000;

        let mut app = component.new_appender();
        app.add(&labels(), samples_at, 1.0).unwrap();
        assert_eq!(app.commit().unwrap().written, 1);

        component
            .update_configuration(RetentionConfig::new(Duration::from_secs(60)).unwrap())
            .unwrap();
        assert_eq!(component.configuration().ttl, Duration::from_secs(60));

        let mut app = component.new_appender();
        app.add(&labels(), samples_at, 1.0).unwrap();
        let outcome = app.commit().unwrap();
        assert_eq!(outcome.written, 0);
        assert_eq!(outcome.dropped, 1);
    }

    #[test]
    fn test_invalid_update_keeps_previous() {
        let (component, _clock) = component(600, 0);
        let err = component
            .update_configuration(RetentionConfig { ttl: Duration::ZERO })
            .unwrap_err();
        assert!(matches!(err, EbbError::Config(_)));
        assert_eq!(component.configuration().ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_state_change_hook_receives_receiver() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let hook: StateChangeHook<MemoryStore> = Arc::new(move |exports: Exports<MemoryStore>| {
            assert!(!exports.receiver.is_closed());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let component = Component::from_store(
            MemoryStore::default(),
            RetentionConfig::default(),
            Arc::new(MockClock::default()),
            Some(hook),
        )
        .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        component
            .update_configuration(RetentionConfig::new(Duration::from_secs(5)).unwrap())
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_clock_advance_moves_cutoff() {
        let (component, clock) = component(60, 100_000);
        let mut app = component.new_appender();
        app.add(&labels(), 50_000, 1.0).unwrap();
        assert_eq!(app.commit().unwrap().written, 1);

        clock.advance(Duration::from_secs(60));
        let mut app = component.new_appender();
        app.add(&labels(), 50_000, 1.0).unwrap();
        assert_eq!(app.commit().unwrap().dropped, 1);
    }

    #[test]
    fn test_close_is_idempotent_and_blocks_commits() {
        let (component, _clock) = component(60, 1_000_000);
        component.close().unwrap();
        component.close().unwrap();
        assert!(component.is_closed());

        let mut app = component.new_appender();
        app.add(&labels(), 999_999, 1.0).unwrap();
        let err = app.commit().unwrap_err();
        assert!(matches!(err, EbbError::StoreWrite(StoreWriteError::Closed)));
        assert!(component.store().batches.lock().unwrap().is_empty());
    }

    #[test]
    fn test_failed_close_can_be_retried() {
        let (component, _clock) = component(60, 1_000_000);
        component.store().fail_close.store(true, Ordering::SeqCst);

        let err = component.close().unwrap_err();
        assert!(matches!(err, EbbError::StoreWrite(StoreWriteError::Io { .. })));
        assert!(!component.is_closed());

        let mut app = component.new_appender();
        app.add(&labels(), 999_999, 1.0).unwrap();
        assert_eq!(app.commit().unwrap().written, 1);

        component.store().fail_close.store(false, Ordering::SeqCst);
        component.close().unwrap();
        assert!(component.is_closed());
    }

    #[tokio::test]
    async fn test_run_ticks_and_stops_on_cancel() {
        let (component, _clock) = component(60, 0);
        let token = CancellationToken::new();
        let handle = {
            let component = component.clone();
            let token = token.clone();
            tokio::spawn(async move { component.run(token).await })
        };

        tokio::time::sleep(MAINTENANCE_INTERVAL + Duration::from_millis(500)).await;
        token.cancel();
        handle.await.unwrap().unwrap();

        assert!(component.store().maintained.load(Ordering::SeqCst) >= 1);
        assert!(component.stats().maintenance_runs >= 1);
    }

    #[tokio::test]
    async fn test_run_returns_immediately_when_cancelled() {
        let (component, _clock) = component(60, 0);
        let token = CancellationToken::new();
        token.cancel();
        component.run(token).await.unwrap();
        assert_eq!(component.store().maintained.load(Ordering::SeqCst), 0);
    }
}
