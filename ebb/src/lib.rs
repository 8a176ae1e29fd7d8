//! # ebb
//!
//! Write-behind, short-retention time-series storage for telemetry agents.
//!
//! ebb sits between metric producers (scrapers, receivers) and a small
//! embedded durable store. Producers batch samples in an [`Appender`] and
//! commit them atomically; the commit drops anything older than the
//! configured retention window and persists the rest with a per-entry TTL,
//! so the store never holds data the host has no use for.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - Commit-time retention filter: `cutoff = now - ttl`, evaluated per commit
//! - Strictly increasing sequence numbers, atomic under concurrent commits
//! - Stale samples are counted, never reported as errors
//! - Hot-swappable TTL that never waits on store I/O
//! - Append-only record log with torn-tail recovery and expiry compaction
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ebb::{Component, Labels, RetentionConfig, Selector};
//! use std::time::Duration;
//! use tokio_util::sync::CancellationToken;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Keep five minutes of data under ./agent-data/metrics
//! let component = Component::open("./agent-data", RetentionConfig::new(Duration::from_secs(300))?)?;
//!
//! // Background maintenance: flush, expire, compact
//! let cancel = CancellationToken::new();
//! let maintenance = {
//!     let component = component.clone();
//!     let cancel = cancel.clone();
//!     tokio::spawn(async move { component.run(cancel).await })
//! };
//!
//! // Buffer and commit a batch
//! let mut app = component.new_appender();
//! let cpu = app.add(&Labels::metric("cpu_usage", [("host", "web1")]), 1_700_000_000_000, 0.5)?;
//! app.add_fast(cpu, 1_700_000_001_000, 0.6)?;
//! app.commit()?;
//!
//! // Read it back
//! for sample in component.query(&Selector::metric("cpu_usage"), 0, i64::MAX)? {
//!     println!("{}: {}", sample.timestamp_ms, sample.value);
//! }
//!
//! cancel.cancel();
//! maintenance.await??;
//! component.close()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`Component`]: Owns the store and retention config; hands out appenders
//! - [`Appender`]: Single-use write session; `commit` or `rollback` closes it
//! - [`PersistentStore`]: Contract for the durable engine
//! - [`LogStore`]: Bundled engine: append-only log plus in-memory index
//!
//! ## Modules
//!
//! - [`component`]: Lifecycle, commit path, maintenance loop, counters
//! - [`appender`]: Write sessions
//! - [`retention`]: Cutoff computation and stale filtering
//! - [`store`]: Persistent store contract and selectors
//! - [`log`]: On-disk record log
//! - [`record`]: Records and the sequence-number capability
//! - [`series`]: Label sets and series references
//! - [`config`]: Retention configuration and duration parsing
//! - [`clock`]: Wall-clock abstraction
//! - [`query`]: Query result type
//! - [`error`]: Error types

pub mod appender;
pub mod clock;
pub mod component;
pub mod config;
pub mod error;
pub mod log;
pub mod query;
pub mod record;
pub mod retention;
pub mod series;
pub mod store;

// Re-export primary API types at crate root for convenience.
pub use appender::Appender;
pub use clock::{Clock, MockClock, SystemClock};
pub use component::{CommitOutcome, Component, ComponentOptions, Exports, StatsSnapshot};
pub use config::{Durability, RetentionConfig};
pub use error::{EbbError, Result};
pub use log::{LogStore, LogStoreOptions};
pub use query::QueryResult;
pub use record::{Record, Sequenced, StoredSample};
pub use series::{Labels, SeriesRef};
pub use store::{PersistentStore, Selector};
