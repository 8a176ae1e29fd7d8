//! Error types for the ebb retention store.

use thiserror::Error;

use crate::series::SeriesRef;

/// The main error type for all ebb operations.
///
/// Each variant wraps the error family of one stage of the pipeline: the
/// producer-side appender (including invalid series labels), opening the
/// durable store, writing to it, and configuration handling.
#[derive(Error, Debug)]
pub enum EbbError {
    /// Error raised by an appender (write-session misuse).
    #[error("appender error: {0}")]
    Appender(#[from] AppenderError),

    /// The persistent store could not be opened.
    #[error("store open error: {0}")]
    StoreOpen(#[from] StoreOpenError),

    /// A committed batch could not be persisted.
    #[error("store write error: {0}")]
    StoreWrite(#[from] StoreWriteError),

    /// Invalid or unreadable retention configuration.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors raised by [`Appender`](crate::appender::Appender) operations.
#[derive(Error, Debug)]
pub enum AppenderError {
    /// The appender was already committed or rolled back.
    #[error("appender is closed: already committed or rolled back")]
    Closed,

    /// `add_fast` was called with a series reference this appender never saw.
    #[error("unknown series reference {series}: add the series with labels first")]
    UnknownSeries {
        /// The unrecognized reference.
        series: SeriesRef,
    },

    /// The labels passed to `add` are not a valid series identity.
    #[error("invalid series: {0}")]
    InvalidSeries(#[from] SeriesError),
}

/// Errors that can occur when opening the persistent store.
#[derive(Error, Debug)]
pub enum StoreOpenError {
    /// The store directory or one of its files could not be created or read.
    #[error("failed to access '{path}': {source}")]
    DirectoryAccess {
        /// The path that could not be accessed.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Another process (or handle) holds the store lock.
    #[error("store at '{path}' is locked by another process")]
    Locked {
        /// The store directory.
        path: String,
    },

    /// The record log or metadata is structurally invalid.
    #[error("store file '{path}' is corrupted: {reason}")]
    Corrupted {
        /// The offending file.
        path: String,
        /// Description of what was invalid.
        reason: String,
    },

    /// The metadata file (meta.json) could not be parsed.
    #[error("invalid metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Errors that can occur while writing to (or maintaining) the store.
#[derive(Error, Debug)]
pub enum StoreWriteError {
    /// An I/O operation on a store file failed.
    #[error("write to '{path}' failed: {source}")]
    Io {
        /// The file being written.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The store (or its owning component) has been closed.
    #[error("store is closed")]
    Closed,

    /// A record could not be encoded into the log format.
    #[error("failed to encode record: {reason}")]
    Encode {
        /// Why encoding failed.
        reason: String,
    },

    /// Failed to serialize metadata.
    #[error("failed to serialize metadata: {0}")]
    Metadata(#[from] serde_json::Error),
}

/// Errors in retention configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The retention window must be strictly positive.
    #[error("ttl must be greater than zero")]
    InvalidTtl,

    /// A duration string could not be parsed.
    #[error("invalid duration '{input}': {reason}")]
    InvalidDuration {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The configuration file could not be read.
    #[error("failed to read config '{path}': {source}")]
    Read {
        /// The configuration file path.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid JSON for a [`RetentionConfig`](crate::config::RetentionConfig).
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors in series label sets.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    /// A label is malformed or duplicated.
    #[error("invalid label '{name}': {reason}")]
    InvalidLabel {
        /// The label name.
        name: String,
        /// Why the label is invalid.
        reason: String,
    },

    /// A series must carry at least one label.
    #[error("series has no labels")]
    Empty,
}

/// Convenience type alias for Results with [`EbbError`].
pub type Result<T> = std::result::Result<T, EbbError>;
