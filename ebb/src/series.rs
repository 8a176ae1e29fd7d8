//! Series identity for ebb records.
//!
//! A series is identified by its full label set. The metric name travels as
//! the reserved `__name__` label, so two series are the same exactly when
//! their label sets are equal.
//!
//! - [`Labels`] - Sorted, validated label set
//! - [`SeriesRef`] - Opaque `Copy` token (the label set's fingerprint) handed
//!   out by [`Appender::add`](crate::appender::Appender::add) and accepted by
//!   [`Appender::add_fast`](crate::appender::Appender::add_fast)
//!
//! # Example
//!
//! ```rust
//! use ebb::series::Labels;
//!
//! let labels = Labels::new([("__name__", "cpu_usage"), ("host", "web1")]);
//! assert_eq!(labels.metric_name(), Some("cpu_usage"));
//! assert_eq!(labels.to_string(), r#"cpu_usage{host="web1"}"#);
//! ```

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// Reserved label carrying the metric name.
pub const METRIC_NAME_LABEL: &str = "__name__";

/// Opaque reference to a series.
///
/// The reference is the stable fingerprint of the series' [`Labels`]. It is
/// cheap to copy and is what producers keep around between writes to the
/// same series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeriesRef(u64);

impl SeriesRef {
    /// Returns the raw fingerprint value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SeriesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// A sorted set of `(name, value)` label pairs identifying one series.
///
/// Deserialized sets go through [`Labels::new`], so they are sorted too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(from = "Vec<(String, String)>")]
pub struct Labels(Vec<(String, String)>);

impl From<Vec<(String, String)>> for Labels {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

impl Labels {
    /// Creates a label set, sorting pairs by name.
    ///
    /// Duplicates and empty names are kept as-is so that [`validate`](Self::validate)
    /// can report them.
    pub fn new<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        pairs.sort();
        Self(pairs)
    }

    /// Shorthand for a series with only a metric name and extra labels.
    pub fn metric<I, K, V>(name: &str, labels: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let pairs = labels
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .chain(std::iter::once((METRIC_NAME_LABEL.to_string(), name.to_string())));
        Self::new(pairs)
    }

    /// Checks that the set is non-empty and that names are non-empty and unique.
    ///
    /// # Errors
    ///
    /// Returns [`SeriesError::Empty`] or [`SeriesError::InvalidLabel`].
    pub fn validate(&self) -> Result<(), SeriesError> {
        if self.0.is_empty() {
            return Err(SeriesError::Empty);
        }

        for (name, _) in &self.0 {
            if name.is_empty() {
                return Err(SeriesError::InvalidLabel {
                    name: name.clone(),
                    reason: "label name cannot be empty".to_string(),
                });
            }
            if name.len() > usize::from(u16::MAX) {
                return Err(SeriesError::InvalidLabel {
                    name: name.clone(),
                    reason: "label name too long".to_string(),
                });
            }
        }

        // Sorted, so duplicates are adjacent.
        for window in self.0.windows(2) {
            if window[0].0 == window[1].0 {
                return Err(SeriesError::InvalidLabel {
                    name: window[0].0.clone(),
                    reason: "duplicate label name".to_string(),
                });
            }
        }

        if let Some((name, _)) = self.0.iter().find(|(_, v)| v.len() > usize::from(u16::MAX)) {
            return Err(SeriesError::InvalidLabel {
                name: name.clone(),
                reason: "label value too long".to_string(),
            });
        }

        Ok(())
    }

    /// Returns the series fingerprint.
    pub fn fingerprint(&self) -> SeriesRef {
        let mut hasher = DefaultHasher::new();
        self.0.hash(&mut hasher);
        SeriesRef(hasher.finish())
    }

    /// Returns the value of a label, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .binary_search_by(|(k, _)| k.as_str().cmp(name))
            .ok()
            .map(|i| self.0[i].1.as_str())
    }

    /// Returns the metric name (`__name__`), if present.
    pub fn metric_name(&self) -> Option<&str> {
        self.get(METRIC_NAME_LABEL)
    }

    /// Iterates over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Returns the number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set has no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Labels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.metric_name() {
            f.write_str(name)?;
        }
        f.write_str("{")?;
        let mut first = true;
        for (k, v) in self.iter().filter(|(k, _)| *k != METRIC_NAME_LABEL) {
            if !first {
                f.write_str(",")?;
            }
            first = false;
            write!(f, "{k}=\"{v}\"")?;
        }
        f.write_str("}")
    }
}
