//! Retention configuration.
//!
//! The only runtime tunable of a component is its retention window (TTL).
//! It is read by every commit and can be hot-swapped through
//! [`Component::update_configuration`](crate::component::Component::update_configuration).
//!
//! # Example
//!
//! ```rust
//! use ebb::config::RetentionConfig;
//! use std::time::Duration;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config: RetentionConfig = serde_json::from_str(r#"{ "ttl": "5m" }"#)?;
//! assert_eq!(config.ttl, Duration::from_secs(300));
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default retention window: two hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(2 * 3600);

/// Retention configuration of a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionConfig {
    /// How long samples remain eligible for persistence and query.
    #[serde(with = "duration_serde", default = "default_ttl")]
    pub ttl: Duration,
}

fn default_ttl() -> Duration {
    DEFAULT_TTL
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self { ttl: DEFAULT_TTL }
    }
}

impl RetentionConfig {
    /// Creates a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTtl`] if `ttl` is zero.
    pub fn new(ttl: Duration) -> Result<Self, ConfigError> {
        let config = Self { ttl };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidTtl`] if the TTL is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidTtl);
        }
        Ok(())
    }

    /// Loads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] if the file can't be read,
    /// [`ConfigError::Parse`] if it isn't valid JSON, or a validation error.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

/// When writes are forced to stable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Durability {
    /// `fsync` every committed batch before the commit returns.
    #[default]
    Fsync,
    /// Hand batches to the OS on commit; `fsync` on maintenance ticks and close.
    Buffered,
}

/// Parses a human-readable duration (`"90s"`, `"5m"`, `"2h"`, `"7d"`, `"250ms"`).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidDuration`] for empty input, a missing or
/// unknown unit, or a non-numeric amount.
pub fn parse_duration(s: &str) -> Result<Duration, ConfigError> {
    let input = s.trim();
    let invalid = |reason: &str| ConfigError::InvalidDuration {
        input: s.to_string(),
        reason: reason.to_string(),
    };

    if input.is_empty() {
        return Err(invalid("empty duration string"));
    }

    let split = input
        .find(|c: char| !c.is_ascii_digit())
        .ok_or_else(|| invalid("missing unit; use ms, s, m, h, or d"))?;
    let (num_str, unit) = input.split_at(split);
    let num: u64 = num_str
        .parse()
        .map_err(|_| invalid("amount must be a non-negative integer"))?;

    let multiplier = match unit {
        "ms" => return Ok(Duration::from_millis(num)),
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86400,
        _ => return Err(invalid("unknown unit; use ms, s, m, h, or d")),
    };

    num.checked_mul(multiplier)
        .map(Duration::from_secs)
        .ok_or_else(|| invalid("duration overflows"))
}

/// Formats a duration using the largest unit that divides it evenly.
pub fn format_duration(d: Duration) -> String {
    if d.subsec_millis() != 0 || d.as_secs() == 0 {
        return format!("{}ms", d.as_millis());
    }
    let secs = d.as_secs();
    if secs.is_multiple_of(86400) {
        format!("{}d", secs / 86400)
    } else if secs.is_multiple_of(3600) {
        format!("{}h", secs / 3600)
    } else if secs.is_multiple_of(60) {
        format!("{}m", secs / 60)
    } else {
        format!("{secs}s")
    }
}

/// Serde support for durations as human-readable strings.
///
/// Serializes with [`format_duration`]; deserializes either a duration
/// string or a number of seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer, de};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Seconds(f64),
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_duration(*duration))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => super::parse_duration(&s).map_err(de::Error::custom),
            Raw::Seconds(secs) => Duration::try_from_secs_f64(secs).map_err(de::Error::custom),
        }
    }
}
