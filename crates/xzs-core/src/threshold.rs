//! Size threshold resolution.
//!
//! Entries smaller than the resolved threshold are passed through untouched.
//! Resolved thresholds never go below [`MIN_THRESHOLD`]: under that size the
//! xz container overhead outweighs anything the encoder can save.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

use crate::error::ConfigError;

/// Smallest enabled threshold, in bytes.
pub const MIN_THRESHOLD: u64 = 150;

static RE_SIZE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(\d+(?:\.\d+)?)\s*([kmgtp]i?b?|b)?$").unwrap()
});

/// Threshold as written by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ThresholdSpec {
    Bool(bool),
    Bytes(i64),
    Size(String),
    /// Anything else; always rejected by [`Threshold::resolve`].
    Other(serde_json::Value),
}

impl Default for ThresholdSpec {
    fn default() -> Self {
        Self::Bool(false)
    }
}

impl From<bool> for ThresholdSpec {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ThresholdSpec {
    fn from(v: i64) -> Self {
        Self::Bytes(v)
    }
}

impl From<&str> for ThresholdSpec {
    fn from(v: &str) -> Self {
        Self::Size(v.to_string())
    }
}

/// Resolved threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// No gating; every entry is compressed.
    #[default]
    Disabled,
    /// Entries of at least this many bytes are compressed.
    Bytes(u64),
}

impl Threshold {
    pub fn resolve(spec: &ThresholdSpec) -> Result<Self, ConfigError> {
        match spec {
            ThresholdSpec::Bool(false) => Ok(Self::Disabled),
            ThresholdSpec::Bool(true) => Ok(Self::Bytes(MIN_THRESHOLD)),
            ThresholdSpec::Bytes(n) => Ok(Self::floored(u64::try_from(*n).unwrap_or(0))),
            ThresholdSpec::Size(s) => parse_size(s)
                .map(Self::floored)
                .ok_or_else(|| ConfigError::InvalidThreshold(s.clone())),
            ThresholdSpec::Other(v) => Err(ConfigError::InvalidThreshold(v.to_string())),
        }
    }

    fn floored(bytes: u64) -> Self {
        Self::Bytes(bytes.max(MIN_THRESHOLD))
    }

    /// Byte count, or `None` when disabled.
    pub fn bytes(&self) -> Option<u64> {
        match self {
            Self::Disabled => None,
            Self::Bytes(n) => Some(*n),
        }
    }

    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Bytes(_))
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disabled => f.write_str("disabled"),
            Self::Bytes(n) => write!(f, "{n}B"),
        }
    }
}

/// Parse a human size string such as `"1kb"`, `"2 MB"` or `"512"`.
///
/// Units are powers of 1024 (`kb` and `kib` both mean 1024 bytes). A bare
/// number is a byte count. Fractions are floored to whole bytes.
pub fn parse_size(input: &str) -> Option<u64> {
    let caps = RE_SIZE.captures(input.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps
        .get(2)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default();
    let exp = match unit.chars().next() {
        None | Some('b') => 0,
        Some('k') => 1,
        Some('m') => 2,
        Some('g') => 3,
        Some('t') => 4,
        Some('p') => 5,
        Some(_) => return None,
    };
    let bytes = value * 1024f64.powi(exp);
    if !bytes.is_finite() {
        return None;
    }
    Some(bytes.floor() as u64)
}
