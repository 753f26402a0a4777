//! Shared types for the xz compression stage: file entries, options,
//! threshold resolution, output naming and the error taxonomy.

pub mod config;
pub mod entry;
pub mod error;
pub mod naming;
pub mod threshold;

pub use config::{Config, DeleteMode, LzmaOptions, Options};
pub use entry::{FileEntry, Payload};
pub use error::{CodecError, ConfigError, ReconcileError, Result, StageError};
pub use naming::NamePolicy;
pub use threshold::{Threshold, ThresholdSpec, MIN_THRESHOLD};

/// Suffix appended to compressed entries when no override is configured.
pub const DEFAULT_SUFFIX: &str = "xz";
