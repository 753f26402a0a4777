use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Invalid stage options. Raised while building a stage, before any entry
/// is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("invalid {field}: {value:?}")]
    InvalidExtension { field: &'static str, value: String },
    #[error("invalid deleteMode: {0}")]
    InvalidDeleteMode(String),
    #[error("options parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Failure reported by the compression codec for a single entry.
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("invalid lzma option {name}: {reason}")]
    InvalidOption { name: String, reason: String },
    #[error("codec init failed: {0}")]
    Init(String),
    #[error("codec io error: {0}")]
    Io(#[from] io::Error),
}

/// Stale artifact removal failed for a reason other than absence.
#[derive(Error, Debug)]
#[error("failed to remove stale artifact {}: {source}", path.display())]
pub struct ReconcileError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Per-entry failure surfaced by the pipeline stage. The entry is not
/// emitted; other entries are unaffected.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("compressing {}: {source}", entry.display())]
    Codec {
        entry: PathBuf,
        #[source]
        source: CodecError,
    },
    #[error("reading stream of {}: {source}", entry.display())]
    Read {
        entry: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("worker for {} did not complete: {reason}", entry.display())]
    Worker { entry: PathBuf, reason: String },
}

impl StageError {
    /// Path of the entry the failure belongs to.
    pub fn entry(&self) -> &std::path::Path {
        match self {
            Self::Codec { entry, .. } | Self::Read { entry, .. } | Self::Worker { entry, .. } => {
                entry
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
