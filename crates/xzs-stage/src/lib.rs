//! xz compression stage for build pipelines.
//!
//! Wraps the xz codec with:
//! 1. Threshold gating (small entries pass through)
//! 2. Growth guard (results that did not shrink are dropped)
//! 3. Output naming (`.xz` suffix, custom extension or pre-extension)
//! 4. Delete mode (stale `.xz` artifacts of uncompressed entries are pruned)

pub mod decision;
pub mod guard;
pub mod stage;

pub use decision::should_compress;
pub use guard::{maybe_revert, Guarded};
pub use stage::{Action, Cleanup, Emitted, PipelineStage, RunSummary};

pub use xzs_codec::{Codec, XzCodec};
pub use xzs_core::{Config, ConfigError, FileEntry, Options, Payload, StageError};
