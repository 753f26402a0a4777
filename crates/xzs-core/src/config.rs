use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{ConfigError, Result};
use crate::naming::NamePolicy;
use crate::threshold::{Threshold, ThresholdSpec};

/// Codec options, passed through to the codec uninterpreted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LzmaOptions(BTreeMap<String, serde_json::Value>);

impl LzmaOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

/// `deleteMode` as written: `false` or an output directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DeleteMode {
    Flag(bool),
    Dir(PathBuf),
}

impl Default for DeleteMode {
    fn default() -> Self {
        Self::Flag(false)
    }
}

impl DeleteMode {
    pub fn is_off(&self) -> bool {
        matches!(self, Self::Flag(false))
    }
}

/// Stage options as supplied by the caller. Every field has a default, so a
/// partial JSON object merges over the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct Options {
    pub append: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_extension: Option<String>,
    pub lzma_options: LzmaOptions,
    pub skip_growing_files: bool,
    pub threshold: ThresholdSpec,
    #[serde(skip_serializing_if = "DeleteMode::is_off")]
    pub delete_mode: DeleteMode,
    /// Base for a relative `delete_mode` directory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delete_mode_cwd: Option<PathBuf>,
    /// Drain streamed entries into memory so threshold, growth guard and
    /// delete mode apply to them as they do to buffers.
    #[serde(skip_serializing_if = "is_false")]
    pub buffer_streams: bool,
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Default for Options {
    fn default() -> Self {
        Self {
            append: true,
            extension: None,
            pre_extension: None,
            lzma_options: LzmaOptions::default(),
            skip_growing_files: false,
            threshold: ThresholdSpec::default(),
            delete_mode: DeleteMode::default(),
            delete_mode_cwd: None,
            buffer_streams: false,
        }
    }
}

impl Options {
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_json_value(v: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(v)?)
    }
}

/// Resolved, validated stage configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub naming: NamePolicy,
    pub lzma_options: LzmaOptions,
    pub skip_growing_files: bool,
    pub threshold: Threshold,
    /// Output directory scanned for stale artifacts, when delete mode is on.
    pub delete_mode: Option<PathBuf>,
    pub buffer_streams: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            naming: NamePolicy::default(),
            lzma_options: LzmaOptions::default(),
            skip_growing_files: false,
            threshold: Threshold::Disabled,
            delete_mode: None,
            buffer_streams: false,
        }
    }
}

impl Config {
    pub fn from_options(opts: &Options) -> Result<Self> {
        let naming = NamePolicy::new(
            opts.append,
            opts.extension.clone(),
            opts.pre_extension.clone(),
        )?;
        let threshold = Threshold::resolve(&opts.threshold)?;
        let delete_mode = resolve_delete_mode(&opts.delete_mode, opts.delete_mode_cwd.as_ref())?;

        tracing::debug!(
            %threshold,
            delete_mode = ?delete_mode,
            skip_growing_files = opts.skip_growing_files,
            "resolved stage config"
        );

        Ok(Self {
            naming,
            lzma_options: opts.lzma_options.clone(),
            skip_growing_files: opts.skip_growing_files,
            threshold,
            delete_mode,
            buffer_streams: opts.buffer_streams,
        })
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        Self::from_options(&Options::from_json_str(s)?)
    }
}

impl TryFrom<Options> for Config {
    type Error = ConfigError;

    fn try_from(opts: Options) -> Result<Self> {
        Self::from_options(&opts)
    }
}

fn resolve_delete_mode(mode: &DeleteMode, cwd: Option<&PathBuf>) -> Result<Option<PathBuf>> {
    match mode {
        DeleteMode::Flag(false) => Ok(None),
        DeleteMode::Flag(true) => Err(ConfigError::InvalidDeleteMode(
            "true carries no output directory".into(),
        )),
        DeleteMode::Dir(dir) if dir.as_os_str().is_empty() => {
            Err(ConfigError::InvalidDeleteMode("empty output directory".into()))
        }
        DeleteMode::Dir(dir) => Ok(Some(match cwd {
            Some(cwd) if dir.is_relative() => cwd.join(dir),
            _ => dir.clone(),
        })),
    }
}
