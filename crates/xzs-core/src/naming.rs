//! Output naming for compressed entries.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::DEFAULT_SUFFIX;

/// Decides the name an entry carries after compression.
///
/// Only the last path component is rewritten. Precedence:
/// 1. `pre_extension`: `name.ext` becomes `name.<pre>.ext`, nothing appended.
/// 2. `extension`: `.<extension>` is appended to the full name.
/// 3. `append`: the codec suffix (`.xz`) is appended.
/// 4. otherwise the name is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamePolicy {
    pub append: bool,
    pub extension: Option<String>,
    pub pre_extension: Option<String>,
    suffix: String,
}

impl Default for NamePolicy {
    fn default() -> Self {
        Self {
            append: true,
            extension: None,
            pre_extension: None,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }
}

impl NamePolicy {
    pub fn new(
        append: bool,
        extension: Option<String>,
        pre_extension: Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(ext) = &extension {
            validate_component("extension", ext)?;
        }
        if let Some(pre) = &pre_extension {
            validate_component("preExtension", pre)?;
        }
        Ok(Self {
            append,
            extension,
            pre_extension,
            suffix: DEFAULT_SUFFIX.to_string(),
        })
    }

    /// Replace the suffix used by the `append` rule.
    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Name of `relative` after the stage ran. Unchanged when nothing was
    /// compressed.
    pub fn output_name(&self, relative: &Path, did_compress: bool) -> PathBuf {
        if !did_compress {
            return relative.to_path_buf();
        }
        let Some(file_name) = relative.file_name() else {
            return relative.to_path_buf();
        };

        let renamed = if let Some(pre) = &self.pre_extension {
            let stem = relative.file_stem().unwrap_or(file_name);
            let mut name = stem.to_os_string();
            name.push(".");
            name.push(pre);
            if let Some(ext) = relative.extension() {
                name.push(".");
                name.push(ext);
            }
            name
        } else if let Some(ext) = &self.extension {
            appended(file_name.to_os_string(), ext)
        } else if self.append {
            appended(file_name.to_os_string(), &self.suffix)
        } else {
            return relative.to_path_buf();
        };

        relative.with_file_name(renamed)
    }

    /// True when a compressed entry keeps its original name.
    pub fn keeps_name(&self) -> bool {
        self.pre_extension.is_none() && self.extension.is_none() && !self.append
    }
}

fn appended(mut name: OsString, ext: &str) -> OsString {
    name.push(".");
    name.push(ext);
    name
}

fn validate_component(field: &'static str, value: &str) -> Result<(), ConfigError> {
    let bad = value.is_empty()
        || value.starts_with('.')
        || value.contains(['/', '\\']);
    if bad {
        return Err(ConfigError::InvalidExtension {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}
