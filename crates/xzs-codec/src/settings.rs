//! Interpretation of `lzmaOptions` for the xz encoder.

use serde_json::Value;
use xz2::stream::Check;
use xzs_core::{CodecError, LzmaOptions};

/// liblzma's `LZMA_PRESET_EXTREME` flag.
const PRESET_EXTREME: u32 = 0x8000_0000;

pub const DEFAULT_PRESET: u32 = 6;

/// Integrity check stored in the xz container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CheckKind {
    None,
    Crc32,
    #[default]
    Crc64,
    Sha256,
}

impl CheckKind {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Some(Self::None),
            "crc32" => Some(Self::Crc32),
            "crc64" => Some(Self::Crc64),
            "sha256" => Some(Self::Sha256),
            _ => None,
        }
    }

    pub(crate) fn to_xz(self) -> Check {
        match self {
            Self::None => Check::None,
            Self::Crc32 => Check::Crc32,
            Self::Crc64 => Check::Crc64,
            Self::Sha256 => Check::Sha256,
        }
    }
}

/// Encoder parameters derived from [`LzmaOptions`].
///
/// Recognized keys: `preset` (0-9), `extreme` (bool), `check`
/// (`none`/`crc32`/`crc64`/`sha256`) and `threads` (>= 1). Other keys are
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderSettings {
    pub preset: u32,
    pub extreme: bool,
    pub check: CheckKind,
    pub threads: u32,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            preset: DEFAULT_PRESET,
            extreme: false,
            check: CheckKind::default(),
            threads: 1,
        }
    }
}

impl EncoderSettings {
    pub fn from_options(options: &LzmaOptions) -> Result<Self, CodecError> {
        let mut settings = Self::default();
        for (key, value) in options.iter() {
            match key.as_str() {
                "preset" => {
                    settings.preset = value
                        .as_u64()
                        .filter(|p| *p <= 9)
                        .map(|p| p as u32)
                        .ok_or_else(|| invalid(key, value, "expected an integer from 0 to 9"))?;
                }
                "extreme" => {
                    settings.extreme = value
                        .as_bool()
                        .ok_or_else(|| invalid(key, value, "expected a boolean"))?;
                }
                "check" => {
                    settings.check = value
                        .as_str()
                        .and_then(CheckKind::parse)
                        .ok_or_else(|| invalid(key, value, "expected none, crc32, crc64 or sha256"))?;
                }
                "threads" => {
                    settings.threads = value
                        .as_u64()
                        .filter(|t| *t >= 1)
                        .and_then(|t| u32::try_from(t).ok())
                        .ok_or_else(|| invalid(key, value, "expected a positive integer"))?;
                }
                other => tracing::debug!(option = other, "ignoring unrecognized lzma option"),
            }
        }
        Ok(settings)
    }

    /// Preset value passed to liblzma, extreme flag included.
    pub fn raw_preset(&self) -> u32 {
        if self.extreme {
            self.preset | PRESET_EXTREME
        } else {
            self.preset
        }
    }
}

fn invalid(key: &str, value: &Value, reason: &str) -> CodecError {
    CodecError::InvalidOption {
        name: key.to_string(),
        reason: format!("{reason}, got {value}"),
    }
}
