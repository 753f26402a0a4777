//! File entries flowing through the stage.

use std::ffi::OsStr;
use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Contents of an entry. The variant is fixed for the entry's lifetime.
pub enum Payload {
    /// Fully materialized contents.
    Buffer(Vec<u8>),
    /// Open reader; its length is unknown until drained.
    Stream(Box<dyn Read + Send>),
}

impl Payload {
    pub fn stream(reader: impl Read + Send + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    pub fn is_buffer(&self) -> bool {
        matches!(self, Self::Buffer(_))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Length of a buffered payload; `None` for streams.
    pub fn known_len(&self) -> Option<usize> {
        match self {
            Self::Buffer(b) => Some(b.len()),
            Self::Stream(_) => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Buffer(b) => Some(b),
            Self::Stream(_) => None,
        }
    }

    /// Drain the payload into memory. Blocking for streams.
    pub fn into_bytes(self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Buffer(b) => Ok(b),
            Self::Stream(mut r) => {
                let mut out = Vec::new();
                r.read_to_end(&mut out)?;
                Ok(out)
            }
        }
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Self::Buffer(v)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buffer(b) => f.debug_tuple("Buffer").field(&b.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// One file's worth of work.
///
/// `relative` is the entry's name: it is what gets renamed and what delete
/// mode looks up in the output directory. `metadata` belongs to the caller
/// and is handed back untouched.
#[derive(Debug)]
pub struct FileEntry<M = ()> {
    pub base: PathBuf,
    pub relative: PathBuf,
    pub payload: Payload,
    /// Encodings applied so far, outermost last.
    pub content_encoding: Vec<String>,
    pub metadata: M,
}

impl FileEntry<()> {
    pub fn buffer(relative: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        Self::new(relative, Payload::Buffer(contents.into()), ())
    }

    pub fn stream(relative: impl Into<PathBuf>, reader: impl Read + Send + 'static) -> Self {
        Self::new(relative, Payload::stream(reader), ())
    }
}

impl<M> FileEntry<M> {
    pub fn new(relative: impl Into<PathBuf>, payload: Payload, metadata: M) -> Self {
        Self {
            base: PathBuf::new(),
            relative: relative.into(),
            payload,
            content_encoding: Vec::new(),
            metadata,
        }
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    /// Replace the caller metadata, keeping everything else.
    pub fn with_metadata<N>(self, metadata: N) -> FileEntry<N> {
        FileEntry {
            base: self.base,
            relative: self.relative,
            payload: self.payload,
            content_encoding: self.content_encoding,
            metadata,
        }
    }

    /// Full path: `base` joined with `relative`.
    pub fn path(&self) -> PathBuf {
        self.base.join(&self.relative)
    }

    pub fn file_name(&self) -> Option<&OsStr> {
        self.relative.file_name()
    }

    pub fn extension(&self) -> Option<&OsStr> {
        self.relative.extension()
    }

    pub fn relative(&self) -> &Path {
        &self.relative
    }

    pub fn is_buffer(&self) -> bool {
        self.payload.is_buffer()
    }

    pub fn is_stream(&self) -> bool {
        self.payload.is_stream()
    }
}
