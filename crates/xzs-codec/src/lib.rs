//! Codec seam of the xz stage.
//!
//! The stage only talks to [`Codec`]; [`XzCodec`] is the default
//! implementation on top of liblzma (through `xz2`).

pub mod settings;
pub mod xz;

use std::io::Read;
use xzs_core::{CodecError, LzmaOptions};

pub use settings::{CheckKind, EncoderSettings};
pub use xz::XzCodec;

/// Boxed reader handed between the stage and the codec.
pub type ByteStream = Box<dyn Read + Send>;

/// Byte transform wrapped by the stage.
pub trait Codec: Send + Sync {
    /// Content encoding recorded on compressed entries.
    fn name(&self) -> &str;

    /// File suffix for compressed entries, without the dot.
    fn suffix(&self) -> &str;

    /// Compress a complete buffer.
    fn compress_buffer(&self, input: &[u8], options: &LzmaOptions) -> Result<Vec<u8>, CodecError>;

    /// Wrap `input` so that reading the result yields compressed bytes.
    ///
    /// Nothing is read from `input` until the returned reader is polled.
    /// Encoder failures after this point surface as read errors.
    fn compress_stream(&self, input: ByteStream, options: &LzmaOptions) -> Result<ByteStream, CodecError>;

    /// Inverse of [`Codec::compress_buffer`]. Used for verification.
    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError>;
}
