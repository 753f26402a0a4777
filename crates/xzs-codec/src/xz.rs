//! xz container codec backed by liblzma.

use std::io::{Read, Write};

use xz2::read::{XzDecoder, XzEncoder as XzReadEncoder};
use xz2::stream::{MtStreamBuilder, Stream};
use xz2::write::XzEncoder;
use xzs_core::{CodecError, LzmaOptions};

use crate::settings::EncoderSettings;
use crate::{ByteStream, Codec};

/// Default codec: LZMA2 in an xz container.
#[derive(Debug, Clone, Copy, Default)]
pub struct XzCodec;

impl XzCodec {
    pub fn new() -> Self {
        Self
    }

    fn encoder(settings: &EncoderSettings) -> Result<Stream, CodecError> {
        let check = settings.check.to_xz();
        let stream = if settings.threads > 1 {
            let mut builder = MtStreamBuilder::new();
            builder
                .threads(settings.threads)
                .preset(settings.raw_preset())
                .check(check);
            builder.encoder()
        } else {
            Stream::new_easy_encoder(settings.raw_preset(), check)
        };
        stream.map_err(|e| CodecError::Init(e.to_string()))
    }
}

impl Codec for XzCodec {
    fn name(&self) -> &str {
        "lzma"
    }

    fn suffix(&self) -> &str {
        "xz"
    }

    fn compress_buffer(&self, input: &[u8], options: &LzmaOptions) -> Result<Vec<u8>, CodecError> {
        let settings = EncoderSettings::from_options(options)?;
        let stream = Self::encoder(&settings)?;
        let mut encoder = XzEncoder::new_stream(Vec::with_capacity(input.len() / 2 + 64), stream);
        encoder.write_all(input)?;
        Ok(encoder.finish()?)
    }

    fn compress_stream(&self, input: ByteStream, options: &LzmaOptions) -> Result<ByteStream, CodecError> {
        let settings = EncoderSettings::from_options(options)?;
        let stream = Self::encoder(&settings)?;
        Ok(Box::new(XzReadEncoder::new_stream(input, stream)))
    }

    fn decompress(&self, input: &[u8]) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(input.len() * 2);
        XzDecoder::new(input).read_to_end(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;

    fn text(size: usize) -> Vec<u8> {
        let words = ["lorem", "ipsum", "dolor", "sit", "amet", "consectetur", "adipiscing", "elit"];
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        let mut out = Vec::with_capacity(size);
        while out.len() < size {
            out.extend_from_slice(words[rng.gen_range(0..words.len())].as_bytes());
            out.push(b' ');
        }
        out.truncate(size);
        out
    }

    #[test]
    fn test_buffer_roundtrip() {
        let codec = XzCodec::new();
        let input = text(5000);
        let compressed = codec.compress_buffer(&input, &LzmaOptions::new()).unwrap();
        assert!(compressed.len() < input.len());
        assert_eq!(&compressed[..6], &[0xFD, b'7', b'z', b'X', b'Z', 0x00]);
        assert_eq!(codec.decompress(&compressed).unwrap(), input);
    }

    #[test]
    fn test_empty_roundtrip() {
        let codec = XzCodec::new();
        let compressed = codec.compress_buffer(&[], &LzmaOptions::new()).unwrap();
        assert!(!compressed.is_empty());
        assert!(codec.decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_stream_roundtrip() {
        let codec = XzCodec::new();
        let input = text(64 * 1024);
        let reader: ByteStream = Box::new(Cursor::new(input.clone()));
        let mut compressed = Vec::new();
        codec
            .compress_stream(reader, &LzmaOptions::new())
            .unwrap()
            .read_to_end(&mut compressed)
            .unwrap();
        assert_eq!(codec.decompress(&compressed).unwrap(), input);
    }

    #[test]
    fn test_stream_is_lazy() {
        struct Exploding;
        impl Read for Exploding {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::other("boom"))
            }
        }
        let codec = XzCodec::new();
        let mut reader = codec.compress_stream(Box::new(Exploding), &LzmaOptions::new()).unwrap();
        let mut out = Vec::new();
        assert!(reader.read_to_end(&mut out).is_err());
    }

    #[test]
    fn test_preset_levels() {
        let codec = XzCodec::new();
        let input = text(256 * 1024);
        let low = codec.compress_buffer(&input, &LzmaOptions::new().with("preset", 0)).unwrap();
        let high = codec.compress_buffer(&input, &LzmaOptions::new().with("preset", 9)).unwrap();
        assert!(high.len() <= low.len());
        assert_eq!(codec.decompress(&high).unwrap(), input);
    }

    #[test]
    fn test_threads_and_checks() {
        let codec = XzCodec::new();
        let input = text(20_000);
        for check in ["none", "crc32", "crc64", "sha256"] {
            let opts = LzmaOptions::new().with("threads", 2).with("check", check);
            let compressed = codec.compress_buffer(&input, &opts).unwrap();
            assert_eq!(codec.decompress(&compressed).unwrap(), input, "{check}");
        }
    }

    #[test]
    fn test_extreme_roundtrip() {
        let codec = XzCodec::new();
        let input = text(10_000);
        let opts = LzmaOptions::new().with("preset", 1).with("extreme", true);
        let compressed = codec.compress_buffer(&input, &opts).unwrap();
        assert_eq!(codec.decompress(&compressed).unwrap(), input);
    }

    #[test]
    fn test_invalid_option_is_codec_error() {
        let codec = XzCodec::new();
        let err = codec
            .compress_buffer(b"data", &LzmaOptions::new().with("preset", 42))
            .unwrap_err();
        assert!(matches!(err, CodecError::InvalidOption { .. }));
        let err = codec
            .compress_stream(Box::new(Cursor::new(vec![1u8])), &LzmaOptions::new().with("check", 3))
            .err()
            .unwrap();
        assert!(matches!(err, CodecError::InvalidOption { .. }));
    }

    #[test]
    fn test_decompress_garbage() {
        let codec = XzCodec::new();
        assert!(matches!(codec.decompress(b"not xz at all"), Err(CodecError::Io(_))));
    }

    #[test]
    fn test_names() {
        let codec = XzCodec::new();
        assert_eq!(codec.name(), "lzma");
        assert_eq!(codec.suffix(), "xz");
    }
}
