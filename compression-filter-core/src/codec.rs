//! Payload codecs behind each wire algorithm.
//!
//! A [`Codec`] turns one whole message payload into another. The filter never
//! streams across messages, so every codec works on complete buffers.
//! [`compress_if_smaller`] and [`decompress_payload`] are the two entry
//! points the transform step uses. Identity has no codec at all.
//!
//! | Type | Wire name | Feature |
//! |------|-----------|---------|
//! | [`GzipCodec`] | `gzip` | `compression-gzip` |
//! | [`DeflateCodec`] | `deflate` | `compression-deflate` |
//! | [`BrotliCodec`] | `br` | `compression-br` |
//! | [`ZstdCodec`] | `zstd` | `compression-zstd` |

use bytes::Bytes;
use std::io;
use std::sync::Arc;

#[cfg(any(
    feature = "compression-gzip",
    feature = "compression-deflate",
    feature = "compression-zstd"
))]
use std::io::Read;

#[cfg(any(feature = "compression-gzip", feature = "compression-deflate"))]
use std::io::Write;

/// Codec trait for per-message compression.
///
/// A codec sees one complete message payload at a time. Whether the output
/// is worth sending is decided by the caller (see [`compress_if_smaller`]).
///
/// # Example
///
/// ```ignore
/// use compression_filter_core::Codec;
/// use bytes::Bytes;
/// use std::io;
///
/// struct Lz4Codec;
///
/// impl Codec for Lz4Codec {
///     fn name(&self) -> &'static str { "lz4" }
///
///     fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
///         // ... lz4 compression
///     }
///
///     fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
///         // ... lz4 decompression
///     }
/// }
/// ```
pub trait Codec: Send + Sync + 'static {
    /// The algorithm name as it appears in `grpc-encoding`.
    fn name(&self) -> &'static str;

    /// Compress data.
    fn compress(&self, data: &[u8]) -> io::Result<Bytes>;

    /// Decompress data.
    fn decompress(&self, data: &[u8]) -> io::Result<Bytes>;
}

/// A boxed codec for type-erased storage.
///
/// Use `Option<BoxedCodec>` where `None` represents identity (no compression).
#[derive(Clone)]
pub struct BoxedCodec(Arc<dyn Codec>);

impl BoxedCodec {
    /// Create a new boxed codec.
    pub fn new<C: Codec>(codec: C) -> Self {
        BoxedCodec(Arc::new(codec))
    }

    /// Get the codec name.
    pub fn name(&self) -> &'static str {
        self.0.name()
    }

    /// Compress data.
    pub fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        self.0.compress(data)
    }

    /// Decompress data.
    pub fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        self.0.decompress(data)
    }
}

impl std::fmt::Debug for BoxedCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BoxedCodec").field(&self.name()).finish()
    }
}

/// Drain a decoder into one payload.
#[cfg(any(
    feature = "compression-gzip",
    feature = "compression-deflate",
    feature = "compression-zstd"
))]
fn read_to_bytes(mut decoder: impl Read) -> io::Result<Bytes> {
    let mut payload = Vec::new();
    decoder.read_to_end(&mut payload)?;
    Ok(Bytes::from(payload))
}

/// `gzip` on the wire: RFC 1952 framing via flate2.
///
/// The algorithm most peers advertise. Needs `compression-gzip`.
#[cfg(feature = "compression-gzip")]
#[derive(Debug, Clone, Copy)]
pub struct GzipCodec {
    /// flate2 level, clamped to 9. The filter uses 6.
    pub level: u32,
}

#[cfg(feature = "compression-gzip")]
impl Default for GzipCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

#[cfg(feature = "compression-gzip")]
impl GzipCodec {
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

#[cfg(feature = "compression-gzip")]
impl Codec for GzipCodec {
    fn name(&self) -> &'static str {
        "gzip"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        let level = flate2::Compression::new(self.level);
        let mut encoder = flate2::write::GzEncoder::new(Vec::with_capacity(data.len()), level);
        encoder.write_all(data)?;
        encoder.finish().map(Bytes::from)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        read_to_bytes(flate2::read::GzDecoder::new(data))
    }
}

/// `deflate` on the wire. gRPC means the zlib stream here, not raw deflate.
///
/// Needs `compression-deflate`.
#[cfg(feature = "compression-deflate")]
#[derive(Debug, Clone, Copy)]
pub struct DeflateCodec {
    /// flate2 level, clamped to 9.
    pub level: u32,
}

#[cfg(feature = "compression-deflate")]
impl Default for DeflateCodec {
    fn default() -> Self {
        Self { level: 6 }
    }
}

#[cfg(feature = "compression-deflate")]
impl DeflateCodec {
    pub fn with_level(level: u32) -> Self {
        Self {
            level: level.min(9),
        }
    }
}

#[cfg(feature = "compression-deflate")]
impl Codec for DeflateCodec {
    fn name(&self) -> &'static str {
        "deflate"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        let level = flate2::Compression::new(self.level);
        let mut encoder = flate2::write::ZlibEncoder::new(Vec::with_capacity(data.len()), level);
        encoder.write_all(data)?;
        encoder.finish().map(Bytes::from)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        read_to_bytes(flate2::read::ZlibDecoder::new(data))
    }
}

/// `br` on the wire. Needs `compression-br`.
#[cfg(feature = "compression-br")]
#[derive(Debug, Clone, Copy)]
pub struct BrotliCodec {
    /// Encoder quality, clamped to 11. Kept low since every message is
    /// compressed on the call's hot path.
    pub quality: u32,
}

#[cfg(feature = "compression-br")]
impl Default for BrotliCodec {
    fn default() -> Self {
        Self { quality: 4 }
    }
}

#[cfg(feature = "compression-br")]
impl BrotliCodec {
    pub fn with_quality(quality: u32) -> Self {
        Self {
            quality: quality.min(11),
        }
    }
}

#[cfg(feature = "compression-br")]
impl Codec for BrotliCodec {
    fn name(&self) -> &'static str {
        "br"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        use brotli::enc::BrotliEncoderParams;
        let mut output = Vec::new();
        let params = BrotliEncoderParams {
            quality: self.quality as i32,
            ..Default::default()
        };
        brotli::enc::BrotliCompress(&mut io::Cursor::new(data), &mut output, &params)?;
        Ok(Bytes::from(output))
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        let mut output = Vec::new();
        brotli::BrotliDecompress(&mut io::Cursor::new(data), &mut output)?;
        Ok(Bytes::from(output))
    }
}

/// `zstd` on the wire. Needs `compression-zstd`.
///
/// Decoding goes through the streaming decoder, so frames without a content
/// size header are accepted.
#[cfg(feature = "compression-zstd")]
#[derive(Debug, Clone, Copy)]
pub struct ZstdCodec {
    /// zstd level in `1..=22`.
    pub level: i32,
}

#[cfg(feature = "compression-zstd")]
impl Default for ZstdCodec {
    fn default() -> Self {
        Self { level: 3 }
    }
}

#[cfg(feature = "compression-zstd")]
impl ZstdCodec {
    pub fn with_level(level: i32) -> Self {
        Self {
            level: level.clamp(1, 22),
        }
    }
}

#[cfg(feature = "compression-zstd")]
impl Codec for ZstdCodec {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn compress(&self, data: &[u8]) -> io::Result<Bytes> {
        zstd::bulk::compress(data, self.level).map(Bytes::from)
    }

    fn decompress(&self, data: &[u8]) -> io::Result<Bytes> {
        read_to_bytes(zstd::Decoder::new(data)?)
    }
}

/// Compress `payload`, keeping the result only if it is strictly smaller.
///
/// Returns `None` when there is no codec, when the codec fails, or when the
/// output is not smaller than the input. Callers then send the original
/// bytes as they are.
pub fn compress_if_smaller(payload: &[u8], codec: Option<&BoxedCodec>) -> Option<Bytes> {
    let codec = codec?;
    match codec.compress(payload) {
        Ok(compressed) if compressed.len() < payload.len() => Some(compressed),
        _ => None,
    }
}

/// Decompress `payload` with `codec`.
///
/// A missing codec is an error here: only payloads that were actually
/// compressed are handed to this function, and identity cannot undo that.
pub fn decompress_payload(payload: &[u8], codec: Option<&BoxedCodec>) -> io::Result<Bytes> {
    match codec {
        Some(codec) => codec.decompress(payload),
        None => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "no codec available for compressed payload",
        )),
    }
}
