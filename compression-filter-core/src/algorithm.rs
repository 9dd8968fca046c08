//! Compression algorithm identifiers.
//!
//! - [`CompressionAlgorithm`]: one algorithm, including the `identity` sentinel
//! - [`AlgorithmSet`]: an immutable set of algorithms, as advertised in
//!   `grpc-accept-encoding`

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::BoxedCodec;

#[cfg(feature = "compression-br")]
use crate::codec::BrotliCodec;
#[cfg(feature = "compression-deflate")]
use crate::codec::DeflateCodec;
#[cfg(feature = "compression-gzip")]
use crate::codec::GzipCodec;
#[cfg(feature = "compression-zstd")]
use crate::codec::ZstdCodec;

/// A message compression algorithm.
///
/// Every variant exists regardless of enabled features so that metadata from
/// a peer can always be parsed; [`is_supported`](Self::is_supported) reports
/// whether a codec is actually compiled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// No compression.
    #[default]
    #[serde(rename = "identity")]
    Identity,
    #[serde(rename = "deflate")]
    Deflate,
    #[serde(rename = "gzip")]
    Gzip,
    #[serde(rename = "br")]
    Brotli,
    #[serde(rename = "zstd")]
    Zstd,
}

impl CompressionAlgorithm {
    /// All algorithms in declaration order.
    pub const ALL: [CompressionAlgorithm; 5] = [
        Self::Identity,
        Self::Deflate,
        Self::Gzip,
        Self::Brotli,
        Self::Zstd,
    ];

    /// Parse a wire name. Returns `None` for unknown names.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "identity" => Some(Self::Identity),
            "deflate" => Some(Self::Deflate),
            "gzip" => Some(Self::Gzip),
            "br" => Some(Self::Brotli),
            "zstd" => Some(Self::Zstd),
            _ => None,
        }
    }

    /// The wire name of this algorithm.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Deflate => "deflate",
            Self::Gzip => "gzip",
            Self::Brotli => "br",
            Self::Zstd => "zstd",
        }
    }

    /// Returns true if this is identity (no compression).
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Identity)
    }

    /// Whether a codec for this algorithm is compiled in.
    pub fn is_supported(&self) -> bool {
        match self {
            Self::Identity => true,
            Self::Deflate => cfg!(feature = "compression-deflate"),
            Self::Gzip => cfg!(feature = "compression-gzip"),
            Self::Brotli => cfg!(feature = "compression-br"),
            Self::Zstd => cfg!(feature = "compression-zstd"),
        }
    }

    /// Get the codec for this algorithm.
    ///
    /// Returns `None` for identity and for algorithms whose feature is off.
    pub fn codec(&self) -> Option<BoxedCodec> {
        match self {
            Self::Identity => None,
            #[cfg(feature = "compression-deflate")]
            Self::Deflate => Some(BoxedCodec::new(DeflateCodec::default())),
            #[cfg(feature = "compression-gzip")]
            Self::Gzip => Some(BoxedCodec::new(GzipCodec::default())),
            #[cfg(feature = "compression-br")]
            Self::Brotli => Some(BoxedCodec::new(BrotliCodec::default())),
            #[cfg(feature = "compression-zstd")]
            Self::Zstd => Some(BoxedCodec::new(ZstdCodec::default())),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }

    fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown algorithm name.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unknown compression algorithm: {0}")]
pub struct UnknownAlgorithm(pub String);

impl FromStr for CompressionAlgorithm {
    type Err = UnknownAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| UnknownAlgorithm(s.to_string()))
    }
}

/// An immutable set of compression algorithms.
///
/// Identity is always a member: a peer can always fall back to sending
/// uncompressed messages.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(
    from = "Vec<CompressionAlgorithm>",
    into = "Vec<CompressionAlgorithm>"
)]
pub struct AlgorithmSet {
    bits: u8,
}

impl AlgorithmSet {
    /// A set containing only identity.
    pub fn new() -> Self {
        Self {
            bits: CompressionAlgorithm::Identity.bit(),
        }
    }

    /// Every algorithm with a compiled-in codec.
    pub fn all() -> Self {
        Self::from_algorithms(
            CompressionAlgorithm::ALL
                .into_iter()
                .filter(CompressionAlgorithm::is_supported),
        )
    }

    /// Build a set from `algorithms`, plus identity.
    pub fn from_algorithms<I>(algorithms: I) -> Self
    where
        I: IntoIterator<Item = CompressionAlgorithm>,
    {
        algorithms.into_iter().fold(Self::new(), Self::set)
    }

    /// Parse a `grpc-accept-encoding` value. Unknown names are ignored.
    pub fn parse_header_value(value: &str) -> Self {
        Self::from_algorithms(
            value
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(CompressionAlgorithm::from_name),
        )
    }

    /// Return a copy of this set with `algorithm` added.
    pub fn set(self, algorithm: CompressionAlgorithm) -> Self {
        Self {
            bits: self.bits | algorithm.bit(),
        }
    }

    /// Members of both sets. Identity is in every set, so it stays.
    pub fn intersection(self, other: Self) -> Self {
        Self {
            bits: self.bits & other.bits,
        }
    }

    /// Returns true if `algorithm` is a member.
    pub fn is_set(&self, algorithm: CompressionAlgorithm) -> bool {
        self.bits & algorithm.bit() != 0
    }

    /// Iterate members in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = CompressionAlgorithm> + '_ {
        CompressionAlgorithm::ALL
            .into_iter()
            .filter(|algorithm| self.is_set(*algorithm))
    }

    /// Number of members (always at least one).
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Always false; identity is always present.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Render as a comma-joined `grpc-accept-encoding` value.
    pub fn to_header_value(&self) -> String {
        self.iter()
            .map(|algorithm| algorithm.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl Default for AlgorithmSet {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for AlgorithmSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl From<Vec<CompressionAlgorithm>> for AlgorithmSet {
    fn from(algorithms: Vec<CompressionAlgorithm>) -> Self {
        Self::from_algorithms(algorithms)
    }
}

impl From<AlgorithmSet> for Vec<CompressionAlgorithm> {
    fn from(set: AlgorithmSet) -> Self {
        set.iter().collect()
    }
}

impl FromIterator<CompressionAlgorithm> for AlgorithmSet {
    fn from_iter<I: IntoIterator<Item = CompressionAlgorithm>>(iter: I) -> Self {
        Self::from_algorithms(iter)
    }
}
