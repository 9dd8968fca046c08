//! Call metadata with typed keys.
//!
//! [`MetadataBatch`] stores metadata as an [`http::HeaderMap`] and exposes
//! typed access through [`MetadataKey`] implementations. The compression
//! filter uses three keys:
//!
//! - [`GrpcInternalEncodingRequest`]: algorithm the application asked for,
//!   consumed once by the filter and never sent on the wire
//! - [`GrpcAcceptEncoding`]: algorithms the sender can decompress
//! - [`GrpcEncoding`]: algorithm used for the messages that follow

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::algorithm::{AlgorithmSet, CompressionAlgorithm};

/// Header name for the application's requested algorithm.
pub const GRPC_INTERNAL_ENCODING_REQUEST: &str = "grpc-internal-encoding-request";

/// Header name for the advertised set of accepted algorithms.
pub const GRPC_ACCEPT_ENCODING: &str = "grpc-accept-encoding";

/// Header name for the algorithm of the message stream.
pub const GRPC_ENCODING: &str = "grpc-encoding";

/// A typed metadata key.
pub trait MetadataKey {
    /// The header name (lowercase).
    const NAME: &'static str;

    /// The typed value stored under this key.
    type Value;

    /// Encode a value for storage.
    fn encode(value: &Self::Value) -> HeaderValue;

    /// Parse a stored value. `None` means the value is malformed.
    fn parse(value: &HeaderValue) -> Option<Self::Value>;
}

/// `grpc-internal-encoding-request`
#[derive(Debug, Clone, Copy)]
pub struct GrpcInternalEncodingRequest;

impl MetadataKey for GrpcInternalEncodingRequest {
    const NAME: &'static str = GRPC_INTERNAL_ENCODING_REQUEST;
    type Value = CompressionAlgorithm;

    fn encode(value: &CompressionAlgorithm) -> HeaderValue {
        HeaderValue::from_static(value.as_str())
    }

    fn parse(value: &HeaderValue) -> Option<CompressionAlgorithm> {
        value.to_str().ok().and_then(CompressionAlgorithm::from_name)
    }
}

/// `grpc-accept-encoding`
#[derive(Debug, Clone, Copy)]
pub struct GrpcAcceptEncoding;

impl MetadataKey for GrpcAcceptEncoding {
    const NAME: &'static str = GRPC_ACCEPT_ENCODING;
    type Value = AlgorithmSet;

    fn encode(value: &AlgorithmSet) -> HeaderValue {
        // Algorithm names are plain ASCII tokens.
        HeaderValue::from_str(&value.to_header_value())
            .unwrap_or_else(|_| HeaderValue::from_static("identity"))
    }

    fn parse(value: &HeaderValue) -> Option<AlgorithmSet> {
        value.to_str().ok().map(AlgorithmSet::parse_header_value)
    }
}

/// `grpc-encoding`
#[derive(Debug, Clone, Copy)]
pub struct GrpcEncoding;

impl MetadataKey for GrpcEncoding {
    const NAME: &'static str = GRPC_ENCODING;
    type Value = CompressionAlgorithm;

    fn encode(value: &CompressionAlgorithm) -> HeaderValue {
        HeaderValue::from_static(value.as_str())
    }

    fn parse(value: &HeaderValue) -> Option<CompressionAlgorithm> {
        value.to_str().ok().and_then(CompressionAlgorithm::from_name)
    }
}

/// An ordered batch of call metadata.
#[derive(Debug, Clone, Default)]
pub struct MetadataBatch {
    headers: HeaderMap,
}

impl MetadataBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a typed value. Malformed values read as absent.
    pub fn get<K: MetadataKey>(&self) -> Option<K::Value> {
        self.headers.get(K::NAME).and_then(K::parse)
    }

    /// Store a typed value, replacing any previous value.
    pub fn set<K: MetadataKey>(&mut self, value: K::Value) {
        self.headers
            .insert(HeaderName::from_static(K::NAME), K::encode(&value));
    }

    /// Remove a key, returning its typed value if present and well formed.
    pub fn take<K: MetadataKey>(&mut self) -> Option<K::Value> {
        self.headers
            .remove(K::NAME)
            .and_then(|value| K::parse(&value))
    }

    /// Returns true if the key is present (even if malformed).
    pub fn contains<K: MetadataKey>(&self) -> bool {
        self.headers.contains_key(K::NAME)
    }

    /// Store an untyped value.
    pub fn insert_raw(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Read an untyped value.
    pub fn get_raw(&self, name: &str) -> Option<&HeaderValue> {
        self.headers.get(name)
    }

    /// The underlying header map.
    pub fn as_header_map(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }
}

impl From<HeaderMap> for MetadataBatch {
    fn from(headers: HeaderMap) -> Self {
        Self { headers }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_encoding() {
        let mut md = MetadataBatch::new();
        assert!(md.get::<GrpcEncoding>().is_none());

        md.set::<GrpcEncoding>(CompressionAlgorithm::Gzip);
        assert_eq!(md.get::<GrpcEncoding>(), Some(CompressionAlgorithm::Gzip));
        assert_eq!(md.get_raw("grpc-encoding").unwrap(), "gzip");
    }

    #[test]
    fn test_take_removes_key() {
        let mut md = MetadataBatch::new();
        md.set::<GrpcInternalEncodingRequest>(CompressionAlgorithm::Deflate);
        assert!(md.contains::<GrpcInternalEncodingRequest>());

        assert_eq!(
            md.take::<GrpcInternalEncodingRequest>(),
            Some(CompressionAlgorithm::Deflate)
        );
        assert!(!md.contains::<GrpcInternalEncodingRequest>());
        assert!(md.take::<GrpcInternalEncodingRequest>().is_none());
    }

    #[test]
    fn test_accept_encoding_value() {
        let mut md = MetadataBatch::new();
        let set = AlgorithmSet::from_algorithms([CompressionAlgorithm::Gzip]);
        md.set::<GrpcAcceptEncoding>(set);

        assert_eq!(md.get_raw("grpc-accept-encoding").unwrap(), "identity,gzip");
        assert_eq!(md.get::<GrpcAcceptEncoding>(), Some(set));
    }

    #[test]
    fn test_unknown_encoding_reads_as_absent() {
        let mut md = MetadataBatch::new();
        md.insert_raw(
            HeaderName::from_static("grpc-encoding"),
            HeaderValue::from_static("lz4"),
        );
        assert!(md.contains::<GrpcEncoding>());
        assert!(md.get::<GrpcEncoding>().is_none());
    }

    #[test]
    fn test_set_replaces_previous_value() {
        let mut md = MetadataBatch::new();
        md.set::<GrpcEncoding>(CompressionAlgorithm::Gzip);
        md.set::<GrpcEncoding>(CompressionAlgorithm::Deflate);
        assert_eq!(md.len(), 1);
        assert_eq!(md.get::<GrpcEncoding>(), Some(CompressionAlgorithm::Deflate));
    }
}
