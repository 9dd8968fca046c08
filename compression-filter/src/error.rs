//! Error types for the compression filter.
//!
//! - [`TransformError`]: a per-message failure that terminates the call
//! - [`ConfigError`]: invalid channel or service configuration input

use compression_filter_core::{CompressionAlgorithm, Status};

/// A per-message transform failure.
///
/// Every variant is terminal for the call; it is converted into the call's
/// [`Status`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TransformError {
    /// The incoming message's wire size exceeds the receive limit.
    #[error("Received message larger than max ({size} vs. {max})")]
    MessageTooLarge { size: usize, max: u32 },

    /// The codec rejected a payload flagged as compressed.
    #[error("Unexpected error decompressing data for algorithm {algorithm}")]
    Decompression { algorithm: CompressionAlgorithm },
}

impl From<TransformError> for Status {
    fn from(err: TransformError) -> Self {
        match &err {
            TransformError::MessageTooLarge { .. } => Status::resource_exhausted(err.to_string()),
            TransformError::Decompression { .. } => Status::internal(err.to_string()),
        }
    }
}

/// Invalid configuration input.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A message size that is not a non-negative integer.
    #[error("invalid message size: {0:?}")]
    InvalidSize(String),

    /// Malformed JSON configuration.
    #[error("invalid configuration: {0}")]
    Json(#[from] serde_json::Error),
}
