//! Per-message compression and decompression.
//!
//! Both functions take the message by value and hand it back, so a message
//! is owned by exactly one stage at a time.

use compression_filter_core::{
    CompressionAlgorithm, Message, compress_if_smaller, decompress_payload, message_flags,
};

use crate::config::FilterConfig;
use crate::error::TransformError;
use crate::trace::{TRACE_TARGET, compression_trace_enabled};

/// Compress an outgoing message with `algorithm`.
///
/// Best effort: the message comes back unchanged when the algorithm is
/// identity, compression is disabled, the message opts out, or the
/// compressed form would not be smaller.
pub fn compress_message(
    config: &FilterConfig,
    mut message: Message,
    algorithm: CompressionAlgorithm,
) -> Message {
    if algorithm.is_identity()
        || !config.enable_compression()
        || message.has_flag(message_flags::NO_COMPRESS | message_flags::INTERNAL_COMPRESS)
    {
        return message;
    }

    let before = message.len();
    let codec = algorithm.codec();
    match compress_if_smaller(message.payload(), codec.as_ref()) {
        Some(compressed) => {
            let after = compressed.len();
            message.swap_payload(compressed);
            *message.flags_mut() |= message_flags::INTERNAL_COMPRESS;

            if compression_trace_enabled() {
                let savings = 100.0 * (before - after) as f64 / before as f64;
                tracing::info!(
                    target: TRACE_TARGET,
                    algorithm = %algorithm,
                    before,
                    after,
                    "Compressed[{}] {} bytes vs. {} bytes ({:.2}% savings)",
                    algorithm,
                    before,
                    after,
                    savings
                );
            }
        }
        None => {
            if compression_trace_enabled() {
                tracing::info!(
                    target: TRACE_TARGET,
                    algorithm = %algorithm,
                    before,
                    "Algorithm '{}' enabled but decided not to compress. Input size: {}",
                    algorithm,
                    before
                );
            }
        }
    }

    message
}

/// Decompress an incoming message that was compressed with `algorithm`.
///
/// The wire size is checked against `max` first, before the payload is
/// touched. Messages not flagged as compressed pass through.
pub fn decompress_message(
    config: &FilterConfig,
    mut message: Message,
    algorithm: CompressionAlgorithm,
    max: Option<u32>,
) -> Result<Message, TransformError> {
    if compression_trace_enabled() {
        tracing::debug!(
            target: TRACE_TARGET,
            algorithm = %algorithm,
            len = message.len(),
            flags = message.flags(),
            max = ?max,
            "DecompressMessage"
        );
    }

    if let Some(max) = max
        && message.len() > max as usize
    {
        return Err(TransformError::MessageTooLarge {
            size: message.len(),
            max,
        });
    }

    if !config.enable_decompression() || !message.is_compressed() {
        return Ok(message);
    }

    let codec = algorithm.codec();
    let decompressed = decompress_payload(message.payload(), codec.as_ref()).map_err(|err| {
        tracing::debug!(algorithm = %algorithm, error = %err, "decompression failed");
        TransformError::Decompression { algorithm }
    })?;

    message.swap_payload(decompressed);
    let flags = message.flags_mut();
    *flags &= !message_flags::INTERNAL_COMPRESS;
    *flags |= message_flags::TEST_ONLY_WAS_COMPRESSED;

    Ok(message)
}
