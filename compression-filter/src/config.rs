//! Channel configuration and the per-channel filter config.
//!
//! [`ChannelArgs`] is the raw channel setup input. [`FilterConfig`] is what
//! the filter derives from it once, when the channel is built; every call on
//! the channel shares it through an `Arc`.
//!
//! # Example
//!
//! ```rust
//! use compression_filter::{ChannelArgs, CompressionAlgorithm, FilterConfig};
//!
//! let args = ChannelArgs::new()
//!     .max_receive_message_size(4 * 1024 * 1024)
//!     .default_compression_algorithm(CompressionAlgorithm::Gzip);
//!
//! let config = FilterConfig::new(&args);
//! assert_eq!(config.default_algorithm(), CompressionAlgorithm::Gzip);
//! assert_eq!(config.max_recv_size(), Some(4 * 1024 * 1024));
//! ```

use serde::Deserialize;

use compression_filter_core::{AlgorithmSet, CompressionAlgorithm};

use crate::error::ConfigError;
use crate::limits::{MessageSizeParser, ParserIndex};

/// Channel-level configuration recognized by the filter.
///
/// Every field is optional. Unset fields take the defaults documented on
/// each one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelArgs {
    /// Maximum incoming message size in bytes. Unset or negative means
    /// unbounded.
    pub max_receive_message_size: Option<i32>,
    /// Algorithm used when a call does not request one. Default: identity.
    pub default_compression_algorithm: Option<CompressionAlgorithm>,
    /// Algorithms this channel may use. Default: every compiled-in codec.
    pub enabled_compression_algorithms: Option<AlgorithmSet>,
    /// Whether outgoing messages may be compressed. Default: true.
    pub enable_per_message_compression: Option<bool>,
    /// Whether incoming compressed messages are decompressed. Default: true.
    pub enable_per_message_decompression: Option<bool>,
}

impl ChannelArgs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse channel args from JSON.
    ///
    /// ```rust
    /// use compression_filter::ChannelArgs;
    ///
    /// let args = ChannelArgs::from_json(
    ///     r#"{"default_compression_algorithm": "gzip", "enabled_compression_algorithms": ["gzip"]}"#,
    /// )
    /// .unwrap();
    /// assert!(args.default_compression_algorithm.is_some());
    /// ```
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn max_receive_message_size(mut self, max: i32) -> Self {
        self.max_receive_message_size = Some(max);
        self
    }

    pub fn default_compression_algorithm(mut self, algorithm: CompressionAlgorithm) -> Self {
        self.default_compression_algorithm = Some(algorithm);
        self
    }

    /// Restrict the channel to `algorithms` (identity is always included).
    pub fn enabled_compression_algorithms<I>(mut self, algorithms: I) -> Self
    where
        I: IntoIterator<Item = CompressionAlgorithm>,
    {
        self.enabled_compression_algorithms = Some(AlgorithmSet::from_algorithms(algorithms));
        self
    }

    pub fn enable_per_message_compression(mut self, enabled: bool) -> Self {
        self.enable_per_message_compression = Some(enabled);
        self
    }

    pub fn enable_per_message_decompression(mut self, enabled: bool) -> Self {
        self.enable_per_message_decompression = Some(enabled);
        self
    }
}

/// Per-channel compression settings.
///
/// Built once per channel and read-only afterwards. The enabled set always
/// contains the effective default algorithm.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    max_recv_size: Option<u32>,
    message_size_service_config_parser_index: ParserIndex,
    default_algorithm: CompressionAlgorithm,
    enabled_algorithms: AlgorithmSet,
    enable_compression: bool,
    enable_decompression: bool,
}

impl FilterConfig {
    /// Derive the filter config from channel args.
    ///
    /// Never fails. Algorithms without a compiled-in codec are dropped from
    /// the enabled set. A default algorithm outside the resulting set is
    /// replaced by identity and reported at `error` level.
    ///
    /// The only side effect is that diagnostic. The `compression` trace flag
    /// is left to the embedding application, see
    /// [`init_trace_from_env`](crate::trace::init_trace_from_env).
    pub fn new(args: &ChannelArgs) -> Self {
        let enabled_algorithms = args
            .enabled_compression_algorithms
            .unwrap_or_default()
            .intersection(AlgorithmSet::all());
        let mut default_algorithm = args.default_compression_algorithm.unwrap_or_default();

        if !enabled_algorithms.is_set(default_algorithm) {
            tracing::error!(
                algorithm = %default_algorithm,
                "default compression algorithm {} not enabled: switching to none",
                default_algorithm
            );
            default_algorithm = CompressionAlgorithm::Identity;
        }

        let max_recv_size = args
            .max_receive_message_size
            .and_then(|max| u32::try_from(max).ok());

        Self {
            max_recv_size,
            message_size_service_config_parser_index: MessageSizeParser::parser_index(),
            default_algorithm,
            enabled_algorithms,
            enable_compression: args.enable_per_message_compression.unwrap_or(true),
            enable_decompression: args.enable_per_message_decompression.unwrap_or(true),
        }
    }

    /// Channel-wide receive limit, `None` when unbounded.
    pub fn max_recv_size(&self) -> Option<u32> {
        self.max_recv_size
    }

    pub fn message_size_parser_index(&self) -> ParserIndex {
        self.message_size_service_config_parser_index
    }

    pub fn default_algorithm(&self) -> CompressionAlgorithm {
        self.default_algorithm
    }

    pub fn enabled_algorithms(&self) -> AlgorithmSet {
        self.enabled_algorithms
    }

    pub fn enable_compression(&self) -> bool {
        self.enable_compression
    }

    pub fn enable_decompression(&self) -> bool {
        self.enable_decompression
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self::new(&ChannelArgs::default())
    }
}
