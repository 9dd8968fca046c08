//! Per-call message size limits from service config.
//!
//! The channel carries a receive limit of its own (see
//! [`FilterConfig`](crate::FilterConfig)); a method's service config may
//! tighten it. The tighter of the two applies, and it is looked up again on
//! every call because service config can change between calls.
//!
//! # Example
//!
//! ```rust
//! use compression_filter::{FilterEndpoint, MessageSizeParsedConfig, effective_max_recv_size};
//!
//! let method = MessageSizeParsedConfig::parse_json(
//!     r#"{"maxRequestMessageBytes": "4096", "maxResponseMessageBytes": 1024}"#,
//!     FilterEndpoint::Client,
//! )
//! .unwrap();
//!
//! assert_eq!(method.max_recv_size(), Some(1024));
//! assert_eq!(effective_max_recv_size(Some(2048), Some(&method)), Some(1024));
//! ```

use std::any::Any;
use std::sync::Arc;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::Deserialize;

use crate::call::CallContext;
use crate::error::ConfigError;
use crate::filter::FilterEndpoint;

/// Index of a service config parser's slot in per-call config data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ParserIndex(usize);

impl ParserIndex {
    pub fn get(&self) -> usize {
        self.0
    }
}

static NEXT_PARSER_INDEX: AtomicUsize = AtomicUsize::new(0);

/// Allocate a slot for a service config parser.
pub fn register_parser() -> ParserIndex {
    ParserIndex(NEXT_PARSER_INDEX.fetch_add(1, Ordering::Relaxed))
}

/// Parser for the message size fields of a method config.
#[derive(Debug, Clone, Copy)]
pub struct MessageSizeParser;

impl MessageSizeParser {
    /// The slot this parser's results occupy. Registered on first use.
    pub fn parser_index() -> ParserIndex {
        static INDEX: OnceLock<ParserIndex> = OnceLock::new();
        *INDEX.get_or_init(register_parser)
    }
}

/// Parsed service config values stored for one call, by parser index.
#[derive(Clone, Default)]
pub struct ServiceConfigCallData {
    configs: Vec<Option<Arc<dyn Any + Send + Sync>>>,
}

impl ServiceConfigCallData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `config` in the slot for `index`.
    pub fn set<T: Any + Send + Sync>(&mut self, index: ParserIndex, config: T) {
        if self.configs.len() <= index.0 {
            self.configs.resize(index.0 + 1, None);
        }
        self.configs[index.0] = Some(Arc::new(config));
    }

    /// Read the config in the slot for `index`, if it has type `T`.
    pub fn get<T: Any>(&self, index: ParserIndex) -> Option<&T> {
        self.configs
            .get(index.0)?
            .as_deref()
            .and_then(|config| config.downcast_ref::<T>())
    }
}

impl std::fmt::Debug for ServiceConfigCallData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfigCallData")
            .field("slots", &self.configs.len())
            .finish()
    }
}

/// Message size limits from a method's service config.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MessageSizeParsedConfig {
    max_send_size: Option<u32>,
    max_recv_size: Option<u32>,
}

/// The raw JSON shape of the message size fields.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MethodConfigJson {
    #[serde(default)]
    max_request_message_bytes: Option<SizeValue>,
    #[serde(default)]
    max_response_message_bytes: Option<SizeValue>,
}

/// Sizes may be encoded as JSON numbers or as decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SizeValue {
    Number(u64),
    Text(String),
}

impl SizeValue {
    fn to_size(&self) -> Result<u32, ConfigError> {
        let value = match self {
            SizeValue::Number(n) => *n,
            SizeValue::Text(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidSize(s.clone()))?,
        };
        Ok(u32::try_from(value).unwrap_or(u32::MAX))
    }
}

impl MessageSizeParsedConfig {
    pub fn new(max_send_size: Option<u32>, max_recv_size: Option<u32>) -> Self {
        Self {
            max_send_size,
            max_recv_size,
        }
    }

    /// Parse the message size fields of a method config.
    ///
    /// On the client, requests are sent and responses received; on the
    /// server it is the other way round.
    pub fn parse_json(json: &str, endpoint: FilterEndpoint) -> Result<Self, ConfigError> {
        let raw: MethodConfigJson = serde_json::from_str(json)?;
        let request = raw
            .max_request_message_bytes
            .as_ref()
            .map(SizeValue::to_size)
            .transpose()?;
        let response = raw
            .max_response_message_bytes
            .as_ref()
            .map(SizeValue::to_size)
            .transpose()?;

        Ok(match endpoint {
            FilterEndpoint::Client => Self::new(request, response),
            FilterEndpoint::Server => Self::new(response, request),
        })
    }

    pub fn max_send_size(&self) -> Option<u32> {
        self.max_send_size
    }

    pub fn max_recv_size(&self) -> Option<u32> {
        self.max_recv_size
    }

    /// Look up this call's parsed config.
    pub fn get_from_call_context(ctx: &CallContext, index: ParserIndex) -> Option<&Self> {
        ctx.service_config().get::<Self>(index)
    }
}

/// Combine the channel receive limit with a call's service config limit.
pub fn effective_max_recv_size(
    channel: Option<u32>,
    call: Option<&MessageSizeParsedConfig>,
) -> Option<u32> {
    match (channel, call.and_then(MessageSizeParsedConfig::max_recv_size)) {
        (Some(channel), Some(call)) => Some(channel.min(call)),
        (channel, call) => channel.or(call),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_numbers_and_strings() {
        let config = MessageSizeParsedConfig::parse_json(
            r#"{"maxRequestMessageBytes": 100, "maxResponseMessageBytes": "200"}"#,
            FilterEndpoint::Client,
        )
        .unwrap();
        assert_eq!(config.max_send_size(), Some(100));
        assert_eq!(config.max_recv_size(), Some(200));
    }

    #[test]
    fn test_parse_json_server_swaps_directions() {
        let config = MessageSizeParsedConfig::parse_json(
            r#"{"maxRequestMessageBytes": 100, "maxResponseMessageBytes": 200}"#,
            FilterEndpoint::Server,
        )
        .unwrap();
        assert_eq!(config.max_send_size(), Some(200));
        assert_eq!(config.max_recv_size(), Some(100));
    }

    #[test]
    fn test_parse_json_missing_fields() {
        let config = MessageSizeParsedConfig::parse_json("{}", FilterEndpoint::Client).unwrap();
        assert_eq!(config, MessageSizeParsedConfig::default());
    }

    #[test]
    fn test_parse_json_clamps_large_values() {
        let config = MessageSizeParsedConfig::parse_json(
            r#"{"maxResponseMessageBytes": "99999999999"}"#,
            FilterEndpoint::Client,
        )
        .unwrap();
        assert_eq!(config.max_recv_size(), Some(u32::MAX));
    }

    #[test]
    fn test_parse_json_invalid_size() {
        let err = MessageSizeParsedConfig::parse_json(
            r#"{"maxResponseMessageBytes": "lots"}"#,
            FilterEndpoint::Client,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSize(_)));
    }

    #[test]
    fn test_effective_max_recv_size() {
        let tight = MessageSizeParsedConfig::new(None, Some(512));
        let loose = MessageSizeParsedConfig::new(None, Some(8192));
        let unset = MessageSizeParsedConfig::default();

        assert_eq!(effective_max_recv_size(None, None), None);
        assert_eq!(effective_max_recv_size(Some(1024), None), Some(1024));
        assert_eq!(effective_max_recv_size(None, Some(&tight)), Some(512));
        assert_eq!(effective_max_recv_size(Some(1024), Some(&tight)), Some(512));
        assert_eq!(effective_max_recv_size(Some(1024), Some(&loose)), Some(1024));
        assert_eq!(effective_max_recv_size(Some(1024), Some(&unset)), Some(1024));
    }

    #[test]
    fn test_service_config_call_data_slots() {
        let first = register_parser();
        let second = register_parser();
        assert_ne!(first, second);

        let mut data = ServiceConfigCallData::new();
        data.set(second, MessageSizeParsedConfig::new(None, Some(10)));

        assert!(data.get::<MessageSizeParsedConfig>(first).is_none());
        assert_eq!(
            data.get::<MessageSizeParsedConfig>(second).unwrap().max_recv_size(),
            Some(10)
        );
        // Wrong type in an occupied slot reads as absent.
        assert!(data.get::<u32>(second).is_none());
    }

    #[test]
    fn test_message_size_parser_index_is_stable() {
        assert_eq!(
            MessageSizeParser::parser_index(),
            MessageSizeParser::parser_index()
        );
    }
}
