//! # Compression Filter
//!
//! Per-call message compression for an RPC filter chain.
//!
//! Each call carries two independent message streams. For each direction, the
//! sending side picks an algorithm while it writes its initial metadata,
//! announces it in `grpc-encoding`, and compresses every message that
//! follows. The receiving side decompresses with the announced algorithm and
//! enforces a receive size limit on the wire bytes.
//!
//! ## Features
//!
//! - **Negotiation:** `grpc-internal-encoding-request` selects the algorithm
//!   for one call, falling back to the channel default; the enabled set is
//!   always advertised in `grpc-accept-encoding`.
//! - **Best effort compression:** a message is only sent compressed if that
//!   makes it strictly smaller.
//! - **Size limits:** the channel limit and the method's service config limit
//!   are combined per call; oversized messages fail the call with
//!   `ResourceExhausted` before any decompression.
//! - **Structured concurrency:** each call is a single future. Message loops
//!   run as legs of [`TryConcurrently`] and the first failure ends the call.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use compression_filter::prelude::*;
//! use futures::FutureExt;
//!
//! # futures::executor::block_on(async {
//! let filter = ClientCompressionFilter::new(Arc::new(FilterConfig::new(&ChannelArgs::new())));
//!
//! let (call, args) = ClientCall::new(MetadataBatch::new());
//! let result = filter
//!     .make_call_promise(
//!         args,
//!         &CallContext::new(),
//!         Box::new(|args: ClientCallArgs| {
//!             async move {
//!                 // A transport would write `args.client_initial_metadata`
//!                 // and pump the message pipes here.
//!                 assert!(args.client_initial_metadata.get::<GrpcAcceptEncoding>().is_some());
//!                 Ok(MetadataBatch::new())
//!             }
//!             .boxed()
//!         }),
//!     )
//!     .await;
//! assert!(result.is_ok());
//! drop(call);
//! # });
//! ```
//!
//! ## Modules
//!
//! - [`config`]: channel args and the per-channel filter config
//! - [`limits`]: per-call receive limits from service config
//! - [`transform`]: compression and decompression of a single message
//! - [`filter`]: the client and server filters

pub mod call;
pub mod concurrently;
pub mod config;
pub mod error;
pub mod filter;
pub mod interceptor;
pub mod limits;
pub mod pipe;
pub mod trace;
pub mod transform;

pub use call::{CallContext, CallResult, ClientCall, ClientCallArgs, ServerCall, ServerCallArgs};
pub use concurrently::{Leg, TryConcurrently};
pub use config::{ChannelArgs, FilterConfig};
pub use error::{ConfigError, TransformError};
pub use filter::{
    ChannelFilter, ClientCompressionFilter, CompressLoop, DecompressLoop, FilterEndpoint,
    NextCall, ServerCompressionFilter,
};
pub use interceptor::{Interceptable, StreamInterceptor};
pub use limits::{
    MessageSizeParsedConfig, MessageSizeParser, ParserIndex, ServiceConfigCallData,
    effective_max_recv_size, register_parser,
};
pub use pipe::{
    LatchSetter, LatchWaiter, PipeReceiver, PipeSender, latch, pipe, pipe_with_capacity,
};
pub use transform::{compress_message, decompress_message};

// Re-export core types
pub use compression_filter_core::{
    AlgorithmSet, BoxedCodec, Code, Codec, CompressionAlgorithm, GrpcAcceptEncoding,
    GrpcEncoding, GrpcInternalEncodingRequest, Message, MetadataBatch, MetadataKey, Status,
    UnknownAlgorithm, message_flags,
};

pub mod prelude {
    //! The most common types for wiring the filter into a chain.
    pub use crate::call::{
        CallContext, CallResult, ClientCall, ClientCallArgs, ServerCall, ServerCallArgs,
    };
    pub use crate::config::{ChannelArgs, FilterConfig};
    pub use crate::filter::{
        ChannelFilter, ClientCompressionFilter, NextCall, ServerCompressionFilter,
    };
    pub use compression_filter_core::{
        CompressionAlgorithm, GrpcAcceptEncoding, GrpcEncoding, GrpcInternalEncodingRequest,
        Message, MetadataBatch, Status, message_flags,
    };
}
