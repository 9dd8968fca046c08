//! The compression stage of a call's filter chain.
//!
//! - [`ClientCompressionFilter`]: compresses requests, decompresses responses
//! - [`ServerCompressionFilter`]: decompresses requests, compresses responses
//!
//! Both sides share the two message loops defined here:
//!
//! - [`CompressLoop`]: negotiates the outgoing algorithm from the initial
//!   metadata this side sends, then compresses every outgoing message
//! - [`DecompressLoop`]: decompresses every incoming message with the
//!   algorithm the peer announced, enforcing the receive limit
//!
//! ## Negotiation
//!
//! The sender of initial metadata decides its own outgoing algorithm:
//!
//! ```text
//! grpc-internal-encoding-request: gzip      (taken out, never sent)
//!         │
//!         ▼
//! grpc-accept-encoding: identity,deflate,gzip
//! grpc-encoding: gzip                       (omitted for identity)
//! ```
//!
//! The client knows its metadata before the call starts and negotiates
//! immediately. The server negotiates when the application sends its initial
//! metadata, which may be deep inside the handler.

mod client;
mod server;

pub use client::ClientCompressionFilter;
pub use server::ServerCompressionFilter;

use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;

use compression_filter_core::{
    CompressionAlgorithm, GrpcAcceptEncoding, GrpcEncoding, GrpcInternalEncodingRequest, Message,
    MetadataBatch, Status,
};

use crate::call::{CallContext, CallResult};
use crate::config::FilterConfig;
use crate::interceptor::{Interceptable, StreamInterceptor};
use crate::limits::{MessageSizeParsedConfig, effective_max_recv_size};
use crate::trace::{TRACE_TARGET, compression_trace_enabled};
use crate::transform::{compress_message, decompress_message};

/// Which side of a call a filter runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FilterEndpoint {
    Client,
    Server,
}

/// The remainder of the chain after a filter.
pub type NextCall<Args> = Box<dyn FnOnce(Args) -> BoxFuture<'static, CallResult> + Send>;

/// A stage in a call's filter chain.
pub trait ChannelFilter: Send + Sync + 'static {
    /// Name of the filter in the chain.
    const NAME: &'static str;

    /// The side of the call this filter runs on.
    const ENDPOINT: FilterEndpoint;

    /// Call args threaded through the chain on this side.
    type CallArgs: Send + 'static;

    /// Wrap the rest of the chain for one call.
    ///
    /// The returned future resolves to the call's outcome: the result of
    /// `next`, unless one of the filter's own legs fails first.
    fn make_call_promise(
        &self,
        args: Self::CallArgs,
        ctx: &CallContext,
        next: NextCall<Self::CallArgs>,
    ) -> BoxFuture<'static, CallResult>;
}

/// Outgoing half of the filter.
#[derive(Debug)]
pub struct CompressLoop {
    config: Arc<FilterConfig>,
    interceptor: StreamInterceptor<Message>,
}

impl CompressLoop {
    /// Intercept the outgoing message stream in `slot`.
    pub fn new<S>(config: Arc<FilterConfig>, slot: &mut S) -> Self
    where
        S: Interceptable<Item = Message>,
    {
        Self {
            config,
            interceptor: StreamInterceptor::intercept(slot),
        }
    }

    /// Negotiate on `outgoing_metadata` and start compressing.
    ///
    /// Takes the requested algorithm out of the metadata (falling back to the
    /// channel default), advertises the enabled set, and announces the
    /// algorithm unless it is identity.
    pub fn take_and_run(
        self,
        outgoing_metadata: &mut MetadataBatch,
    ) -> impl Future<Output = Result<(), Status>> + Send + use<> {
        let algorithm = outgoing_metadata
            .take::<GrpcInternalEncodingRequest>()
            .unwrap_or_else(|| self.config.default_algorithm());

        outgoing_metadata.set::<GrpcAcceptEncoding>(self.config.enabled_algorithms());
        if !algorithm.is_identity() {
            outgoing_metadata.set::<GrpcEncoding>(algorithm);
        }

        if compression_trace_enabled() {
            tracing::debug!(
                target: TRACE_TARGET,
                algorithm = %algorithm,
                accept = %self.config.enabled_algorithms().to_header_value(),
                "negotiated outgoing compression"
            );
        }

        let config = self.config;
        self.interceptor
            .take_and_run(move |message| compress_message(&config, message, algorithm))
    }
}

/// Incoming half of the filter.
#[derive(Debug)]
pub struct DecompressLoop {
    config: Arc<FilterConfig>,
    max_recv_size: Option<u32>,
    interceptor: StreamInterceptor<Message>,
}

impl DecompressLoop {
    /// Intercept the incoming message stream in `slot`.
    ///
    /// The receive limit is resolved here, for this call, from the channel
    /// limit and the call's service config.
    pub fn new<S>(config: Arc<FilterConfig>, ctx: &CallContext, slot: &mut S) -> Self
    where
        S: Interceptable<Item = Message>,
    {
        let call_limits =
            MessageSizeParsedConfig::get_from_call_context(ctx, config.message_size_parser_index());
        let max_recv_size = effective_max_recv_size(config.max_recv_size(), call_limits);

        Self {
            config,
            max_recv_size,
            interceptor: StreamInterceptor::intercept(slot),
        }
    }

    /// The receive limit in force for this call.
    pub fn max_recv_size(&self) -> Option<u32> {
        self.max_recv_size
    }

    /// Start decompressing with `algorithm`.
    pub fn take_and_run(
        self,
        algorithm: CompressionAlgorithm,
    ) -> impl Future<Output = Result<(), Status>> + Send + 'static {
        let Self {
            config,
            max_recv_size,
            interceptor,
        } = self;

        interceptor.take_and_run_fallible(move |message| {
            decompress_message(&config, message, algorithm, max_recv_size)
        })
    }
}
