use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use compression_filter_core::{CompressionAlgorithm, GrpcEncoding, MetadataBatch, Status};

use crate::call::{CallContext, CallResult, ServerCallArgs};
use crate::concurrently::TryConcurrently;
use crate::config::{ChannelArgs, FilterConfig};
use crate::filter::{ChannelFilter, CompressLoop, DecompressLoop, FilterEndpoint, NextCall};
use crate::pipe::latch;

/// Server side of the compression filter.
///
/// Requests are decompressed from the start of the call. Responses are
/// compressed once the application has sent its initial metadata, with the
/// algorithm negotiated at that point; the application may override the
/// channel default by setting `grpc-internal-encoding-request` there.
#[derive(Debug, Clone)]
pub struct ServerCompressionFilter {
    config: Arc<FilterConfig>,
}

impl ServerCompressionFilter {
    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self { config }
    }

    /// Build the filter for a server created with `args`.
    pub fn from_channel_args(args: &ChannelArgs) -> Self {
        Self::new(Arc::new(FilterConfig::new(args)))
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl ChannelFilter for ServerCompressionFilter {
    const NAME: &'static str = "compression";
    const ENDPOINT: FilterEndpoint = FilterEndpoint::Server;
    type CallArgs = ServerCallArgs;

    fn make_call_promise(
        &self,
        mut args: ServerCallArgs,
        ctx: &CallContext,
        next: NextCall<ServerCallArgs>,
    ) -> BoxFuture<'static, CallResult> {
        let compress = CompressLoop::new(self.config.clone(), &mut args.outgoing_messages);

        let algorithm = args
            .client_initial_metadata
            .get::<GrpcEncoding>()
            .unwrap_or(CompressionAlgorithm::Identity);
        let decompress = DecompressLoop::new(self.config.clone(), ctx, &mut args.incoming_messages)
            .take_and_run(algorithm);

        // The application writes its initial metadata here; we negotiate on
        // it before it reaches the transport.
        let (md_setter, md_waiter) = latch::<MetadataBatch>();
        let downstream = std::mem::replace(&mut args.server_initial_metadata, md_setter);

        let send = async move {
            let Some(mut md) = md_waiter.wait().await else {
                return Ok(());
            };
            let pump = compress.take_and_run(&mut md);
            if !downstream.set(md) {
                return Err(Status::cancelled("server initial metadata sink closed"));
            }
            pump.await
        };

        // The send leg drains responses buffered before the application returned.
        TryConcurrently::new(next(args))
            .pull(decompress)
            .necessary_push(send)
            .boxed()
    }
}
