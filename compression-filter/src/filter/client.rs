use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;

use compression_filter_core::{CompressionAlgorithm, GrpcEncoding, MetadataBatch};

use crate::call::{CallContext, CallResult, ClientCallArgs};
use crate::concurrently::TryConcurrently;
use crate::config::{ChannelArgs, FilterConfig};
use crate::filter::{ChannelFilter, CompressLoop, DecompressLoop, FilterEndpoint, NextCall};
use crate::pipe::latch;

/// Client side of the compression filter.
///
/// Requests are compressed with the algorithm negotiated from the client's
/// initial metadata; responses are decompressed with the algorithm the
/// server announces in its initial metadata.
#[derive(Debug, Clone)]
pub struct ClientCompressionFilter {
    config: Arc<FilterConfig>,
}

impl ClientCompressionFilter {
    pub fn new(config: Arc<FilterConfig>) -> Self {
        Self { config }
    }

    /// Build the filter for a channel created with `args`.
    pub fn from_channel_args(args: &ChannelArgs) -> Self {
        Self::new(Arc::new(FilterConfig::new(args)))
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }
}

impl ChannelFilter for ClientCompressionFilter {
    const NAME: &'static str = "compression";
    const ENDPOINT: FilterEndpoint = FilterEndpoint::Client;
    type CallArgs = ClientCallArgs;

    fn make_call_promise(
        &self,
        mut args: ClientCallArgs,
        ctx: &CallContext,
        next: NextCall<ClientCallArgs>,
    ) -> BoxFuture<'static, CallResult> {
        let compress = CompressLoop::new(self.config.clone(), &mut args.outgoing_messages)
            .take_and_run(&mut args.client_initial_metadata);
        let decompress =
            DecompressLoop::new(self.config.clone(), ctx, &mut args.incoming_messages);

        // Server initial metadata passes through us on its way up.
        let (md_setter, md_waiter) = latch::<MetadataBatch>();
        let upstream = std::mem::replace(&mut args.server_initial_metadata, md_setter);

        let receive = async move {
            let Some(md) = md_waiter.wait().await else {
                // The call ended before the server sent anything.
                return Ok(());
            };
            let algorithm = md
                .get::<GrpcEncoding>()
                .unwrap_or(CompressionAlgorithm::Identity);
            if !upstream.set(md) {
                tracing::debug!(%algorithm, "server initial metadata dropped by the application");
            }
            decompress.take_and_run(algorithm).await
        };

        TryConcurrently::new(next(args))
            .necessary_pull(receive)
            .push(compress)
            .boxed()
    }
}
