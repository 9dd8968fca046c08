#![cfg(feature = "compression-gzip")]

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use futures::FutureExt;

use compression_filter::prelude::*;
use compression_filter::{
    Code, MessageSizeParsedConfig, MessageSizeParser, ServiceConfigCallData, compress_message,
    decompress_message,
};

fn enable_trace() {
    compression_filter::trace::set_compression_trace(true);
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn payload(len: usize) -> Bytes {
    Bytes::from(
        b"the quick brown fox "
            .iter()
            .copied()
            .cycle()
            .take(len)
            .collect::<Vec<u8>>(),
    )
}

fn gzip_channel() -> ChannelArgs {
    ChannelArgs::new().enabled_compression_algorithms([CompressionAlgorithm::Gzip])
}

#[derive(Default)]
struct Seen {
    client_initial_metadata: Option<MetadataBatch>,
    outgoing: Vec<Message>,
}

#[tokio::test]
async fn test_requested_gzip_compresses_every_request() {
    enable_trace();
    let filter = ClientCompressionFilter::from_channel_args(&gzip_channel());

    let mut md = MetadataBatch::new();
    md.set::<GrpcInternalEncodingRequest>(CompressionAlgorithm::Gzip);
    let (call, args) = ClientCall::new(md);

    let seen = Arc::new(Mutex::new(Seen::default()));
    let transport_seen = seen.clone();
    let next: NextCall<ClientCallArgs> = Box::new(move |mut args: ClientCallArgs| {
        async move {
            let mut outgoing = Vec::new();
            while let Some(message) = args.outgoing_messages.next().await {
                outgoing.push(message);
            }
            let mut seen = transport_seen.lock().unwrap();
            seen.client_initial_metadata = Some(args.client_initial_metadata);
            seen.outgoing = outgoing;
            args.server_initial_metadata.set(MetadataBatch::new());
            Ok(MetadataBatch::new())
        }
        .boxed()
    });

    let promise = filter.make_call_promise(args, &CallContext::new(), next);

    for _ in 0..3 {
        assert!(call.outgoing.push(Message::new(payload(1024), 0)).await);
    }
    drop(call.outgoing);

    assert!(promise.await.is_ok());
    assert!(call.server_initial_metadata.wait().await.is_some());

    let seen = seen.lock().unwrap();
    let md = seen.client_initial_metadata.as_ref().unwrap();
    assert!(!md.contains::<GrpcInternalEncodingRequest>());
    assert_eq!(md.get_raw("grpc-accept-encoding").unwrap(), "identity,gzip");
    assert_eq!(md.get_raw("grpc-encoding").unwrap(), "gzip");

    assert_eq!(seen.outgoing.len(), 3);
    let config = FilterConfig::default();
    for message in &seen.outgoing {
        assert!(message.is_compressed());
        assert!(message.len() < 1024);
        let restored = decompress_message(
            &config,
            message.clone(),
            CompressionAlgorithm::Gzip,
            None,
        )
        .unwrap();
        assert_eq!(restored.payload(), &payload(1024));
    }
}

#[tokio::test]
async fn test_default_identity_sends_plain_requests() {
    let filter = ClientCompressionFilter::from_channel_args(&gzip_channel());
    let (call, args) = ClientCall::new(MetadataBatch::new());

    let seen = Arc::new(Mutex::new(Seen::default()));
    let transport_seen = seen.clone();
    let next: NextCall<ClientCallArgs> = Box::new(move |mut args: ClientCallArgs| {
        async move {
            let mut outgoing = Vec::new();
            while let Some(message) = args.outgoing_messages.next().await {
                outgoing.push(message);
            }
            let mut seen = transport_seen.lock().unwrap();
            seen.client_initial_metadata = Some(args.client_initial_metadata);
            seen.outgoing = outgoing;
            Ok(MetadataBatch::new())
        }
        .boxed()
    });

    let promise = filter.make_call_promise(args, &CallContext::new(), next);
    assert!(call.outgoing.push(Message::new(payload(1024), 0)).await);
    drop(call.outgoing);

    assert!(promise.await.is_ok());

    let seen = seen.lock().unwrap();
    let md = seen.client_initial_metadata.as_ref().unwrap();
    assert!(md.contains::<GrpcAcceptEncoding>());
    assert!(!md.contains::<GrpcEncoding>());
    assert_eq!(seen.outgoing[0].payload(), &payload(1024));
    assert!(!seen.outgoing[0].is_compressed());
}

#[tokio::test]
async fn test_responses_decompressed_with_server_encoding() {
    let filter = ClientCompressionFilter::from_channel_args(&gzip_channel());
    let (mut call, args) = ClientCall::new(MetadataBatch::new());

    let next: NextCall<ClientCallArgs> = Box::new(|args: ClientCallArgs| {
        async move {
            let mut md = MetadataBatch::new();
            md.set::<GrpcEncoding>(CompressionAlgorithm::Gzip);
            args.server_initial_metadata.set(md);

            let compressed = compress_message(
                &FilterConfig::default(),
                Message::new(payload(2048), 0),
                CompressionAlgorithm::Gzip,
            );
            assert!(compressed.is_compressed());
            assert!(args.incoming_messages.push(compressed).await);
            assert!(args.incoming_messages.push(Message::new(&b"plain"[..], 0)).await);
            Ok(MetadataBatch::new())
        }
        .boxed()
    });

    let result = filter
        .make_call_promise(args, &CallContext::new(), next)
        .await;
    assert!(result.is_ok());

    let md = call.server_initial_metadata.wait().await.unwrap();
    assert_eq!(md.get::<GrpcEncoding>(), Some(CompressionAlgorithm::Gzip));

    let first = call.incoming.next().await.unwrap();
    assert_eq!(first.payload(), &payload(2048));
    assert!(!first.is_compressed());
    assert!(first.has_flag(message_flags::TEST_ONLY_WAS_COMPRESSED));

    let second = call.incoming.next().await.unwrap();
    assert_eq!(second.payload().as_ref(), b"plain");
    assert!(!second.has_flag(message_flags::TEST_ONLY_WAS_COMPRESSED));

    assert!(call.incoming.next().await.is_none());
}

#[tokio::test]
async fn test_responses_decompressed_after_metadata_waiter_dropped() {
    let filter = ClientCompressionFilter::from_channel_args(&gzip_channel());
    let (call, args) = ClientCall::new(MetadataBatch::new());
    let ClientCall {
        outgoing,
        mut incoming,
        server_initial_metadata,
    } = call;
    drop(outgoing);
    drop(server_initial_metadata);

    let next: NextCall<ClientCallArgs> = Box::new(|args: ClientCallArgs| {
        async move {
            let mut md = MetadataBatch::new();
            md.set::<GrpcEncoding>(CompressionAlgorithm::Gzip);
            assert!(args.server_initial_metadata.set(md));

            let compressed = compress_message(
                &FilterConfig::default(),
                Message::new(payload(2048), 0),
                CompressionAlgorithm::Gzip,
            );
            assert!(args.incoming_messages.push(compressed).await);
            Ok(MetadataBatch::new())
        }
        .boxed()
    });

    let result = filter
        .make_call_promise(args, &CallContext::new(), next)
        .await;
    assert!(result.is_ok());

    let message = incoming.next().await.unwrap();
    assert_eq!(message.payload(), &payload(2048));
    assert!(!message.is_compressed());
}

#[tokio::test]
async fn test_oversized_response_fails_before_decompression() {
    let filter = ClientCompressionFilter::from_channel_args(
        &gzip_channel().max_receive_message_size(1024),
    );
    let (mut call, args) = ClientCall::new(MetadataBatch::new());

    let next: NextCall<ClientCallArgs> = Box::new(|args: ClientCallArgs| {
        async move {
            let mut md = MetadataBatch::new();
            md.set::<GrpcEncoding>(CompressionAlgorithm::Gzip);
            args.server_initial_metadata.set(md);

            // Not valid gzip: only the size check may reject it.
            let oversized = Message::new(vec![0u8; 2048], message_flags::INTERNAL_COMPRESS);
            args.incoming_messages.push(oversized).await;
            Ok(MetadataBatch::new())
        }
        .boxed()
    });

    let status = filter
        .make_call_promise(args, &CallContext::new(), next)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::ResourceExhausted);
    assert_eq!(
        status.message(),
        Some("Received message larger than max (2048 vs. 1024)")
    );
    assert!(call.incoming.next().await.is_none());
}

#[tokio::test]
async fn test_service_config_tightens_receive_limit() {
    let filter = ClientCompressionFilter::from_channel_args(
        &gzip_channel().max_receive_message_size(4096),
    );
    let (_call, args) = ClientCall::new(MetadataBatch::new());

    let mut service_config = ServiceConfigCallData::new();
    service_config.set(
        MessageSizeParser::parser_index(),
        MessageSizeParsedConfig::new(None, Some(100)),
    );
    let ctx = CallContext::new().with_service_config(service_config);

    let next: NextCall<ClientCallArgs> = Box::new(|args: ClientCallArgs| {
        async move {
            args.server_initial_metadata.set(MetadataBatch::new());
            args.incoming_messages.push(Message::new(vec![1u8; 101], 0)).await;
            Ok(MetadataBatch::new())
        }
        .boxed()
    });

    let status = filter.make_call_promise(args, &ctx, next).await.unwrap_err();
    assert_eq!(status.code(), Code::ResourceExhausted);
    assert_eq!(
        status.message(),
        Some("Received message larger than max (101 vs. 100)")
    );
}

#[tokio::test]
async fn test_call_without_server_metadata_succeeds() {
    let filter = ClientCompressionFilter::from_channel_args(&gzip_channel());
    let (call, args) = ClientCall::new(MetadataBatch::new());

    let next: NextCall<ClientCallArgs> =
        Box::new(|_args: ClientCallArgs| async { Ok(MetadataBatch::new()) }.boxed());

    let result = filter
        .make_call_promise(args, &CallContext::new(), next)
        .await;
    assert!(result.is_ok());
    assert!(call.server_initial_metadata.wait().await.is_none());
}

#[tokio::test]
async fn test_transport_failure_is_call_status() {
    let filter = ClientCompressionFilter::from_channel_args(&gzip_channel());
    let (_call, args) = ClientCall::new(MetadataBatch::new());

    let next: NextCall<ClientCallArgs> = Box::new(|_args: ClientCallArgs| {
        async { Err(Status::new(Code::Unavailable, "connection reset")) }.boxed()
    });

    let status = filter
        .make_call_promise(args, &CallContext::new(), next)
        .await
        .unwrap_err();
    assert_eq!(status.code(), Code::Unavailable);
}

#[test]
fn test_filter_identity() {
    assert_eq!(ClientCompressionFilter::NAME, "compression");
    assert_eq!(
        ClientCompressionFilter::ENDPOINT,
        compression_filter::FilterEndpoint::Client
    );
}
