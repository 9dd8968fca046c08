//! Call arguments threaded through the filter chain.
//!
//! Each side of a call hands a filter four things: the client's initial
//! metadata, the sink for the server's initial metadata, and one pipe end
//! per message direction. A filter may rewrite the metadata and swap any of
//! the ends before passing the args on to the next stage.
//!
//! [`ClientCall`] and [`ServerCall`] build a fresh set of args together with
//! the ends the outer side of the chain keeps.

use compression_filter_core::{Message, MetadataBatch, Status};

use crate::limits::ServiceConfigCallData;
use crate::pipe::{LatchSetter, LatchWaiter, PipeReceiver, PipeSender, latch, pipe};

/// Outcome of a call: trailing metadata on success.
pub type CallResult = Result<MetadataBatch, Status>;

/// Per-call context visible to every filter.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    service_config: ServiceConfigCallData,
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the parsed service config for this call.
    pub fn with_service_config(mut self, service_config: ServiceConfigCallData) -> Self {
        self.service_config = service_config;
        self
    }

    pub fn service_config(&self) -> &ServiceConfigCallData {
        &self.service_config
    }
}

/// Args of a client call, as seen by a stage on its way to the transport.
#[derive(Debug)]
pub struct ClientCallArgs {
    /// Metadata sent before the first request message.
    pub client_initial_metadata: MetadataBatch,
    /// Set by the transport once the server's initial metadata arrives.
    pub server_initial_metadata: LatchSetter<MetadataBatch>,
    /// Request messages from the application.
    pub outgoing_messages: PipeReceiver<Message>,
    /// Response messages toward the application.
    pub incoming_messages: PipeSender<Message>,
}

/// Args of a server call, as seen by a stage on its way to the application.
#[derive(Debug)]
pub struct ServerCallArgs {
    /// Metadata received before the first request message.
    pub client_initial_metadata: MetadataBatch,
    /// Set by the application when it sends its initial metadata.
    pub server_initial_metadata: LatchSetter<MetadataBatch>,
    /// Request messages from the transport.
    pub incoming_messages: PipeReceiver<Message>,
    /// Response messages toward the transport.
    pub outgoing_messages: PipeSender<Message>,
}

/// Application-side ends of a client call.
#[derive(Debug)]
pub struct ClientCall {
    /// Send request messages.
    pub outgoing: PipeSender<Message>,
    /// Receive response messages.
    pub incoming: PipeReceiver<Message>,
    /// Resolves to the server's initial metadata, or `None` if the call ended
    /// without any.
    pub server_initial_metadata: LatchWaiter<MetadataBatch>,
}

impl ClientCall {
    /// Start a client call with `client_initial_metadata`.
    pub fn new(client_initial_metadata: MetadataBatch) -> (Self, ClientCallArgs) {
        let (outgoing_tx, outgoing_rx) = pipe();
        let (incoming_tx, incoming_rx) = pipe();
        let (md_setter, md_waiter) = latch();

        let call = Self {
            outgoing: outgoing_tx,
            incoming: incoming_rx,
            server_initial_metadata: md_waiter,
        };
        let args = ClientCallArgs {
            client_initial_metadata,
            server_initial_metadata: md_setter,
            outgoing_messages: outgoing_rx,
            incoming_messages: incoming_tx,
        };
        (call, args)
    }
}

/// Transport-side ends of a server call.
#[derive(Debug)]
pub struct ServerCall {
    /// Deliver request messages.
    pub incoming: PipeSender<Message>,
    /// Collect response messages.
    pub outgoing: PipeReceiver<Message>,
    /// Resolves to the application's initial metadata.
    pub server_initial_metadata: LatchWaiter<MetadataBatch>,
}

impl ServerCall {
    /// Accept a server call whose client sent `client_initial_metadata`.
    pub fn new(client_initial_metadata: MetadataBatch) -> (Self, ServerCallArgs) {
        let (incoming_tx, incoming_rx) = pipe();
        let (outgoing_tx, outgoing_rx) = pipe();
        let (md_setter, md_waiter) = latch();

        let call = Self {
            incoming: incoming_tx,
            outgoing: outgoing_rx,
            server_initial_metadata: md_waiter,
        };
        let args = ServerCallArgs {
            client_initial_metadata,
            server_initial_metadata: md_setter,
            incoming_messages: incoming_rx,
            outgoing_messages: outgoing_tx,
        };
        (call, args)
    }
}
