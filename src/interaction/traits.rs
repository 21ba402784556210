//! Trait definitions for the engine's external collaborators
//!
//! The engine owns no transport and no data model: the exchange layer below
//! and the cluster dispatcher above are reached exclusively through the
//! interfaces defined here, which keeps both sides mockable.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::ImError;
use crate::interaction::domain_types::{
    DataVersion, ExchangeId, FabricIndex, NodeId,
};
use crate::interaction::messages::{AttributePath, CommandPath, OpCode, StatusIb};

/// Session-scoped attributes of the interaction being served.
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext {
    /// Fabric the accessing session belongs to; 0 when unscoped.
    pub fabric_index: FabricIndex,
    /// Peer node, when the session is authenticated to one.
    pub source_node_id: Option<NodeId>,
    /// True when the exchange is inside a timed interaction window.
    pub timed: bool,
}

/// One attribute read forwarded to the data model.
#[derive(Debug, Clone)]
pub struct AttributeReadRequest {
    /// The attribute addressed; concrete by the time it reaches the
    /// dispatcher.
    pub path: AttributePath,
    /// Restrict fabric-scoped data to the accessing fabric.
    pub fabric_filtered: bool,
}

/// What the data model produced for one attribute read.
#[derive(Debug, Clone)]
pub enum AttributeReadOutcome {
    /// A value, as opaque TLV bytes plus the cluster data version.
    Data {
        /// Cluster data version at read time, when tracked.
        data_version: Option<DataVersion>,
        /// The encoded value.
        payload: Bytes,
    },
    /// A cluster-chosen status instead of a value.
    Status(StatusIb),
}

/// One attribute write forwarded to the data model.
#[derive(Debug, Clone)]
pub struct AttributeWriteRequest {
    /// The attribute addressed; concrete and without list index.
    pub path: AttributePath,
    /// Version precondition supplied by the client, when any.
    pub data_version: Option<DataVersion>,
    /// The encoded value to write.
    pub data: Bytes,
}

/// One command invocation forwarded to the data model.
#[derive(Debug, Clone)]
pub struct CommandInvokeRequest {
    /// The command addressed.
    pub path: CommandPath,
    /// Opaque TLV-encoded command fields; must be consumed within the call.
    pub fields: Bytes,
}

/// What the data model produced for one command.
#[derive(Debug, Clone)]
pub enum CommandOutcome {
    /// A response command with payload.
    Data {
        /// Path of the response command.
        path: CommandPath,
        /// The encoded response fields.
        payload: Bytes,
    },
    /// A cluster-chosen status.
    Status(StatusIb),
}

/// The data-model dispatcher behind the engine.
///
/// Implementations resolve paths to concrete clusters and perform the
/// operation. Per-element errors are returned as `ImError` kinds and
/// projected to statuses by the handlers; implementations never see the wire.
pub trait Dispatcher: Send + Sync {
    /// Reads one attribute.
    ///
    /// `Ok(None)` means the attribute does not exist.
    ///
    /// # Errors
    /// Any `ImError` kind; surfaced as a per-element status.
    fn read_attribute(
        &self,
        ctx: &InteractionContext,
        request: &AttributeReadRequest,
    ) -> Result<Option<AttributeReadOutcome>, ImError>;

    /// Writes one attribute.
    ///
    /// # Errors
    /// Any `ImError` kind; mapped to the per-element status.
    fn write_attribute(
        &self,
        ctx: &InteractionContext,
        request: &AttributeWriteRequest,
    ) -> Result<(), ImError>;

    /// Invokes one command.
    ///
    /// `Ok(None)` means success without response data.
    ///
    /// # Errors
    /// Any `ImError` kind; surfaced as a per-element status.
    fn invoke_command(
        &self,
        ctx: &InteractionContext,
        request: &CommandInvokeRequest,
    ) -> Result<Option<CommandOutcome>, ImError>;
}

/// Dispatcher that knows no clusters; every operation fails with
/// [`ImError::ClusterNotFound`]. Useful as a test seam.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

impl Dispatcher for NullDispatcher {
    fn read_attribute(
        &self,
        _ctx: &InteractionContext,
        _request: &AttributeReadRequest,
    ) -> Result<Option<AttributeReadOutcome>, ImError> {
        Err(ImError::ClusterNotFound)
    }

    fn write_attribute(
        &self,
        _ctx: &InteractionContext,
        _request: &AttributeWriteRequest,
    ) -> Result<(), ImError> {
        Err(ImError::ClusterNotFound)
    }

    fn invoke_command(
        &self,
        _ctx: &InteractionContext,
        _request: &CommandInvokeRequest,
    ) -> Result<Option<CommandOutcome>, ImError> {
        Err(ImError::ClusterNotFound)
    }
}

/// One reliable, ordered message conversation provided by the exchange layer.
///
/// The engine replies on the exchange that delivered the request and treats
/// `send_message` as blocking: it returns once the message is handed to the
/// transport, or with a transport error.
pub trait Exchange: Send + Sync {
    /// Exchange identifier, unique per session.
    fn id(&self) -> ExchangeId;

    /// Fabric of the session carrying this exchange.
    fn fabric_index(&self) -> FabricIndex;

    /// Peer node of the session, when authenticated.
    fn peer_node_id(&self) -> Option<NodeId>;

    /// True while the exchange is inside a timed interaction window.
    fn in_timed_interaction(&self) -> bool;

    /// Sends one protocol message on this exchange.
    ///
    /// `expect_response` tells the exchange layer to keep the exchange open
    /// for the peer's reply (chunk flow control).
    ///
    /// # Errors
    /// Returns [`ImError::Transport`] when the transport rejects the send.
    fn send_message(
        &self,
        opcode: OpCode,
        payload: Bytes,
        expect_response: bool,
    ) -> Result<(), ImError>;

    /// Closes the exchange.
    fn close(&self);
}

impl InteractionContext {
    /// Captures the session-scoped attributes of an exchange.
    #[must_use]
    pub fn from_exchange(exchange: &dyn Exchange) -> Self {
        Self {
            fabric_index: exchange.fabric_index(),
            source_node_id: exchange.peer_node_id(),
            timed: exchange.in_timed_interaction(),
        }
    }
}

/// Management surface of the exchange layer.
///
/// The engine is handed to `register_protocol` once at startup;
/// `new_exchange` exists for initiators (client wrappers, unsolicited event
/// reports) and is not called on the request path.
pub trait ExchangeManager: Send + Sync {
    /// Registers a protocol handler under its protocol id.
    ///
    /// # Errors
    /// Implementation-defined; typically a duplicate registration.
    fn register_protocol(&self, handler: Arc<dyn ProtocolHandler>) -> Result<(), ImError>;

    /// Opens a new exchange to a peer node for the given protocol.
    ///
    /// # Errors
    /// [`ImError::Transport`] when no session to the peer is available.
    fn new_exchange(&self, peer: NodeId, protocol_id: u16) -> Result<Arc<dyn Exchange>, ImError>;
}

/// Delegate surface the exchange manager invokes for a registered protocol.
pub trait ProtocolHandler: Send + Sync {
    /// The protocol identifier this handler is registered under.
    fn protocol_id(&self) -> u16;

    /// Handles one inbound protocol message.
    ///
    /// # Errors
    /// Returns an error only when the handler could not produce any reply
    /// (including an error reply) on the exchange.
    fn on_message(
        &self,
        exchange: &dyn Exchange,
        opcode: u8,
        payload: &[u8],
    ) -> Result<(), ImError>;

    /// Notifies the handler that an exchange closed.
    fn on_exchange_close(&self, exchange_id: ExchangeId);
}
