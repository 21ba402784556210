//! Interaction Model message shells and information blocks
//!
//! These are the decoded forms of the TLV structures exchanged on an IM
//! exchange: request/response shells, the per-element information blocks
//! (IBs) they carry, and the protocol opcodes that select between them.
//! Encoding to and from wire bytes is the codec's concern; payload fields
//! stay opaque [`Bytes`].

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::StatusCode;
use crate::interaction::domain_types::{
    AttributeId, ClusterId, CommandId, CommandRef, DataVersion, EndpointId, EventId, EventNumber,
    EventPriority, ListIndex, NodeId, SubscriptionId,
};

/// Protocol opcodes carried in the exchange protocol header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum OpCode {
    /// Flow-control and generic error reply.
    StatusResponse = 0x01,
    /// Read interaction request.
    ReadRequest = 0x02,
    /// Subscribe interaction request (refused by this engine).
    SubscribeRequest = 0x03,
    /// Subscribe interaction response.
    SubscribeResponse = 0x04,
    /// Attribute and event report, possibly chunked.
    ReportData = 0x05,
    /// Write interaction request.
    WriteRequest = 0x06,
    /// Write interaction response.
    WriteResponse = 0x07,
    /// Invoke interaction request.
    InvokeRequest = 0x08,
    /// Invoke interaction response, possibly chunked.
    InvokeResponse = 0x09,
    /// Timed interaction opener (refused by this engine).
    TimedRequest = 0x0A,
}

impl OpCode {
    /// Returns the raw opcode byte.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a raw opcode byte.
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        let op = match raw {
            0x01 => OpCode::StatusResponse,
            0x02 => OpCode::ReadRequest,
            0x03 => OpCode::SubscribeRequest,
            0x04 => OpCode::SubscribeResponse,
            0x05 => OpCode::ReportData,
            0x06 => OpCode::WriteRequest,
            0x07 => OpCode::WriteResponse,
            0x08 => OpCode::InvokeRequest,
            0x09 => OpCode::InvokeResponse,
            0x0A => OpCode::TimedRequest,
            _ => return None,
        };
        Some(op)
    }
}

/// Path addressing an attribute; absent fields are wildcards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributePath {
    /// Endpoint, or wildcard.
    pub endpoint: Option<EndpointId>,
    /// Cluster, or wildcard.
    pub cluster: Option<ClusterId>,
    /// Attribute, or wildcard.
    pub attribute: Option<AttributeId>,
    /// Index into a list attribute, when addressing a single element.
    pub list_index: Option<ListIndex>,
}

impl AttributePath {
    /// Builds a concrete (non-wildcard) path.
    #[must_use]
    pub fn concrete(
        endpoint: impl Into<EndpointId>,
        cluster: impl Into<ClusterId>,
        attribute: impl Into<AttributeId>,
    ) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            cluster: Some(cluster.into()),
            attribute: Some(attribute.into()),
            list_index: None,
        }
    }

    /// True when any of endpoint, cluster, or attribute is absent.
    #[must_use]
    pub fn is_wildcard(&self) -> bool {
        self.endpoint.is_none() || self.cluster.is_none() || self.attribute.is_none()
    }
}

/// Path addressing a command; all fields are required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandPath {
    /// Endpoint hosting the cluster.
    pub endpoint: EndpointId,
    /// Cluster exposing the command.
    pub cluster: ClusterId,
    /// The command itself.
    pub command: CommandId,
}

impl CommandPath {
    /// Builds a command path.
    #[must_use]
    pub fn new(
        endpoint: impl Into<EndpointId>,
        cluster: impl Into<ClusterId>,
        command: impl Into<CommandId>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            cluster: cluster.into(),
            command: command.into(),
        }
    }
}

/// Path addressing an event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventPath {
    /// Endpoint hosting the cluster.
    pub endpoint: EndpointId,
    /// Cluster emitting the event.
    pub cluster: ClusterId,
    /// The event itself.
    pub event: EventId,
}

impl EventPath {
    /// Builds an event path.
    #[must_use]
    pub fn new(
        endpoint: impl Into<EndpointId>,
        cluster: impl Into<ClusterId>,
        event: impl Into<EventId>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            cluster: cluster.into(),
            event: event.into(),
        }
    }
}

/// Status IB: a status code plus an optional cluster-specific status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusIb {
    /// The IM status code.
    pub status: StatusCode,
    /// Cluster-defined refinement of the status, when present.
    pub cluster_status: Option<u8>,
}

impl StatusIb {
    /// Builds a status IB without a cluster-specific byte.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            cluster_status: None,
        }
    }
}

/// Attribute data IB: a reported or written attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeDataIb {
    /// Cluster data version at read time, or the version precondition on
    /// write.
    pub data_version: Option<DataVersion>,
    /// The attribute addressed.
    pub path: AttributePath,
    /// Opaque TLV-encoded value.
    pub data: Bytes,
}

/// Attribute status IB: per-attribute outcome of a read or write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeStatusIb {
    /// The attribute addressed.
    pub path: AttributePath,
    /// The outcome.
    pub status: StatusIb,
}

/// One entry of a ReportData attribute report list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttributeReportIb {
    /// A successfully read value.
    Data(AttributeDataIb),
    /// A per-attribute failure.
    Status(AttributeStatusIb),
}

/// Command data IB: one invoked command or one command response payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandDataIb {
    /// The command addressed.
    pub path: CommandPath,
    /// Opaque TLV-encoded command fields.
    pub fields: Bytes,
    /// Correlation reference, mandatory in multi-command interactions.
    pub command_ref: Option<CommandRef>,
}

/// Command status IB: per-command outcome without response data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandStatusIb {
    /// The command addressed.
    pub path: CommandPath,
    /// The outcome.
    pub status: StatusIb,
    /// Correlation reference, mandatory in multi-command interactions.
    pub command_ref: Option<CommandRef>,
}

/// One entry of an InvokeResponse list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum InvokeResponseIb {
    /// A command that produced response data.
    Command(CommandDataIb),
    /// A command that produced only a status.
    Status(CommandStatusIb),
}

impl InvokeResponseIb {
    /// The correlation reference of either variant.
    #[must_use]
    pub fn command_ref(&self) -> Option<CommandRef> {
        match self {
            InvokeResponseIb::Command(data) => data.command_ref,
            InvokeResponseIb::Status(status) => status.command_ref,
        }
    }
}

/// Event data IB: one reported event record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDataIb {
    /// The event source.
    pub path: EventPath,
    /// Monotonic event number.
    pub event_number: EventNumber,
    /// Priority band the event was stored in.
    pub priority: EventPriority,
    /// Wall-clock timestamp in milliseconds since the UNIX epoch.
    pub epoch_timestamp_ms: u64,
    /// Opaque TLV-encoded event payload.
    pub data: Bytes,
}

/// Event status IB: per-event-path failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventStatusIb {
    /// The event source addressed.
    pub path: EventPath,
    /// The outcome.
    pub status: StatusIb,
}

/// One entry of a ReportData event report list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventReportIb {
    /// A reported event record.
    Data(EventDataIb),
    /// A per-path failure.
    Status(EventStatusIb),
}

/// Filter restricting which events a read returns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    /// Node the filter applies to, when scoped.
    pub node: Option<NodeId>,
    /// Lowest event number of interest.
    pub min_event_number: Option<EventNumber>,
}

/// Filter skipping attribute reports whose cluster data version is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataVersionFilter {
    /// Endpoint of the filtered cluster.
    pub endpoint: EndpointId,
    /// The filtered cluster.
    pub cluster: ClusterId,
    /// Version the client already holds.
    pub data_version: DataVersion,
}

/// Read interaction request shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadRequest {
    /// Attributes to report, in request order.
    #[serde(default)]
    pub attribute_requests: Vec<AttributePath>,
    /// Event sources to report.
    #[serde(default)]
    pub event_requests: Vec<EventPath>,
    /// Event filters; the first filter's minimum applies.
    #[serde(default)]
    pub event_filters: Vec<EventFilter>,
    /// Restrict fabric-scoped data to the accessing fabric.
    #[serde(default)]
    pub fabric_filtered: bool,
    /// Data versions the client already holds.
    #[serde(default)]
    pub data_version_filters: Vec<DataVersionFilter>,
}

/// Report shell answering reads (and, out of scope here, subscriptions).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportData {
    /// Subscription the report belongs to, when any.
    #[serde(default)]
    pub subscription_id: Option<SubscriptionId>,
    /// Attribute reports, in request order.
    #[serde(default)]
    pub attribute_reports: Vec<AttributeReportIb>,
    /// Event reports, in storage order.
    #[serde(default)]
    pub event_reports: Vec<EventReportIb>,
    /// True on every chunk except the last.
    #[serde(default)]
    pub more_chunks: bool,
    /// Sender asks the peer not to reply at the IM layer.
    #[serde(default)]
    pub suppress_response: bool,
}

/// Write interaction request shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRequest {
    /// Sender asks for no WriteResponse.
    #[serde(default)]
    pub suppress_response: bool,
    /// The write claims a timed interaction context.
    #[serde(default)]
    pub timed_request: bool,
    /// Attribute writes, in order.
    #[serde(default)]
    pub write_requests: Vec<AttributeDataIb>,
    /// True on every chunk except the last.
    #[serde(default)]
    pub more_chunks: bool,
}

/// Write interaction response shell.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    /// One status per write request entry, in request order.
    #[serde(default)]
    pub write_responses: Vec<AttributeStatusIb>,
}

/// Invoke interaction request shell. Never chunked on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeRequest {
    /// Sender asks for no InvokeResponse.
    #[serde(default)]
    pub suppress_response: bool,
    /// The invoke claims a timed interaction context.
    #[serde(default)]
    pub timed_request: bool,
    /// Commands to invoke, in order.
    #[serde(default)]
    pub invoke_requests: Vec<CommandDataIb>,
}

/// Invoke interaction response shell, possibly chunked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeResponse {
    /// Echo of the request's suppress flag.
    #[serde(default)]
    pub suppress_response: bool,
    /// One entry per command, in request order.
    #[serde(default)]
    pub invoke_responses: Vec<InvokeResponseIb>,
    /// True on every chunk except the last.
    #[serde(default)]
    pub more_chunks: bool,
}

/// Status response shell: flow control between chunks and generic errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResponse {
    /// The reported status.
    pub status: StatusCode,
}

impl StatusResponse {
    /// Builds a status response.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_bytes_round_trip() {
        for raw in 0x01..=0x0A {
            let op = OpCode::from_u8(raw).expect("opcode in assigned range");
            assert_eq!(op.as_u8(), raw);
        }
        assert_eq!(OpCode::from_u8(0x00), None);
        assert_eq!(OpCode::from_u8(0xFF), None);
    }

    #[test]
    fn test_wildcard_detection_requires_all_three_fields() {
        let concrete = AttributePath::concrete(0u16, 0x001F_u32, 0u32);
        assert!(!concrete.is_wildcard());

        let no_endpoint = AttributePath {
            endpoint: None,
            ..concrete
        };
        assert!(no_endpoint.is_wildcard());

        let no_attribute = AttributePath {
            attribute: None,
            ..concrete
        };
        assert!(no_attribute.is_wildcard());
    }

    #[test]
    fn test_invoke_response_entry_exposes_either_ref() {
        let path = CommandPath::new(1u16, 6u32, 2u32);
        let data = InvokeResponseIb::Command(CommandDataIb {
            path,
            fields: Bytes::new(),
            command_ref: Some(CommandRef::from(4)),
        });
        let status = InvokeResponseIb::Status(CommandStatusIb {
            path,
            status: StatusIb::new(StatusCode::Success),
            command_ref: None,
        });
        assert_eq!(data.command_ref(), Some(CommandRef::from(4)));
        assert_eq!(status.command_ref(), None);
    }
}
