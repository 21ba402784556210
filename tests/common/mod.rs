//! Shared fixtures for the integration suites: a recording exchange and a
//! scriptable dispatcher.

#![allow(dead_code)]

use std::sync::Mutex;

use bytes::Bytes;
use matter_im::interaction::domain_types::{ExchangeId, FabricIndex, NodeId};
use matter_im::interaction::messages::{AttributePath, CommandPath, OpCode};
use matter_im::interaction::traits::{
    AttributeReadOutcome, AttributeReadRequest, AttributeWriteRequest, CommandInvokeRequest,
    CommandOutcome,
};
use matter_im::{Dispatcher, Exchange, ImError, InteractionContext};

/// Exchange double that records every outbound message.
pub struct MockExchange {
    id: ExchangeId,
    fabric: FabricIndex,
    timed: bool,
    sent: Mutex<Vec<(OpCode, Bytes)>>,
}

impl MockExchange {
    pub fn new() -> Self {
        Self {
            id: ExchangeId::from(1),
            fabric: FabricIndex::unscoped(),
            timed: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn with_fabric(mut self, fabric: u8) -> Self {
        self.fabric = FabricIndex::new(fabric);
        self
    }

    pub fn with_timed(mut self, timed: bool) -> Self {
        self.timed = timed;
        self
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<(OpCode, Bytes)> {
        self.sent.lock().unwrap().clone()
    }

    /// The single message sent so far; panics when there is not exactly one.
    pub fn only_sent(&self) -> (OpCode, Bytes) {
        let sent = self.sent();
        assert_eq!(sent.len(), 1, "expected exactly one sent message");
        sent.into_iter().next().unwrap()
    }
}

impl Exchange for MockExchange {
    fn id(&self) -> ExchangeId {
        self.id
    }

    fn fabric_index(&self) -> FabricIndex {
        self.fabric
    }

    fn peer_node_id(&self) -> Option<NodeId> {
        Some(NodeId::from(0xDEAD_BEEF_u64))
    }

    fn in_timed_interaction(&self) -> bool {
        self.timed
    }

    fn send_message(
        &self,
        opcode: OpCode,
        payload: Bytes,
        _expect_response: bool,
    ) -> Result<(), ImError> {
        self.sent.lock().unwrap().push((opcode, payload));
        Ok(())
    }

    fn close(&self) {}
}

/// Dispatcher double: reads return a configured payload, writes record their
/// paths, invokes succeed without response data.
pub struct ScriptedDispatcher {
    pub read_payload: Option<Bytes>,
    pub write_result: Result<(), ImError>,
    pub writes: Mutex<Vec<AttributePath>>,
    pub invokes: Mutex<Vec<CommandPath>>,
}

impl ScriptedDispatcher {
    pub fn new() -> Self {
        Self {
            read_payload: Some(Bytes::from_static(b"{}")),
            write_result: Ok(()),
            writes: Mutex::new(Vec::new()),
            invokes: Mutex::new(Vec::new()),
        }
    }

    pub fn with_read_payload(mut self, payload: Bytes) -> Self {
        self.read_payload = Some(payload);
        self
    }

    pub fn with_write_result(mut self, result: Result<(), ImError>) -> Self {
        self.write_result = result;
        self
    }
}

impl Dispatcher for ScriptedDispatcher {
    fn read_attribute(
        &self,
        _ctx: &InteractionContext,
        _request: &AttributeReadRequest,
    ) -> Result<Option<AttributeReadOutcome>, ImError> {
        Ok(self.read_payload.clone().map(|payload| {
            AttributeReadOutcome::Data {
                data_version: None,
                payload,
            }
        }))
    }

    fn write_attribute(
        &self,
        _ctx: &InteractionContext,
        request: &AttributeWriteRequest,
    ) -> Result<(), ImError> {
        self.writes.lock().unwrap().push(request.path);
        self.write_result.clone()
    }

    fn invoke_command(
        &self,
        _ctx: &InteractionContext,
        request: &CommandInvokeRequest,
    ) -> Result<Option<CommandOutcome>, ImError> {
        self.invokes.lock().unwrap().push(request.path);
        Ok(None)
    }
}
