//! The opcode-dispatched Interaction Model engine
//!
//! One engine instance is registered with the exchange manager under
//! protocol id 0x0001 and serves every inbound IM message: it decodes the
//! payload, routes by opcode to the matching handler, and replies on the
//! same exchange with the correct response opcode. Inbound StatusResponses
//! during a chunked outbound sequence are forwarded to whichever handler is
//! mid-transfer.

use std::sync::{Arc, Mutex, PoisonError};

use tracing::{debug, info, warn};

use crate::error::{ImError, StatusCode};
use crate::interaction::chunking::Fragmenter;
use crate::interaction::codec::{JsonCodec, MessageCodec};
use crate::interaction::config::EngineConfig;
use crate::interaction::domain_types::ExchangeId;
use crate::interaction::events::EventManager;
use crate::interaction::handlers::{InvokeHandler, ReadHandler, WriteHandler};
use crate::interaction::messages::{OpCode, StatusResponse};
use crate::interaction::traits::{Dispatcher, Exchange, InteractionContext, ProtocolHandler};

/// Protocol identifier the engine is registered under.
pub const INTERACTION_MODEL_PROTOCOL_ID: u16 = 0x0001;

/// Which handler owns the outbound chunk sequence in flight, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingChunkSource {
    None,
    Read,
    Invoke,
}

/// The Interaction Model protocol engine.
///
/// Construct through [`InteractionEngine::builder`]. The engine is safe to
/// share across the exchange layer's delivery threads; each stateful part is
/// guarded by its own lock, and the exchange layer is expected to serialize
/// messages per exchange.
pub struct InteractionEngine {
    codec: Arc<dyn MessageCodec>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    events: Arc<EventManager>,
    fragmenter: Fragmenter,
    read_handler: ReadHandler,
    write_handler: WriteHandler,
    invoke_handler: InvokeHandler,
    pending: Mutex<PendingChunkSource>,
}

impl InteractionEngine {
    /// Creates an engine builder.
    #[must_use]
    pub fn builder() -> InteractionEngineBuilder {
        InteractionEngineBuilder::new()
    }

    /// The event manager serving this engine's event reads.
    #[must_use]
    pub fn events(&self) -> &Arc<EventManager> {
        &self.events
    }

    fn handle_read(&self, exchange: &dyn Exchange, payload: &[u8]) -> Result<(), ImError> {
        let request = match self.codec.decode_read_request(payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(%err, "undecodable read request");
                return self.send_status(exchange, StatusCode::InvalidAction);
            }
        };

        let ctx = InteractionContext::from_exchange(exchange);
        let chunk = self.read_handler.handle_read_request(
            self.dispatcher.as_deref(),
            &self.events,
            &self.fragmenter,
            &request,
            &ctx,
        );
        if !self.read_handler.is_idle() {
            *self.pending_lock() = PendingChunkSource::Read;
        }

        let bytes = self.codec.encode_report_data(&chunk)?;
        exchange.send_message(OpCode::ReportData, bytes, chunk.more_chunks)
    }

    fn handle_write(&self, exchange: &dyn Exchange, payload: &[u8]) -> Result<(), ImError> {
        let request = match self.codec.decode_write_request(payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(%err, "undecodable write request");
                return self.send_status(exchange, StatusCode::InvalidAction);
            }
        };

        let ctx = InteractionContext::from_exchange(exchange);
        match self
            .write_handler
            .handle_write_request(self.dispatcher.as_deref(), &request, &ctx)
        {
            Ok(Some(response)) => {
                let bytes = self.codec.encode_write_response(&response)?;
                exchange.send_message(OpCode::WriteResponse, bytes, false)
            }
            Ok(None) => Ok(()),
            Err(err) => {
                debug!(%err, "write precondition failed");
                self.send_status(exchange, err.to_status())
            }
        }
    }

    fn handle_invoke(&self, exchange: &dyn Exchange, payload: &[u8]) -> Result<(), ImError> {
        let request = match self.codec.decode_invoke_request(payload) {
            Ok(request) => request,
            Err(err) => {
                warn!(%err, "undecodable invoke request");
                return self.send_status(exchange, StatusCode::InvalidAction);
            }
        };

        let ctx = InteractionContext::from_exchange(exchange);
        match self.invoke_handler.handle_invoke_request(
            self.dispatcher.as_deref(),
            &self.fragmenter,
            &request,
            &ctx,
        ) {
            Ok(chunk) => {
                if !self.invoke_handler.is_idle() {
                    *self.pending_lock() = PendingChunkSource::Invoke;
                }
                let bytes = self.codec.encode_invoke_response(&chunk)?;
                exchange.send_message(OpCode::InvokeResponse, bytes, chunk.more_chunks)
            }
            Err(err) => {
                debug!(%err, "invoke precondition failed");
                self.send_status(exchange, err.to_status())
            }
        }
    }

    fn handle_status_response(
        &self,
        exchange: &dyn Exchange,
        payload: &[u8],
    ) -> Result<(), ImError> {
        let response = match self.codec.decode_status_response(payload) {
            Ok(response) => response,
            Err(err) => {
                warn!(%err, "undecodable status response");
                return self.send_status(exchange, StatusCode::InvalidAction);
            }
        };

        let source = *self.pending_lock();
        match source {
            PendingChunkSource::Read => {
                let next = self.read_handler.handle_status_response(response.status);
                if self.read_handler.is_idle() {
                    *self.pending_lock() = PendingChunkSource::None;
                }
                match next {
                    Some(chunk) => {
                        let bytes = self.codec.encode_report_data(&chunk)?;
                        exchange.send_message(OpCode::ReportData, bytes, chunk.more_chunks)
                    }
                    None => Ok(()),
                }
            }
            PendingChunkSource::Invoke => {
                let next = self.invoke_handler.handle_status_response(response.status);
                if self.invoke_handler.is_idle() {
                    *self.pending_lock() = PendingChunkSource::None;
                }
                match next {
                    Some(chunk) => {
                        let bytes = self.codec.encode_invoke_response(&chunk)?;
                        exchange.send_message(OpCode::InvokeResponse, bytes, chunk.more_chunks)
                    }
                    None => Ok(()),
                }
            }
            PendingChunkSource::None => {
                debug!(status = ?response.status, "status response with no transfer in flight");
                Ok(())
            }
        }
    }

    fn send_status(&self, exchange: &dyn Exchange, status: StatusCode) -> Result<(), ImError> {
        let bytes = self
            .codec
            .encode_status_response(&StatusResponse::new(status))?;
        exchange.send_message(OpCode::StatusResponse, bytes, false)
    }

    fn reset_handlers(&self) {
        self.read_handler.reset();
        self.write_handler.reset();
        self.invoke_handler.reset();
        *self.pending_lock() = PendingChunkSource::None;
    }

    fn pending_lock(&self) -> std::sync::MutexGuard<'_, PendingChunkSource> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ProtocolHandler for InteractionEngine {
    fn protocol_id(&self) -> u16 {
        INTERACTION_MODEL_PROTOCOL_ID
    }

    fn on_message(
        &self,
        exchange: &dyn Exchange,
        opcode: u8,
        payload: &[u8],
    ) -> Result<(), ImError> {
        let Some(opcode) = OpCode::from_u8(opcode) else {
            debug!(opcode, "unknown opcode");
            return self.send_status(exchange, StatusCode::InvalidAction);
        };
        debug!(?opcode, exchange = %exchange.id(), "inbound message");

        match opcode {
            OpCode::ReadRequest => self.handle_read(exchange, payload),
            OpCode::WriteRequest => self.handle_write(exchange, payload),
            OpCode::InvokeRequest => self.handle_invoke(exchange, payload),
            OpCode::StatusResponse => self.handle_status_response(exchange, payload),
            OpCode::SubscribeRequest | OpCode::TimedRequest => {
                self.send_status(exchange, StatusCode::UnsupportedAccess)
            }
            OpCode::SubscribeResponse
            | OpCode::ReportData
            | OpCode::WriteResponse
            | OpCode::InvokeResponse => self.send_status(exchange, StatusCode::InvalidAction),
        }
    }

    fn on_exchange_close(&self, exchange_id: ExchangeId) {
        debug!(exchange = %exchange_id, "exchange closed, resetting handlers");
        self.reset_handlers();
    }
}

/// Builder for [`InteractionEngine`].
pub struct InteractionEngineBuilder {
    config: EngineConfig,
    codec: Option<Arc<dyn MessageCodec>>,
    dispatcher: Option<Arc<dyn Dispatcher>>,
    events: Option<Arc<EventManager>>,
}

impl InteractionEngineBuilder {
    /// Creates a builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            codec: None,
            dispatcher: None,
            events: None,
        }
    }

    /// Sets the engine configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the message codec; defaults to [`JsonCodec`].
    #[must_use]
    pub fn codec(mut self, codec: Arc<dyn MessageCodec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Sets the data-model dispatcher. Without one, reads report
    /// `UnsupportedAttribute`, invokes `UnsupportedCommand`, and writes
    /// `UnsupportedCluster` per element.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Shares an existing event manager; defaults to a fresh one sized from
    /// the configuration.
    #[must_use]
    pub fn events(mut self, events: Arc<EventManager>) -> Self {
        self.events = Some(events);
        self
    }

    /// Builds the engine.
    #[must_use]
    pub fn build(self) -> InteractionEngine {
        let fragmenter = Fragmenter::new(self.config.max_payload());
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(EventManager::from_config(&self.config)));
        let codec = self.codec.unwrap_or_else(|| Arc::new(JsonCodec));

        info!(
            max_payload = fragmenter.max_payload(),
            has_dispatcher = self.dispatcher.is_some(),
            "interaction engine ready"
        );
        InteractionEngine {
            codec,
            dispatcher: self.dispatcher,
            events,
            fragmenter,
            read_handler: ReadHandler::new(),
            write_handler: WriteHandler::new(),
            invoke_handler: InvokeHandler::new(),
            pending: Mutex::new(PendingChunkSource::None),
        }
    }
}

impl Default for InteractionEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_registers_under_the_im_protocol_id() {
        let engine = InteractionEngine::builder().build();
        assert_eq!(engine.protocol_id(), 0x0001);
    }

    #[test]
    fn test_builder_defaults_produce_a_working_engine() {
        let engine = InteractionEngine::builder().build();
        assert_eq!(engine.fragmenter.max_payload(), 1180);
        assert_eq!(engine.events().latest_event_number(), 0);
    }
}
