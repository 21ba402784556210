//! The Interaction Model protocol engine
//!
//! This module is the server-side state machine between the exchange layer
//! below and the data-model dispatcher above:
//!
//! - [`engine::InteractionEngine`]: opcode router registered under protocol
//!   id 0x0001; decodes payloads, delegates to the per-interaction handlers,
//!   and replies on the delivering exchange
//! - [`handlers`]: Read, Write, and Invoke state machines
//! - [`chunking`]: outbound fragmentation with ack-driven flow control and
//!   inbound chunk assembly
//! - [`events`]: priority-banded event storage with monotonic numbering
//! - [`traits`]: the dispatcher, exchange, and protocol-handler seams
//! - [`codec`]: the message codec boundary (TLV stays out-of-tree; a JSON
//!   codec ships for tests and debugging)
//!
//! ## Message flow
//!
//! ```text
//! exchange layer -> on_message(opcode, payload) -> decode -> handler
//!        |                                                     |
//!        v                                                     v
//!   StatusResponse acks                              dispatcher calls per path
//!   release queued chunks                            response -> fragmenter
//! ```
//!
//! Chunked transfers are strictly request/response: chunk N+1 is sent only
//! after a Success StatusResponse for chunk N.

pub mod chunking;
pub mod codec;
pub mod config;
pub mod domain_types;
pub mod engine;
pub mod events;
pub mod handlers;
pub mod messages;
pub mod traits;

pub use chunking::{Assembler, AssemblyKind, DEFAULT_MAX_PAYLOAD, Fragmenter};
pub use codec::{JsonCodec, MessageCodec};
pub use config::{ConfigError, EngineConfig, EngineConfigBuilder};
pub use engine::{INTERACTION_MODEL_PROTOCOL_ID, InteractionEngine, InteractionEngineBuilder};
pub use events::{EventListener, EventManager, EventRecord, EventReporter};
pub use traits::{
    Dispatcher, Exchange, ExchangeManager, InteractionContext, NullDispatcher, ProtocolHandler,
};
