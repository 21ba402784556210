//! # matter-im - Matter Interaction Model Engine
//!
//! Server-side core of the Matter Interaction Model: the protocol state
//! machine that mediates between a reliable exchange layer below and a
//! pluggable data-model dispatcher above. Controllers issue Read, Write, and
//! Invoke interactions against clusters of attributes, events, and commands;
//! this crate routes those interactions, chunks oversize transfers with
//! ack-driven flow control, stores and reports events, and maps every
//! internal error kind onto its wire status code.
//!
//! The TLV codec, secure sessions, access control, and concrete clusters are
//! external collaborators reached through the traits in
//! [`interaction::traits`] and [`interaction::codec`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use matter_im::{EngineConfig, InteractionEngine, NullDispatcher};
//!
//! let engine = InteractionEngine::builder()
//!     .config(EngineConfig::default())
//!     .dispatcher(Arc::new(NullDispatcher))
//!     .build();
//! // Register `engine` with the exchange manager under protocol id 0x0001;
//! // it will serve every inbound IM message via ProtocolHandler::on_message.
//! ```

pub mod error;
pub mod interaction;

pub use crate::error::{ImError, StatusCode};
pub use crate::interaction::{
    Dispatcher, EngineConfig, EventListener, EventManager, EventRecord, EventReporter, Exchange,
    ExchangeManager, INTERACTION_MODEL_PROTOCOL_ID, InteractionContext, InteractionEngine,
    JsonCodec, MessageCodec, NullDispatcher, ProtocolHandler,
};
