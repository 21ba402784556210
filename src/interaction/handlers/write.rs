//! Write interaction handler
//!
//! Synthesizes one status per write entry. This handler never produces
//! chunked responses and refuses chunked inbound writes, which imply list
//! operations.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::{ImError, StatusCode};
use crate::interaction::messages::{
    AttributeDataIb, AttributeStatusIb, StatusIb, WriteRequest, WriteResponse,
};
use crate::interaction::traits::{AttributeWriteRequest, Dispatcher, InteractionContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteState {
    Idle,
    Processing,
}

/// Handler for Write interactions.
pub struct WriteHandler {
    state: Mutex<WriteState>,
}

impl WriteHandler {
    /// Creates an idle handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(WriteState::Idle),
        }
    }

    /// Handles one WriteRequest.
    ///
    /// Every write entry is attempted even when the response is suppressed;
    /// `Ok(None)` means no response message should be sent.
    ///
    /// # Errors
    /// [`ImError::NeedsTimedInteraction`] when the request claims a timed
    /// context the exchange is not in; [`ImError::UnsupportedListOperation`]
    /// for chunked writes. Both abort before any dispatch.
    pub fn handle_write_request(
        &self,
        dispatcher: Option<&dyn Dispatcher>,
        request: &WriteRequest,
        ctx: &InteractionContext,
    ) -> Result<Option<WriteResponse>, ImError> {
        let mut state = self.lock();
        *state = WriteState::Processing;
        let result = Self::process(dispatcher, request, ctx);
        *state = WriteState::Idle;
        result
    }

    /// Returns the handler to idle, discarding any in-flight processing
    /// marker.
    pub fn reset(&self) {
        *self.lock() = WriteState::Idle;
    }

    fn process(
        dispatcher: Option<&dyn Dispatcher>,
        request: &WriteRequest,
        ctx: &InteractionContext,
    ) -> Result<Option<WriteResponse>, ImError> {
        if request.timed_request && !ctx.timed {
            return Err(ImError::NeedsTimedInteraction);
        }
        if request.more_chunks {
            return Err(ImError::UnsupportedListOperation);
        }

        let write_responses = request
            .write_requests
            .iter()
            .map(|entry| AttributeStatusIb {
                path: entry.path,
                status: StatusIb::new(Self::write_one(dispatcher, entry, ctx)),
            })
            .collect();

        if request.suppress_response {
            debug!("write response suppressed by request");
            return Ok(None);
        }
        Ok(Some(WriteResponse { write_responses }))
    }

    fn write_one(
        dispatcher: Option<&dyn Dispatcher>,
        entry: &AttributeDataIb,
        ctx: &InteractionContext,
    ) -> StatusCode {
        if entry.path.is_wildcard() {
            return StatusCode::InvalidAction;
        }
        if entry.path.list_index.is_some() {
            return StatusCode::UnsupportedWrite;
        }
        let Some(dispatcher) = dispatcher else {
            return StatusCode::UnsupportedCluster;
        };

        let request = AttributeWriteRequest {
            path: entry.path,
            data_version: entry.data_version,
            data: entry.data.clone(),
        };
        match dispatcher.write_attribute(ctx, &request) {
            Ok(()) => StatusCode::Success,
            Err(err) => err.to_status(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, WriteState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for WriteHandler {
    fn default() -> Self {
        Self::new()
    }
}
