//! Invoke interaction handler
//!
//! Runs each command through the dispatcher, correlates responses with
//! command refs, and drives chunked response transmission the same way the
//! read handler drives reports.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::{ImError, StatusCode};
use crate::interaction::chunking::Fragmenter;
use crate::interaction::domain_types::CommandRef;
use crate::interaction::messages::{
    CommandDataIb, CommandStatusIb, InvokeRequest, InvokeResponse, InvokeResponseIb, StatusIb,
};
use crate::interaction::traits::{
    CommandInvokeRequest, CommandOutcome, Dispatcher, InteractionContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InvokeState {
    Idle,
    Processing,
    SendingResponse,
}

struct InvokeInner {
    state: InvokeState,
    pending: VecDeque<InvokeResponse>,
}

/// Handler for Invoke interactions.
pub struct InvokeHandler {
    inner: Mutex<InvokeInner>,
}

impl InvokeHandler {
    /// Creates an idle handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(InvokeInner {
                state: InvokeState::Idle,
                pending: VecDeque::new(),
            }),
        }
    }

    /// Handles one InvokeRequest and returns the first (or only) response
    /// chunk.
    ///
    /// In multi-command requests every response entry carries a command ref:
    /// the request's when supplied, the request index otherwise.
    ///
    /// # Errors
    /// [`ImError::NeedsTimedInteraction`] when the request claims a timed
    /// context the exchange is not in.
    pub fn handle_invoke_request(
        &self,
        dispatcher: Option<&dyn Dispatcher>,
        fragmenter: &Fragmenter,
        request: &InvokeRequest,
        ctx: &InteractionContext,
    ) -> Result<InvokeResponse, ImError> {
        let mut inner = self.lock();
        inner.state = InvokeState::Processing;
        inner.pending.clear();

        if request.timed_request && !ctx.timed {
            inner.state = InvokeState::Idle;
            return Err(ImError::NeedsTimedInteraction);
        }

        let multi = request.invoke_requests.len() > 1;
        let invoke_responses = request
            .invoke_requests
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let reference = entry.command_ref.or_else(|| {
                    multi.then(|| CommandRef::from(index as u16))
                });
                Self::invoke_one(dispatcher, entry, reference, ctx)
            })
            .collect();

        let response = InvokeResponse {
            suppress_response: request.suppress_response,
            invoke_responses,
            more_chunks: false,
        };

        let mut chunks = VecDeque::from(fragmenter.fragment_invoke_response(&response));
        let first = chunks.pop_front().unwrap_or_else(|| InvokeResponse {
            suppress_response: request.suppress_response,
            ..Default::default()
        });
        if chunks.is_empty() {
            inner.state = InvokeState::Idle;
        } else {
            debug!(remaining = chunks.len(), "invoke response chunked");
            inner.pending = chunks;
            inner.state = InvokeState::SendingResponse;
        }
        Ok(first)
    }

    /// Handles a peer StatusResponse during chunked transmission; behaves
    /// like the read handler's counterpart.
    pub fn handle_status_response(&self, status: StatusCode) -> Option<InvokeResponse> {
        let mut inner = self.lock();
        if inner.state != InvokeState::SendingResponse {
            return None;
        }
        if !status.is_success() {
            warn!(?status, "peer aborted chunked invoke response");
            inner.state = InvokeState::Idle;
            inner.pending.clear();
            return None;
        }

        let chunk = inner.pending.pop_front();
        if inner.pending.is_empty() {
            inner.state = InvokeState::Idle;
        }
        chunk
    }

    /// True when no interaction is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.lock().state == InvokeState::Idle
    }

    /// Returns the handler to idle, discarding pending chunks.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = InvokeState::Idle;
        inner.pending.clear();
    }

    fn invoke_one(
        dispatcher: Option<&dyn Dispatcher>,
        entry: &CommandDataIb,
        reference: Option<CommandRef>,
        ctx: &InteractionContext,
    ) -> InvokeResponseIb {
        let Some(dispatcher) = dispatcher else {
            return Self::status_entry(entry, StatusCode::UnsupportedCommand, reference);
        };

        let request = CommandInvokeRequest {
            path: entry.path,
            fields: entry.fields.clone(),
        };
        match dispatcher.invoke_command(ctx, &request) {
            Err(_) => Self::status_entry(entry, StatusCode::Failure, reference),
            Ok(None) => Self::status_entry(entry, StatusCode::Success, reference),
            Ok(Some(CommandOutcome::Status(status))) => {
                InvokeResponseIb::Status(CommandStatusIb {
                    path: entry.path,
                    status,
                    command_ref: reference,
                })
            }
            Ok(Some(CommandOutcome::Data { path, payload })) => {
                InvokeResponseIb::Command(CommandDataIb {
                    path,
                    fields: payload,
                    command_ref: reference,
                })
            }
        }
    }

    fn status_entry(
        entry: &CommandDataIb,
        status: StatusCode,
        reference: Option<CommandRef>,
    ) -> InvokeResponseIb {
        InvokeResponseIb::Status(CommandStatusIb {
            path: entry.path,
            status: StatusIb::new(status),
            command_ref: reference,
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, InvokeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for InvokeHandler {
    fn default() -> Self {
        Self::new()
    }
}
