//! Inbound chunk assembly
//!
//! Accumulates the array fields of chunked WriteRequest, ReportData, and
//! InvokeResponse sequences into one logical message. Header fields are
//! captured from the first chunk; later values are ignored. An assembly in
//! progress refuses chunks of any other message type.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::ImError;
use crate::interaction::domain_types::SubscriptionId;
use crate::interaction::messages::{
    AttributeDataIb, AttributeReportIb, EventReportIb, InvokeResponse, InvokeResponseIb,
    ReportData, WriteRequest,
};

/// The message type currently being assembled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblyKind {
    /// A chunked WriteRequest sequence.
    WriteRequest,
    /// A chunked ReportData sequence.
    ReportData,
    /// A chunked InvokeResponse sequence.
    InvokeResponse,
}

enum State {
    Idle,
    Write {
        suppress_response: bool,
        timed_request: bool,
        writes: Vec<AttributeDataIb>,
    },
    Report {
        subscription_id: Option<SubscriptionId>,
        suppress_response: bool,
        attribute_reports: Vec<AttributeReportIb>,
        event_reports: Vec<EventReportIb>,
    },
    Invoke {
        suppress_response: bool,
        responses: Vec<InvokeResponseIb>,
    },
}

impl State {
    fn kind(&self) -> Option<AssemblyKind> {
        match self {
            State::Idle => None,
            State::Write { .. } => Some(AssemblyKind::WriteRequest),
            State::Report { .. } => Some(AssemblyKind::ReportData),
            State::Invoke { .. } => Some(AssemblyKind::InvokeResponse),
        }
    }
}

/// Accumulates inbound chunk sequences into whole messages.
///
/// All operations take the interior mutex; buffers are reclaimed on every
/// transition back to idle.
pub struct Assembler {
    state: Mutex<State>,
}

impl Assembler {
    /// Creates an idle assembler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::Idle),
        }
    }

    /// Feeds one WriteRequest chunk.
    ///
    /// Returns the assembled message once the final chunk arrives, `None`
    /// while more chunks are expected.
    ///
    /// # Errors
    /// [`ImError::ChunkingInProgress`] when a sequence of a different type is
    /// being assembled; the prior accumulation is left intact.
    pub fn add_write_request(&self, chunk: WriteRequest) -> Result<Option<WriteRequest>, ImError> {
        let mut state = self.lock();
        if let State::Idle = *state {
            *state = State::Write {
                suppress_response: chunk.suppress_response,
                timed_request: chunk.timed_request,
                writes: Vec::new(),
            };
        }
        let State::Write {
            suppress_response,
            timed_request,
            writes,
        } = &mut *state
        else {
            return Err(ImError::ChunkingInProgress);
        };

        writes.extend(chunk.write_requests);
        if chunk.more_chunks {
            return Ok(None);
        }

        let assembled = WriteRequest {
            suppress_response: *suppress_response,
            timed_request: *timed_request,
            write_requests: std::mem::take(writes),
            more_chunks: false,
        };
        *state = State::Idle;
        Ok(Some(assembled))
    }

    /// Feeds one ReportData chunk.
    ///
    /// # Errors
    /// [`ImError::ChunkingInProgress`] on a type mismatch with the assembly
    /// in progress.
    pub fn add_report_data(&self, chunk: ReportData) -> Result<Option<ReportData>, ImError> {
        let mut state = self.lock();
        if let State::Idle = *state {
            *state = State::Report {
                subscription_id: chunk.subscription_id,
                suppress_response: chunk.suppress_response,
                attribute_reports: Vec::new(),
                event_reports: Vec::new(),
            };
        }
        let State::Report {
            subscription_id,
            suppress_response,
            attribute_reports,
            event_reports,
        } = &mut *state
        else {
            return Err(ImError::ChunkingInProgress);
        };

        attribute_reports.extend(chunk.attribute_reports);
        event_reports.extend(chunk.event_reports);
        if chunk.more_chunks {
            return Ok(None);
        }

        let assembled = ReportData {
            subscription_id: *subscription_id,
            attribute_reports: std::mem::take(attribute_reports),
            event_reports: std::mem::take(event_reports),
            more_chunks: false,
            suppress_response: *suppress_response,
        };
        *state = State::Idle;
        Ok(Some(assembled))
    }

    /// Feeds one InvokeResponse chunk.
    ///
    /// # Errors
    /// [`ImError::ChunkingInProgress`] on a type mismatch with the assembly
    /// in progress.
    pub fn add_invoke_response(
        &self,
        chunk: InvokeResponse,
    ) -> Result<Option<InvokeResponse>, ImError> {
        let mut state = self.lock();
        if let State::Idle = *state {
            *state = State::Invoke {
                suppress_response: chunk.suppress_response,
                responses: Vec::new(),
            };
        }
        let State::Invoke {
            suppress_response,
            responses,
        } = &mut *state
        else {
            return Err(ImError::ChunkingInProgress);
        };

        responses.extend(chunk.invoke_responses);
        if chunk.more_chunks {
            return Ok(None);
        }

        let assembled = InvokeResponse {
            suppress_response: *suppress_response,
            invoke_responses: std::mem::take(responses),
            more_chunks: false,
        };
        *state = State::Idle;
        Ok(Some(assembled))
    }

    /// True while a sequence is being assembled.
    #[must_use]
    pub fn is_assembling(&self) -> bool {
        self.kind().is_some()
    }

    /// The type of the sequence being assembled, when any.
    #[must_use]
    pub fn kind(&self) -> Option<AssemblyKind> {
        self.lock().kind()
    }

    /// Unconditionally discards any assembly in progress.
    pub fn reset(&self) {
        let mut state = self.lock();
        if state.kind().is_some() {
            debug!("discarding partial chunk assembly");
        }
        *state = State::Idle;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Assembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;
    use crate::interaction::messages::{
        AttributePath, AttributeStatusIb, CommandDataIb, CommandPath, StatusIb,
    };
    use bytes::Bytes;

    fn attr_report(attribute: u32) -> AttributeReportIb {
        AttributeReportIb::Status(AttributeStatusIb {
            path: AttributePath::concrete(0u16, 6u32, attribute),
            status: StatusIb::new(StatusCode::Success),
        })
    }

    fn event_report(event: u32) -> EventReportIb {
        EventReportIb::Status(crate::interaction::messages::EventStatusIb {
            path: crate::interaction::messages::EventPath::new(0u16, 6u32, event),
            status: StatusIb::new(StatusCode::Success),
        })
    }

    #[test]
    fn test_three_chunk_report_assembly_takes_headers_from_first() {
        let assembler = Assembler::new();

        let first = ReportData {
            subscription_id: Some(SubscriptionId::from(12345)),
            attribute_reports: vec![attr_report(0), attr_report(1)],
            more_chunks: true,
            ..Default::default()
        };
        assert_eq!(assembler.add_report_data(first).unwrap(), None);
        assert_eq!(assembler.kind(), Some(AssemblyKind::ReportData));

        let second = ReportData {
            subscription_id: None,
            attribute_reports: vec![attr_report(2)],
            event_reports: vec![event_report(0), event_report(1)],
            more_chunks: true,
            ..Default::default()
        };
        assert_eq!(assembler.add_report_data(second).unwrap(), None);

        let third = ReportData {
            event_reports: vec![event_report(2)],
            more_chunks: false,
            ..Default::default()
        };
        let assembled = assembler
            .add_report_data(third)
            .unwrap()
            .expect("final chunk completes the assembly");

        assert_eq!(assembled.subscription_id, Some(SubscriptionId::from(12345)));
        assert_eq!(
            assembled.attribute_reports,
            vec![attr_report(0), attr_report(1), attr_report(2)]
        );
        assert_eq!(
            assembled.event_reports,
            vec![event_report(0), event_report(1), event_report(2)]
        );
        assert!(!assembled.more_chunks);
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_mismatched_chunk_type_is_rejected_and_state_kept() {
        let assembler = Assembler::new();

        let write_chunk = WriteRequest {
            write_requests: vec![AttributeDataIb {
                data_version: None,
                path: AttributePath::concrete(0u16, 6u32, 0u32),
                data: Bytes::new(),
            }],
            more_chunks: true,
            ..Default::default()
        };
        assert_eq!(assembler.add_write_request(write_chunk).unwrap(), None);

        let invoke_chunk = InvokeResponse {
            invoke_responses: vec![InvokeResponseIb::Command(CommandDataIb {
                path: CommandPath::new(0u16, 6u32, 1u32),
                fields: Bytes::new(),
                command_ref: None,
            })],
            more_chunks: false,
            ..Default::default()
        };
        assert_eq!(
            assembler.add_invoke_response(invoke_chunk),
            Err(ImError::ChunkingInProgress)
        );

        // The write assembly survives the rejected chunk.
        assert_eq!(assembler.kind(), Some(AssemblyKind::WriteRequest));
        let closing = WriteRequest {
            more_chunks: false,
            ..Default::default()
        };
        let assembled = assembler.add_write_request(closing).unwrap().unwrap();
        assert_eq!(assembled.write_requests.len(), 1);
    }

    #[test]
    fn test_single_chunk_passes_straight_through() {
        let assembler = Assembler::new();
        let message = InvokeResponse {
            suppress_response: true,
            invoke_responses: vec![],
            more_chunks: false,
        };
        let assembled = assembler.add_invoke_response(message.clone()).unwrap();
        assert_eq!(assembled, Some(message));
        assert!(!assembler.is_assembling());
    }

    #[test]
    fn test_reset_discards_partial_assembly() {
        let assembler = Assembler::new();
        let chunk = ReportData {
            attribute_reports: vec![attr_report(0)],
            more_chunks: true,
            ..Default::default()
        };
        assembler.add_report_data(chunk).unwrap();
        assert!(assembler.is_assembling());

        assembler.reset();
        assert!(!assembler.is_assembling());
        assert_eq!(assembler.kind(), None);
    }

    #[test]
    fn test_headers_on_later_write_chunks_are_ignored() {
        let assembler = Assembler::new();
        let first = WriteRequest {
            suppress_response: true,
            timed_request: false,
            more_chunks: true,
            ..Default::default()
        };
        assembler.add_write_request(first).unwrap();

        let second = WriteRequest {
            suppress_response: false,
            timed_request: true,
            more_chunks: false,
            ..Default::default()
        };
        let assembled = assembler.add_write_request(second).unwrap().unwrap();
        assert!(assembled.suppress_response);
        assert!(!assembled.timed_request);
    }
}
