//! Read interaction handler
//!
//! Builds attribute and event reports and, when the report does not fit one
//! message, drives the chunked transmission: each further chunk is released
//! only by a Success StatusResponse from the peer.
//!
//! Data-version filters are accepted but never match, because current
//! cluster data versions are not tracked; every requested attribute is
//! reported.

use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use crate::error::StatusCode;
use crate::interaction::chunking::Fragmenter;
use crate::interaction::events::{EventManager, record_to_report};
use crate::interaction::messages::{
    AttributeDataIb, AttributePath, AttributeReportIb, AttributeStatusIb, ReadRequest, ReportData,
    StatusIb,
};
use crate::interaction::traits::{
    AttributeReadOutcome, AttributeReadRequest, Dispatcher, InteractionContext,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReadState {
    Idle,
    Processing,
    SendingReport,
}

struct ReadInner {
    state: ReadState,
    pending: VecDeque<ReportData>,
}

/// Handler for Read interactions.
pub struct ReadHandler {
    inner: Mutex<ReadInner>,
}

impl ReadHandler {
    /// Creates an idle handler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ReadInner {
                state: ReadState::Idle,
                pending: VecDeque::new(),
            }),
        }
    }

    /// Handles one ReadRequest and returns the first (or only) report chunk.
    ///
    /// The report is built with `suppress_response = true`; when more than
    /// one chunk results, the remainder is stored and the handler waits for
    /// per-chunk acknowledgements.
    pub fn handle_read_request(
        &self,
        dispatcher: Option<&dyn Dispatcher>,
        events: &EventManager,
        fragmenter: &Fragmenter,
        request: &ReadRequest,
        ctx: &InteractionContext,
    ) -> ReportData {
        let mut inner = self.lock();
        inner.state = ReadState::Processing;
        inner.pending.clear();

        let mut report = ReportData {
            suppress_response: true,
            ..Default::default()
        };
        for path in &request.attribute_requests {
            report
                .attribute_reports
                .push(Self::read_one(dispatcher, path, request, ctx));
        }

        let min_event_number = request
            .event_filters
            .first()
            .and_then(|filter| filter.min_event_number);
        for path in &request.event_requests {
            for record in events.get_events(Some(path), min_event_number, ctx.fabric_index, &[]) {
                report.event_reports.push(record_to_report(&record));
            }
        }

        let mut chunks = VecDeque::from(fragmenter.fragment_report_data(&report));
        let first = chunks
            .pop_front()
            .unwrap_or_else(|| ReportData {
                suppress_response: true,
                ..Default::default()
            });
        if chunks.is_empty() {
            inner.state = ReadState::Idle;
        } else {
            debug!(remaining = chunks.len(), "report chunked, awaiting acks");
            inner.pending = chunks;
            inner.state = ReadState::SendingReport;
        }
        first
    }

    /// Handles a peer StatusResponse during chunked transmission.
    ///
    /// On Success the next stored chunk is returned; after the last chunk, or
    /// on any non-Success status, the handler resets to idle and returns
    /// nothing.
    pub fn handle_status_response(&self, status: StatusCode) -> Option<ReportData> {
        let mut inner = self.lock();
        if inner.state != ReadState::SendingReport {
            return None;
        }
        if !status.is_success() {
            warn!(?status, "peer aborted chunked report");
            inner.state = ReadState::Idle;
            inner.pending.clear();
            return None;
        }

        let chunk = inner.pending.pop_front();
        if inner.pending.is_empty() {
            inner.state = ReadState::Idle;
        }
        chunk
    }

    /// True when no interaction is in flight.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.lock().state == ReadState::Idle
    }

    /// Returns the handler to idle, discarding pending chunks.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.state = ReadState::Idle;
        inner.pending.clear();
    }

    fn read_one(
        dispatcher: Option<&dyn Dispatcher>,
        path: &AttributePath,
        request: &ReadRequest,
        ctx: &InteractionContext,
    ) -> AttributeReportIb {
        let Some(dispatcher) = dispatcher else {
            return Self::status_report(path, StatusCode::UnsupportedAttribute);
        };

        let read = AttributeReadRequest {
            path: *path,
            fabric_filtered: request.fabric_filtered,
        };
        match dispatcher.read_attribute(ctx, &read) {
            Err(_) => Self::status_report(path, StatusCode::Failure),
            Ok(None) => Self::status_report(path, StatusCode::UnsupportedAttribute),
            Ok(Some(AttributeReadOutcome::Status(status))) => {
                AttributeReportIb::Status(AttributeStatusIb {
                    path: *path,
                    status,
                })
            }
            Ok(Some(AttributeReadOutcome::Data {
                data_version,
                payload,
            })) => AttributeReportIb::Data(AttributeDataIb {
                data_version,
                path: *path,
                data: payload,
            }),
        }
    }

    fn status_report(path: &AttributePath, status: StatusCode) -> AttributeReportIb {
        AttributeReportIb::Status(AttributeStatusIb {
            path: *path,
            status: StatusIb::new(status),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ReadInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ReadHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ImError;
    use crate::interaction::domain_types::{
        DataVersion, EventPriority, FabricIndex, MaxEventsPerPriority,
    };
    use crate::interaction::messages::{EventFilter, EventPath, EventReportIb};
    use crate::interaction::traits::{
        AttributeWriteRequest, CommandInvokeRequest, CommandOutcome,
    };
    use bytes::Bytes;

    struct FixedReader {
        outcome: fn() -> Result<Option<AttributeReadOutcome>, ImError>,
    }

    impl Dispatcher for FixedReader {
        fn read_attribute(
            &self,
            _ctx: &InteractionContext,
            _request: &AttributeReadRequest,
        ) -> Result<Option<AttributeReadOutcome>, ImError> {
            (self.outcome)()
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

    fn ctx() -> InteractionContext {
        InteractionContext {
            fabric_index: FabricIndex::unscoped(),
            source_node_id: None,
            timed: false,
        }
    }

    fn events() -> EventManager {
        EventManager::new(MaxEventsPerPriority::try_new(10).unwrap())
    }

    #[test]
    fn test_empty_request_yields_empty_suppressed_report() {
        let handler = ReadHandler::new();
        let report = handler.handle_read_request(
            None,
            &events(),
            &Fragmenter::default(),
            &ReadRequest::default(),
            &ctx(),
        );
        assert!(report.attribute_reports.is_empty());
        assert!(report.event_reports.is_empty());
        assert!(report.suppress_response);
        assert!(!report.more_chunks);
        assert!(handler.is_idle());
    }

    #[test]
    fn test_no_dispatcher_reports_unsupported_attribute() {
        let handler = ReadHandler::new();
        let request = ReadRequest {
            attribute_requests: vec![AttributePath::concrete(0u16, 6u32, 0u32)],
            ..Default::default()
        };
        let report = handler.handle_read_request(
            None,
            &events(),
            &Fragmenter::default(),
            &request,
            &ctx(),
        );
        let AttributeReportIb::Status(status) = &report.attribute_reports[0] else {
            panic!("expected a status entry");
        };
        assert_eq!(status.status.status, StatusCode::UnsupportedAttribute);
    }

    #[test]
    fn test_reader_outcomes_map_to_report_entries() {
        let handler = ReadHandler::new();
        let request = ReadRequest {
            attribute_requests: vec![AttributePath::concrete(0u16, 6u32, 0u32)],
            ..Default::default()
        };

        let data_reader = FixedReader {
            outcome: || {
                Ok(Some(AttributeReadOutcome::Data {
                    data_version: Some(DataVersion::from(9)),
                    payload: Bytes::from_static(b"{\"on\":true}"),
                }))
            },
        };
        let report = handler.handle_read_request(
            Some(&data_reader),
            &events(),
            &Fragmenter::default(),
            &request,
            &ctx(),
        );
        let AttributeReportIb::Data(data) = &report.attribute_reports[0] else {
            panic!("expected a data entry");
        };
        assert_eq!(data.data_version, Some(DataVersion::from(9)));

        let failing_reader = FixedReader {
            outcome: || Err(ImError::AccessDenied),
        };
        let report = handler.handle_read_request(
            Some(&failing_reader),
            &events(),
            &Fragmenter::default(),
            &request,
            &ctx(),
        );
        let AttributeReportIb::Status(status) = &report.attribute_reports[0] else {
            panic!("expected a status entry");
        };
        assert_eq!(status.status.status, StatusCode::Failure);

        let missing_reader = FixedReader { outcome: || Ok(None) };
        let report = handler.handle_read_request(
            Some(&missing_reader),
            &events(),
            &Fragmenter::default(),
            &request,
            &ctx(),
        );
        let AttributeReportIb::Status(status) = &report.attribute_reports[0] else {
            panic!("expected a status entry");
        };
        assert_eq!(status.status.status, StatusCode::UnsupportedAttribute);
    }

    #[test]
    fn test_event_requests_are_served_from_the_event_manager() {
        let handler = ReadHandler::new();
        let mgr = events();
        let path = EventPath::new(1u16, 6u32, 0u32);
        for _ in 0..3 {
            mgr.publish_event(
                path,
                EventPriority::Info,
                Bytes::new(),
                FabricIndex::unscoped(),
            );
        }

        let request = ReadRequest {
            event_requests: vec![path],
            event_filters: vec![EventFilter {
                node: None,
                min_event_number: Some(crate::interaction::domain_types::EventNumber::new(2)),
            }],
            ..Default::default()
        };
        let report = handler.handle_read_request(
            None,
            &mgr,
            &Fragmenter::default(),
            &request,
            &ctx(),
        );

        let numbers: Vec<u64> = report
            .event_reports
            .iter()
            .map(|entry| match entry {
                EventReportIb::Data(data) => data.event_number.as_u64(),
                EventReportIb::Status(_) => panic!("expected data entries"),
            })
            .collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[test]
    fn test_chunked_report_flows_on_success_acks_only() {
        let handler = ReadHandler::new();
        let reader = FixedReader {
            outcome: || {
                Ok(Some(AttributeReadOutcome::Data {
                    data_version: None,
                    payload: Bytes::from(vec![0u8; 60]),
                }))
            },
        };
        let request = ReadRequest {
            attribute_requests: (0..6)
                .map(|i| AttributePath::concrete(0u16, 6u32, i as u32))
                .collect(),
            ..Default::default()
        };

        let first = handler.handle_read_request(
            Some(&reader),
            &events(),
            &Fragmenter::new(120),
            &request,
            &ctx(),
        );
        assert!(first.more_chunks);
        assert!(!first.suppress_response, "intermediate chunk must be acked");
        assert!(!handler.is_idle());

        let mut received = vec![first];
        while let Some(chunk) = handler.handle_status_response(StatusCode::Success) {
            received.push(chunk);
        }
        assert!(handler.is_idle());
        assert!(!received.last().unwrap().more_chunks);
        assert!(received.last().unwrap().suppress_response);

        let total: usize = received.iter().map(|c| c.attribute_reports.len()).sum();
        assert_eq!(total, 6);
    }

    #[test]
    fn test_non_success_ack_aborts_the_sequence() {
        let handler = ReadHandler::new();
        let reader = FixedReader {
            outcome: || {
                Ok(Some(AttributeReadOutcome::Data {
                    data_version: None,
                    payload: Bytes::from(vec![0u8; 60]),
                }))
            },
        };
        let request = ReadRequest {
            attribute_requests: (0..6)
                .map(|i| AttributePath::concrete(0u16, 6u32, i as u32))
                .collect(),
            ..Default::default()
        };
        let first = handler.handle_read_request(
            Some(&reader),
            &events(),
            &Fragmenter::new(120),
            &request,
            &ctx(),
        );
        assert!(first.more_chunks);

        assert_eq!(handler.handle_status_response(StatusCode::Busy), None);
        assert!(handler.is_idle());
        assert_eq!(handler.handle_status_response(StatusCode::Success), None);
    }

    #[test]
    fn test_status_response_outside_a_transfer_is_ignored() {
        let handler = ReadHandler::new();
        assert_eq!(handler.handle_status_response(StatusCode::Success), None);
    }
}
