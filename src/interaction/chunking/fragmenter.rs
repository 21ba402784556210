//! Outbound message fragmentation
//!
//! Splits oversize WriteRequest, InvokeResponse, and ReportData messages into
//! size-bounded chunks. Sizes are estimates over the eventual TLV encoding;
//! the budget is the transport MTU minus the envelope overhead.

use crate::interaction::messages::{
    AttributeDataIb, AttributeReportIb, EventReportIb, InvokeResponse, InvokeResponseIb,
    ReportData, WriteRequest,
};

/// Default per-chunk payload budget: IPv6 minimum MTU minus a 100-byte
/// envelope.
pub const DEFAULT_MAX_PAYLOAD: usize = 1280 - 100;

// Estimated envelope cost of the message shell around the arrays.
const INVOKE_BASE_OVERHEAD: usize = 20;
const WRITE_BASE_OVERHEAD: usize = 20;
const REPORT_BASE_OVERHEAD: usize = 30;

// Estimated per-element costs: path, tags, and container framing.
const COMMAND_ENTRY_COST: usize = 15;
const ATTRIBUTE_DATA_COST: usize = 20;
const REPORT_WRAPPER_COST: usize = 5;
const EVENT_METADATA_COST: usize = 30;

fn invoke_entry_size(entry: &InvokeResponseIb) -> usize {
    match entry {
        InvokeResponseIb::Command(data) => COMMAND_ENTRY_COST + data.fields.len(),
        InvokeResponseIb::Status(_) => COMMAND_ENTRY_COST,
    }
}

fn write_entry_size(entry: &AttributeDataIb) -> usize {
    ATTRIBUTE_DATA_COST + entry.data.len()
}

fn attribute_report_size(entry: &AttributeReportIb) -> usize {
    let nested = match entry {
        AttributeReportIb::Data(data) => ATTRIBUTE_DATA_COST + data.data.len(),
        AttributeReportIb::Status(_) => ATTRIBUTE_DATA_COST,
    };
    REPORT_WRAPPER_COST + nested
}

fn event_report_size(entry: &EventReportIb) -> usize {
    let data_len = match entry {
        EventReportIb::Data(data) => data.data.len(),
        EventReportIb::Status(_) => 0,
    };
    REPORT_WRAPPER_COST + EVENT_METADATA_COST + data_len
}

/// Splits outbound messages into chunks that fit the payload budget.
#[derive(Debug, Clone, Copy)]
pub struct Fragmenter {
    max_payload: usize,
}

impl Fragmenter {
    /// Creates a fragmenter with the given payload budget; 0 selects
    /// [`DEFAULT_MAX_PAYLOAD`].
    #[must_use]
    pub fn new(max_payload: usize) -> Self {
        let max_payload = if max_payload == 0 {
            DEFAULT_MAX_PAYLOAD
        } else {
            max_payload
        };
        Self { max_payload }
    }

    /// The active payload budget.
    #[must_use]
    pub fn max_payload(&self) -> usize {
        self.max_payload
    }

    /// Splits a WriteRequest; suppress-response and timed-request are
    /// preserved on every chunk.
    #[must_use]
    pub fn fragment_write_request(&self, message: &WriteRequest) -> Vec<WriteRequest> {
        let groups = self.split(&message.write_requests, write_entry_size, WRITE_BASE_OVERHEAD);
        let last = groups.len() - 1;
        groups
            .into_iter()
            .enumerate()
            .map(|(i, write_requests)| WriteRequest {
                suppress_response: message.suppress_response,
                timed_request: message.timed_request,
                write_requests,
                more_chunks: i < last,
            })
            .collect()
    }

    /// Splits an InvokeResponse; suppress-response is preserved on every
    /// chunk.
    #[must_use]
    pub fn fragment_invoke_response(&self, message: &InvokeResponse) -> Vec<InvokeResponse> {
        let groups = self.split(
            &message.invoke_responses,
            invoke_entry_size,
            INVOKE_BASE_OVERHEAD,
        );
        let last = groups.len() - 1;
        groups
            .into_iter()
            .enumerate()
            .map(|(i, invoke_responses)| InvokeResponse {
                suppress_response: message.suppress_response,
                invoke_responses,
                more_chunks: i < last,
            })
            .collect()
    }

    /// Splits a ReportData message.
    ///
    /// Attribute reports are processed first, then event reports, into one
    /// linear chunk sequence; a chunk may carry entries of either or both
    /// kinds. Intermediate chunks force `suppress_response = false` so the
    /// peer acknowledges each one; only the final chunk preserves the
    /// caller's flag.
    #[must_use]
    pub fn fragment_report_data(&self, message: &ReportData) -> Vec<ReportData> {
        let mut chunks: Vec<ReportData> = Vec::new();
        let mut attrs: Vec<AttributeReportIb> = Vec::new();
        let mut events: Vec<EventReportIb> = Vec::new();
        let mut current_size = 0usize;

        let mut emit =
            |attrs: &mut Vec<AttributeReportIb>, events: &mut Vec<EventReportIb>| {
                chunks.push(ReportData {
                    subscription_id: message.subscription_id,
                    attribute_reports: std::mem::take(attrs),
                    event_reports: std::mem::take(events),
                    more_chunks: true,
                    suppress_response: false,
                });
            };

        for report in &message.attribute_reports {
            let size = attribute_report_size(report);
            if current_size > 0 && current_size + size + REPORT_BASE_OVERHEAD > self.max_payload {
                emit(&mut attrs, &mut events);
                current_size = 0;
            }
            attrs.push(report.clone());
            current_size += size;
        }

        for report in &message.event_reports {
            let size = event_report_size(report);
            if current_size > 0 && current_size + size + REPORT_BASE_OVERHEAD > self.max_payload {
                emit(&mut attrs, &mut events);
                current_size = 0;
            }
            events.push(report.clone());
            current_size += size;
        }

        chunks.push(ReportData {
            subscription_id: message.subscription_id,
            attribute_reports: attrs,
            event_reports: events,
            more_chunks: false,
            suppress_response: message.suppress_response,
        });
        chunks
    }

    fn split<T: Clone>(
        &self,
        items: &[T],
        entry_size: impl Fn(&T) -> usize,
        base_overhead: usize,
    ) -> Vec<Vec<T>> {
        let mut groups: Vec<Vec<T>> = Vec::new();
        let mut current: Vec<T> = Vec::new();
        let mut current_size = 0usize;

        for item in items {
            let size = entry_size(item);
            if current_size > 0 && current_size + size + base_overhead > self.max_payload {
                groups.push(std::mem::take(&mut current));
                current_size = 0;
            }
            current.push(item.clone());
            current_size += size;
        }
        groups.push(current);
        groups
    }
}

impl Default for Fragmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PAYLOAD)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StatusCode;
    use crate::interaction::domain_types::{EventNumber, EventPriority};
    use crate::interaction::messages::{
        AttributePath, CommandDataIb, CommandPath, EventDataIb, EventPath, StatusIb,
    };
    use bytes::Bytes;

    fn invoke_entry(fields_len: usize) -> InvokeResponseIb {
        InvokeResponseIb::Command(CommandDataIb {
            path: CommandPath::new(0u16, 6u32, 1u32),
            fields: Bytes::from(vec![0u8; fields_len]),
            command_ref: None,
        })
    }

    fn attribute_report(data_len: usize) -> AttributeReportIb {
        AttributeReportIb::Data(crate::interaction::messages::AttributeDataIb {
            data_version: None,
            path: AttributePath::concrete(0u16, 6u32, 0u32),
            data: Bytes::from(vec![0u8; data_len]),
        })
    }

    fn event_report(data_len: usize) -> EventReportIb {
        EventReportIb::Data(EventDataIb {
            path: EventPath::new(0u16, 6u32, 0u32),
            event_number: EventNumber::new(1),
            priority: EventPriority::Info,
            epoch_timestamp_ms: 0,
            data: Bytes::from(vec![0u8; data_len]),
        })
    }

    #[test]
    fn test_message_that_fits_stays_whole() {
        let fragmenter = Fragmenter::default();
        let message = InvokeResponse {
            suppress_response: true,
            invoke_responses: vec![invoke_entry(10), invoke_entry(10)],
            more_chunks: false,
        };
        let chunks = fragmenter.fragment_invoke_response(&message);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], message);
    }

    #[test]
    fn test_empty_message_yields_single_chunk_equal_to_input() {
        let fragmenter = Fragmenter::new(80);
        let message = ReportData {
            suppress_response: true,
            ..Default::default()
        };
        let chunks = fragmenter.fragment_report_data(&message);
        assert_eq!(chunks, vec![message]);
    }

    #[test]
    fn test_chunk_flags_mark_all_but_the_last() {
        let fragmenter = Fragmenter::new(80);
        let message = InvokeResponse {
            suppress_response: false,
            invoke_responses: (0..5).map(|_| invoke_entry(30)).collect(),
            more_chunks: false,
        };
        let chunks = fragmenter.fragment_invoke_response(&message);
        assert!(chunks.len() >= 2, "expected fragmentation at budget 80");

        for chunk in &chunks[..chunks.len() - 1] {
            assert!(chunk.more_chunks);
        }
        assert!(!chunks.last().unwrap().more_chunks);

        let reassembled: Vec<_> = chunks
            .iter()
            .flat_map(|c| c.invoke_responses.clone())
            .collect();
        assert_eq!(reassembled, message.invoke_responses);
    }

    #[test]
    fn test_intermediate_report_chunks_demand_acknowledgement() {
        let fragmenter = Fragmenter::new(100);
        let message = ReportData {
            attribute_reports: (0..4).map(|_| attribute_report(40)).collect(),
            event_reports: (0..3).map(|_| event_report(40)).collect(),
            more_chunks: false,
            suppress_response: true,
            ..Default::default()
        };
        let chunks = fragmenter.fragment_report_data(&message);
        assert!(chunks.len() >= 3);

        for chunk in &chunks[..chunks.len() - 1] {
            assert!(!chunk.suppress_response, "intermediate chunks must be acked");
            assert!(chunk.more_chunks);
        }
        let last = chunks.last().unwrap();
        assert!(last.suppress_response, "final chunk keeps the caller's flag");
        assert!(!last.more_chunks);

        let attrs: Vec<_> = chunks
            .iter()
            .flat_map(|c| c.attribute_reports.clone())
            .collect();
        let events: Vec<_> = chunks
            .iter()
            .flat_map(|c| c.event_reports.clone())
            .collect();
        assert_eq!(attrs, message.attribute_reports);
        assert_eq!(events, message.event_reports);
    }

    #[test]
    fn test_write_chunks_keep_request_header_fields() {
        let fragmenter = Fragmenter::new(90);
        let message = WriteRequest {
            suppress_response: true,
            timed_request: true,
            write_requests: (0..4)
                .map(|_| AttributeDataIb {
                    data_version: None,
                    path: AttributePath::concrete(0u16, 6u32, 0u32),
                    data: Bytes::from(vec![0u8; 40]),
                })
                .collect(),
            more_chunks: false,
        };
        let chunks = fragmenter.fragment_write_request(&message);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.suppress_response);
            assert!(chunk.timed_request);
        }
    }

    #[test]
    fn test_zero_budget_selects_the_default() {
        assert_eq!(Fragmenter::new(0).max_payload(), DEFAULT_MAX_PAYLOAD);
        assert_eq!(DEFAULT_MAX_PAYLOAD, 1180);
    }

    #[test]
    fn test_oversize_single_entry_still_emits() {
        let fragmenter = Fragmenter::new(40);
        let message = InvokeResponse {
            suppress_response: false,
            invoke_responses: vec![invoke_entry(200), InvokeResponseIb::Status(
                crate::interaction::messages::CommandStatusIb {
                    path: CommandPath::new(0u16, 6u32, 1u32),
                    status: StatusIb::new(StatusCode::Success),
                    command_ref: None,
                },
            )],
            more_chunks: false,
        };
        let chunks = fragmenter.fragment_invoke_response(&message);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].invoke_responses.len(), 1);
        assert_eq!(chunks[1].invoke_responses.len(), 1);
    }
}
