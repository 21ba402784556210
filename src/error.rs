//! Error taxonomy for the Interaction Model engine and its lossless mapping
//! to and from wire status codes.
//!
//! Per-element failures inside a Read, Write, or Invoke surface as
//! [`StatusIb`](crate::interaction::messages::StatusIb) entries in the
//! aggregate response; only handler preconditions and decode failures become
//! top-level `StatusResponse` messages. The mapping is lossy only for the
//! catch-all bucket: every named kind round-trips through its status code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Internal error kinds used throughout the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImError {
    /// The addressed cluster does not exist on the endpoint.
    #[error("cluster not found")]
    ClusterNotFound,

    /// The addressed attribute does not exist on the cluster.
    #[error("attribute not found")]
    AttributeNotFound,

    /// The addressed command does not exist on the cluster.
    #[error("command not found")]
    CommandNotFound,

    /// The caller lacks the privilege for the operation.
    #[error("access denied")]
    AccessDenied,

    /// The attribute does not support writes.
    #[error("attribute does not support writes")]
    UnsupportedWrite,

    /// The attribute does not support reads.
    #[error("attribute does not support reads")]
    UnsupportedRead,

    /// The written value violates a cluster constraint.
    #[error("constraint violated")]
    ConstraintError,

    /// The supplied data version no longer matches.
    #[error("data version mismatch")]
    DataVersionMismatch,

    /// The operation requires a timed interaction context.
    #[error("timed interaction required")]
    NeedsTimedInteraction,

    /// The request path is malformed for the operation.
    #[error("invalid path")]
    InvalidPath,

    /// The peer is temporarily unable to serve the request.
    #[error("busy")]
    Busy,

    /// A resource limit was hit while serving the request.
    #[error("resource exhausted")]
    ResourceExhausted,

    /// Generic failure; the catch-all projection target.
    #[error("failure")]
    Failure,

    /// The message payload could not be decoded.
    #[error("malformed message payload: {0}")]
    InvalidMessage(String),

    /// A chunked transfer of a different message type is already being
    /// assembled.
    #[error("chunked assembly of a different message type is in progress")]
    ChunkingInProgress,

    /// List operations (including chunked writes) are not supported.
    #[error("list operations are not supported")]
    UnsupportedListOperation,

    /// The exchange layer failed to send a message.
    #[error("transport send failed: {0}")]
    Transport(String),

    /// The exchange closed before the interaction completed.
    #[error("exchange closed")]
    ExchangeClosed,
}

impl ImError {
    /// Projects this error onto its wire status code.
    ///
    /// Every kind outside the named taxonomy lands on [`StatusCode::Failure`].
    #[must_use]
    pub fn to_status(&self) -> StatusCode {
        match self {
            ImError::ClusterNotFound => StatusCode::UnsupportedCluster,
            ImError::AttributeNotFound => StatusCode::UnsupportedAttribute,
            ImError::CommandNotFound => StatusCode::UnsupportedCommand,
            ImError::AccessDenied => StatusCode::UnsupportedAccess,
            ImError::UnsupportedWrite => StatusCode::UnsupportedWrite,
            ImError::UnsupportedRead => StatusCode::UnsupportedRead,
            ImError::ConstraintError => StatusCode::ConstraintError,
            ImError::DataVersionMismatch => StatusCode::DataVersionMismatch,
            ImError::NeedsTimedInteraction => StatusCode::NeedsTimedInteraction,
            ImError::InvalidPath => StatusCode::InvalidAction,
            ImError::Busy => StatusCode::Busy,
            ImError::ResourceExhausted => StatusCode::ResourceExhausted,
            _ => StatusCode::Failure,
        }
    }
}

/// Interaction Model status codes as carried on the wire.
///
/// The numeric values are fixed by the protocol schema; only the subset the
/// engine emits or interprets is represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum StatusCode {
    /// Operation succeeded.
    Success = 0x00,
    /// Generic failure.
    Failure = 0x01,
    /// The referenced subscription is not active.
    InvalidSubscription = 0x7D,
    /// Access to the element is not permitted.
    UnsupportedAccess = 0x7E,
    /// The action is not recognized or is malformed.
    InvalidAction = 0x80,
    /// The command is not supported on the cluster.
    UnsupportedCommand = 0x81,
    /// The attribute is not supported on the cluster.
    UnsupportedAttribute = 0x86,
    /// The supplied value violates a constraint.
    ConstraintError = 0x87,
    /// The attribute is not writable.
    UnsupportedWrite = 0x88,
    /// A resource limit was exceeded.
    ResourceExhausted = 0x89,
    /// The attribute is not readable.
    UnsupportedRead = 0x8F,
    /// The supplied data version does not match.
    DataVersionMismatch = 0x92,
    /// The interaction timed out.
    Timeout = 0x94,
    /// The responder is temporarily busy.
    Busy = 0x9C,
    /// The cluster is not supported on the endpoint.
    UnsupportedCluster = 0xC3,
    /// A timed interaction is required first.
    NeedsTimedInteraction = 0xC6,
}

impl StatusCode {
    /// Returns the raw wire value.
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parses a raw wire value into a known status code.
    #[must_use]
    pub fn from_u8(raw: u8) -> Option<Self> {
        let status = match raw {
            0x00 => StatusCode::Success,
            0x01 => StatusCode::Failure,
            0x7D => StatusCode::InvalidSubscription,
            0x7E => StatusCode::UnsupportedAccess,
            0x80 => StatusCode::InvalidAction,
            0x81 => StatusCode::UnsupportedCommand,
            0x86 => StatusCode::UnsupportedAttribute,
            0x87 => StatusCode::ConstraintError,
            0x88 => StatusCode::UnsupportedWrite,
            0x89 => StatusCode::ResourceExhausted,
            0x8F => StatusCode::UnsupportedRead,
            0x92 => StatusCode::DataVersionMismatch,
            0x94 => StatusCode::Timeout,
            0x9C => StatusCode::Busy,
            0xC3 => StatusCode::UnsupportedCluster,
            0xC6 => StatusCode::NeedsTimedInteraction,
            _ => return None,
        };
        Some(status)
    }

    /// Lifts a failure status back into the internal taxonomy.
    ///
    /// `Success` lifts to `None`; statuses without a named kind lift to
    /// [`ImError::Failure`].
    #[must_use]
    pub fn to_error(self) -> Option<ImError> {
        let err = match self {
            StatusCode::Success => return None,
            StatusCode::UnsupportedCluster => ImError::ClusterNotFound,
            StatusCode::UnsupportedAttribute => ImError::AttributeNotFound,
            StatusCode::UnsupportedCommand => ImError::CommandNotFound,
            StatusCode::UnsupportedAccess => ImError::AccessDenied,
            StatusCode::UnsupportedWrite => ImError::UnsupportedWrite,
            StatusCode::UnsupportedRead => ImError::UnsupportedRead,
            StatusCode::ConstraintError => ImError::ConstraintError,
            StatusCode::DataVersionMismatch => ImError::DataVersionMismatch,
            StatusCode::NeedsTimedInteraction => ImError::NeedsTimedInteraction,
            StatusCode::InvalidAction => ImError::InvalidPath,
            StatusCode::Busy => ImError::Busy,
            StatusCode::ResourceExhausted => ImError::ResourceExhausted,
            StatusCode::Failure | StatusCode::InvalidSubscription | StatusCode::Timeout => {
                ImError::Failure
            }
        };
        Some(err)
    }

    /// True for `Success`.
    #[must_use]
    pub fn is_success(self) -> bool {
        self == StatusCode::Success
    }
}

impl From<&ImError> for StatusCode {
    fn from(err: &ImError) -> Self {
        err.to_status()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMED_KINDS: &[ImError] = &[
        ImError::ClusterNotFound,
        ImError::AttributeNotFound,
        ImError::CommandNotFound,
        ImError::AccessDenied,
        ImError::UnsupportedWrite,
        ImError::UnsupportedRead,
        ImError::ConstraintError,
        ImError::DataVersionMismatch,
        ImError::NeedsTimedInteraction,
        ImError::InvalidPath,
        ImError::Busy,
        ImError::ResourceExhausted,
    ];

    #[test]
    fn test_named_kinds_round_trip_through_status_codes() {
        for kind in NAMED_KINDS {
            let status = kind.to_status();
            let lifted = status.to_error();
            assert_eq!(
                lifted.as_ref(),
                Some(kind),
                "kind {kind:?} should survive error -> status -> error"
            );
        }
    }

    #[test]
    fn test_catch_all_kinds_project_to_failure() {
        let others = [
            ImError::Failure,
            ImError::InvalidMessage("bad tag".to_string()),
            ImError::ChunkingInProgress,
            ImError::UnsupportedListOperation,
            ImError::Transport("socket closed".to_string()),
            ImError::ExchangeClosed,
        ];
        for kind in others {
            assert_eq!(kind.to_status(), StatusCode::Failure);
        }
    }

    #[test]
    fn test_wire_values_match_protocol_schema() {
        assert_eq!(StatusCode::Success.as_u8(), 0x00);
        assert_eq!(StatusCode::Failure.as_u8(), 0x01);
        assert_eq!(StatusCode::UnsupportedAccess.as_u8(), 0x7E);
        assert_eq!(StatusCode::UnsupportedCommand.as_u8(), 0x81);
        assert_eq!(StatusCode::UnsupportedAttribute.as_u8(), 0x86);
        assert_eq!(StatusCode::ConstraintError.as_u8(), 0x87);
        assert_eq!(StatusCode::UnsupportedCluster.as_u8(), 0xC3);
        assert_eq!(StatusCode::NeedsTimedInteraction.as_u8(), 0xC6);
    }

    #[test]
    fn test_raw_parse_rejects_unknown_values() {
        assert_eq!(StatusCode::from_u8(0x00), Some(StatusCode::Success));
        assert_eq!(StatusCode::from_u8(0x9C), Some(StatusCode::Busy));
        assert_eq!(StatusCode::from_u8(0xFF), None);
    }

    #[test]
    fn test_success_lifts_to_no_error() {
        assert_eq!(StatusCode::Success.to_error(), None);
        assert_eq!(StatusCode::Timeout.to_error(), Some(ImError::Failure));
    }
}
