//! Message codec seam
//!
//! The TLV codec is an external collaborator: the engine only ever sees
//! decoded shells. [`MessageCodec`] is the boundary; [`JsonCodec`] is the
//! shipped serde_json implementation used as the debug wire format and test
//! seam. A production TLV codec implements the same trait out-of-tree.

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::ImError;
use crate::interaction::messages::{
    InvokeRequest, InvokeResponse, ReadRequest, ReportData, StatusResponse, WriteRequest,
    WriteResponse,
};

/// Encodes and decodes the message shells the engine exchanges.
pub trait MessageCodec: Send + Sync {
    /// Decodes a ReadRequest payload.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] on malformed input.
    fn decode_read_request(&self, payload: &[u8]) -> Result<ReadRequest, ImError>;

    /// Decodes a WriteRequest payload.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] on malformed input.
    fn decode_write_request(&self, payload: &[u8]) -> Result<WriteRequest, ImError>;

    /// Decodes an InvokeRequest payload.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] on malformed input.
    fn decode_invoke_request(&self, payload: &[u8]) -> Result<InvokeRequest, ImError>;

    /// Decodes a StatusResponse payload.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] on malformed input.
    fn decode_status_response(&self, payload: &[u8]) -> Result<StatusResponse, ImError>;

    /// Encodes a ReportData message.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] when the message cannot be
    /// serialized.
    fn encode_report_data(&self, message: &ReportData) -> Result<Bytes, ImError>;

    /// Encodes a WriteResponse message.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] when the message cannot be
    /// serialized.
    fn encode_write_response(&self, message: &WriteResponse) -> Result<Bytes, ImError>;

    /// Encodes an InvokeResponse message.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] when the message cannot be
    /// serialized.
    fn encode_invoke_response(&self, message: &InvokeResponse) -> Result<Bytes, ImError>;

    /// Encodes a StatusResponse message.
    ///
    /// # Errors
    /// Returns [`ImError::InvalidMessage`] when the message cannot be
    /// serialized.
    fn encode_status_response(&self, message: &StatusResponse) -> Result<Bytes, ImError>;
}

/// serde_json-backed codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl JsonCodec {
    fn decode<T: DeserializeOwned>(payload: &[u8]) -> Result<T, ImError> {
        serde_json::from_slice(payload).map_err(|e| ImError::InvalidMessage(e.to_string()))
    }

    fn encode<T: Serialize>(message: &T) -> Result<Bytes, ImError> {
        serde_json::to_vec(message)
            .map(Bytes::from)
            .map_err(|e| ImError::InvalidMessage(e.to_string()))
    }
}

impl MessageCodec for JsonCodec {
    fn decode_read_request(&self, payload: &[u8]) -> Result<ReadRequest, ImError> {
        Self::decode(payload)
    }

    fn decode_write_request(&self, payload: &[u8]) -> Result<WriteRequest, ImError> {
        Self::decode(payload)
    }

    fn decode_invoke_request(&self, payload: &[u8]) -> Result<InvokeRequest, ImError> {
        Self::decode(payload)
    }

    fn decode_status_response(&self, payload: &[u8]) -> Result<StatusResponse, ImError> {
        Self::decode(payload)
    }

    fn encode_report_data(&self, message: &ReportData) -> Result<Bytes, ImError> {
        Self::encode(message)
    }

    fn encode_write_response(&self, message: &WriteResponse) -> Result<Bytes, ImError> {
        Self::encode(message)
    }

    fn encode_invoke_response(&self, message: &InvokeResponse) -> Result<Bytes, ImError> {
        Self::encode(message)
    }

    fn encode_status_response(&self, message: &StatusResponse) -> Result<Bytes, ImError> {
        Self::encode(message)
    }
}
