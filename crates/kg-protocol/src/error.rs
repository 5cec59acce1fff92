//! Protocol error types

use thiserror::Error;

/// Errors that can occur while encoding or decoding protocol messages
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Outbound message could not be serialized
    #[error("Failed to encode message: {0}")]
    Encoding(#[source] serde_json::Error),

    /// Inbound frame is not valid JSON or lacks a well-formed envelope
    #[error("Failed to decode message: {0}")]
    Decoding(#[source] serde_json::Error),

    /// Content did not match the payload type requested by the caller
    #[error("Content of {msg_type} does not match the requested type: {source}")]
    ContentMismatch {
        msg_type: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ProtocolError {
    /// Whether this error happened on the outbound (serialization) side
    pub fn is_encoding(&self) -> bool {
        matches!(self, ProtocolError::Encoding(_))
    }
}
