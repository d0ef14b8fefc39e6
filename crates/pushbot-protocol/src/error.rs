//! Protocol error types.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur during protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Inbound payload is not a decodable frame array.
    ///
    /// Fatal only for the message that carried it; the connection itself
    /// stays up and the caller drops the payload.
    #[error("malformed envelope: {detail}")]
    MalformedEnvelope { detail: String },

    /// Message exceeds maximum allowed size.
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: u32, max: u32 },

    /// Failed to serialize a frame batch to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ProtocolError {
    /// Shorthand for a [`ProtocolError::MalformedEnvelope`].
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedEnvelope {
            detail: detail.into(),
        }
    }
}
