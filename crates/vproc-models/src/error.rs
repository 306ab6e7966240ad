//! Validation error types.

use thiserror::Error;

/// Result type for input validation.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Errors raised while decoding or validating inbound job requests.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid message envelope: {0}")]
    MalformedEnvelope(String),

    #[error("Invalid message payload received.")]
    MissingData,

    #[error("base64 decode failed: {0}")]
    InvalidBase64(String),

    #[error("Invalid notification payload: {0}")]
    InvalidPayload(String),

    #[error("Bad Request: missing filename.")]
    MissingName,

    #[error("Invalid object name: {0}")]
    InvalidName(String),
}

impl ValidationError {
    pub fn malformed_envelope(msg: impl Into<String>) -> Self {
        Self::MalformedEnvelope(msg.into())
    }

    pub fn invalid_name(msg: impl Into<String>) -> Self {
        Self::InvalidName(msg.into())
    }
}
