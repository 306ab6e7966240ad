//! Push-notification envelope decoding.
//!
//! Upload notifications arrive as a JSON envelope whose `message.data` field
//! holds base64-encoded JSON naming the uploaded raw object:
//!
//! ```text
//! {"message": {"data": "<base64 of {\"name\": \"abc-123.mp4\"}>"}}
//! ```

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ValidationResult};

/// Outer push envelope. Unknown fields (subscription, attributes, ...) are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEnvelope {
    #[serde(default)]
    pub message: Option<PushMessage>,
}

/// Push message carrying the encoded payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushMessage {
    #[serde(default)]
    pub data: Option<String>,
}

/// Decoded payload of an upload notification.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UploadNotification {
    #[serde(default)]
    pub name: String,
}

impl PushEnvelope {
    /// Build an envelope for a raw object name.
    pub fn for_object(name: &str) -> Self {
        let payload = serde_json::json!({ "name": name }).to_string();
        Self {
            message: Some(PushMessage {
                data: Some(STANDARD.encode(payload)),
            }),
        }
    }
}

/// Decode a push envelope body into the raw object name it announces.
pub fn decode_push_envelope(body: &[u8]) -> ValidationResult<String> {
    let envelope: PushEnvelope = serde_json::from_slice(body)
        .map_err(|e| ValidationError::malformed_envelope(e.to_string()))?;

    let data = envelope
        .message
        .and_then(|m| m.data)
        .ok_or(ValidationError::MissingData)?;

    let bytes = STANDARD
        .decode(data.trim())
        .map_err(|e| ValidationError::InvalidBase64(e.to_string()))?;

    let notification: UploadNotification = serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::InvalidPayload(e.to_string()))?;

    if notification.name.is_empty() {
        return Err(ValidationError::MissingName);
    }

    Ok(notification.name)
}
