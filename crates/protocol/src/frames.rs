//! JSON frames exchanged over the auth-dialogue and chat channels.

use serde::{Deserialize, Serialize};

use crate::constants::TOKEN_EXPIRED_ERROR;
use crate::error::ProtocolError;

/// A decoded server-to-client frame.
///
/// Every field is optional. A frame may issue a token, carry an
/// application message, or report an error. Empty strings are treated
/// the same as absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InboundFrame {
    /// Decodes a raw text frame.
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let mut frame: InboundFrame = serde_json::from_str(text)?;
        frame.token = frame.token.filter(|t| !t.is_empty());
        frame.message = frame.message.filter(|m| !m.is_empty());
        frame.error = frame.error.filter(|e| !e.is_empty());
        Ok(frame)
    }

    /// Returns `true` if the frame reports an expired or rejected token.
    pub fn is_token_expired(&self) -> bool {
        self.error.as_deref() == Some(TOKEN_EXPIRED_ERROR)
    }
}

/// A client-to-server frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboundFrame {
    /// Text typed by the user: `{"user_input": "..."}`.
    UserInput(String),
    /// Acknowledges a rotated token in-band: `{"update_token": "..."}`.
    UpdateToken(String),
}

impl OutboundFrame {
    /// Encodes the frame as a JSON text payload.
    pub fn encode(&self) -> Result<String, ProtocolError> {
        Ok(serde_json::to_string(self)?)
    }
}
