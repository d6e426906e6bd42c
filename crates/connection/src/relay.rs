//! Classifies inbound text frames into manager actions.

use chatlink_protocol::InboundFrame;
use tracing::{debug, warn};

/// What the manager should do with an inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum FrameAction {
    /// Not valid JSON. Logged at debug and dropped.
    Malformed,
    /// The server rejected the session token.
    Expired,
    /// A new or rotated token. Any accompanying message is not surfaced.
    Token(String),
    /// An application message for the UI.
    Message(String),
    /// Nothing actionable (e.g. an unrelated error or an empty object).
    Ignored,
}

/// Classifies a frame. The expiry sentinel wins over every other field.
pub(crate) fn classify(text: &str) -> FrameAction {
    let frame = match InboundFrame::decode(text) {
        Ok(frame) => frame,
        Err(e) => {
            debug!(error = %e, len = text.len(), "dropping malformed frame");
            return FrameAction::Malformed;
        }
    };

    if frame.is_token_expired() {
        return FrameAction::Expired;
    }
    if let Some(token) = frame.token {
        return FrameAction::Token(token);
    }
    if let Some(message) = frame.message {
        return FrameAction::Message(message);
    }
    if let Some(error) = frame.error {
        warn!(%error, "server reported an error");
    }
    FrameAction::Ignored
}
