//! Connection status state machine.
//!
//! Every status change goes through [`transition`], a pure function of the
//! current status, the channel role involved and the signal observed. The
//! manager applies the returned effects; nothing here performs I/O.

use chatlink_protocol::is_token_rejection;

use crate::types::{ChannelRole, ConnectionStatus};

/// Something that happened to a channel or to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    /// A channel open was issued.
    Opening,
    /// The channel reported it is open.
    Opened,
    /// The channel reported an error.
    Failed,
    /// The channel closed with this code.
    Closed(u16),
    /// The server sent the token-expired error frame.
    TokenExpired,
    /// A user message could not be sent because no channel is open.
    SendRejected,
    /// The token store could not be read while initialising.
    InitFailed,
}

/// Side effects the manager must carry out after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Effect {
    ResetBackoff,
    CancelRetry,
    ScheduleRetry,
    /// Close the channel of the other role, if any.
    RetireOtherRole,
    /// Clear the token, stop retrying and notify the UI.
    ExpireSession,
}

/// How the user-facing error text changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ErrorUpdate {
    Keep,
    Clear,
    Set(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Transition {
    pub status: ConnectionStatus,
    pub error: ErrorUpdate,
    pub effects: Vec<Effect>,
}

pub(crate) const AUTH_FAILED: &str =
    "Failed to establish authentication connection. Please check your internet connection and try again.";
pub(crate) const CHAT_FAILED: &str = "Failed to connect to chat. Please try again later.";
pub(crate) const AUTH_CLOSED: &str =
    "Authentication connection closed. Attempting to reconnect...";
pub(crate) const CHAT_CLOSED: &str = "Chat connection closed. Attempting to reconnect...";
pub(crate) const SEND_REJECTED: &str =
    "Unable to send message. Please check your connection and try again.";
pub(crate) const INIT_FAILED: &str = "Failed to initialize connection. Please try again.";

/// Computes the next status, error text and effects.
pub(crate) fn transition(
    current: ConnectionStatus,
    role: ChannelRole,
    signal: Signal,
) -> Transition {
    use ConnectionStatus::*;

    match signal {
        Signal::Opening => Transition {
            status: Connecting,
            error: ErrorUpdate::Clear,
            effects: vec![],
        },
        Signal::Opened => Transition {
            status: Connected,
            error: ErrorUpdate::Clear,
            effects: vec![
                Effect::ResetBackoff,
                Effect::CancelRetry,
                Effect::RetireOtherRole,
            ],
        },
        Signal::Failed => Transition {
            status: Error,
            error: ErrorUpdate::Set(match role {
                ChannelRole::Auth => AUTH_FAILED,
                ChannelRole::Chat => CHAT_FAILED,
            }),
            effects: vec![],
        },
        Signal::Closed(code) if is_token_rejection(code) => Transition {
            status: Disconnected,
            error: ErrorUpdate::Keep,
            effects: vec![Effect::ExpireSession],
        },
        Signal::Closed(_) => Transition {
            status: Disconnected,
            error: ErrorUpdate::Set(match role {
                ChannelRole::Auth => AUTH_CLOSED,
                ChannelRole::Chat => CHAT_CLOSED,
            }),
            effects: vec![Effect::ScheduleRetry],
        },
        Signal::TokenExpired => Transition {
            status: Disconnected,
            error: ErrorUpdate::Keep,
            effects: vec![Effect::ExpireSession],
        },
        Signal::SendRejected => Transition {
            status: current,
            error: ErrorUpdate::Set(SEND_REJECTED),
            effects: vec![Effect::ScheduleRetry],
        },
        Signal::InitFailed => Transition {
            status: Error,
            error: ErrorUpdate::Set(INIT_FAILED),
            effects: vec![],
        },
    }
}
