//! Public types for the session connection manager.

use std::fmt;
use std::time::Duration;

use chatlink_protocol::Endpoints;
use chatlink_protocol::constants::{INITIAL_RETRY_DELAY, MAX_RETRY_DELAY};

/// Overall connection status surfaced to consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConnectionStatus::Disconnected => "disconnected",
            ConnectionStatus::Connecting => "connecting",
            ConnectionStatus::Connected => "connected",
            ConnectionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Logical role of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelRole {
    /// Unauthenticated dialogue used to obtain a session token.
    Auth,
    /// Authenticated chat channel.
    Chat,
}

impl ChannelRole {
    /// The opposite role.
    pub fn other(self) -> Self {
        match self {
            ChannelRole::Auth => ChannelRole::Chat,
            ChannelRole::Chat => ChannelRole::Auth,
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelRole::Auth => f.write_str("auth"),
            ChannelRole::Chat => f.write_str("chat"),
        }
    }
}

/// Events emitted by the connection manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The overall status changed.
    StatusChanged(ConnectionStatus),
    /// An application message arrived on either channel.
    Message(String),
    /// A reconnection attempt was scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// A fresh token was issued or rotated and persisted.
    TokenRotated,
    /// The authenticated flag changed, either on request or because the
    /// session expired.
    AuthenticationChanged(bool),
    /// The server rejected the session token. The UI should show a blocking
    /// notice and route back to its authentication entry point.
    SessionExpired,
}

/// Configuration for automatic reconnection with exponential backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Maximum delay between attempts (backoff cap).
    pub max_delay: Duration,
    /// Multiplier for each subsequent attempt.
    pub backoff_factor: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: INITIAL_RETRY_DELAY,
            max_delay: MAX_RETRY_DELAY,
            backoff_factor: 2.0,
        }
    }
}

impl ReconnectConfig {
    /// Delay for a zero-based attempt number:
    /// `min(initial_delay * backoff_factor^attempt, max_delay)`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(63) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        let capped = secs.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped)
    }
}

/// Settings for a [`ConnectionManager`](crate::ConnectionManager).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub endpoints: Endpoints,
    pub reconnect: ReconnectConfig,
    /// Whether the user has passed the app's own authentication gate.
    /// The chat channel is only opened from a stored token when this is set.
    pub authenticated: bool,
}

impl SessionConfig {
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            reconnect: ReconnectConfig::default(),
            authenticated: false,
        }
    }
}

/// State of a single channel instance held by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelState {
    pub id: u64,
    pub open: bool,
}

/// Which channel instances the manager currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelSnapshot {
    pub auth: Option<ChannelState>,
    pub chat: Option<ChannelState>,
}

impl ChannelSnapshot {
    pub fn get(&self, role: ChannelRole) -> Option<ChannelState> {
        match role {
            ChannelRole::Auth => self.auth,
            ChannelRole::Chat => self.chat,
        }
    }
}
