//! The persistent-connection primitive the manager drives.
//!
//! A [`Connector`] opens channels; each open channel reports its lifecycle
//! back through a [`ChannelEvents`] sink. The WebSocket implementation lives
//! in [`ws_client`](crate::ws_client); tests substitute their own.

use std::fmt;

use tokio::sync::mpsc;
use tracing::trace;

/// Errors from sending on a channel.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ChannelError {
    #[error("channel is not open")]
    NotOpen,

    #[error("outbound queue is full")]
    QueueFull,
}

/// Identifies one channel instance for the lifetime of a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub(crate) u64);

impl ChannelId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Opens channels. Must return immediately; the outcome is reported later
/// through the supplied [`ChannelEvents`].
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &str, events: ChannelEvents) -> Box<dyn Channel>;
}

/// A single open (or opening) channel.
pub trait Channel: Send + Sync {
    /// Queues a text frame. Fails unless the channel is open.
    fn send_text(&self, text: String) -> Result<(), ChannelError>;

    /// Returns `true` once the channel has opened and until it closes.
    fn is_open(&self) -> bool;

    /// Closes the channel. No further events are reported afterwards.
    fn close(&self);
}

/// Lifecycle signal reported by a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChannelSignal {
    Opened,
    Frame(String),
    Failed(String),
    Closed(u16),
}

/// Everything the manager task reacts to besides API commands.
#[derive(Debug)]
pub(crate) enum DriverEvent {
    Channel { id: ChannelId, signal: ChannelSignal },
    RetryDue { generation: u64 },
}

/// Sink through which a channel reports open/message/error/close events.
#[derive(Debug, Clone)]
pub struct ChannelEvents {
    id: ChannelId,
    tx: mpsc::Sender<DriverEvent>,
}

impl ChannelEvents {
    pub(crate) fn new(id: ChannelId, tx: mpsc::Sender<DriverEvent>) -> Self {
        Self { id, tx }
    }

    /// The channel this sink reports for.
    pub fn id(&self) -> ChannelId {
        self.id
    }

    /// The channel is open and ready to send.
    pub async fn opened(&self) {
        self.emit(ChannelSignal::Opened).await;
    }

    /// A text frame arrived.
    pub async fn frame(&self, text: impl Into<String>) {
        self.emit(ChannelSignal::Frame(text.into())).await;
    }

    /// The channel hit an error. Usually followed by [`closed`](Self::closed).
    pub async fn failed(&self, description: impl Into<String>) {
        self.emit(ChannelSignal::Failed(description.into())).await;
    }

    /// The channel closed with the given close code.
    pub async fn closed(&self, code: u16) {
        self.emit(ChannelSignal::Closed(code)).await;
    }

    async fn emit(&self, signal: ChannelSignal) {
        if self
            .tx
            .send(DriverEvent::Channel {
                id: self.id,
                signal,
            })
            .await
            .is_err()
        {
            trace!(channel = %self.id, "manager gone, dropping channel event");
        }
    }
}
