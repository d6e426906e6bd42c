//! Connection manager handle.
//!
//! [`ConnectionManager::start`] spawns the manager task and returns a handle
//! for sending messages, triggering reconnects and observing state.
//! Dropping the handle stops the task and closes both channels.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::channel::Connector;
use crate::driver::{Command, Driver, Outputs};
use crate::token_store::TokenStore;
use crate::types::{ChannelSnapshot, ConnectionEvent, ConnectionStatus, SessionConfig};

/// Errors from manager operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("connection manager has stopped")]
    Stopped,
}

/// Handle to a running dual-channel session.
pub struct ConnectionManager {
    commands: mpsc::Sender<Command>,
    status_rx: watch::Receiver<ConnectionStatus>,
    error_rx: watch::Receiver<Option<String>>,
    last_message_rx: watch::Receiver<Option<String>>,
    authenticated_rx: watch::Receiver<bool>,
    events_rx: Mutex<Option<mpsc::Receiver<ConnectionEvent>>>,
    cancel: CancellationToken,
    task: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl ConnectionManager {
    /// Spawns the manager task and opens the initial channel.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn TokenStore>,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::channel(64);
        let (driver_tx, driver_rx) = mpsc::channel(64);
        let (commands_tx, commands_rx) = mpsc::channel(64);
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Disconnected);
        let (error_tx, error_rx) = watch::channel(None);
        let (last_message_tx, last_message_rx) = watch::channel(None);
        let (authenticated_tx, authenticated_rx) = watch::channel(config.authenticated);
        let cancel = CancellationToken::new();

        let outputs = Outputs {
            status: status_tx,
            error: error_tx,
            last_message: last_message_tx,
            authenticated: authenticated_tx,
            events: events_tx,
        };
        let driver = Driver::new(config, connector, store, driver_tx, outputs);
        let task = tokio::spawn(driver.run(driver_rx, commands_rx, cancel.clone()));

        Self {
            commands: commands_tx,
            status_rx,
            error_rx,
            last_message_rx,
            authenticated_rx,
            events_rx: Mutex::new(Some(events_rx)),
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<ConnectionEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Sends `{"user_input": text}` on the live channel.
    ///
    /// Delivery is not confirmed. With no open channel the manager records
    /// an error and schedules a reconnect instead.
    pub async fn send_chat_message(&self, text: impl Into<String>) -> Result<(), SessionError> {
        self.command(Command::Send(text.into())).await
    }

    /// Re-reads the token and reopens the appropriate channel now.
    pub async fn initialize_connections(&self) -> Result<(), SessionError> {
        self.command(Command::Initialize).await
    }

    /// Updates the authenticated flag and re-initialises if it changed.
    ///
    /// An idle manager (after session expiry or a failed initialise)
    /// re-initialises even when the flag is unchanged.
    pub async fn set_authenticated(&self, authenticated: bool) -> Result<(), SessionError> {
        self.command(Command::SetAuthenticated(authenticated)).await
    }

    /// Returns which channel instances the manager currently holds.
    pub async fn channels(&self) -> Result<ChannelSnapshot, SessionError> {
        let (tx, rx) = oneshot::channel();
        self.command(Command::Channels(tx)).await?;
        rx.await.map_err(|_| SessionError::Stopped)
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_rx.borrow()
    }

    /// Human-readable description of the last connectivity problem.
    pub fn connection_error(&self) -> Option<String> {
        self.error_rx.borrow().clone()
    }

    /// The most recent application message.
    pub fn last_message(&self) -> Option<String> {
        self.last_message_rx.borrow().clone()
    }

    /// The manager's view of the authenticated flag. Cleared on session expiry.
    pub fn is_authenticated(&self) -> bool {
        *self.authenticated_rx.borrow()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status_rx.clone()
    }

    pub fn subscribe_last_message(&self) -> watch::Receiver<Option<String>> {
        self.last_message_rx.clone()
    }

    /// Cancels the retry timer, closes both channels and waits for the task.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
            debug!("connection manager shut down");
        }
    }

    async fn command(&self, command: Command) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Stopped)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
