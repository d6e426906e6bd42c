//! The manager task.
//!
//! One task owns every piece of mutable session state. Channel events,
//! retry timer fires and API commands are all handled here, one at a time.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use chatlink_protocol::OutboundFrame;

use crate::channel::{Channel, ChannelEvents, ChannelId, ChannelSignal, Connector, DriverEvent};
use crate::machine::{self, Effect, ErrorUpdate, Signal};
use crate::reconnection::{Backoff, RetryTimer};
use crate::relay::{self, FrameAction};
use crate::token_store::TokenStore;
use crate::types::{
    ChannelRole, ChannelSnapshot, ChannelState, ConnectionEvent, ConnectionStatus, SessionConfig,
};

/// Requests from [`ConnectionManager`](crate::ConnectionManager) handles.
#[derive(Debug)]
pub(crate) enum Command {
    Send(String),
    Initialize,
    SetAuthenticated(bool),
    Channels(oneshot::Sender<ChannelSnapshot>),
}

/// Watch senders and the event queue the driver publishes into.
pub(crate) struct Outputs {
    pub status: watch::Sender<ConnectionStatus>,
    pub error: watch::Sender<Option<String>>,
    pub last_message: watch::Sender<Option<String>>,
    pub authenticated: watch::Sender<bool>,
    pub events: mpsc::Sender<ConnectionEvent>,
}

struct Slot {
    id: ChannelId,
    channel: Box<dyn Channel>,
}

pub(crate) struct Driver {
    config: SessionConfig,
    connector: Arc<dyn Connector>,
    store: Arc<dyn TokenStore>,
    events_tx: mpsc::Sender<DriverEvent>,
    outputs: Outputs,
    auth: Option<Slot>,
    chat: Option<Slot>,
    next_id: u64,
    status: ConnectionStatus,
    backoff: Backoff,
    retry: RetryTimer,
}

impl Driver {
    pub(crate) fn new(
        config: SessionConfig,
        connector: Arc<dyn Connector>,
        store: Arc<dyn TokenStore>,
        events_tx: mpsc::Sender<DriverEvent>,
        outputs: Outputs,
    ) -> Self {
        Self {
            backoff: Backoff::new(config.reconnect.clone()),
            retry: RetryTimer::new(events_tx.clone()),
            config,
            connector,
            store,
            events_tx,
            outputs,
            auth: None,
            chat: None,
            next_id: 0,
            status: ConnectionStatus::Disconnected,
        }
    }

    /// Runs until cancelled or every handle is gone.
    ///
    /// Channel and timer events are drained before commands.
    pub(crate) async fn run(
        mut self,
        mut events_rx: mpsc::Receiver<DriverEvent>,
        mut commands_rx: mpsc::Receiver<Command>,
        cancel: CancellationToken,
    ) {
        self.initialize().await;

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(event) = events_rx.recv() => self.handle_event(event).await,

                command = commands_rx.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => break,
                },
            }
        }

        self.teardown();
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::Send(text) => self.send_chat_message(text).await,
            Command::Initialize => {
                info!(superseding_retry = self.retry.is_pending(), "manual reconnect requested");
                self.retry.cancel();
                self.initialize().await;
            }
            Command::SetAuthenticated(authenticated) => {
                let idle = self.auth.is_none() && self.chat.is_none() && !self.retry.is_pending();
                if authenticated == self.config.authenticated && !idle {
                    return;
                }
                info!(authenticated, idle, "authentication state set");
                self.set_authenticated(authenticated);
                self.retry.cancel();
                self.initialize().await;
            }
            Command::Channels(reply) => {
                let _ = reply.send(self.snapshot());
            }
        }
    }

    async fn handle_event(&mut self, event: DriverEvent) {
        match event {
            DriverEvent::Channel { id, signal } => {
                let Some(role) = self.role_of(id) else {
                    trace!(channel = %id, ?signal, "ignoring event from retired channel");
                    return;
                };
                self.handle_signal(role, id, signal).await;
            }
            DriverEvent::RetryDue { generation } => {
                if !self.retry.fire(generation) {
                    trace!(generation, "ignoring stale retry");
                    return;
                }
                info!(attempt = self.backoff.attempt(), "reconnecting");
                self.initialize().await;
            }
        }
    }

    async fn handle_signal(&mut self, role: ChannelRole, id: ChannelId, signal: ChannelSignal) {
        match signal {
            ChannelSignal::Opened => {
                info!(%role, channel = %id, "channel open");
                self.apply(role, Signal::Opened).await;
            }
            ChannelSignal::Frame(text) => self.handle_frame(role, id, &text).await,
            ChannelSignal::Failed(description) => {
                warn!(%role, channel = %id, error = %description, "channel error");
                self.apply(role, Signal::Failed).await;
            }
            ChannelSignal::Closed(code) => {
                info!(%role, channel = %id, code, "channel closed");
                self.slot_mut(role).take();
                self.apply(role, Signal::Closed(code)).await;
            }
        }
    }

    /// Token relay and message routing. Shared by both roles.
    async fn handle_frame(&mut self, role: ChannelRole, id: ChannelId, text: &str) {
        trace!(%role, channel = %id, len = text.len(), "frame");
        match relay::classify(text) {
            FrameAction::Malformed | FrameAction::Ignored => {}
            FrameAction::Expired => {
                warn!(%role, channel = %id, "server rejected session token");
                self.retire(role);
                self.apply(role, Signal::TokenExpired).await;
            }
            FrameAction::Token(token) => self.relay_token(token).await,
            FrameAction::Message(message) => {
                self.outputs.last_message.send_replace(Some(message.clone()));
                self.emit(ConnectionEvent::Message(message));
            }
        }
    }

    async fn relay_token(&mut self, token: String) {
        // The store must agree with the channel before the token is used.
        if let Err(e) = self.store.set_token(token.clone()).await {
            warn!(error = %e, "failed to persist session token");
        }

        let rotated_in_band = match &self.chat {
            Some(slot) if slot.channel.is_open() => {
                match OutboundFrame::UpdateToken(token.clone()).encode() {
                    Ok(frame) => match slot.channel.send_text(frame) {
                        Ok(()) => true,
                        Err(e) => {
                            warn!(channel = %slot.id, error = %e, "in-band token update failed");
                            false
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "failed to encode token update");
                        false
                    }
                }
            }
            _ => false,
        };

        if rotated_in_band {
            debug!("token rotated on open chat channel");
        } else {
            self.open_channel(ChannelRole::Chat, Some(&token)).await;
        }
        self.emit(ConnectionEvent::TokenRotated);
    }

    async fn send_chat_message(&mut self, text: String) {
        let frame = match OutboundFrame::UserInput(text).encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode user input");
                return;
            }
        };

        let live = [ChannelRole::Chat, ChannelRole::Auth]
            .into_iter()
            .find_map(|role| self.slot(role).filter(|s| s.channel.is_open()).map(|s| (role, s)));

        if let Some((role, slot)) = live {
            match slot.channel.send_text(frame) {
                Ok(()) => {
                    trace!(%role, channel = %slot.id, "user input sent");
                    return;
                }
                Err(e) => warn!(%role, channel = %slot.id, error = %e, "send failed"),
            }
        } else {
            warn!("no open channel for user input");
        }
        self.apply(ChannelRole::Chat, Signal::SendRejected).await;
    }

    /// Re-reads the token and opens the channel the session calls for.
    async fn initialize(&mut self) {
        let token = match self.store.get_token().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "failed to read session token");
                self.apply(ChannelRole::Auth, Signal::InitFailed).await;
                return;
            }
        };

        match token {
            Some(token) if self.config.authenticated => {
                self.open_channel(ChannelRole::Chat, Some(&token)).await;
            }
            _ => self.open_channel(ChannelRole::Auth, None).await,
        }
    }

    /// Opens a channel, closing any prior instance of the role first.
    async fn open_channel(&mut self, role: ChannelRole, token: Option<&str>) {
        let url = match (role, token) {
            (ChannelRole::Chat, Some(token)) => self.config.endpoints.chat_url(token),
            _ => self.config.endpoints.auth_url(),
        };

        self.retire(role);

        self.next_id += 1;
        let id = ChannelId(self.next_id);
        info!(%role, channel = %id, path = url.path(), "opening channel");

        let events = ChannelEvents::new(id, self.events_tx.clone());
        let channel = self.connector.open(url.as_str(), events);
        *self.slot_mut(role) = Some(Slot { id, channel });

        self.apply(role, Signal::Opening).await;
    }

    /// Closes and forgets the channel of `role`. It reports nothing further.
    fn retire(&mut self, role: ChannelRole) {
        if let Some(slot) = self.slot_mut(role).take() {
            debug!(%role, channel = %slot.id, "closing channel");
            slot.channel.close();
        }
    }

    async fn apply(&mut self, role: ChannelRole, signal: Signal) {
        let t = machine::transition(self.status, role, signal);
        // Error text first, so a status event always sees the matching text.
        match t.error {
            ErrorUpdate::Keep => {}
            ErrorUpdate::Clear => self.set_error(None),
            ErrorUpdate::Set(text) => self.set_error(Some(text.to_string())),
        }
        self.set_status(t.status);

        for effect in t.effects {
            match effect {
                Effect::ResetBackoff => self.backoff.reset(),
                Effect::CancelRetry => self.retry.cancel(),
                Effect::ScheduleRetry => self.schedule_retry(),
                Effect::RetireOtherRole => self.retire(role.other()),
                Effect::ExpireSession => self.expire_session().await,
            }
        }
    }

    fn schedule_retry(&mut self) {
        let delay = self.backoff.next_delay();
        let attempt = self.backoff.attempt();
        self.retry.arm(delay);
        info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            "reconnect scheduled"
        );
        self.emit(ConnectionEvent::Reconnecting { attempt, delay });
    }

    /// Ends the session: no channel stays open and nothing is retried.
    async fn expire_session(&mut self) {
        self.retry.cancel();
        self.retire(ChannelRole::Auth);
        self.retire(ChannelRole::Chat);
        if let Err(e) = self.store.clear_token().await {
            warn!(error = %e, "failed to clear session token");
        }
        self.set_authenticated(false);
        warn!("session expired");
        self.emit(ConnectionEvent::SessionExpired);
    }

    fn teardown(&mut self) {
        self.retry.cancel();
        self.retire(ChannelRole::Auth);
        self.retire(ChannelRole::Chat);
        self.set_status(ConnectionStatus::Disconnected);
        debug!("connection manager stopped");
    }

    fn set_status(&mut self, status: ConnectionStatus) {
        if status == self.status {
            return;
        }
        debug!(from = %self.status, to = %status, "status changed");
        self.status = status;
        self.outputs.status.send_replace(status);
        self.emit(ConnectionEvent::StatusChanged(status));
    }

    fn set_authenticated(&mut self, authenticated: bool) {
        if authenticated == self.config.authenticated {
            return;
        }
        self.config.authenticated = authenticated;
        self.outputs.authenticated.send_replace(authenticated);
        self.emit(ConnectionEvent::AuthenticationChanged(authenticated));
    }

    fn set_error(&self, error: Option<String>) {
        self.outputs.error.send_if_modified(|current| {
            if *current == error {
                false
            } else {
                *current = error;
                true
            }
        });
    }

    fn emit(&self, event: ConnectionEvent) {
        match self.outputs.events.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                debug!(?event, "event queue full, dropping");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }

    fn role_of(&self, id: ChannelId) -> Option<ChannelRole> {
        if self.auth.as_ref().is_some_and(|s| s.id == id) {
            Some(ChannelRole::Auth)
        } else if self.chat.as_ref().is_some_and(|s| s.id == id) {
            Some(ChannelRole::Chat)
        } else {
            None
        }
    }

    fn slot(&self, role: ChannelRole) -> Option<&Slot> {
        match role {
            ChannelRole::Auth => self.auth.as_ref(),
            ChannelRole::Chat => self.chat.as_ref(),
        }
    }

    fn slot_mut(&mut self, role: ChannelRole) -> &mut Option<Slot> {
        match role {
            ChannelRole::Auth => &mut self.auth,
            ChannelRole::Chat => &mut self.chat,
        }
    }

    fn snapshot(&self) -> ChannelSnapshot {
        let state = |slot: &Slot| ChannelState {
            id: slot.id.get(),
            open: slot.channel.is_open(),
        };
        ChannelSnapshot {
            auth: self.auth.as_ref().map(state),
            chat: self.chat.as_ref().map(state),
        }
    }
}
