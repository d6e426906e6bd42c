//! In-memory connector and stores for manager tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::FutureExt;
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::channel::{Channel, ChannelError, ChannelEvents, Connector};
use crate::token_store::{StoreFuture, TokenStore, TokenStoreError};

#[derive(Default)]
struct FakeState {
    open: AtomicBool,
    closed: AtomicBool,
    sent: Mutex<Vec<String>>,
}

/// A channel the test drives by hand.
pub(crate) struct FakeOpen {
    pub url: String,
    pub id: u64,
    pub opened_at: Instant,
    /// What the token store held when the channel was opened.
    pub stored_token: Option<String>,
    events: ChannelEvents,
    state: Arc<FakeState>,
}

impl FakeOpen {
    pub async fn open(&self) {
        self.state.open.store(true, Ordering::SeqCst);
        self.events.opened().await;
    }

    pub async fn frame(&self, text: &str) {
        self.events.frame(text).await;
    }

    /// Peer close. Reported even if the manager already let go.
    pub async fn close(&self, code: u16) {
        self.state.open.store(false, Ordering::SeqCst);
        self.events.closed(code).await;
    }

    /// Connect or transport failure followed by a close.
    pub async fn fail(&self, code: u16) {
        self.state.open.store(false, Ordering::SeqCst);
        self.events.failed("connection refused").await;
        self.events.closed(code).await;
    }

    pub fn sent(&self) -> Vec<String> {
        self.state
            .sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }

    /// Whether the manager closed this channel.
    pub fn was_closed(&self) -> bool {
        self.state.closed.load(Ordering::SeqCst)
    }
}

struct FakeChannel {
    state: Arc<FakeState>,
}

impl Channel for FakeChannel {
    fn send_text(&self, text: String) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::NotOpen);
        }
        self.state
            .sent
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push(text);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.state.open.load(Ordering::SeqCst) && !self.state.closed.load(Ordering::SeqCst)
    }

    fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
        self.state.open.store(false, Ordering::SeqCst);
    }
}

/// Hands every opened channel to the test through [`Opens`].
pub(crate) struct FakeConnector {
    store: Arc<dyn TokenStore>,
    opens_tx: mpsc::UnboundedSender<FakeOpen>,
}

impl FakeConnector {
    pub fn new(store: Arc<dyn TokenStore>) -> (Arc<Self>, Opens) {
        let (opens_tx, opens_rx) = mpsc::unbounded_channel();
        (Arc::new(Self { store, opens_tx }), Opens(opens_rx))
    }
}

impl Connector for FakeConnector {
    fn open(&self, url: &str, events: ChannelEvents) -> Box<dyn Channel> {
        let state = Arc::new(FakeState::default());
        let stored_token = self
            .store
            .get_token()
            .now_or_never()
            .and_then(Result::ok)
            .flatten();
        let _ = self.opens_tx.send(FakeOpen {
            url: url.to_string(),
            id: events.id().get(),
            opened_at: Instant::now(),
            stored_token,
            events,
            state: state.clone(),
        });
        Box::new(FakeChannel { state })
    }
}

pub(crate) struct Opens(mpsc::UnboundedReceiver<FakeOpen>);

impl Opens {
    /// Waits for the manager to open a channel.
    pub async fn next(&mut self) -> FakeOpen {
        tokio::time::timeout(Duration::from_secs(3600), self.0.recv())
            .await
            .expect("manager never opened a channel")
            .expect("connector dropped")
    }

    pub fn try_next(&mut self) -> Option<FakeOpen> {
        self.0.try_recv().ok()
    }
}

/// A store whose reads always fail.
pub(crate) struct FailingStore;

impl TokenStore for FailingStore {
    fn get_token(&self) -> StoreFuture<'_, Option<String>> {
        Box::pin(async {
            Err(TokenStoreError::Io(std::io::Error::other("keychain locked")))
        })
    }

    fn set_token(&self, _token: String) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }

    fn clear_token(&self) -> StoreFuture<'_, ()> {
        Box::pin(async { Ok(()) })
    }
}
