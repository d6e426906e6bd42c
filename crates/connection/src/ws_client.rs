//! WebSocket implementation of the channel primitive.
//!
//! Each channel runs one connection task which dials, reports `opened`,
//! then drives the read, write and ping pumps under a shared
//! cancellation token until either side closes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatlink_protocol::constants::{CLOSE_ABNORMAL, WS_MAX_MESSAGE_SIZE, WS_WRITE_QUEUE};

use crate::channel::{Channel, ChannelError, ChannelEvents, Connector};
use crate::pumps::ping::ping_pump;
use crate::pumps::read::{ReadOutcome, read_pump};
use crate::pumps::write::write_pump;

/// Opens [`WsChannel`]s with tokio-tungstenite.
#[derive(Debug, Clone, Default)]
pub struct WsConnector;

impl WsConnector {
    pub fn new() -> Self {
        Self
    }
}

impl Connector for WsConnector {
    fn open(&self, url: &str, events: ChannelEvents) -> Box<dyn Channel> {
        let (write_tx, write_rx) = mpsc::channel(WS_WRITE_QUEUE);
        let open = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_channel(
            url.to_string(),
            write_rx,
            write_tx.clone(),
            open.clone(),
            cancel.clone(),
            events,
        ));

        Box::new(WsChannel {
            write_tx,
            open,
            cancel,
            _task: task,
        })
    }
}

/// A WebSocket channel handle. Dropping it closes the connection.
pub struct WsChannel {
    write_tx: mpsc::Sender<tungstenite::Message>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
    _task: tokio::task::JoinHandle<()>,
}

impl Channel for WsChannel {
    fn send_text(&self, text: String) -> Result<(), ChannelError> {
        if !self.is_open() {
            return Err(ChannelError::NotOpen);
        }
        self.write_tx
            .try_send(tungstenite::Message::Text(text.into()))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => ChannelError::QueueFull,
                mpsc::error::TrySendError::Closed(_) => ChannelError::NotOpen,
            })
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire) && !self.cancel.is_cancelled()
    }

    fn close(&self) {
        self.open.store(false, Ordering::Release);
        self.cancel.cancel();
    }
}

impl Drop for WsChannel {
    fn drop(&mut self) {
        // The connection task exits on its own once cancelled, which lets
        // the write pump send a close frame.
        self.cancel.cancel();
    }
}

fn ws_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(WS_MAX_MESSAGE_SIZE);
    config.max_frame_size = Some(WS_MAX_MESSAGE_SIZE);
    config
}

async fn run_channel(
    url: String,
    write_rx: mpsc::Receiver<tungstenite::Message>,
    write_tx: mpsc::Sender<tungstenite::Message>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
    events: ChannelEvents,
) {
    debug!(channel = %events.id(), %url, "dialing");
    let connect =
        tokio_tungstenite::connect_async_with_config(url.as_str(), Some(ws_config()), false);
    let result = tokio::select! {
        _ = cancel.cancelled() => return,
        result = connect => result,
    };

    let ws_stream = match result {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            if cancel.is_cancelled() {
                return;
            }
            warn!(channel = %events.id(), %url, error = %e, "connect failed");
            events.failed(e.to_string()).await;
            events.closed(CLOSE_ABNORMAL).await;
            return;
        }
    };
    if cancel.is_cancelled() {
        return;
    }

    let (sink, stream) = ws_stream.split();
    open.store(true, Ordering::Release);
    info!(channel = %events.id(), "channel open");
    events.opened().await;

    let writer = tokio::spawn(write_pump(sink, write_rx, cancel.clone()));
    let pinger = tokio::spawn(ping_pump(write_tx.clone(), cancel.clone()));

    let outcome = read_pump(stream, events.clone(), write_tx, cancel.clone()).await;

    open.store(false, Ordering::Release);
    cancel.cancel();
    let _ = writer.await;
    let _ = pinger.await;

    match outcome {
        ReadOutcome::Cancelled => debug!(channel = %events.id(), "channel closed locally"),
        ReadOutcome::Closed(code) => {
            info!(channel = %events.id(), code, "channel closed by peer");
            events.closed(code).await;
        }
        ReadOutcome::Failed(description) => {
            events.failed(description).await;
            events.closed(CLOSE_ABNORMAL).await;
        }
    }
}
