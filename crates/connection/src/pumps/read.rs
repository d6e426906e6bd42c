//! WebSocket read pump: forwards inbound frames to the manager.

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use chatlink_protocol::constants::{
    CLOSE_ABNORMAL, CLOSE_NO_STATUS, WS_MAX_MESSAGE_SIZE, WS_PONG_WAIT,
};

use crate::channel::ChannelEvents;

/// How the read side of a channel ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    /// Closed locally. Nothing is reported.
    Cancelled,
    /// The peer closed the connection with this code.
    Closed(u16),
    /// Transport error or keepalive timeout.
    Failed(String),
}

/// Reads messages from the WebSocket and forwards text frames.
///
/// Uses a read deadline to detect dead connections: if nothing arrives
/// within [`WS_PONG_WAIT`] the connection is considered dead.
pub(crate) async fn read_pump<S>(
    mut read: S,
    events: ChannelEvents,
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) -> ReadOutcome
where
    S: StreamExt<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
{
    let deadline = tokio::time::sleep(WS_PONG_WAIT);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return ReadOutcome::Cancelled,

            () = &mut deadline => {
                warn!(channel = %events.id(), "read deadline expired, closing");
                return ReadOutcome::Failed("connection timed out".into());
            }

            msg = read.next() => {
                let msg = match msg {
                    Some(Ok(msg)) => msg,
                    Some(Err(e)) => {
                        warn!(channel = %events.id(), "WebSocket read error: {e}");
                        return ReadOutcome::Failed(e.to_string());
                    }
                    None => {
                        debug!(channel = %events.id(), "WebSocket stream ended");
                        return ReadOutcome::Closed(CLOSE_ABNORMAL);
                    }
                };

                // Any inbound traffic proves the peer is alive.
                deadline.as_mut().reset(tokio::time::Instant::now() + WS_PONG_WAIT);

                match msg {
                    tungstenite::Message::Text(text) => {
                        if text.len() > WS_MAX_MESSAGE_SIZE {
                            warn!(
                                channel = %events.id(),
                                len = text.len(),
                                "frame too large, dropping"
                            );
                            continue;
                        }
                        trace!(channel = %events.id(), len = text.len(), "received frame");
                        events.frame(text.as_str()).await;
                    }
                    tungstenite::Message::Ping(data) => {
                        trace!("received ping, sending pong");
                        let _ = write_tx.try_send(tungstenite::Message::Pong(data));
                    }
                    tungstenite::Message::Pong(_) => {
                        trace!("received pong");
                    }
                    tungstenite::Message::Close(frame) => {
                        let code = frame.map_or(CLOSE_NO_STATUS, |f| u16::from(f.code));
                        debug!(channel = %events.id(), code, "received close frame");
                        return ReadOutcome::Closed(code);
                    }
                    _ => {} // Binary is not part of the protocol.
                }
            }
        }
    }
}
