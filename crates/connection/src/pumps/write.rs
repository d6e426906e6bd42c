//! Write pump. The only task that touches the socket's sink half.

use futures_util::SinkExt;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

/// Drains the outbound queue into the socket. On cancellation, or once
/// every sender is dropped, a close frame is sent before returning.
pub(crate) async fn write_pump<S>(
    mut sink: S,
    mut queue: mpsc::Receiver<tungstenite::Message>,
    cancel: CancellationToken,
) where
    S: SinkExt<tungstenite::Message, Error = tungstenite::Error> + Unpin,
{
    loop {
        let msg = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            msg = queue.recv() => match msg {
                Some(msg) => msg,
                None => break,
            },
        };

        if let tungstenite::Message::Text(ref text) = msg {
            trace!(len = text.len(), "writing frame");
        }
        if let Err(e) = sink.send(msg).await {
            warn!("WebSocket write error: {e}");
            return;
        }
    }

    // The peer may already be gone.
    let _ = sink.send(tungstenite::Message::Close(None)).await;
}
