//! Keepalive pump: periodic pings so idle channels stay routable.

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::tungstenite;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use chatlink_protocol::constants::WS_PING_PERIOD;

/// Queues a ping every [`WS_PING_PERIOD`] until cancelled or the write
/// side goes away. A full queue skips the tick rather than blocking.
pub(crate) async fn ping_pump(
    write_tx: mpsc::Sender<tungstenite::Message>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(WS_PING_PERIOD);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval.tick().await; // first tick completes immediately

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = interval.tick() => {
                match write_tx.try_send(tungstenite::Message::Ping(Vec::new().into())) {
                    Ok(()) => trace!("queued keepalive ping"),
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        trace!("write queue full, skipping ping")
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => return,
                }
            }
        }
    }
}
