//! Reconnection policy: exponential backoff and the single pending
//! retry timer.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use crate::channel::DriverEvent;
use crate::types::ReconnectConfig;

/// Attempt counter for consecutive failures.
///
/// Reset whenever a channel opens; advanced each time a retry is scheduled.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    config: ReconnectConfig,
    attempt: u32,
}

impl Backoff {
    pub(crate) fn new(config: ReconnectConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Returns the delay for the current attempt and advances the counter.
    pub(crate) fn next_delay(&mut self) -> Duration {
        let delay = self.config.delay_for_attempt(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub(crate) fn reset(&mut self) {
        self.attempt = 0;
    }

    pub(crate) fn attempt(&self) -> u32 {
        self.attempt
    }
}

/// Owns at most one pending retry.
///
/// Arming always cancels the previous timer first, so two retry chains can
/// never run side by side. A timer that fires posts
/// [`DriverEvent::RetryDue`] tagged with its generation; anything but the
/// latest generation is stale.
#[derive(Debug)]
pub(crate) struct RetryTimer {
    events_tx: mpsc::Sender<DriverEvent>,
    pending: Option<(u64, CancellationToken)>,
    generation: u64,
}

impl RetryTimer {
    pub(crate) fn new(events_tx: mpsc::Sender<DriverEvent>) -> Self {
        Self {
            events_tx,
            pending: None,
            generation: 0,
        }
    }

    /// Schedules a retry after `delay`, superseding any pending one.
    pub(crate) fn arm(&mut self, delay: Duration) -> u64 {
        self.cancel();
        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        self.pending = Some((generation, cancel.clone()));

        let tx = self.events_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    trace!(generation, "retry timer cancelled");
                }
                _ = tokio::time::sleep(delay) => {
                    let _ = tx.send(DriverEvent::RetryDue { generation }).await;
                }
            }
        });
        debug!(generation, delay_ms = delay.as_millis() as u64, "retry armed");
        generation
    }

    /// Cancels the pending retry, if any.
    pub(crate) fn cancel(&mut self) {
        if let Some((generation, token)) = self.pending.take() {
            token.cancel();
            trace!(generation, "pending retry cancelled");
        }
    }

    /// Consumes a fired timer. Returns `false` for stale or cancelled ones.
    pub(crate) fn fire(&mut self, generation: u64) -> bool {
        match self.pending {
            Some((current, _)) if current == generation => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
