//! Background eviction of expired sessions.
//!
//! The reaper only bounds memory. Correctness never depends on it: every
//! `SessionStore` accessor re-checks expiry, so a session that outlives its
//! TTL between sweeps is still treated as absent.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::store::SessionStore;

/// Periodic sweeper over a shared `SessionStore`.
pub struct SessionReaper {
    store: SessionStore,
    interval: Duration,
}

impl SessionReaper {
    pub fn new(store: SessionStore, interval: Duration) -> Self {
        Self { store, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single sweep now, returning the number of evicted sessions.
    pub fn sweep_once(&self) -> usize {
        let evicted = self.store.sweep();
        if evicted > 0 {
            tracing::info!(
                evicted,
                remaining = self.store.len(),
                "reaped expired sessions"
            );
        } else {
            tracing::trace!("reaper sweep found nothing to evict");
        }
        evicted
    }

    /// Sweep every `interval` until `cancel` fires.
    ///
    /// The first sweep happens one full interval after start.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!(interval_secs = self.interval.as_secs(), "session reaper started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.sweep_once();
                }
            }
        }

        tracing::debug!("session reaper stopped");
    }

    /// Spawn `run` onto the current tokio runtime.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }
}
