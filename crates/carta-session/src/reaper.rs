//! # Session Reaper
//!
//! Background task that evicts sessions idle longer than the configured TTL.
//!
//! ## Reaper Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   spawn() ──► loop {                                                    │
//! │                 select! {                                               │
//! │                   interval.tick()   ─► cutoff = clock.now() − idle_ttl  │
//! │                                        store.evict_idle(cutoff)         │
//! │                   shutdown_rx.recv() ─► break                           │
//! │                 }                                                       │
//! │               }                                                         │
//! │                                                                         │
//! │   Sessions leased at sweep time are skipped and retried next tick.      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::ReaperSettings;
use crate::store::SessionStore;

/// Periodically evicts idle sessions from a store.
pub struct SessionReaper<S: SessionStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    idle_ttl: Duration,
    sweep_interval: Duration,
    shutdown_rx: mpsc::Receiver<()>,
}

/// Handle for stopping a running reaper.
pub struct ReaperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    /// Stops the reaper and waits for its task to finish.
    pub async fn shutdown(self) {
        // A closed channel means the task is already gone.
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

impl<S: SessionStore> SessionReaper<S> {
    /// Spawns the reaper as a background task.
    pub fn spawn(store: Arc<S>, clock: Arc<dyn Clock>, settings: &ReaperSettings) -> ReaperHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let reaper = SessionReaper {
            store,
            clock,
            idle_ttl: settings.idle_ttl(),
            sweep_interval: settings.sweep_interval(),
            shutdown_rx,
        };
        let task = tokio::spawn(reaper.run());

        ReaperHandle { shutdown_tx, task }
    }

    async fn run(mut self) {
        info!(
            idle_ttl_secs = self.idle_ttl.as_secs(),
            sweep_interval_secs = self.sweep_interval.as_secs(),
            "Session reaper starting"
        );

        let mut interval = tokio::time::interval(self.sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.sweep().await;
                }

                _ = self.shutdown_rx.recv() => {
                    info!("Session reaper shutting down");
                    break;
                }
            }
        }

        info!("Session reaper stopped");
    }

    /// Runs one eviction pass. Returns the number of sessions evicted.
    async fn sweep(&self) -> usize {
        let now = self.clock.now();
        let Some(cutoff) = chrono::Duration::from_std(self.idle_ttl)
            .ok()
            .and_then(|ttl| now.checked_sub_signed(ttl))
        else {
            return 0;
        };

        let evicted = self.store.evict_idle(cutoff).await;
        if evicted > 0 {
            info!(evicted, "Evicted idle sessions");
        } else {
            debug!("No idle sessions");
        }
        evicted
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
