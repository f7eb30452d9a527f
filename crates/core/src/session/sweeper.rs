use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::session::store::SessionStore;

/// Background backstop that bulk-evicts abandoned sessions so the store does
/// not grow without bound between reads. Runs independently of request
/// handling; each sweep only touches already-stale entries.
pub struct SessionSweeper {
    store: Arc<SessionStore>,
    interval: Duration,
}

impl SessionSweeper {
    pub fn new(store: Arc<SessionStore>, interval: Duration) -> Self {
        Self { store, interval }
    }

    /// Sweeps once immediately, then on a fixed interval until the returned
    /// handle is stopped.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        info!(
            event_name = "session.sweeper.started",
            interval_secs = self.interval.as_secs(),
            "session sweeper task starting"
        );

        let task = tokio::spawn(async move {
            let evicted = self.store.sweep();
            debug!(
                event_name = "session.sweeper.pass_completed",
                evicted,
                live = self.store.len(),
                "initial session sweep finished"
            );

            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of a fresh interval resolves immediately and
            // would double up the initial sweep.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let evicted = self.store.sweep();
                        debug!(
                            event_name = "session.sweeper.pass_completed",
                            evicted,
                            live = self.store.len(),
                            "periodic session sweep finished"
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            info!(event_name = "session.sweeper.stopped", "session sweeper task exiting");
        });

        SweeperHandle { shutdown: shutdown_tx, task }
    }
}

/// Owning handle for a running sweep task.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweep task to exit and waits for it to finish.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.task.await;
    }
}
