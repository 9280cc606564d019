// libs/text-session-cell/src/services/sweeper.rs
use std::sync::Arc;

use tokio::time::Duration;
use tracing::{debug, error, info, instrument};

use crate::services::lifecycle::SessionLifecycleService;

/// Counts from one sweep pass, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepStats {
    pub checked: usize,
    pub expired: usize,
    pub ended: usize,
}

/// Background enforcement of deadlines and time limits.
///
/// Each tick re-checks every open session through the same
/// `check_status` entry point the polling clients use, so a session a
/// client stopped watching still expires and still settles — and a session
/// both actors race on converges, because the termination guard is shared.
pub struct ExpirationSweeper {
    lifecycle: Arc<SessionLifecycleService>,
    tick: Duration,
    is_shutdown: tokio::sync::RwLock<bool>,
}

impl ExpirationSweeper {
    pub fn new(lifecycle: Arc<SessionLifecycleService>, tick_seconds: u64) -> Self {
        Self {
            lifecycle,
            tick: Duration::from_secs(tick_seconds),
            is_shutdown: tokio::sync::RwLock::new(false),
        }
    }

    /// Spawn the sweep loop. Returns the task handle; the loop exits after
    /// `shutdown()`.
    pub fn start(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    pub async fn shutdown(&self) {
        info!("Expiration sweeper shutting down");
        let mut is_shutdown = self.is_shutdown.write().await;
        *is_shutdown = true;
    }

    #[instrument(skip(self))]
    async fn run(&self) {
        info!(tick_seconds = self.tick.as_secs(), "Expiration sweeper started");
        let mut interval = tokio::time::interval(self.tick);

        loop {
            interval.tick().await;

            if *self.is_shutdown.read().await {
                break;
            }

            let stats = self.sweep_once().await;
            if stats.expired > 0 || stats.ended > 0 {
                info!(
                    checked = stats.checked,
                    expired = stats.expired,
                    ended = stats.ended,
                    "Sweep pass applied transitions"
                );
            } else {
                debug!(checked = stats.checked, "Sweep pass found nothing due");
            }
        }

        info!("Expiration sweeper stopped");
    }

    /// One pass over all open sessions. Exposed separately so tests can
    /// drive sweeps without waiting on timers.
    pub async fn sweep_once(&self) -> SweepStats {
        let ids = self.lifecycle.store().open_session_ids().await;
        let mut stats = SweepStats {
            checked: ids.len(),
            ..SweepStats::default()
        };

        for id in ids {
            match self.lifecycle.check_status(id).await {
                Ok(check) => match check.status {
                    crate::models::SessionStatus::Expired => stats.expired += 1,
                    crate::models::SessionStatus::Ended => stats.ended += 1,
                    _ => {}
                },
                Err(e) => {
                    // a session can vanish between the scan and the check
                    error!(session_id = %id, "Sweep check failed: {}", e);
                }
            }
        }

        stats
    }
}
