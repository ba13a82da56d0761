//! Dispute Deadline Sweeper
//!
//! Background task that periodically enforces elapsed dispute windows through
//! [`MatchService::sweep_expired_disputes`].

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::SweeperConfig;
use crate::settlement::MatchService;

/// Handle to a running sweeper.
pub struct DeadlineSweeper {
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl DeadlineSweeper {
    /// Start sweeping on the configured interval.
    pub fn spawn(service: MatchService, config: SweeperConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(config.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Dispute sweeper started (interval: {:?})", config.interval);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = service.sweep_expired_disputes(Utc::now()).await;
                        if report.is_empty() {
                            debug!("Dispute sweep: nothing to do");
                        } else {
                            info!(
                                escalated = report.escalated.len(),
                                refunded = report.refunded.len(),
                                "Dispute sweep applied"
                            );
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Dispute sweeper stopping");
                        break;
                    }
                }
            }
        });

        Self { shutdown_tx, handle }
    }

    /// Stop the sweeper and wait for the current sweep to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}
