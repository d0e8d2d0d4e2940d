//! Periodic sweep trigger

use crate::error::SweepError;
use crate::orchestrator::CheckOrchestrator;
use crate::records::TriggerSource;
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drives scheduled sweeps on a fixed interval until shutdown
pub struct Scheduler {
    orchestrator: Arc<CheckOrchestrator>,
    interval: Duration,
}

impl Scheduler {
    /// # Arguments
    ///
    /// * `orchestrator` - Shared with the manual trigger
    /// * `interval` - Time between sweep starts; the first sweep runs at once
    pub fn new(orchestrator: Arc<CheckOrchestrator>, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
        }
    }

    /// Run until `shutdown` is cancelled, returning the number of ticks taken
    ///
    /// Sweep errors are logged and never end the loop.
    pub async fn run(self, shutdown: CancellationToken) -> u64 {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks = 0;

        info!("Scheduler started, sweeping every {:?}", self.interval);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    ticks += 1;
                    self.tick().await;
                }
            }
        }
        info!("Scheduler stopped after {} ticks", ticks);
        ticks
    }

    async fn tick(&self) {
        match self.orchestrator.try_run_sweep(TriggerSource::Scheduled).await {
            Ok(_) => {}
            Err(SweepError::Busy) => warn!("Skipping scheduled sweep, another sweep is running"),
            Err(e) => error!("Scheduled sweep failed: {}", e),
        }
    }
}
