//! Check orchestrator: one full sweep over every monitor
//!
//! For each monitor, in list order: probe, read the latest stored status,
//! append the new record, then notify if the status flipped. After the last
//! monitor, records older than the retention window are pruned. Only a monitor
//! list that cannot be loaded fails the sweep; every other failure is logged.
//!
//! A sweep deadline or shutdown only cancels probes. Monitors not yet probed
//! are skipped, but a probed monitor is always recorded and observed, and
//! pruning always runs.

use crate::alerts::{down_detail, TransitionNotifier};
use crate::clock::Clock;
use crate::config::MonitorSource;
use crate::error::{ConfigError, ProbeCancelled, SweepError};
use crate::history::HistoryStore;
use crate::probe::Prober;
use crate::records::{CheckRecord, Monitor, Status, SweepResult, Timestamp, TriggerSource};
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Five weeks, in seconds
pub const DEFAULT_RETENTION_SECONDS: i64 = 35 * 24 * 3600;

/// Runs sweeps, one at a time
pub struct CheckOrchestrator {
    source: Arc<dyn MonitorSource>,
    prober: Arc<dyn Prober>,
    store: Arc<dyn HistoryStore>,
    notifier: Arc<TransitionNotifier>,
    clock: Arc<dyn Clock>,
    retention_seconds: i64,
    sweep_timeout: Option<Duration>,
    shutdown: CancellationToken,
    /// Held for the whole duration of a sweep
    gate: Mutex<()>,
}

impl CheckOrchestrator {
    pub fn new(
        source: Arc<dyn MonitorSource>,
        prober: Arc<dyn Prober>,
        store: Arc<dyn HistoryStore>,
        notifier: Arc<TransitionNotifier>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            source,
            prober,
            store,
            notifier,
            clock,
            retention_seconds: DEFAULT_RETENTION_SECONDS,
            sweep_timeout: None,
            shutdown: CancellationToken::new(),
            gate: Mutex::new(()),
        }
    }

    /// Keep records for `seconds` before pruning them
    pub fn with_retention(mut self, seconds: i64) -> Self {
        self.retention_seconds = seconds;
        self
    }

    /// Stop probing once a sweep has run for `limit`; `None` never stops
    pub fn with_sweep_timeout(mut self, limit: Option<Duration>) -> Self {
        self.sweep_timeout = limit;
        self
    }

    /// Abandon in-flight probes when `token` is cancelled
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn store(&self) -> &Arc<dyn HistoryStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<TransitionNotifier> {
        &self.notifier
    }

    pub fn source(&self) -> &Arc<dyn MonitorSource> {
        &self.source
    }

    /// Run a sweep, waiting for any sweep already in flight to finish
    ///
    /// # Arguments
    ///
    /// * `trigger` - What started the sweep; manual sweeps also return the
    ///   probed response headers
    ///
    /// # Returns
    ///
    /// One result per probed monitor, in list order. A sweep interrupted by
    /// shutdown or its deadline returns the monitors it got through.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the monitor list cannot be loaded.
    pub async fn run_sweep(&self, trigger: TriggerSource) -> Result<Vec<SweepResult>, ConfigError> {
        let _guard = self.gate.lock().await;
        self.sweep(trigger).await
    }

    /// Run a sweep unless one is already in flight
    ///
    /// # Errors
    ///
    /// Returns `SweepError::Busy` instead of waiting, or `SweepError::Config`
    /// if the monitor list cannot be loaded.
    pub async fn try_run_sweep(
        &self,
        trigger: TriggerSource,
    ) -> Result<Vec<SweepResult>, SweepError> {
        let _guard = self.gate.try_lock().map_err(|_| SweepError::Busy)?;
        Ok(self.sweep(trigger).await?)
    }

    async fn sweep(&self, trigger: TriggerSource) -> Result<Vec<SweepResult>, ConfigError> {
        let monitors = self.source.load()?;
        let now = self.clock.now();
        info!(
            "Starting {} sweep over {} monitors",
            trigger,
            monitors.len()
        );

        let cancel = self.shutdown.child_token();
        let deadline = self.sweep_timeout.map(|limit| {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                cancel.cancel();
            })
        });

        let mut results = Vec::with_capacity(monitors.len());
        for monitor in &monitors {
            match self.check_one(monitor, trigger, now, &cancel).await {
                Ok(result) => results.push(result),
                Err(ProbeCancelled) => {
                    let skipped = monitors.len() - results.len();
                    if self.shutdown.is_cancelled() {
                        warn!("Sweep cancelled, skipping {} remaining monitors", skipped);
                    } else {
                        error!(
                            "Sweep exceeded {:?}, skipping {} remaining monitors",
                            self.sweep_timeout.unwrap_or_default(),
                            skipped
                        );
                    }
                    break;
                }
            }
        }

        if let Some(timer) = deadline {
            timer.abort();
        }

        self.prune(now).await;

        let down = results.iter().filter(|r| r.status != Status::Up).count();
        info!(
            "Finished {} sweep: {} checked, {} down",
            trigger,
            results.len(),
            down
        );
        Ok(results)
    }

    async fn check_one(
        &self,
        monitor: &Monitor,
        trigger: TriggerSource,
        now: Timestamp,
        cancel: &CancellationToken,
    ) -> Result<SweepResult, ProbeCancelled> {
        let outcome = self.prober.probe(&monitor.url, cancel).await?;
        debug!(
            "{}: {} (HTTP {}, {} ms)",
            monitor.name, outcome.status, outcome.status_code, outcome.duration_ms
        );

        let previous = match self.store.latest_status(&monitor.name).await {
            Ok(status) => status,
            Err(e) => {
                warn!(
                    "Could not read latest status for {}, treating as unknown: {}",
                    monitor.name, e
                );
                Status::Unknown
            }
        };

        let record = CheckRecord {
            name: monitor.name.clone(),
            status: outcome.status,
            status_code: outcome.status_code,
            timestamp: now,
            scheduled: trigger.is_scheduled(),
            duration_ms: outcome.duration_ms,
            error_detail: outcome.error_detail.clone(),
        };
        if let Err(e) = self.store.append(&record).await {
            error!("Failed to record check for {}: {}", monitor.name, e);
        }

        let detail = down_detail(outcome.status_code, outcome.error_detail.as_deref());
        self.notifier
            .observe(&monitor.name, previous, outcome.status, &detail);

        Ok(SweepResult {
            name: monitor.name.clone(),
            status: outcome.status,
            status_code: outcome.status_code,
            duration_ms: outcome.duration_ms,
            headers: match trigger {
                TriggerSource::Manual => Some(outcome.headers),
                TriggerSource::Scheduled => None,
            },
        })
    }

    async fn prune(&self, now: Timestamp) {
        let cutoff = now - self.retention_seconds;
        match self.store.prune_older_than(cutoff).await {
            Ok(0) => debug!("No records older than {} to prune", cutoff),
            Ok(deleted) => info!("Pruned {} records older than {}", deleted, cutoff),
            Err(e) => error!("Failed to prune history: {}", e),
        }
    }
}
