//! Age-based eviction of staged and processed files.
//!
//! The sweeper shares nothing with request handling except the two
//! directories. A file deleted by a request between listing and eviction
//! simply shows up as a `NotFound` failure in the sweep report.

use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::error::StoreError;
use crate::store::{FileStore, ProcessedStore, StagedStore, StoreKind};
use crate::types::{StoredFile, SweepReport};

/// What the background sweeper is doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweeperState {
    Idle,
    Scanning,
}

/// Deletes files older than the retention window from both stores.
#[derive(Debug, Clone)]
pub struct RetentionSweeper {
    staged: StagedStore,
    processed: ProcessedStore,
    ttl: Duration,
    interval: Duration,
}

impl RetentionSweeper {
    pub fn new(
        staged: StagedStore,
        processed: ProcessedStore,
        ttl: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            staged,
            processed,
            ttl,
            interval,
        }
    }

    /// Build from config with the configured window and period.
    pub fn from_config(config: &Config, staged: StagedStore, processed: ProcessedStore) -> Self {
        Self::new(staged, processed, config.ttl(), config.sweep_interval())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// One pass against the current time.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_at(SystemTime::now())
    }

    /// One pass treating `now` as the current time.
    ///
    /// A file is evicted when its modification time is strictly older than
    /// `now - ttl`. Failures are logged and counted; they never stop the pass.
    pub fn sweep_at(&self, now: SystemTime) -> SweepReport {
        let mut report = SweepReport::default();
        let Some(cutoff) = now.checked_sub(self.ttl) else {
            return report;
        };
        tracing::debug!("Running retention sweep (ttl {:?})", self.ttl);

        sweep_store(&self.staged, cutoff, &mut report);
        sweep_store(&self.processed, cutoff, &mut report);

        if !report.evicted.is_empty() || report.failures > 0 {
            tracing::info!(
                "Retention sweep: {} scanned, {} evicted, {} failed",
                report.scanned,
                report.evicted.len(),
                report.failures
            );
        }
        report
    }

    /// Run forever on a tokio task: sweep immediately, then every `interval`.
    ///
    /// Each pass runs on the blocking pool so request handling on the runtime
    /// is never stalled by directory scans.
    pub fn spawn(self) -> SweeperHandle {
        let (state_tx, state_rx) = watch::channel(SweeperState::Idle);
        let sweeper = Arc::new(self);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweeper.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                state_tx.send_replace(SweeperState::Scanning);

                let pass = Arc::clone(&sweeper);
                if let Err(e) = tokio::task::spawn_blocking(move || pass.sweep()).await {
                    tracing::error!("Retention sweep task failed: {e}");
                }

                state_tx.send_replace(SweeperState::Idle);
            }
        });

        SweeperHandle {
            task,
            state: state_rx,
        }
    }
}

fn sweep_store<K: StoreKind>(store: &FileStore<K>, cutoff: SystemTime, report: &mut SweepReport) {
    let files = match store.list() {
        Ok(files) => files,
        Err(e) => {
            tracing::error!("Cannot list {} files for retention: {}", store.label(), e);
            report.failures += 1;
            return;
        }
    };
    evict(store, files, cutoff, report);
}

/// Delete every listed file older than `cutoff`.
///
/// `files` is a snapshot, so an entry may already be gone by the time it is
/// reached. That counts as a failure and the pass moves on.
fn evict<K: StoreKind>(
    store: &FileStore<K>,
    files: Vec<StoredFile>,
    cutoff: SystemTime,
    report: &mut SweepReport,
) {
    for file in files {
        report.scanned += 1;
        if file.modified >= cutoff {
            continue;
        }
        match store.delete(&file.name) {
            Ok(()) => {
                tracing::debug!("Deleted old {} file: {}", store.label(), file.name);
                report.evicted.push(file.name);
            }
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(
                    "Old {} file {} vanished before eviction",
                    store.label(),
                    file.name
                );
                report.failures += 1;
            }
            Err(e) => {
                tracing::error!("Error deleting old {} file {}: {}", store.label(), file.name, e);
                report.failures += 1;
            }
        }
    }
}

/// Control over a spawned sweeper.
#[derive(Debug)]
pub struct SweeperHandle {
    task: JoinHandle<()>,
    state: watch::Receiver<SweeperState>,
}

impl SweeperHandle {
    /// Current state of the loop.
    pub fn state(&self) -> SweeperState {
        *self.state.borrow()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the loop. A pass already on the blocking pool runs to completion.
    pub async fn shutdown(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}
