//! Reconciler — runs one full cycle against the agent and the store.

use std::sync::Arc;
use std::time::Instant;

use cashwatch_agent::{FetchOutcome, RecordSource};
use cashwatch_core::{Error, Result};
use cashwatch_reconcile::{filter_batch, merge_with_report, Candidate, Clock, MergeOutcome};
use cashwatch_store::{JsonRecordStore, LoadOutcome};
use parking_lot::RwLock;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::types::*;

/// Owns the collaborators of a cycle and serializes cycles.
pub struct Reconciler {
    source: Arc<dyn RecordSource>,
    store: JsonRecordStore,
    clock: Arc<dyn Clock>,
    options: CycleOptions,
    cycle_lock: Arc<Mutex<()>>,
    last_report: RwLock<Option<CycleReport>>,
}

struct MergeSummary {
    outcome: MergeOutcome,
    store_state: StoreState,
    persisted: bool,
}

impl Reconciler {
    pub fn new(
        source: Arc<dyn RecordSource>,
        store: JsonRecordStore,
        clock: Arc<dyn Clock>,
        options: CycleOptions,
    ) -> Self {
        Self {
            source,
            store,
            clock,
            options,
            cycle_lock: Arc::new(Mutex::new(())),
            last_report: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &JsonRecordStore {
        &self.store
    }

    /// Whether a cycle is in flight.
    pub fn is_running(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Report of the most recent cycle that was not skipped.
    pub fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().clone()
    }

    /// Run one cycle, or return a `Skipped` report if one is already running.
    pub async fn run_cycle(&self) -> CycleReport {
        let start = Instant::now();
        match self.cycle_lock.clone().try_lock_owned() {
            Ok(guard) => self.run_guarded(guard, start).await,
            Err(_) => {
                info!("Reconciliation cycle already in flight, skipping");
                CycleReport::begin().finish(CycleStatus::Skipped, None, start.elapsed())
            }
        }
    }

    /// Claim the cycle lock now and run the cycle on a background task.
    ///
    /// Returns `None` if a cycle is already in flight.
    pub fn spawn_cycle(self: &Arc<Self>) -> Option<JoinHandle<CycleReport>> {
        let start = Instant::now();
        let guard = self.cycle_lock.clone().try_lock_owned().ok()?;
        let this = Arc::clone(self);
        Some(tokio::spawn(async move { this.run_guarded(guard, start).await }))
    }

    async fn run_guarded(&self, _guard: OwnedMutexGuard<()>, start: Instant) -> CycleReport {
        let report = self.run_locked(start).await;
        *self.last_report.write() = Some(report.clone());
        report
    }

    async fn run_locked(&self, start: Instant) -> CycleReport {
        let mut report = CycleReport::begin();
        info!(
            "Starting reconciliation cycle {} (source: {})",
            report.cycle_id,
            self.source.name()
        );

        let fetched = match tokio::time::timeout(self.options.fetch_timeout, self.source.fetch()).await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                let err = Error::Timeout(self.options.fetch_timeout.as_secs());
                warn!("Agent call abandoned: {}", err);
                return report.finish(CycleStatus::Abandoned, Some(err.to_string()), start.elapsed());
            }
        };

        if let FetchOutcome::Failed { reason } = &fetched {
            warn!("Fetch failed, continuing with an empty batch: {}", reason);
            report.fetch_error = Some(reason.clone());
        }

        let batch = fetched.into_batch();
        report.fetched = batch.candidates.len();
        report.malformed = batch.malformed;

        let filtered = filter_batch(batch.candidates);
        report.noise_filtered = filtered.noise_removed;

        let store = self.store.clone();
        let clock = self.clock.clone();
        let strict_reads = self.options.strict_reads;
        let merged = tokio::task::spawn_blocking(move || {
            merge_into_store(&store, clock.as_ref(), &filtered.candidates, strict_reads)
        })
        .await
        .map_err(|e| Error::Internal(format!("merge task failed: {}", e)))
        .and_then(|r| r);

        match merged {
            Ok(summary) => {
                report.store_state = Some(summary.store_state);
                report.inserted = summary.outcome.inserted;
                report.duplicates = summary.outcome.duplicates;
                report.total_records = summary.outcome.records.len();
                report.persisted = summary.persisted;
                let report = report.finish(CycleStatus::Completed, None, start.elapsed());
                info!(
                    "Cycle complete: fetched={}, noise={}, inserted={}, duplicates={}, total={}, persisted={}, duration={}ms",
                    report.fetched,
                    report.noise_filtered,
                    report.inserted,
                    report.duplicates,
                    report.total_records,
                    report.persisted,
                    report.duration_ms
                );
                report
            }
            Err(e) => {
                error!("Reconciliation cycle failed: {}", e);
                report.finish(CycleStatus::Failed, Some(e.to_string()), start.elapsed())
            }
        }
    }
}

/// Load, merge and (if needed) save. Runs on a blocking thread.
fn merge_into_store(
    store: &JsonRecordStore,
    clock: &dyn Clock,
    candidates: &[Candidate],
    strict_reads: bool,
) -> Result<MergeSummary> {
    let loaded = store.load();
    let store_state = match &loaded {
        LoadOutcome::Loaded(_) => StoreState::Loaded,
        LoadOutcome::Missing => {
            info!("No store at {}, starting empty", store.path().display());
            StoreState::Missing
        }
        LoadOutcome::Salvaged { records, reason } => {
            warn!(
                "Store {} needed repair ({}); keeping {} records",
                store.path().display(),
                reason,
                records.len()
            );
            backup_before_overwrite(store)?;
            StoreState::Salvaged
        }
        LoadOutcome::Corrupt { reason } => {
            warn!(
                "Store {} is corrupt ({}); treating as empty for this cycle",
                store.path().display(),
                reason
            );
            backup_before_overwrite(store)?;
            StoreState::Corrupt
        }
        LoadOutcome::Unreadable { reason } => {
            if strict_reads {
                return Err(Error::Storage(format!(
                    "store {} is unreadable: {}",
                    store.path().display(),
                    reason
                )));
            }
            warn!(
                "Store {} is unreadable ({}); treating as empty for this cycle",
                store.path().display(),
                reason
            );
            backup_before_overwrite(store)?;
            StoreState::Unreadable
        }
    };

    let clean = loaded.is_clean();
    let outcome = merge_with_report(loaded.into_records(), candidates, clock);

    let persisted = outcome.changed() || !clean;
    if persisted {
        store.save(&outcome.records)?;
    }

    Ok(MergeSummary {
        outcome,
        store_state,
        persisted,
    })
}

/// A store that did not load cleanly is only overwritten once a copy exists.
fn backup_before_overwrite(store: &JsonRecordStore) -> Result<()> {
    store
        .backup_corrupt()
        .map(|_| ())
        .map_err(|e| Error::Storage(format!("store could not be backed up: {}", e)))
}
