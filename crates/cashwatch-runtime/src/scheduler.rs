//! Periodic trigger for reconciliation cycles.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::reconciler::Reconciler;
use crate::types::CycleStatus;

/// Fires a cycle every `interval`. Cycles run inline, so a slow cycle
/// delays the next tick instead of overlapping it; missed ticks are dropped.
pub struct Scheduler {
    reconciler: Arc<Reconciler>,
    interval: Duration,
    run_on_start: bool,
}

impl Scheduler {
    pub fn new(reconciler: Arc<Reconciler>, interval: Duration, run_on_start: bool) -> Self {
        Self {
            reconciler,
            interval,
            run_on_start,
        }
    }

    /// Run until `shutdown` flips to true or its sender is dropped. A cycle
    /// in progress at shutdown is dropped; the store is only ever replaced
    /// by a finished merge.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // The first tick completes immediately.
        if !self.run_on_start {
            ticker.tick().await;
        }

        info!(
            "Scheduler started: every {}s, run_on_start={}",
            self.interval.as_secs(),
            self.run_on_start
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wait_for_shutdown(&mut shutdown) => break,
            }

            tokio::select! {
                report = self.reconciler.run_cycle() => {
                    if report.status != CycleStatus::Completed {
                        warn!(
                            "Cycle {} ended {:?}: {}",
                            report.cycle_id,
                            report.status,
                            report.error.as_deref().unwrap_or("-")
                        );
                    }
                }
                _ = wait_for_shutdown(&mut shutdown) => break,
            }
        }

        info!("Scheduler stopped");
    }
}

async fn wait_for_shutdown(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
