//! Runtime types.

use std::time::Duration;

use serde::Serialize;

/// How a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    /// Merge ran; the store was written if anything changed.
    Completed,
    /// Another cycle was in flight.
    Skipped,
    /// The agent call timed out. Nothing was written.
    Abandoned,
    /// Store could not be read (strict mode), backed up, or written.
    Failed,
}

/// State of the store file when the cycle read it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreState {
    Loaded,
    Missing,
    /// Parsed, but with entries repaired or dropped.
    Salvaged,
    Corrupt,
    Unreadable,
}

/// Summary of one reconciliation cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleReport {
    pub cycle_id: String,
    pub started_at: String,
    pub duration_ms: u64,
    pub status: CycleStatus,
    /// Candidates parsed from the agent's answer.
    pub fetched: usize,
    pub malformed: usize,
    pub noise_filtered: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub total_records: usize,
    pub persisted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_state: Option<StoreState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fetch_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CycleReport {
    pub(crate) fn begin() -> Self {
        Self {
            cycle_id: uuid::Uuid::new_v4().to_string(),
            started_at: chrono::Utc::now().to_rfc3339(),
            duration_ms: 0,
            status: CycleStatus::Completed,
            fetched: 0,
            malformed: 0,
            noise_filtered: 0,
            inserted: 0,
            duplicates: 0,
            total_records: 0,
            persisted: false,
            store_state: None,
            fetch_error: None,
            error: None,
        }
    }

    pub(crate) fn finish(
        mut self,
        status: CycleStatus,
        error: Option<String>,
        elapsed: Duration,
    ) -> Self {
        self.status = status;
        self.error = error;
        self.duration_ms = elapsed.as_millis() as u64;
        self
    }
}

/// Per-cycle knobs.
#[derive(Debug, Clone)]
pub struct CycleOptions {
    /// Upper bound on the agent call.
    pub fetch_timeout: Duration,
    /// Fail the cycle instead of treating an unreadable store as empty.
    pub strict_reads: bool,
}

impl Default for CycleOptions {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(600),
            strict_reads: false,
        }
    }
}

/// Scheduler/runtime status.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatus {
    pub running: bool,
    pub interval_secs: u64,
    pub record_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_cycle: Option<CycleReport>,
}
