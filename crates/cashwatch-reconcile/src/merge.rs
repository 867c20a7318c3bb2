//! Merge engine — folds a filtered batch into the persisted record set.
//!
//! Existing records are carried over untouched and keep their original
//! timestamps. Unknown identities are appended in first-seen order, stamped
//! with a single reconciliation time. Known identities, whether from the
//! store or earlier in the same batch, are absorbed without effect.

use std::collections::HashSet;

use tracing::debug;

use crate::clock::{format_timestamp, Clock};
use crate::types::{Candidate, IdentityKey, Record};

/// Merged records plus counters for the cycle report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub records: Vec<Record>,
    /// Identities seen for the first time.
    pub inserted: usize,
    /// Incoming candidates whose identity was already present.
    pub duplicates: usize,
    /// Incoming noise candidates skipped.
    pub noise_skipped: usize,
    /// Existing entries dropped for being noise or repeating an earlier key.
    pub existing_dropped: usize,
    /// Timestamp assigned to this merge's insertions.
    pub timestamp: String,
}

impl MergeOutcome {
    /// Whether `records` differs from the store it was merged against.
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.existing_dropped > 0
    }
}

/// Merge `incoming` into `existing` and return the next store state.
pub fn merge(existing: Vec<Record>, incoming: &[Candidate], clock: &dyn Clock) -> Vec<Record> {
    merge_with_report(existing, incoming, clock).records
}

pub fn merge_with_report(
    existing: Vec<Record>,
    incoming: &[Candidate],
    clock: &dyn Clock,
) -> MergeOutcome {
    let timestamp = format_timestamp(&clock.now());
    let mut seen: HashSet<IdentityKey> = HashSet::with_capacity(existing.len() + incoming.len());
    let mut records = Vec::with_capacity(existing.len() + incoming.len());
    let mut outcome = MergeOutcome::default();

    for record in existing {
        if record.is_noise() || !seen.insert(record.key()) {
            debug!("Dropping invalid stored entry {}", record.key());
            outcome.existing_dropped += 1;
            continue;
        }
        records.push(record);
    }

    for candidate in incoming {
        if candidate.is_noise() {
            outcome.noise_skipped += 1;
            continue;
        }
        if seen.insert(candidate.key()) {
            records.push(Record::from_candidate(candidate, &timestamp));
            outcome.inserted += 1;
        } else {
            outcome.duplicates += 1;
        }
    }

    outcome.records = records;
    outcome.timestamp = timestamp;
    outcome
}
