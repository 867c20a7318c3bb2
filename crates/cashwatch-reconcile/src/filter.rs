//! Batch filter — drops observations with no identifying information.

use crate::types::Candidate;

/// Kept candidates plus how many were dropped as noise.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredBatch {
    pub candidates: Vec<Candidate>,
    pub noise_removed: usize,
}

/// Remove every candidate whose cashtag and contract address are both
/// absent. Order is preserved and duplicates are left alone.
pub fn filter_invalid(records: Vec<Candidate>) -> Vec<Candidate> {
    filter_batch(records).candidates
}

pub fn filter_batch(records: Vec<Candidate>) -> FilteredBatch {
    let before = records.len();
    let candidates: Vec<Candidate> = records.into_iter().filter(|c| !c.is_noise()).collect();
    FilteredBatch {
        noise_removed: before - candidates.len(),
        candidates,
    }
}
