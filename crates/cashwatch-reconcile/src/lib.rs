//! Reconciliation engine — filters observed batches and merges them into the
//! persisted record set.
//!
//! Everything here is pure and synchronous. The only source of
//! non-determinism, the current time, is injected through [`Clock`].

pub mod clock;
pub mod filter;
pub mod merge;
pub mod types;

pub use clock::{format_timestamp, parse_utc_offset, Clock, FixedClock, SystemClock};
pub use filter::{filter_batch, filter_invalid, FilteredBatch};
pub use merge::{merge, merge_with_report, MergeOutcome};
pub use types::*;
