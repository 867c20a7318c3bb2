//! Runtime — runs reconciliation cycles and schedules them.
//!
//! A cycle is fetch → filter → load → merge → save. At most one cycle runs
//! at a time; a second request while one is in flight is skipped.

pub mod reconciler;
pub mod scheduler;
pub mod types;

pub use reconciler::Reconciler;
pub use scheduler::Scheduler;
pub use types::*;
