//! Persistence for the reconciled record set.
//!
//! The store is a single pretty-printed JSON array. Reads classify every
//! failure instead of raising, so the caller decides how to recover. Writes
//! go through a sibling temp file and a rename, so readers only ever see a
//! complete store.

pub mod json_store;

pub use json_store::{JsonRecordStore, LoadOutcome};
