//! Cashwatch server — wiring, shared state and the HTTP status API.

pub mod bootstrap;
pub mod routes;
pub mod state;

pub use bootstrap::{build_reconciler, resolve_data_dir};
pub use state::AppState;
