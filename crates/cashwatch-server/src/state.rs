//! Shared application state.

use std::sync::Arc;

use cashwatch_core::CashwatchConfig;
use cashwatch_runtime::Reconciler;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: CashwatchConfig,
    pub reconciler: Arc<Reconciler>,
}

impl AppState {
    pub fn new(config: CashwatchConfig, reconciler: Arc<Reconciler>) -> Self {
        Self { config, reconciler }
    }
}
