//! Cycle status and manual trigger routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use cashwatch_runtime::RuntimeStatus;
use tracing::info;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(get_status))
        .route("/cycle", post(trigger_cycle))
}

/// GET /api/status — in-flight flag, cadence, record count, last cycle.
async fn get_status(State(state): State<Arc<AppState>>) -> Json<RuntimeStatus> {
    let store = state.reconciler.store().clone();
    let record_count = tokio::task::spawn_blocking(move || store.load().into_records().len())
        .await
        .unwrap_or(0);

    Json(RuntimeStatus {
        running: state.reconciler.is_running(),
        interval_secs: state.config.interval_secs,
        record_count,
        last_cycle: state.reconciler.last_report(),
    })
}

/// POST /api/cycle — start a cycle now. 409 while one is in flight.
async fn trigger_cycle(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    match state.reconciler.spawn_cycle() {
        Some(_) => {
            info!("Manual reconciliation cycle started");
            (StatusCode::ACCEPTED, Json(serde_json::json!({ "started": true })))
        }
        None => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({ "error": "A reconciliation cycle is already running" })),
        ),
    }
}
