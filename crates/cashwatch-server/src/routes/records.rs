//! Record store routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cashwatch_store::LoadOutcome;

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/records", get(get_records))
}

/// GET /api/records — the persisted store, as written.
async fn get_records(State(state): State<Arc<AppState>>) -> Response {
    let store = state.reconciler.store().clone();
    let loaded = match tokio::task::spawn_blocking(move || store.load()).await {
        Ok(loaded) => loaded,
        Err(e) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": e.to_string() })),
            )
                .into_response()
        }
    };

    match loaded {
        LoadOutcome::Loaded(records) | LoadOutcome::Salvaged { records, .. } => {
            Json(records).into_response()
        }
        LoadOutcome::Missing => Json(serde_json::json!([])).into_response(),
        LoadOutcome::Corrupt { reason } | LoadOutcome::Unreadable { reason } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": reason })),
        )
            .into_response(),
    }
}
