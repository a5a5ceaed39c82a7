//! `GET /api/health`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use coc_store::ProcessFilter;
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/health", get(health))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    process_count: usize,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let filter = ProcessFilter {
        limit: Some(usize::MAX),
        ..Default::default()
    };
    let process_count = state.store.get_all_processes(&filter).await.len();
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started_at.elapsed().as_secs(),
        process_count,
    })
}
