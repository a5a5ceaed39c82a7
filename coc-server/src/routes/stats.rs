//! `GET /api/stats` — aggregate process counts by status and workspace.

use std::collections::HashMap;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use coc_store::ProcessFilter;
use serde::Serialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/stats", get(stats))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsResponse {
    total: usize,
    by_status: HashMap<String, usize>,
    by_workspace: HashMap<String, usize>,
}

async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let filter = ProcessFilter {
        limit: Some(usize::MAX),
        ..Default::default()
    };
    let processes = state.store.get_all_processes(&filter).await;

    let mut by_status = HashMap::new();
    let mut by_workspace = HashMap::new();
    for process in &processes {
        let status_key = format!("{:?}", process.status).to_lowercase();
        *by_status.entry(status_key).or_insert(0) += 1;
        let workspace_key = process.workspace_id().map(|w| w.as_str().to_string()).unwrap_or_else(|| "none".to_string());
        *by_workspace.entry(workspace_key).or_insert(0) += 1;
    }

    Json(StatsResponse {
        total: processes.len(),
        by_status,
        by_workspace,
    })
}
