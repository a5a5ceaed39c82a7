//! `/api/workspaces` — component C's workspace registry.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use coc_store::WorkspaceInfo;
use serde::Deserialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/workspaces", post(create).get(list))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkspaceBody {
    pub id: String,
    pub name: String,
    pub root_path: String,
    pub color: Option<String>,
}

async fn create(State(state): State<AppState>, Json(body): Json<CreateWorkspaceBody>) -> impl axum::response::IntoResponse {
    let workspace = WorkspaceInfo {
        id: body.id.into(),
        name: body.name,
        root_path: body.root_path,
        color: body.color,
    };
    state.store.register_workspace(workspace.clone()).await;
    (StatusCode::CREATED, Json(workspace))
}

async fn list(State(state): State<AppState>) -> Json<serde_json::Value> {
    let workspaces = state.store.get_workspaces().await;
    Json(serde_json::json!({ "workspaces": workspaces }))
}
