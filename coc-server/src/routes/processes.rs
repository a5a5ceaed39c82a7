//! `/api/processes*` — component C's REST surface.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use coc_shared::error::{CocError, CocResult};
use coc_shared::ids::ProcessId;
use coc_shared::time::now;
use coc_store::{AIProcess, ProcessFilter, ProcessStatus, ProcessSummary, ProcessUpdate};
use serde::Deserialize;

use crate::sse;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/processes", post(create).get(list).delete(clear))
        .route("/api/processes/{id}", get(get_one).patch(update).delete(remove))
        .route("/api/processes/{id}/cancel", post(cancel))
        .route("/api/processes/{id}/stream", get(stream))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProcessBody {
    pub id: String,
    #[serde(rename = "type", default = "default_process_type")]
    pub process_type: String,
    pub prompt_preview: String,
    #[serde(default)]
    pub full_prompt: Option<String>,
    pub status: ProcessStatus,
    pub start_time: i64,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub workspace_id: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_process_type() -> String {
    "ai-clarification".to_string()
}

async fn create(State(state): State<AppState>, Json(body): Json<CreateProcessBody>) -> impl IntoResponse {
    let mut metadata = body.metadata;
    if let Some(workspace_id) = body.workspace_id {
        metadata.insert("workspaceId".to_string(), serde_json::json!(workspace_id));
    }

    let process = AIProcess {
        id: ProcessId::from(body.id.as_str()),
        process_type: body.process_type,
        prompt_preview: body.prompt_preview.clone(),
        full_prompt: body.full_prompt.unwrap_or(body.prompt_preview),
        status: body.status,
        start_time: coc_shared::time::from_millis(body.start_time),
        end_time: None,
        error: None,
        result: None,
        working_directory: body.working_directory,
        metadata,
        parent_process_id: None,
        sdk_session_id: None,
        structured_result: None,
        raw_stdout_file_path: None,
        result_file_path: None,
    };

    state.store.add_process(process.clone()).await;
    (StatusCode::CREATED, Json(process))
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub workspace: Option<String>,
    pub status: Option<String>,
    #[serde(rename = "type")]
    pub process_type: Option<String>,
    pub since: Option<i64>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ListQuery {
    fn into_filter(self) -> ProcessFilter {
        let status = self
            .status
            .map(|csv| {
                csv.split(',')
                    .filter_map(|s| parse_status(s.trim()))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        ProcessFilter {
            workspace_id: self.workspace.map(Into::into),
            status,
            process_type: self.process_type,
            since: self.since.map(coc_shared::time::from_millis),
            limit: self.limit,
            offset: self.offset,
        }
    }
}

fn parse_status(raw: &str) -> Option<ProcessStatus> {
    match raw {
        "queued" => Some(ProcessStatus::Queued),
        "running" => Some(ProcessStatus::Running),
        "completed" => Some(ProcessStatus::Completed),
        "failed" => Some(ProcessStatus::Failed),
        "cancelled" => Some(ProcessStatus::Cancelled),
        _ => None,
    }
}

async fn list(State(state): State<AppState>, Query(query): Query<ListQuery>) -> impl IntoResponse {
    let filter = query.into_filter();
    let processes = state.store.get_all_processes(&filter).await;
    let summaries: Vec<ProcessSummary> = processes.iter().map(ProcessSummary::from).collect();
    Json(serde_json::json!({ "processes": summaries }))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<Json<AIProcess>> {
    let process = state
        .store
        .get_process(&ProcessId::from(id.as_str()))
        .await
        .ok_or_else(|| CocError::NotFound(format!("process {id} not found")))?;
    Ok(Json(process))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchBody {
    pub status: Option<ProcessStatus>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub end_time: Option<i64>,
    pub structured_result: Option<serde_json::Value>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

async fn update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<PatchBody>,
) -> CocResult<StatusCode> {
    let id = ProcessId::from(id.as_str());
    let update = ProcessUpdate {
        status: body.status,
        error: body.error,
        result: body.result,
        end_time: body.end_time.map(coc_shared::time::from_millis),
        structured_result: body.structured_result,
        metadata: body.metadata,
    };
    let updated = state.store.update_process(&id, update).await;
    if updated {
        Ok(StatusCode::OK)
    } else {
        Err(CocError::NotFound(format!("process {} not found", id.as_str())))
    }
}

async fn remove(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<StatusCode> {
    let removed = state.store.remove_process(&ProcessId::from(id.as_str())).await;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(CocError::NotFound(format!("process {id} not found")))
    }
}

#[derive(Debug, Deserialize)]
pub struct ClearQuery {
    pub status: Option<String>,
}

async fn clear(State(state): State<AppState>, Query(query): Query<ClearQuery>) -> CocResult<Json<serde_json::Value>> {
    let Some(status_csv) = query.status else {
        return Err(CocError::Validation("status query parameter is required".to_string()));
    };
    let status: Vec<ProcessStatus> = status_csv.split(',').filter_map(|s| parse_status(s.trim())).collect();
    let filter = ProcessFilter {
        status,
        ..Default::default()
    };
    let removed = state.store.clear_processes(&filter).await;
    Ok(Json(serde_json::json!({ "removedCount": removed })))
}

async fn cancel(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<Json<AIProcess>> {
    let process_id = ProcessId::from(id.as_str());
    let process = state
        .store
        .get_process(&process_id)
        .await
        .ok_or_else(|| CocError::NotFound(format!("process {id} not found")))?;

    if process.status.is_terminal() {
        return Err(CocError::Conflict(format!("process {id} is already in a terminal state")));
    }

    let end_time: DateTime<Utc> = now();
    state
        .store
        .update_process(
            &process_id,
            ProcessUpdate {
                status: Some(ProcessStatus::Cancelled),
                end_time: Some(end_time),
                ..Default::default()
            },
        )
        .await;

    let updated = state.store.get_process(&process_id).await.expect("just updated");
    Ok(Json(updated))
}

async fn stream(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let process_id = ProcessId::from(id.as_str());
    match state.store.get_process(&process_id).await {
        Some(process) => sse::stream_for(process, state.store.clone()).into_response(),
        None => CocError::NotFound(format!("process {id} not found")).into_response(),
    }
}
