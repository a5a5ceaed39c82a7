//! `/api/queue*` — component A's REST surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use coc_queue::{EnqueueInput, TaskConfig, TaskPayload, TaskPriority};
use coc_shared::error::{CocError, CocResult};
use coc_shared::ids::TaskId;
use serde::Deserialize;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/queue", get(snapshot).post(create).delete(clear))
        .route("/api/queue/stats", get(stats))
        .route("/api/queue/history", get(history).delete(clear_history))
        .route("/api/queue/pause", post(pause))
        .route("/api/queue/resume", post(resume))
        .route("/api/queue/{id}", get(get_one).delete(cancel))
        .route("/api/queue/{id}/move-to-top", post(move_to_top))
        .route("/api/queue/{id}/move-up", post(move_up))
        .route("/api/queue/{id}/move-down", post(move_down))
}

async fn snapshot(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "queued": state.queue.get_queued(),
        "running": state.queue.get_running(),
        "stats": state.queue.get_stats(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskBody {
    #[serde(default)]
    pub priority: TaskPriority,
    #[serde(default)]
    pub display_name: Option<String>,
    pub payload: TaskPayload,
    #[serde(default)]
    pub config: TaskConfig,
}

async fn create(State(state): State<AppState>, Json(body): Json<CreateTaskBody>) -> CocResult<impl IntoResponse> {
    let id = state.queue.enqueue(EnqueueInput {
        priority: body.priority,
        display_name: body.display_name,
        payload: body.payload,
        config: body.config,
    })?;
    let task = state.queue.get_task(&id).expect("just enqueued");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "task": task }))))
}

async fn stats(State(state): State<AppState>) -> Json<coc_queue::QueueStats> {
    Json(state.queue.get_stats())
}

async fn history(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "history": state.queue.get_history() }))
}

async fn clear_history(State(state): State<AppState>) -> StatusCode {
    state.queue.clear_history();
    StatusCode::NO_CONTENT
}

async fn pause(State(state): State<AppState>) -> StatusCode {
    state.queue.pause();
    StatusCode::OK
}

async fn resume(State(state): State<AppState>) -> StatusCode {
    state.queue.resume();
    StatusCode::OK
}

async fn clear(State(state): State<AppState>) -> Json<serde_json::Value> {
    let count = state.queue.clear();
    Json(serde_json::json!({ "clearedCount": count }))
}

async fn get_one(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<Json<coc_queue::QueuedTask>> {
    let task_id = TaskId::from(id.as_str());
    state
        .queue
        .get_task(&task_id)
        .map(Json)
        .ok_or_else(|| CocError::NotFound(format!("task {id} not found")))
}

async fn cancel(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<StatusCode> {
    let task_id = TaskId::from(id.as_str());
    if state.queue.cancel_task(&task_id) {
        Ok(StatusCode::OK)
    } else {
        Err(CocError::NotFound(format!("task {id} not found")))
    }
}

async fn move_to_top(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<StatusCode> {
    move_result(state.queue.move_to_top(&TaskId::from(id.as_str())), &id)
}

async fn move_up(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<StatusCode> {
    move_result(state.queue.move_up(&TaskId::from(id.as_str())), &id)
}

async fn move_down(State(state): State<AppState>, Path(id): Path<String>) -> CocResult<StatusCode> {
    move_result(state.queue.move_down(&TaskId::from(id.as_str())), &id)
}

fn move_result(moved: bool, id: &str) -> CocResult<StatusCode> {
    if moved {
        Ok(StatusCode::OK)
    } else {
        Err(CocError::NotFound(format!("task {id} not found or already at that boundary")))
    }
}
