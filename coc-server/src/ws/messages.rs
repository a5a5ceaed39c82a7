//! JSON message shapes exchanged over `/ws`. Client → server messages are a
//! small closed set; server → client messages mirror A's and C's events
//! plus the `welcome`/`pong` handshake frames.

use coc_queue::{QueueStats, QueuedTask};
use coc_shared::ids::{ClientId, WorkspaceId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    Ping,
    Subscribe { workspace_id: Option<WorkspaceId> },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub task_type: String,
    pub priority: coc_queue::TaskPriority,
    pub status: coc_queue::TaskStatus,
    pub display_name: String,
    pub created_at: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&QueuedTask> for TaskSummary {
    fn from(t: &QueuedTask) -> Self {
        Self {
            id: t.id.as_str().to_string(),
            task_type: t.task_type().to_string(),
            priority: t.priority,
            status: t.status,
            display_name: t.display_name.clone(),
            created_at: t.created_at.timestamp_millis(),
            started_at: t.started_at.map(|d| d.timestamp_millis()),
            completed_at: t.completed_at.map(|d| d.timestamp_millis()),
            error: t.error.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub queued: Vec<TaskSummary>,
    pub running: Vec<TaskSummary>,
    pub history: Vec<TaskSummary>,
    pub stats: QueueStats,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Welcome { client_id: ClientId, timestamp: i64 },
    Pong,
    ProcessAdded { process: coc_store::ProcessSummary },
    ProcessUpdated { process: coc_store::ProcessSummary },
    ProcessRemoved { process: coc_store::ProcessSummary },
    ProcessesCleared,
    QueueUpdated { queue: QueueSnapshot },
}

impl ServerMessage {
    /// `None` means "broadcast to every client regardless of subscription".
    pub fn workspace_id(&self) -> Option<WorkspaceId> {
        match self {
            Self::ProcessAdded { process } | Self::ProcessUpdated { process } | Self::ProcessRemoved { process } => {
                process.metadata.get("workspaceId").and_then(|v| v.as_str()).map(WorkspaceId::from)
            }
            _ => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("ServerMessage always serializes")
    }
}
