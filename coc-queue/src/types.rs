//! `QueuedTask` and its supporting types — the data model for component A.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coc_shared::ids::{ProcessId, TaskId};
use coc_shared::time::{millis, millis_opt};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    // Ord derives low < normal < high; band ordering reads `a.priority > b.priority`.
    Low,
    Normal,
    High,
}

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Normal
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum TaskPayload {
    AiClarification {
        prompt: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        working_directory: Option<String>,
    },
    FollowPrompt {
        prompt_file_path: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        plan_file_path: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        additional_context: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        working_directory: Option<String>,
    },
    CodeReview {
        diff_type: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        commit_sha: Option<String>,
    },
    ResolveComments {
        count: u32,
    },
    Custom {
        data: HashMap<String, serde_json::Value>,
    },
}

impl TaskPayload {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AiClarification { .. } => "ai-clarification",
            Self::FollowPrompt { .. } => "follow-prompt",
            Self::CodeReview { .. } => "code-review",
            Self::ResolveComments { .. } => "resolve-comments",
            Self::Custom { .. } => "custom",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskConfig {
    pub model: Option<String>,
    pub timeout_ms: Option<u64>,
    pub retry_on_failure: bool,
    pub retry_attempts: Option<u32>,
    pub retry_delay_ms: Option<u64>,
}

/// Caller-supplied input to `enqueue`. `display_name` is derived when absent
/// or whitespace-only (see [`crate::display_name::derive`]).
#[derive(Debug, Clone)]
pub struct EnqueueInput {
    pub priority: TaskPriority,
    pub display_name: Option<String>,
    pub payload: TaskPayload,
    pub config: TaskConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedTask {
    pub id: TaskId,
    pub priority: TaskPriority,
    pub status: TaskStatus,
    #[serde(with = "millis")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "millis_opt")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(with = "millis_opt")]
    pub completed_at: Option<DateTime<Utc>>,
    pub display_name: String,
    pub payload: TaskPayload,
    pub config: TaskConfig,
    pub process_id: Option<ProcessId>,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub retry_count: u32,
}

impl QueuedTask {
    pub fn task_type(&self) -> &'static str {
        self.payload.type_name()
    }
}

/// Snapshot of queue/history/running counts, returned by `getStats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub queued: usize,
    pub running: usize,
    pub history: usize,
    pub paused: bool,
    pub by_priority: HashMap<TaskPriority, usize>,
}

// HashMap keys need Hash; TaskPriority derives Eq/Ord but not Hash above — add it.
impl std::hash::Hash for TaskPriority {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        (*self as u8).hash(state);
    }
}
