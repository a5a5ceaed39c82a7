//! `AIProcess` and its supporting types — the data model for component C.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coc_shared::ids::{ProcessId, WorkspaceId};
use coc_shared::time::{millis, millis_opt};
use serde::{Deserialize, Serialize};

const PREVIEW_MAX: usize = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ProcessStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

/// Truncate a prompt to `PREVIEW_MAX` chars, appending an ellipsis if cut.
pub fn truncate_preview(prompt: &str) -> String {
    if prompt.chars().count() <= PREVIEW_MAX {
        return prompt.to_string();
    }
    let truncated: String = prompt.chars().take(PREVIEW_MAX).collect();
    format!("{truncated}…")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AIProcess {
    pub id: ProcessId,
    #[serde(rename = "type")]
    pub process_type: String,
    pub prompt_preview: String,
    pub full_prompt: String,
    pub status: ProcessStatus,
    #[serde(with = "millis")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "millis_opt")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_process_id: Option<ProcessId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sdk_session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_stdout_file_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_file_path: Option<String>,
}

impl AIProcess {
    pub fn workspace_id(&self) -> Option<WorkspaceId> {
        self.metadata
            .get("workspaceId")
            .and_then(|v| v.as_str())
            .map(WorkspaceId::from)
    }
}

/// Partial update applied by `updateProcess`: every present field replaces
/// the existing one; absent fields are left untouched (shallow merge).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessUpdate {
    pub status: Option<ProcessStatus>,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
    #[serde(with = "millis_opt", default)]
    pub end_time: Option<DateTime<Utc>>,
    pub structured_result: Option<serde_json::Value>,
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone, Default)]
pub struct ProcessFilter {
    pub workspace_id: Option<WorkspaceId>,
    pub status: Vec<ProcessStatus>,
    pub process_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl ProcessFilter {
    pub fn matches(&self, process: &AIProcess) -> bool {
        if let Some(ws) = &self.workspace_id {
            if process.workspace_id().as_ref() != Some(ws) {
                return false;
            }
        }
        if !self.status.is_empty() && !self.status.contains(&process.status) {
            return false;
        }
        if let Some(t) = &self.process_type {
            if &process.process_type != t {
                return false;
            }
        }
        if let Some(since) = self.since {
            if process.start_time < since {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProcessChangeEvent {
    ProcessAdded { process: AIProcess },
    ProcessUpdated { process: AIProcess },
    ProcessRemoved { process: AIProcess },
    ProcessesCleared,
}

// AIProcess itself doesn't derive PartialEq (serde_json::Value doesn't cleanly
// support it in all cases here); implement by id+status for event comparisons in tests.
impl PartialEq for AIProcess {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.status == other.status
    }
}
impl Eq for AIProcess {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ProcessOutputEvent {
    Chunk { content: String },
    Complete { status: ProcessStatus, duration_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceInfo {
    pub id: WorkspaceId,
    pub name: String,
    pub root_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// The slimmed projection of an `AIProcess` sent over WebSocket/REST list
/// responses: large fields (`fullPrompt`, `result`, `structuredResult`) are
/// dropped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessSummary {
    pub id: ProcessId,
    #[serde(rename = "type")]
    pub process_type: String,
    pub prompt_preview: String,
    pub status: ProcessStatus,
    #[serde(with = "millis")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "millis_opt")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl From<&AIProcess> for ProcessSummary {
    fn from(p: &AIProcess) -> Self {
        Self {
            id: p.id.clone(),
            process_type: p.process_type.clone(),
            prompt_preview: p.prompt_preview.clone(),
            status: p.status,
            start_time: p.start_time,
            end_time: p.end_time,
            error: p.error.clone(),
            metadata: p.metadata.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_preview_adds_ellipsis_past_80_chars() {
        let long = "x".repeat(100);
        let preview = truncate_preview(&long);
        assert_eq!(preview.chars().count(), 81);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn truncate_preview_leaves_short_prompt_untouched() {
        assert_eq!(truncate_preview("hello"), "hello");
    }
}
