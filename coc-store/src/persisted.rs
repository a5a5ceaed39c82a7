//! On-disk process representation: dates as ISO-8601 strings (spec's file
//! format), as opposed to the epoch-millisecond wire format `AIProcess`
//! itself uses over REST/WebSocket.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use coc_shared::ids::ProcessId;
use serde::{Deserialize, Serialize};

use crate::types::{AIProcess, ProcessStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedProcess {
    pub id: ProcessId,
    #[serde(rename = "type")]
    pub process_type: String,
    pub prompt_preview: String,
    pub full_prompt: String,
    pub status: ProcessStatus,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub working_directory: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub parent_process_id: Option<ProcessId>,
    pub sdk_session_id: Option<String>,
    pub structured_result: Option<serde_json::Value>,
    pub raw_stdout_file_path: Option<String>,
    pub result_file_path: Option<String>,
}

impl From<&AIProcess> for PersistedProcess {
    fn from(p: &AIProcess) -> Self {
        Self {
            id: p.id.clone(),
            process_type: p.process_type.clone(),
            prompt_preview: p.prompt_preview.clone(),
            full_prompt: p.full_prompt.clone(),
            status: p.status,
            start_time: p.start_time,
            end_time: p.end_time,
            error: p.error.clone(),
            result: p.result.clone(),
            working_directory: p.working_directory.clone(),
            metadata: p.metadata.clone(),
            parent_process_id: p.parent_process_id.clone(),
            sdk_session_id: p.sdk_session_id.clone(),
            structured_result: p.structured_result.clone(),
            raw_stdout_file_path: p.raw_stdout_file_path.clone(),
            result_file_path: p.result_file_path.clone(),
        }
    }
}

impl From<PersistedProcess> for AIProcess {
    fn from(p: PersistedProcess) -> Self {
        Self {
            id: p.id,
            process_type: p.process_type,
            prompt_preview: p.prompt_preview,
            full_prompt: p.full_prompt,
            status: p.status,
            start_time: p.start_time,
            end_time: p.end_time,
            error: p.error,
            result: p.result,
            working_directory: p.working_directory,
            metadata: p.metadata,
            parent_process_id: p.parent_process_id,
            sdk_session_id: p.sdk_session_id,
            structured_result: p.structured_result,
            raw_stdout_file_path: p.raw_stdout_file_path,
            result_file_path: p.result_file_path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coc_shared::time::now;
    use std::collections::HashMap as Map;

    #[test]
    fn round_trips_through_json() {
        let process = AIProcess {
            id: ProcessId::from("p1"),
            process_type: "queue-custom".to_string(),
            prompt_preview: "hi".to_string(),
            full_prompt: "hi there".to_string(),
            status: ProcessStatus::Completed,
            start_time: now(),
            end_time: Some(now()),
            error: None,
            result: None,
            working_directory: None,
            metadata: Map::new(),
            parent_process_id: None,
            sdk_session_id: None,
            structured_result: None,
            raw_stdout_file_path: None,
            result_file_path: None,
        };
        let persisted = PersistedProcess::from(&process);
        let json = serde_json::to_string(&persisted).unwrap();
        assert!(json.contains("\"startTime\":\""));
        let parsed: PersistedProcess = serde_json::from_str(&json).unwrap();
        let back: AIProcess = parsed.into();
        assert_eq!(back.id, process.id);
        assert_eq!(back.status, process.status);
    }
}
