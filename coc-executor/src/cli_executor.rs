//! `CliTaskExecutor` — the default [`TaskExecutor`]: a config struct with
//! `Default`, structured `tracing::info!` spans keyed by a run id, and a
//! thin dispatch to an injected, opaque external service.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use coc_queue::{QueuedTask, TaskPayload};
use coc_shared::ids::{ProcessId, TaskId};
use coc_shared::time::now;
use coc_store::{AIProcess, ProcessStatus, ProcessStore, ProcessUpdate};
use tokio_util::sync::CancellationToken;

use crate::executor::{ExecutionOutcome, TaskExecutor};

/// A streamed chunk callback. The external AI service invokes this as
/// output becomes available; `CliTaskExecutor` wires it to the tracking
/// process's output bus.
pub type ChunkCallback = Box<dyn Fn(String) + Send + Sync>;

#[derive(Debug, Clone)]
pub struct CopilotResponse {
    pub response: String,
    pub structured: Option<serde_json::Value>,
}

/// The opaque external AI backend. Out of scope per spec; the core only
/// depends on this trait boundary.
#[async_trait]
pub trait CopilotSdkService: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        on_chunk: ChunkCallback,
        cancel: CancellationToken,
    ) -> Result<CopilotResponse, String>;
}

/// Default stand-in used when no real backend is configured: returns
/// immediately with a canned response, matching the behavior the end-to-end
/// scenarios assume for the default executor stub.
#[derive(Debug, Default)]
pub struct StubCopilotService;

#[async_trait]
impl CopilotSdkService for StubCopilotService {
    async fn complete(
        &self,
        _prompt: &str,
        _on_chunk: ChunkCallback,
        _cancel: CancellationToken,
    ) -> Result<CopilotResponse, String> {
        Ok(CopilotResponse {
            response: "ok".to_string(),
            structured: None,
        })
    }
}

fn prompt_and_cwd(payload: &TaskPayload) -> (String, Option<String>) {
    match payload {
        TaskPayload::AiClarification {
            prompt,
            working_directory,
        } => (prompt.clone(), working_directory.clone()),
        TaskPayload::FollowPrompt {
            prompt_file_path,
            plan_file_path,
            additional_context,
            working_directory,
        } => {
            let mut prompt = format!("Follow prompt file: {prompt_file_path}");
            if let Some(plan) = plan_file_path {
                prompt.push_str(&format!(" (plan: {plan})"));
            }
            if let Some(context) = additional_context {
                prompt.push_str(&format!("\n\n{context}"));
            }
            (prompt, working_directory.clone())
        }
        TaskPayload::Custom { data } => {
            let prompt = data
                .get("prompt")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            (prompt, None)
        }
        TaskPayload::CodeReview { .. } | TaskPayload::ResolveComments { .. } => {
            (String::new(), None)
        }
    }
}

/// `true` for task types that dispatch to the external AI service;
/// `false` for the no-op placeholder types.
fn calls_ai_service(payload: &TaskPayload) -> bool {
    matches!(
        payload,
        TaskPayload::AiClarification { .. } | TaskPayload::FollowPrompt { .. } | TaskPayload::Custom { .. }
    )
}

pub struct CliTaskExecutor {
    store: Arc<dyn ProcessStore>,
    ai: Arc<dyn CopilotSdkService>,
}

impl std::fmt::Debug for CliTaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CliTaskExecutor").finish()
    }
}

impl CliTaskExecutor {
    pub fn new(store: Arc<dyn ProcessStore>, ai: Arc<dyn CopilotSdkService>) -> Self {
        Self { store, ai }
    }

    /// Convenience constructor wiring the default [`StubCopilotService`].
    pub fn with_stub_service(store: Arc<dyn ProcessStore>) -> Self {
        Self::new(store, Arc::new(StubCopilotService))
    }
}

#[async_trait]
impl TaskExecutor for CliTaskExecutor {
    async fn execute(&self, task: &QueuedTask, cancel: CancellationToken) -> ExecutionOutcome {
        let process_id = ProcessId::for_task(&task.id);
        let (prompt, working_directory) = prompt_and_cwd(&task.payload);
        let start = Instant::now();

        let process = AIProcess {
            id: process_id.clone(),
            process_type: format!("queue-{}", task.task_type()),
            prompt_preview: coc_store::types::truncate_preview(&prompt),
            full_prompt: prompt.clone(),
            status: ProcessStatus::Running,
            start_time: now(),
            end_time: None,
            error: None,
            result: None,
            working_directory,
            metadata: Default::default(),
            parent_process_id: None,
            sdk_session_id: None,
            structured_result: None,
            raw_stdout_file_path: None,
            result_file_path: None,
        };
        self.store.add_process(process).await;

        tracing::info!(task_id = %task.id, process_id = %process_id, task_type = task.task_type(), "executing task");

        let outcome = if calls_ai_service(&task.payload) {
            let store = self.store.clone();
            let pid = process_id.clone();
            let on_chunk: ChunkCallback = Box::new(move |content| {
                let store = store.clone();
                let pid = pid.clone();
                tokio::spawn(async move {
                    store.emit_process_output(&pid, content).await;
                });
            });

            match self.ai.complete(&prompt, on_chunk, cancel.clone()).await {
                Ok(response) => ExecutionOutcome::success(
                    serde_json::json!({ "response": response.response, "structured": response.structured }),
                    start.elapsed().as_millis() as u64,
                ),
                Err(error) => ExecutionOutcome::failure(error, start.elapsed().as_millis() as u64),
            }
        } else {
            ExecutionOutcome::success(serde_json::json!({ "noop": true }), start.elapsed().as_millis() as u64)
        };

        let final_status = if cancel.is_cancelled() {
            ProcessStatus::Cancelled
        } else if outcome.success {
            ProcessStatus::Completed
        } else {
            ProcessStatus::Failed
        };

        self.store
            .update_process(
                &process_id,
                ProcessUpdate {
                    status: Some(final_status),
                    error: outcome.error.clone(),
                    result: outcome.result.clone(),
                    end_time: Some(now()),
                    structured_result: None,
                    metadata: None,
                },
            )
            .await;
        self.store
            .emit_process_complete(&process_id, final_status, outcome.duration_ms)
            .await;

        outcome
    }

    fn cancel(&self, task_id: &TaskId) {
        tracing::debug!(task_id = %task_id, "cancel requested; relies on the cancellation token passed to execute");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coc_queue::{TaskConfig, TaskPriority, TaskStatus};
    use coc_store::InMemoryProcessStore;

    fn task(payload: TaskPayload) -> QueuedTask {
        QueuedTask {
            id: TaskId::new_v4(),
            priority: TaskPriority::Normal,
            status: TaskStatus::Running,
            created_at: now(),
            started_at: Some(now()),
            completed_at: None,
            display_name: "test".to_string(),
            payload,
            config: TaskConfig::default(),
            process_id: None,
            result: None,
            error: None,
            retry_count: 0,
        }
    }

    #[tokio::test]
    async fn custom_task_calls_stub_service_and_completes() {
        let store: Arc<dyn ProcessStore> = Arc::new(InMemoryProcessStore::new());
        let executor = CliTaskExecutor::with_stub_service(store.clone());
        let mut data = std::collections::HashMap::new();
        data.insert("prompt".to_string(), serde_json::json!("hi"));
        let t = task(TaskPayload::Custom { data });

        let outcome = executor.execute(&t, CancellationToken::new()).await;
        assert!(outcome.success);

        let process = store
            .get_process(&ProcessId::for_task(&t.id))
            .await
            .unwrap();
        assert_eq!(process.status, ProcessStatus::Completed);
    }

    #[tokio::test]
    async fn code_review_is_a_noop_success() {
        let store: Arc<dyn ProcessStore> = Arc::new(InMemoryProcessStore::new());
        let executor = CliTaskExecutor::with_stub_service(store.clone());
        let t = task(TaskPayload::CodeReview {
            diff_type: "pr".to_string(),
            commit_sha: None,
        });

        let outcome = executor.execute(&t, CancellationToken::new()).await;
        assert!(outcome.success);
    }

    #[tokio::test]
    async fn cancelled_token_reports_cancelled_status() {
        let store: Arc<dyn ProcessStore> = Arc::new(InMemoryProcessStore::new());
        let executor = CliTaskExecutor::with_stub_service(store.clone());
        let t = task(TaskPayload::ResolveComments { count: 1 });
        let token = CancellationToken::new();
        token.cancel();

        executor.execute(&t, token).await;
        let process = store
            .get_process(&ProcessId::for_task(&t.id))
            .await
            .unwrap();
        assert_eq!(process.status, ProcessStatus::Cancelled);
    }
}
