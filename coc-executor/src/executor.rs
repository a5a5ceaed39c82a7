//! The pluggable `TaskExecutor` contract B drives against.

use async_trait::async_trait;
use coc_queue::QueuedTask;
use coc_shared::TaskId;
use tokio_util::sync::CancellationToken;

/// The result of running a single task, independent of how it got there.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub success: bool,
    pub result: Option<serde_json::Value>,
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl ExecutionOutcome {
    pub fn success(result: serde_json::Value, duration_ms: u64) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            duration_ms,
        }
    }

    pub fn failure(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            duration_ms,
        }
    }
}

/// Implemented by whatever actually runs a task. `execute` may suspend for
/// an arbitrary duration and must honor `cancel`; `cancel` itself is
/// non-blocking best-effort and never guaranteed to take effect before
/// `execute` returns — the worker loop decides the final status regardless.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, task: &QueuedTask, cancel: CancellationToken) -> ExecutionOutcome;

    fn cancel(&self, task_id: &TaskId);
}
