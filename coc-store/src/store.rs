//! The `ProcessStore` trait shared by the in-memory and file-backed
//! implementations.

use async_trait::async_trait;
use coc_shared::ids::{ProcessId, WorkspaceId};
use tokio::sync::broadcast;

use crate::types::{AIProcess, ProcessChangeEvent, ProcessFilter, ProcessOutputEvent, ProcessStatus, ProcessUpdate, WorkspaceInfo};

pub type ChangeCallback = Box<dyn Fn(ProcessChangeEvent) + Send + Sync>;

pub const OUTPUT_CHANNEL_CAPACITY: usize = 256;
pub const DEFAULT_LIST_LIMIT: usize = 50;

#[async_trait]
pub trait ProcessStore: Send + Sync {
    /// Upsert: replaces any existing record with the same id.
    async fn add_process(&self, process: AIProcess);

    /// Shallow merge. No-op (returns `false`) if `id` is unknown.
    async fn update_process(&self, id: &ProcessId, update: ProcessUpdate) -> bool;

    async fn get_process(&self, id: &ProcessId) -> Option<AIProcess>;

    async fn get_all_processes(&self, filter: &ProcessFilter) -> Vec<AIProcess>;

    /// Returns `true` if a record with `id` existed and was removed.
    async fn remove_process(&self, id: &ProcessId) -> bool;

    /// Removes every process matching `filter`, returning the count removed.
    /// Always emits at most one `ProcessesCleared` event regardless of how
    /// many records matched.
    async fn clear_processes(&self, filter: &ProcessFilter) -> usize;

    async fn get_workspaces(&self) -> Vec<WorkspaceInfo>;

    /// Idempotent: re-registering an id replaces the prior record.
    async fn register_workspace(&self, workspace: WorkspaceInfo);

    /// Single-slot hook invoked (outside any internal lock) for every
    /// mutation. Registering a new callback replaces the previous one.
    fn set_on_change(&self, callback: ChangeCallback);

    /// Subscribe to a process's output bus, creating it lazily if this is
    /// the first subscriber.
    fn subscribe_output(&self, id: &ProcessId) -> broadcast::Receiver<ProcessOutputEvent>;

    async fn emit_process_output(&self, id: &ProcessId, content: String);

    /// Emits the terminal `complete` event and tears down the process's
    /// output bus.
    async fn emit_process_complete(&self, id: &ProcessId, status: ProcessStatus, duration_ms: u64);
}

/// Shared helper: apply pagination (`limit`/`offset`) to an already-filtered
/// list. `limit` defaults to [`DEFAULT_LIST_LIMIT`] when unset.
pub fn paginate(mut items: Vec<AIProcess>, filter: &ProcessFilter) -> Vec<AIProcess> {
    let offset = filter.offset.unwrap_or(0);
    if offset >= items.len() {
        return Vec::new();
    }
    items.drain(..offset);
    let limit = filter.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    items.truncate(limit);
    items
}
