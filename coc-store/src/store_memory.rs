use std::collections::HashMap;
use std::sync::RwLock as StdRwLock;

use async_trait::async_trait;
use coc_shared::ids::{ProcessId, WorkspaceId};
use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};

use crate::store::{paginate, ChangeCallback, ProcessStore, OUTPUT_CHANNEL_CAPACITY};
use crate::types::{
    AIProcess, ProcessChangeEvent, ProcessFilter, ProcessOutputEvent, ProcessStatus,
    ProcessUpdate, WorkspaceInfo,
};

struct Inner {
    processes: HashMap<ProcessId, AIProcess>,
    workspaces: HashMap<WorkspaceId, WorkspaceInfo>,
}

/// Ephemeral, single-process store. Used when no `serve.dataDir`-backed
/// persistence is configured.
pub struct InMemoryProcessStore {
    inner: RwLock<Inner>,
    on_change: StdRwLock<Option<ChangeCallback>>,
    output_buses: DashMap<ProcessId, broadcast::Sender<ProcessOutputEvent>>,
}

impl InMemoryProcessStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                processes: HashMap::new(),
                workspaces: HashMap::new(),
            }),
            on_change: StdRwLock::new(None),
            output_buses: DashMap::new(),
        }
    }

    fn notify(&self, event: ProcessChangeEvent) {
        if let Some(cb) = self.on_change.read().unwrap().as_ref() {
            cb(event);
        }
    }
}

impl Default for InMemoryProcessStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessStore for InMemoryProcessStore {
    async fn add_process(&self, process: AIProcess) {
        {
            let mut w = self.inner.write().await;
            w.processes.insert(process.id.clone(), process.clone());
        }
        tracing::debug!(process_id = %process.id, "process added");
        self.notify(ProcessChangeEvent::ProcessAdded { process });
    }

    async fn update_process(&self, id: &ProcessId, update: ProcessUpdate) -> bool {
        let updated = {
            let mut w = self.inner.write().await;
            let Some(process) = w.processes.get_mut(id) else {
                return false;
            };
            if let Some(status) = update.status {
                process.status = status;
            }
            if update.error.is_some() {
                process.error = update.error;
            }
            if update.result.is_some() {
                process.result = update.result;
            }
            if let Some(end_time) = update.end_time {
                process.end_time = Some(end_time);
            }
            if update.structured_result.is_some() {
                process.structured_result = update.structured_result;
            }
            if let Some(metadata) = update.metadata {
                process.metadata.extend(metadata);
            }
            process.clone()
        };
        tracing::debug!(process_id = %id, "process updated");
        self.notify(ProcessChangeEvent::ProcessUpdated { process: updated });
        true
    }

    async fn get_process(&self, id: &ProcessId) -> Option<AIProcess> {
        self.inner.read().await.processes.get(id).cloned()
    }

    async fn get_all_processes(&self, filter: &ProcessFilter) -> Vec<AIProcess> {
        let inner = self.inner.read().await;
        let mut matched: Vec<AIProcess> = inner
            .processes
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        matched.sort_by_key(|p| p.start_time);
        matched.reverse();
        paginate(matched, filter)
    }

    async fn remove_process(&self, id: &ProcessId) -> bool {
        let removed = {
            let mut w = self.inner.write().await;
            w.processes.remove(id)
        };
        match removed {
            Some(process) => {
                tracing::debug!(process_id = %id, "process removed");
                self.notify(ProcessChangeEvent::ProcessRemoved { process });
                true
            }
            None => false,
        }
    }

    async fn clear_processes(&self, filter: &ProcessFilter) -> usize {
        let count = {
            let mut w = self.inner.write().await;
            let ids: Vec<ProcessId> = w
                .processes
                .values()
                .filter(|p| filter.matches(p))
                .map(|p| p.id.clone())
                .collect();
            for id in &ids {
                w.processes.remove(id);
            }
            ids.len()
        };
        tracing::info!(count, "processes cleared");
        self.notify(ProcessChangeEvent::ProcessesCleared);
        count
    }

    async fn get_workspaces(&self) -> Vec<WorkspaceInfo> {
        self.inner.read().await.workspaces.values().cloned().collect()
    }

    async fn register_workspace(&self, workspace: WorkspaceInfo) {
        self.inner
            .write()
            .await
            .workspaces
            .insert(workspace.id.clone(), workspace);
    }

    fn set_on_change(&self, callback: ChangeCallback) {
        *self.on_change.write().unwrap() = Some(callback);
    }

    fn subscribe_output(&self, id: &ProcessId) -> broadcast::Receiver<ProcessOutputEvent> {
        self.output_buses
            .entry(id.clone())
            .or_insert_with(|| broadcast::channel(OUTPUT_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    async fn emit_process_output(&self, id: &ProcessId, content: String) {
        if let Some(sender) = self.output_buses.get(id) {
            let _ = sender.send(ProcessOutputEvent::Chunk { content });
        }
    }

    async fn emit_process_complete(&self, id: &ProcessId, status: ProcessStatus, duration_ms: u64) {
        if let Some((_, sender)) = self.output_buses.remove(id) {
            let _ = sender.send(ProcessOutputEvent::Complete { status, duration_ms });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coc_shared::time::now;
    use std::collections::HashMap as Map;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn process(id: &str) -> AIProcess {
        AIProcess {
            id: ProcessId::from(id),
            process_type: "queue-custom".to_string(),
            prompt_preview: "hi".to_string(),
            full_prompt: "hi".to_string(),
            status: ProcessStatus::Running,
            start_time: now(),
            end_time: None,
            error: None,
            result: None,
            working_directory: None,
            metadata: Map::new(),
            parent_process_id: None,
            sdk_session_id: None,
            structured_result: None,
            raw_stdout_file_path: None,
            result_file_path: None,
        }
    }

    #[tokio::test]
    async fn add_then_get_round_trips() {
        let store = InMemoryProcessStore::new();
        store.add_process(process("p1")).await;
        let got = store.get_process(&ProcessId::from("p1")).await.unwrap();
        assert_eq!(got.id, ProcessId::from("p1"));
    }

    #[tokio::test]
    async fn add_process_is_idempotent_upsert() {
        let store = InMemoryProcessStore::new();
        store.add_process(process("p1")).await;
        let mut p = process("p1");
        p.status = ProcessStatus::Completed;
        store.add_process(p).await;

        let got = store.get_process(&ProcessId::from("p1")).await.unwrap();
        assert_eq!(got.status, ProcessStatus::Completed);
        assert_eq!(
            store.get_all_processes(&ProcessFilter::default()).await.len(),
            1
        );
    }

    #[tokio::test]
    async fn update_unknown_id_is_silent_no_op() {
        let store = InMemoryProcessStore::new();
        let updated = store
            .update_process(&ProcessId::from("missing"), ProcessUpdate::default())
            .await;
        assert!(!updated);
    }

    #[tokio::test]
    async fn remove_emits_event_and_drops_record() {
        let store = InMemoryProcessStore::new();
        store.add_process(process("p1")).await;
        assert!(store.remove_process(&ProcessId::from("p1")).await);
        assert!(store.get_process(&ProcessId::from("p1")).await.is_none());
        assert!(!store.remove_process(&ProcessId::from("p1")).await);
    }

    #[tokio::test]
    async fn clear_emits_single_event_regardless_of_cardinality() {
        let store = InMemoryProcessStore::new();
        store.add_process(process("p1")).await;
        store.add_process(process("p2")).await;
        store.add_process(process("p3")).await;

        let seen = Arc::new(AtomicUsize::new(0));
        let cleared_events = Arc::new(AtomicUsize::new(0));
        let seen2 = seen.clone();
        let cleared2 = cleared_events.clone();
        store.set_on_change(Box::new(move |event| {
            seen2.fetch_add(1, Ordering::SeqCst);
            if matches!(event, ProcessChangeEvent::ProcessesCleared) {
                cleared2.fetch_add(1, Ordering::SeqCst);
            }
        }));

        let count = store.clear_processes(&ProcessFilter::default()).await;
        assert_eq!(count, 3);
        assert_eq!(cleared_events.load(Ordering::SeqCst), 1);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(store.get_all_processes(&ProcessFilter::default()).await.is_empty());
    }

    #[tokio::test]
    async fn output_bus_delivers_chunks_then_complete_and_tears_down() {
        let store = InMemoryProcessStore::new();
        let id = ProcessId::from("p1");
        let mut rx = store.subscribe_output(&id);

        store.emit_process_output(&id, "hello".to_string()).await;
        store
            .emit_process_complete(&id, ProcessStatus::Completed, 42)
            .await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first, ProcessOutputEvent::Chunk { content: "hello".to_string() });
        let second = rx.recv().await.unwrap();
        assert_eq!(
            second,
            ProcessOutputEvent::Complete {
                status: ProcessStatus::Completed,
                duration_ms: 42
            }
        );
        assert!(store.output_buses.get(&id).is_none());
    }

    #[tokio::test]
    async fn pagination_defaults_to_50_and_respects_offset() {
        let store = InMemoryProcessStore::new();
        for i in 0..60 {
            store.add_process(process(&format!("p{i}"))).await;
        }
        let page = store.get_all_processes(&ProcessFilter::default()).await;
        assert_eq!(page.len(), 50);

        let filter = ProcessFilter {
            offset: Some(55),
            ..Default::default()
        };
        let page2 = store.get_all_processes(&filter).await;
        assert_eq!(page2.len(), 5);
    }
}
