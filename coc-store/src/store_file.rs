use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock as StdRwLock;

use async_trait::async_trait;
use coc_shared::ids::{ProcessId, WorkspaceId};
use dashmap::DashMap;
use tokio::sync::{broadcast, RwLock};

use crate::error::StoreError;
use crate::persisted::PersistedProcess;
use crate::store::{paginate, ChangeCallback, ProcessStore, OUTPUT_CHANNEL_CAPACITY};
use crate::types::{
    AIProcess, ProcessChangeEvent, ProcessFilter, ProcessOutputEvent, ProcessStatus,
    ProcessUpdate, WorkspaceInfo,
};

struct Inner {
    processes: HashMap<ProcessId, AIProcess>,
    workspaces: HashMap<WorkspaceId, WorkspaceInfo>,
}

/// Durable variant: same semantics as [`crate::store_memory::InMemoryProcessStore`],
/// plus best-effort JSON persistence under `data_dir`. One file per process
/// (`processes/{id}.json`) and a single `workspaces.json` registry.
pub struct FileProcessStore {
    inner: RwLock<Inner>,
    on_change: StdRwLock<Option<ChangeCallback>>,
    output_buses: DashMap<ProcessId, broadcast::Sender<ProcessOutputEvent>>,
    data_dir: PathBuf,
}

impl FileProcessStore {
    /// Creates the store and loads any processes/workspaces already on disk
    /// under `data_dir`. Load failures are logged and treated as empty.
    pub async fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let (processes, workspaces) = load_all(&data_dir).await;
        Self {
            inner: RwLock::new(Inner {
                processes,
                workspaces,
            }),
            on_change: StdRwLock::new(None),
            output_buses: DashMap::new(),
            data_dir,
        }
    }

    fn notify(&self, event: ProcessChangeEvent) {
        if let Some(cb) = self.on_change.read().unwrap().as_ref() {
            cb(event);
        }
    }

    fn processes_dir(&self) -> PathBuf {
        self.data_dir.join("processes")
    }

    fn process_path(&self, id: &ProcessId) -> PathBuf {
        self.processes_dir().join(format!("{id}.json"))
    }

    fn workspaces_path(&self) -> PathBuf {
        self.data_dir.join("workspaces.json")
    }

    async fn persist_process(&self, process: &AIProcess) {
        let dir = self.processes_dir();
        if let Err(e) = tokio::fs::create_dir_all(&dir).await {
            tracing::warn!(error = %e, dir = %dir.display(), "failed to create process data directory");
            return;
        }
        let persisted = PersistedProcess::from(process);
        let path = self.process_path(&process.id);
        match serde_json::to_vec_pretty(&persisted) {
            Ok(bytes) => {
                if let Err(source) = tokio::fs::write(&path, bytes).await {
                    let err = StoreError::Write {
                        path: path.display().to_string(),
                        source,
                    };
                    tracing::warn!(%err, "failed to persist process");
                }
            }
            Err(source) => {
                let err = StoreError::Serialize {
                    id: process.id.to_string(),
                    source,
                };
                tracing::warn!(%err, "failed to serialize process");
            }
        }
    }

    async fn delete_process_file(&self, id: &ProcessId) {
        let path = self.process_path(id);
        if let Err(source) = tokio::fs::remove_file(&path).await {
            if source.kind() != std::io::ErrorKind::NotFound {
                let err = StoreError::Write {
                    path: path.display().to_string(),
                    source,
                };
                tracing::warn!(%err, "failed to delete process file");
            }
        }
    }

    async fn persist_workspaces(&self, workspaces: &HashMap<WorkspaceId, WorkspaceInfo>) {
        if let Err(e) = tokio::fs::create_dir_all(&self.data_dir).await {
            tracing::warn!(error = %e, "failed to create data directory");
            return;
        }
        match serde_json::to_vec_pretty(workspaces) {
            Ok(bytes) => {
                if let Err(e) = tokio::fs::write(self.workspaces_path(), bytes).await {
                    tracing::warn!(error = %e, "failed to persist workspace registry");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to serialize workspace registry"),
        }
    }
}

async fn load_all(
    data_dir: &Path,
) -> (HashMap<ProcessId, AIProcess>, HashMap<WorkspaceId, WorkspaceInfo>) {
    let mut processes = HashMap::new();
    let processes_dir = data_dir.join("processes");
    if let Ok(mut entries) = tokio::fs::read_dir(&processes_dir).await {
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            match tokio::fs::read(&path).await {
                Ok(bytes) => match serde_json::from_slice::<PersistedProcess>(&bytes) {
                    Ok(persisted) => {
                        let process: AIProcess = persisted.into();
                        processes.insert(process.id.clone(), process);
                    }
                    Err(e) => tracing::warn!(error = %e, path = %path.display(), "failed to parse persisted process"),
                },
                Err(e) => tracing::warn!(error = %e, path = %path.display(), "failed to read persisted process"),
            }
        }
    }

    let workspaces_path = data_dir.join("workspaces.json");
    let workspaces = match tokio::fs::read(&workspaces_path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).unwrap_or_default(),
        Err(_) => HashMap::new(),
    };

    (processes, workspaces)
}

#[async_trait]
impl ProcessStore for FileProcessStore {
    async fn add_process(&self, process: AIProcess) {
        {
            let mut w = self.inner.write().await;
            w.processes.insert(process.id.clone(), process.clone());
        }
        self.persist_process(&process).await;
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
        self.persist_process(&updated).await;
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
                self.delete_process_file(id).await;
                tracing::debug!(process_id = %id, "process removed");
                self.notify(ProcessChangeEvent::ProcessRemoved { process });
                true
            }
            None => false,
        }
    }

    async fn clear_processes(&self, filter: &ProcessFilter) -> usize {
        let ids = {
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
            ids
        };
        for id in &ids {
            self.delete_process_file(id).await;
        }
        tracing::info!(count = ids.len(), "processes cleared");
        self.notify(ProcessChangeEvent::ProcessesCleared);
        ids.len()
    }

    async fn get_workspaces(&self) -> Vec<WorkspaceInfo> {
        self.inner.read().await.workspaces.values().cloned().collect()
    }

    async fn register_workspace(&self, workspace: WorkspaceInfo) {
        let snapshot = {
            let mut w = self.inner.write().await;
            w.workspaces.insert(workspace.id.clone(), workspace);
            w.workspaces.clone()
        };
        self.persist_workspaces(&snapshot).await;
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
    async fn persists_and_reloads_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProcessStore::new(dir.path()).await;
        store.add_process(process("p1")).await;
        store
            .register_workspace(WorkspaceInfo {
                id: WorkspaceId::from("ws-a"),
                name: "Workspace A".to_string(),
                root_path: "/tmp/a".to_string(),
                color: None,
            })
            .await;

        let reloaded = FileProcessStore::new(dir.path()).await;
        let got = reloaded.get_process(&ProcessId::from("p1")).await.unwrap();
        assert_eq!(got.id, ProcessId::from("p1"));
        assert_eq!(reloaded.get_workspaces().await.len(), 1);
    }

    #[tokio::test]
    async fn remove_deletes_file_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileProcessStore::new(dir.path()).await;
        store.add_process(process("p1")).await;
        assert!(dir.path().join("processes/p1.json").exists());

        store.remove_process(&ProcessId::from("p1")).await;
        assert!(!dir.path().join("processes/p1.json").exists());
    }
}
