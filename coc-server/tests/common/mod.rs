//! Shared test scaffolding: builds an [`AppState`] the same way
//! `bootstrap()` does, minus the real `TcpListener`, so REST-surface tests
//! can drive the router in-process via `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use coc_executor::{CliTaskExecutor, QueueExecutor, QueueExecutorConfig};
use coc_queue::{QueueConfig, TaskQueueManager};
use coc_server::ws::WsHub;
use coc_server::AppState;
use coc_store::{InMemoryProcessStore, ProcessStore};

/// Builds state with the executor already started, so enqueued tasks are
/// actually drained against the stub AI backend.
pub fn running_state() -> AppState {
    let queue = Arc::new(TaskQueueManager::new(QueueConfig::default()));
    let store: Arc<dyn ProcessStore> = Arc::new(InMemoryProcessStore::new());
    let executor = CliTaskExecutor::with_stub_service(store.clone());
    let queue_executor = QueueExecutor::new(queue.clone(), Arc::new(executor), QueueExecutorConfig::default());
    queue_executor.start();

    AppState {
        queue,
        store,
        executor: queue_executor,
        ws_hub: WsHub::new(),
        started_at: std::time::Instant::now(),
    }
}
