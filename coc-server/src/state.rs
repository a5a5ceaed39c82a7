//! Application state threaded through every handler: a `Clone` struct of
//! `Arc`s, cheap to hand to each request.

use std::sync::Arc;

use coc_executor::QueueExecutor;
use coc_queue::TaskQueueManager;
use coc_store::ProcessStore;

use crate::ws::WsHub;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<TaskQueueManager>,
    pub store: Arc<dyn ProcessStore>,
    pub executor: Arc<QueueExecutor>,
    pub ws_hub: Arc<WsHub>,
    pub started_at: std::time::Instant,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
