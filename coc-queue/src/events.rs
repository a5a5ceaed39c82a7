//! The single `change` event the queue manager emits, and its observer list.

use coc_shared::TaskId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeKind {
    Enqueued,
    Started,
    Completed,
    Failed,
    Cancelled,
    Cleared { count: usize },
    HistoryCleared,
    Paused,
    Resumed,
    Reordered,
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub task_id: Option<TaskId>,
}

pub type ChangeHandler = Box<dyn Fn(ChangeEvent) + Send + Sync>;

/// A plain `Vec` of boxed handlers. B and D both call `on(...)` once at
/// startup; fan-out happens outside the manager's mutex (see
/// `TaskQueueManager::emit`).
#[derive(Default)]
pub struct Observers(Vec<ChangeHandler>);

impl Observers {
    pub fn register(&mut self, handler: ChangeHandler) {
        self.0.push(handler);
    }

    pub fn notify(&self, event: ChangeEvent) {
        for handler in &self.0 {
            handler(event.clone());
        }
    }
}

impl std::fmt::Debug for Observers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.0.len())
            .finish()
    }
}
