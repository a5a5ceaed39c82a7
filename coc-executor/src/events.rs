//! Lifecycle events emitted by the worker pool. Consumers are tests and
//! instrumentation; the authoritative state transitions still happen on A.

use coc_queue::QueuedTask;

#[derive(Debug, Clone)]
pub enum TaskEvent {
    Started(QueuedTask),
    Completed(QueuedTask),
    Failed(QueuedTask, String),
    Cancelled(QueuedTask),
}

pub type TaskEventHandler = Box<dyn Fn(TaskEvent) + Send + Sync>;

#[derive(Default)]
pub struct TaskObservers(Vec<TaskEventHandler>);

impl TaskObservers {
    pub fn register(&mut self, handler: TaskEventHandler) {
        self.0.push(handler);
    }

    pub fn notify(&self, event: TaskEvent) {
        for handler in &self.0 {
            handler(event.clone());
        }
    }
}

impl std::fmt::Debug for TaskObservers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskObservers")
            .field("count", &self.0.len())
            .finish()
    }
}
