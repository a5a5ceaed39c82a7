//! Component A: the priority task queue.
//!
//! [`TaskQueueManager`] owns all queue state behind a single mutex and
//! notifies registered observers (B's dispatch loop, D's websocket bridge)
//! of every mutation via [`events::ChangeEvent`].

pub mod display_name;
pub mod events;
pub mod manager;
pub mod types;

pub use events::{ChangeEvent, ChangeHandler, ChangeKind};
pub use manager::{QueueConfig, TaskQueueManager};
pub use types::{
    EnqueueInput, QueueStats, QueuedTask, TaskConfig, TaskPayload, TaskPriority, TaskStatus,
};
