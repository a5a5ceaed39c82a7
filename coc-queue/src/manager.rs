//! `TaskQueueManager` — component A.
//!
//! State lives behind a single `Mutex<Inner>`, matching the "single mutex
//! guards queue state" rule. No `.await` point is ever reached while the
//! guard is held; the manager is synchronous end to end and callers
//! (B, D) handle any suspension on their own side.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use coc_shared::ids::{ProcessId, TaskId};
use coc_shared::time::now;
use coc_shared::{CocError, CocResult};

use crate::display_name::derive_if_needed;
use crate::events::{ChangeEvent, ChangeHandler, ChangeKind, Observers};
use crate::types::{EnqueueInput, QueueStats, QueuedTask, TaskPriority, TaskStatus};

#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// 0 or `None` means unlimited.
    pub max_queue_size: Option<usize>,
    pub max_history_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_queue_size: None,
            max_history_size: 100,
        }
    }
}

const BANDS: [TaskPriority; 3] = [TaskPriority::High, TaskPriority::Normal, TaskPriority::Low];

struct Inner {
    bands: HashMap<TaskPriority, VecDeque<QueuedTask>>,
    running: HashMap<TaskId, QueuedTask>,
    history: VecDeque<QueuedTask>,
    paused: bool,
    cancelled_ids: HashSet<TaskId>,
}

impl Inner {
    fn new() -> Self {
        let mut bands = HashMap::new();
        for band in BANDS {
            bands.insert(band, VecDeque::new());
        }
        Self {
            bands,
            running: HashMap::new(),
            history: VecDeque::new(),
            paused: false,
            cancelled_ids: HashSet::new(),
        }
    }

    fn total_queued(&self) -> usize {
        self.bands.values().map(VecDeque::len).sum()
    }

    /// Ordered read of the full queued sequence: high, then normal, then low,
    /// FIFO within each band.
    fn queued_sequence(&self) -> Vec<QueuedTask> {
        let mut out = Vec::with_capacity(self.total_queued());
        for band in BANDS {
            out.extend(self.bands[&band].iter().cloned());
        }
        out
    }

    fn find_band_mut(&mut self, id: &TaskId) -> Option<(TaskPriority, usize)> {
        for band in BANDS {
            if let Some(pos) = self.bands[&band].iter().position(|t| &t.id == id) {
                return Some((band, pos));
            }
        }
        None
    }

    fn push_history(&mut self, task: QueuedTask, max_history_size: usize) {
        self.history.push_back(task);
        while self.history.len() > max_history_size {
            self.history.pop_front();
        }
    }
}

pub struct TaskQueueManager {
    inner: Mutex<Inner>,
    observers: Mutex<Observers>,
    config: QueueConfig,
}

impl std::fmt::Debug for TaskQueueManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskQueueManager")
            .field("config", &self.config)
            .finish()
    }
}

impl TaskQueueManager {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            inner: Mutex::new(Inner::new()),
            observers: Mutex::new(Observers::default()),
            config,
        }
    }

    pub fn on(&self, handler: ChangeHandler) {
        self.observers.lock().unwrap().register(handler);
    }

    fn emit(&self, event: ChangeEvent) {
        self.observers.lock().unwrap().notify(event);
    }

    pub fn enqueue(&self, input: EnqueueInput) -> CocResult<TaskId> {
        let id = TaskId::new_v4();
        let created_at = now();
        let display_name = derive_if_needed(input.display_name.as_deref(), &input.payload, created_at);

        let mut inner = self.inner.lock().unwrap();
        if let Some(max) = self.config.max_queue_size {
            if max > 0 && inner.total_queued() >= max {
                return Err(CocError::Capacity(format!(
                    "queue is full (max {max} tasks)"
                )));
            }
        }

        let task = QueuedTask {
            id: id.clone(),
            priority: input.priority,
            status: TaskStatus::Queued,
            created_at,
            started_at: None,
            completed_at: None,
            display_name,
            payload: input.payload,
            config: input.config,
            process_id: None,
            result: None,
            error: None,
            retry_count: 0,
        };

        inner
            .bands
            .get_mut(&input.priority)
            .expect("all bands initialized")
            .push_back(task);
        drop(inner);

        tracing::info!(task_id = %id, "task enqueued");
        self.emit(ChangeEvent {
            kind: ChangeKind::Enqueued,
            task_id: Some(id.clone()),
        });
        Ok(id)
    }

    pub fn get_queued(&self) -> Vec<QueuedTask> {
        self.inner.lock().unwrap().queued_sequence()
    }

    pub fn get_running(&self) -> Vec<QueuedTask> {
        self.inner.lock().unwrap().running.values().cloned().collect()
    }

    pub fn get_history(&self) -> Vec<QueuedTask> {
        self.inner.lock().unwrap().history.iter().cloned().collect()
    }

    pub fn get_task(&self, id: &TaskId) -> Option<QueuedTask> {
        let inner = self.inner.lock().unwrap();
        if let Some(task) = inner.running.get(id) {
            return Some(task.clone());
        }
        if let Some(task) = inner.queued_sequence().into_iter().find(|t| &t.id == id) {
            return Some(task);
        }
        inner.history.iter().find(|t| &t.id == id).cloned()
    }

    pub fn get_position(&self, id: &TaskId) -> Option<usize> {
        self.inner
            .lock()
            .unwrap()
            .queued_sequence()
            .iter()
            .position(|t| &t.id == id)
    }

    pub fn get_stats(&self) -> QueueStats {
        let inner = self.inner.lock().unwrap();
        let mut by_priority = HashMap::new();
        for band in BANDS {
            by_priority.insert(band, inner.bands[&band].len());
        }
        QueueStats {
            queued: inner.total_queued(),
            running: inner.running.len(),
            history: inner.history.len(),
            paused: inner.paused,
            by_priority,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.inner.lock().unwrap().paused
    }

    pub fn cancel_task(&self, id: &TaskId) -> bool {
        let mut inner = self.inner.lock().unwrap();

        if let Some((band, pos)) = inner.find_band_mut(id) {
            let mut task = inner.bands.get_mut(&band).unwrap().remove(pos).unwrap();
            task.status = TaskStatus::Cancelled;
            task.completed_at = Some(now());
            inner.push_history(task, self.config.max_history_size);
            drop(inner);
            tracing::info!(task_id = %id, "queued task cancelled");
            self.emit(ChangeEvent {
                kind: ChangeKind::Cancelled,
                task_id: Some(id.clone()),
            });
            return true;
        }

        if inner.running.contains_key(id) {
            inner.cancelled_ids.insert(id.clone());
            tracing::info!(task_id = %id, "running task marked for cancellation");
            return true;
        }

        false
    }

    /// Whether a running task's id has been tombstoned for cancellation.
    /// Called by B when a worker returns, per spec §4.1's "in-flight cancellation" model.
    pub fn is_cancel_requested(&self, id: &TaskId) -> bool {
        self.inner.lock().unwrap().cancelled_ids.contains(id)
    }

    fn reorder_within_band<F>(&self, id: &TaskId, op: F) -> bool
    where
        F: FnOnce(&mut VecDeque<QueuedTask>, usize) -> bool,
    {
        let mut inner = self.inner.lock().unwrap();
        let Some((band, pos)) = inner.find_band_mut(id) else {
            return false;
        };
        let band_queue = inner.bands.get_mut(&band).unwrap();
        let moved = op(band_queue, pos);
        drop(inner);
        if moved {
            self.emit(ChangeEvent {
                kind: ChangeKind::Reordered,
                task_id: Some(id.clone()),
            });
        }
        moved
    }

    pub fn move_to_top(&self, id: &TaskId) -> bool {
        self.reorder_within_band(id, |band, pos| {
            if pos == 0 {
                return false;
            }
            let task = band.remove(pos).unwrap();
            band.push_front(task);
            true
        })
    }

    pub fn move_up(&self, id: &TaskId) -> bool {
        self.reorder_within_band(id, |band, pos| {
            if pos == 0 {
                return false;
            }
            band.swap(pos, pos - 1);
            true
        })
    }

    pub fn move_down(&self, id: &TaskId) -> bool {
        self.reorder_within_band(id, |band, pos| {
            if pos + 1 >= band.len() {
                return false;
            }
            band.swap(pos, pos + 1);
            true
        })
    }

    pub fn pause(&self) {
        self.inner.lock().unwrap().paused = true;
        tracing::info!("queue paused");
        self.emit(ChangeEvent {
            kind: ChangeKind::Paused,
            task_id: None,
        });
    }

    pub fn resume(&self) {
        self.inner.lock().unwrap().paused = false;
        tracing::info!("queue resumed");
        self.emit(ChangeEvent {
            kind: ChangeKind::Resumed,
            task_id: None,
        });
    }

    /// Remove all queued tasks (any band), marking each cancelled and
    /// pushing it to history. Running tasks are untouched.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let mut count = 0;
        for band in BANDS {
            let drained: Vec<_> = inner.bands.get_mut(&band).unwrap().drain(..).collect();
            for mut task in drained {
                task.status = TaskStatus::Cancelled;
                task.completed_at = Some(now());
                inner.push_history(task, self.config.max_history_size);
                count += 1;
            }
        }
        drop(inner);
        if count > 0 {
            tracing::info!(count, "queue cleared");
        }
        self.emit(ChangeEvent {
            kind: ChangeKind::Cleared { count },
            task_id: None,
        });
        count
    }

    pub fn clear_history(&self) {
        self.inner.lock().unwrap().history.clear();
        self.emit(ChangeEvent {
            kind: ChangeKind::HistoryCleared,
            task_id: None,
        });
    }

    /// Pop the highest-priority, oldest queued task and move it into
    /// `running` (status still `Queued` until [`Self::mark_started`] is
    /// called). Returns `None` if paused or the queue is empty.
    pub fn dequeue_next(&self) -> Option<QueuedTask> {
        let mut inner = self.inner.lock().unwrap();
        if inner.paused {
            return None;
        }
        for band in BANDS {
            if let Some(task) = inner.bands.get_mut(&band).unwrap().pop_front() {
                inner.running.insert(task.id.clone(), task.clone());
                return Some(task);
            }
        }
        None
    }

    pub fn mark_started(&self, id: &TaskId, process_id: Option<ProcessId>) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(task) = inner.running.get_mut(id) else {
            return false;
        };
        task.status = TaskStatus::Running;
        task.started_at = Some(now());
        task.process_id = process_id;
        drop(inner);
        tracing::info!(task_id = %id, "task started");
        self.emit(ChangeEvent {
            kind: ChangeKind::Started,
            task_id: Some(id.clone()),
        });
        true
    }

    fn finish(
        &self,
        id: &TaskId,
        status: TaskStatus,
        result: Option<serde_json::Value>,
        error: Option<String>,
    ) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let Some(mut task) = inner.running.remove(id) else {
            return false;
        };
        task.status = status;
        task.completed_at = Some(now());
        task.result = result;
        task.error = error;
        inner.cancelled_ids.remove(id);
        inner.push_history(task, self.config.max_history_size);
        drop(inner);
        true
    }

    pub fn mark_completed(&self, id: &TaskId, result: Option<serde_json::Value>) -> bool {
        let ok = self.finish(id, TaskStatus::Completed, result, None);
        if ok {
            tracing::info!(task_id = %id, "task completed");
            self.emit(ChangeEvent {
                kind: ChangeKind::Completed,
                task_id: Some(id.clone()),
            });
        }
        ok
    }

    pub fn mark_failed(&self, id: &TaskId, error: String) -> bool {
        let ok = self.finish(id, TaskStatus::Failed, None, Some(error));
        if ok {
            tracing::warn!(task_id = %id, "task failed");
            self.emit(ChangeEvent {
                kind: ChangeKind::Failed,
                task_id: Some(id.clone()),
            });
        }
        ok
    }

    pub fn mark_cancelled(&self, id: &TaskId) -> bool {
        let ok = self.finish(id, TaskStatus::Cancelled, None, None);
        if ok {
            tracing::info!(task_id = %id, "running task cancelled");
            self.emit(ChangeEvent {
                kind: ChangeKind::Cancelled,
                task_id: Some(id.clone()),
            });
        }
        ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{TaskConfig, TaskPayload};

    fn input(priority: TaskPriority, name: &str) -> EnqueueInput {
        EnqueueInput {
            priority,
            display_name: Some(name.to_string()),
            payload: TaskPayload::ResolveComments { count: 1 },
            config: TaskConfig::default(),
        }
    }

    #[test]
    fn priority_ordering_high_before_normal_before_low() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        mgr.enqueue(input(TaskPriority::Low, "L")).unwrap();
        mgr.enqueue(input(TaskPriority::Normal, "N")).unwrap();
        mgr.enqueue(input(TaskPriority::High, "H")).unwrap();

        let queued = mgr.get_queued();
        let names: Vec<_> = queued.iter().map(|t| t.display_name.as_str()).collect();
        assert_eq!(names, vec!["H", "N", "L"]);
    }

    #[test]
    fn fifo_within_band() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        mgr.enqueue(input(TaskPriority::Normal, "first")).unwrap();
        mgr.enqueue(input(TaskPriority::Normal, "second")).unwrap();

        let queued = mgr.get_queued();
        assert_eq!(queued[0].display_name, "first");
        assert_eq!(queued[1].display_name, "second");
    }

    #[test]
    fn move_to_top_stays_within_band() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        let a = mgr.enqueue(input(TaskPriority::Normal, "A")).unwrap();
        let b = mgr.enqueue(input(TaskPriority::Normal, "B")).unwrap();
        let c = mgr.enqueue(input(TaskPriority::Normal, "C")).unwrap();

        assert!(mgr.move_to_top(&c));
        let order: Vec<_> = mgr.get_queued().into_iter().map(|t| t.id).collect();
        assert_eq!(order, vec![c.clone(), a, b]);

        let d = mgr.enqueue(input(TaskPriority::High, "D")).unwrap();
        let order: Vec<_> = mgr.get_queued().into_iter().map(|t| t.id).collect();
        assert_eq!(order[0], d);
        assert_eq!(order[1], c);
    }

    #[test]
    fn move_up_and_down_return_false_at_boundary() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        let a = mgr.enqueue(input(TaskPriority::Normal, "A")).unwrap();
        let b = mgr.enqueue(input(TaskPriority::Normal, "B")).unwrap();

        assert!(!mgr.move_up(&a)); // already first
        assert!(!mgr.move_down(&b)); // already last
        assert!(mgr.move_down(&a));
        let order: Vec<_> = mgr.get_queued().into_iter().map(|t| t.id).collect();
        assert_eq!(order, vec![b, a]);
    }

    #[test]
    fn cancel_queued_task_moves_to_history() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        let a = mgr.enqueue(input(TaskPriority::Normal, "A")).unwrap();
        assert!(mgr.cancel_task(&a));
        assert!(mgr.get_queued().is_empty());
        let history = mgr.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, TaskStatus::Cancelled);
    }

    #[test]
    fn cancel_unknown_task_returns_false() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        assert!(!mgr.cancel_task(&TaskId::new_v4()));
    }

    #[test]
    fn cancel_running_task_sets_tombstone_without_moving() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        let a = mgr.enqueue(input(TaskPriority::Normal, "A")).unwrap();
        let task = mgr.dequeue_next().unwrap();
        assert_eq!(task.id, a);
        assert!(mgr.cancel_task(&a));
        assert!(mgr.is_cancel_requested(&a));
        assert_eq!(mgr.get_running().len(), 1);
    }

    #[test]
    fn enqueue_over_capacity_fails() {
        let mgr = TaskQueueManager::new(QueueConfig {
            max_queue_size: Some(1),
            max_history_size: 100,
        });
        mgr.enqueue(input(TaskPriority::Normal, "A")).unwrap();
        let err = mgr.enqueue(input(TaskPriority::Normal, "B")).unwrap_err();
        assert!(matches!(err, CocError::Capacity(_)));
    }

    #[test]
    fn history_ring_evicts_oldest() {
        let mgr = TaskQueueManager::new(QueueConfig {
            max_queue_size: None,
            max_history_size: 2,
        });
        for label in ["A", "B", "C"] {
            let id = mgr.enqueue(input(TaskPriority::Normal, label)).unwrap();
            mgr.cancel_task(&id);
        }
        let history = mgr.get_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].display_name, "B");
        assert_eq!(history[1].display_name, "C");
    }

    #[test]
    fn pause_blocks_dispatch_but_not_running_tasks() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        mgr.enqueue(input(TaskPriority::Normal, "A")).unwrap();
        mgr.pause();
        assert!(mgr.dequeue_next().is_none());
        mgr.resume();
        assert!(mgr.dequeue_next().is_some());
    }

    #[test]
    fn clear_cancels_only_queued_tasks() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        let running_id = mgr.enqueue(input(TaskPriority::Normal, "running")).unwrap();
        mgr.dequeue_next();
        mgr.enqueue(input(TaskPriority::Normal, "queued")).unwrap();

        let cleared = mgr.clear();
        assert_eq!(cleared, 1);
        assert!(mgr.get_queued().is_empty());
        assert_eq!(mgr.get_running().len(), 1);
        assert_eq!(mgr.get_running()[0].id, running_id);
    }

    #[test]
    fn full_lifecycle_completed() {
        let mgr = TaskQueueManager::new(QueueConfig::default());
        let id = mgr.enqueue(input(TaskPriority::Normal, "A")).unwrap();
        let task = mgr.dequeue_next().unwrap();
        assert_eq!(task.id, id);
        assert!(mgr.mark_started(&id, None));
        assert!(mgr.mark_completed(&id, Some(serde_json::json!({"ok": true}))));

        let history = mgr.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].status, TaskStatus::Completed);
        assert!(history[0].started_at.is_some());
        assert!(history[0].completed_at.is_some());
        assert!(mgr.get_running().is_empty());
    }
}
