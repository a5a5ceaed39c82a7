//! `QueueExecutor` — the worker pool (component B). Built around a
//! `tokio::sync::Semaphore` sized to `max_concurrency`: acquire an owned
//! permit before spawning, drop it on completion, wake on either a
//! queue-change subscription or a periodic tick.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::Duration;

use coc_queue::{ChangeEvent, QueuedTask, TaskQueueManager};
use coc_shared::ids::{ProcessId, TaskId};
use dashmap::DashMap;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::events::{TaskEvent, TaskEventHandler, TaskObservers};
use crate::executor::TaskExecutor;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct QueueExecutorConfig {
    pub max_concurrency: usize,
}

impl Default for QueueExecutorConfig {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

pub struct QueueExecutor {
    queue: Arc<TaskQueueManager>,
    executor: Arc<dyn TaskExecutor>,
    semaphore: Arc<Semaphore>,
    config: QueueExecutorConfig,
    observers: StdMutex<TaskObservers>,
    wake_tx: mpsc::UnboundedSender<()>,
    wake_rx: StdMutex<Option<mpsc::UnboundedReceiver<()>>>,
    cancel_tokens: DashMap<TaskId, CancellationToken>,
    inflight: AtomicUsize,
    dispatcher_handle: StdMutex<Option<JoinHandle<()>>>,
}

impl std::fmt::Debug for QueueExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueExecutor")
            .field("config", &self.config)
            .field("inflight", &self.inflight.load(Ordering::SeqCst))
            .finish()
    }
}

impl QueueExecutor {
    pub fn new(
        queue: Arc<TaskQueueManager>,
        executor: Arc<dyn TaskExecutor>,
        config: QueueExecutorConfig,
    ) -> Arc<Self> {
        let (wake_tx, wake_rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            queue,
            executor,
            semaphore: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            config,
            observers: StdMutex::new(TaskObservers::default()),
            wake_tx,
            wake_rx: StdMutex::new(Some(wake_rx)),
            cancel_tokens: DashMap::new(),
            inflight: AtomicUsize::new(0),
            dispatcher_handle: StdMutex::new(None),
        })
    }

    pub fn on(&self, handler: TaskEventHandler) {
        self.observers.lock().unwrap().register(handler);
    }

    fn emit(&self, event: TaskEvent) {
        self.observers.lock().unwrap().notify(event);
    }

    /// Registers a subscriber on A's `change` events and spawns the
    /// dispatch loop. Idempotent: a second call is a no-op.
    pub fn start(self: &Arc<Self>) {
        if self.dispatcher_handle.lock().unwrap().is_some() {
            return;
        }
        let Some(wake_rx) = self.wake_rx.lock().unwrap().take() else {
            return;
        };

        let wake_tx = self.wake_tx.clone();
        self.queue.on(Box::new(move |_event: ChangeEvent| {
            let _ = wake_tx.send(());
        }));

        let this = Arc::clone(self);
        let handle = tokio::spawn(async move { this.run_dispatch_loop(wake_rx).await });
        *self.dispatcher_handle.lock().unwrap() = Some(handle);
        tracing::info!(max_concurrency = self.config.max_concurrency, "queue executor started");
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.dispatcher_handle.lock().unwrap().take() {
            handle.abort();
        }
        tracing::info!("queue executor stopped");
    }

    async fn run_dispatch_loop(self: Arc<Self>, mut wake_rx: mpsc::UnboundedReceiver<()>) {
        let mut tick = tokio::time::interval(POLL_INTERVAL);
        loop {
            tokio::select! {
                maybe = wake_rx.recv() => {
                    if maybe.is_none() {
                        break;
                    }
                }
                _ = tick.tick() => {}
            }
            self.dispatch_ready().await;
        }
    }

    async fn dispatch_ready(self: &Arc<Self>) {
        loop {
            if self.queue.is_paused() {
                break;
            }
            if self.inflight.load(Ordering::SeqCst) >= self.config.max_concurrency {
                break;
            }
            let Some(task) = self.queue.dequeue_next() else {
                break;
            };

            let permit = match self.semaphore.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => break,
            };

            self.inflight.fetch_add(1, Ordering::SeqCst);
            let process_id = ProcessId::for_task(&task.id);
            self.queue.mark_started(&task.id, Some(process_id));

            let token = CancellationToken::new();
            self.cancel_tokens.insert(task.id.clone(), token.clone());
            self.emit(TaskEvent::Started(task.clone()));

            let this = Arc::clone(self);
            tokio::spawn(async move {
                this.run_worker(task, token).await;
                drop(permit);
            });
        }
    }

    async fn run_worker(self: Arc<Self>, task: QueuedTask, token: CancellationToken) {
        let outcome = self.executor.execute(&task, token.clone()).await;
        self.cancel_tokens.remove(&task.id);

        if self.queue.is_cancel_requested(&task.id) || token.is_cancelled() {
            self.queue.mark_cancelled(&task.id);
            self.emit(TaskEvent::Cancelled(task.clone()));
        } else if outcome.success {
            self.queue.mark_completed(&task.id, outcome.result.clone());
            self.emit(TaskEvent::Completed(task.clone()));
        } else {
            let error = outcome.error.clone().unwrap_or_else(|| "unknown error".to_string());
            self.queue.mark_failed(&task.id, error.clone());
            self.emit(TaskEvent::Failed(task.clone(), error));
        }

        self.inflight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.wake_tx.send(());
    }

    /// Cancel a task by id, queued or running. Delegates to A; for running
    /// tasks also invokes the pluggable executor's best-effort `cancel` and
    /// flips the worker's `CancellationToken`.
    pub fn cancel_task(&self, id: &TaskId) -> bool {
        let ok = self.queue.cancel_task(id);
        if ok && self.queue.is_cancel_requested(id) {
            self.executor.cancel(id);
            if let Some(token) = self.cancel_tokens.get(id) {
                token.cancel();
            }
        }
        ok
    }

    pub fn inflight_count(&self) -> usize {
        self.inflight.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use coc_queue::{EnqueueInput, QueueConfig, TaskConfig, TaskPayload, TaskPriority};
    use std::sync::atomic::AtomicBool;
    use std::time::Duration as StdDuration;
    use tokio::sync::Notify;

    struct InstantExecutor {
        delay: Option<StdDuration>,
    }

    #[async_trait]
    impl TaskExecutor for InstantExecutor {
        async fn execute(
            &self,
            _task: &QueuedTask,
            cancel: CancellationToken,
        ) -> crate::executor::ExecutionOutcome {
            if let Some(delay) = self.delay {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => {}
                }
            }
            crate::executor::ExecutionOutcome::success(serde_json::json!({"response": "ok"}), 1)
        }

        fn cancel(&self, _task_id: &TaskId) {}
    }

    fn enqueue_input(priority: TaskPriority, name: &str) -> EnqueueInput {
        let mut data = std::collections::HashMap::new();
        data.insert("prompt".to_string(), serde_json::json!("hi"));
        EnqueueInput {
            priority,
            display_name: Some(name.to_string()),
            payload: TaskPayload::Custom { data },
            config: TaskConfig::default(),
        }
    }

    #[tokio::test]
    async fn drains_a_single_task_to_completion() {
        let queue = Arc::new(TaskQueueManager::new(QueueConfig::default()));
        let executor: Arc<dyn TaskExecutor> = Arc::new(InstantExecutor { delay: None });
        let pool = QueueExecutor::new(queue.clone(), executor, QueueExecutorConfig::default());

        let done = Arc::new(Notify::new());
        let done2 = done.clone();
        pool.on(Box::new(move |event| {
            if matches!(event, TaskEvent::Completed(_)) {
                done2.notify_one();
            }
        }));

        pool.start();
        let id = queue.enqueue(enqueue_input(TaskPriority::Normal, "t")).unwrap();

        tokio::time::timeout(StdDuration::from_secs(2), done.notified())
            .await
            .expect("task should complete");

        let history = queue.get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].status, coc_queue::TaskStatus::Completed);
        pool.stop().await;
    }

    #[tokio::test]
    async fn respects_concurrency_cap() {
        let queue = Arc::new(TaskQueueManager::new(QueueConfig::default()));
        let executor: Arc<dyn TaskExecutor> = Arc::new(InstantExecutor {
            delay: Some(StdDuration::from_millis(300)),
        });
        let pool = QueueExecutor::new(
            queue.clone(),
            executor,
            QueueExecutorConfig { max_concurrency: 1 },
        );

        let max_seen = Arc::new(AtomicUsize::new(0));
        let max_seen2 = max_seen.clone();
        let pool_for_check = Arc::clone(&pool);
        pool.on(Box::new(move |_event| {
            let current = pool_for_check.inflight_count();
            max_seen2.fetch_max(current, Ordering::SeqCst);
        }));

        pool.start();
        queue.enqueue(enqueue_input(TaskPriority::Normal, "a")).unwrap();
        queue.enqueue(enqueue_input(TaskPriority::Normal, "b")).unwrap();

        tokio::time::sleep(StdDuration::from_millis(900)).await;
        assert!(max_seen.load(Ordering::SeqCst) <= 1);
        assert_eq!(queue.get_history().len(), 2);
        pool.stop().await;
    }

    #[tokio::test]
    async fn cancel_running_task_reports_cancelled() {
        let queue = Arc::new(TaskQueueManager::new(QueueConfig::default()));
        let executor: Arc<dyn TaskExecutor> = Arc::new(InstantExecutor {
            delay: Some(StdDuration::from_secs(5)),
        });
        let pool = QueueExecutor::new(queue.clone(), executor, QueueExecutorConfig::default());

        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled2 = cancelled.clone();
        pool.on(Box::new(move |event| {
            if matches!(event, TaskEvent::Cancelled(_)) {
                cancelled2.store(true, Ordering::SeqCst);
            }
        }));

        pool.start();
        let id = queue.enqueue(enqueue_input(TaskPriority::Normal, "slow")).unwrap();
        tokio::time::sleep(StdDuration::from_millis(200)).await;

        assert!(pool.cancel_task(&id));
        tokio::time::timeout(StdDuration::from_secs(1), async {
            while !cancelled.load(Ordering::SeqCst) {
                tokio::time::sleep(StdDuration::from_millis(20)).await;
            }
        })
        .await
        .expect("cancellation should be observed");

        assert!(queue.get_running().is_empty());
        pool.stop().await;
    }
}
