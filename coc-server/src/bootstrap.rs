//! Wires A, B, C, and D together: the queue↔transport and store↔transport
//! bridges, and the bind/serve/shutdown lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use coc_executor::{CliTaskExecutor, QueueExecutor, QueueExecutorConfig};
use coc_queue::{ChangeEvent, QueueConfig, TaskQueueManager};
use coc_shared::config::AppConfig;
use coc_store::{FileProcessStore, InMemoryProcessStore, ProcessChangeEvent, ProcessStore};
use tokio::signal;

use crate::app::app;
use crate::state::AppState;
use crate::ws::{ServerMessage, WsHub};

const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct ServerHandle {
    pub state: AppState,
    pub local_addr: SocketAddr,
    join_handle: tokio::task::JoinHandle<std::io::Result<()>>,
}

impl ServerHandle {
    /// Stop the executor, close every WebSocket client, then let the HTTP
    /// listener's accept loop drain. Bounded so a stuck shutdown can't hang
    /// the process forever.
    pub async fn stop(self) {
        self.state.executor.stop().await;
        self.state.ws_hub.close_all();
        self.join_handle.abort();
    }
}

/// Build the full in-process stack (A, B, C, D) and start serving. Does not
/// block; call [`wait_for_shutdown_signal`] and then [`ServerHandle::stop`]
/// to shut down.
pub async fn bootstrap(config: &AppConfig) -> std::io::Result<ServerHandle> {
    let serve = &config.serve;
    let queue = Arc::new(TaskQueueManager::new(QueueConfig::default()));

    let store: Arc<dyn ProcessStore> = if config.persist {
        let data_dir = coc_shared::config::expand_tilde(&serve.data_dir);
        Arc::new(FileProcessStore::new(data_dir).await)
    } else {
        Arc::new(InMemoryProcessStore::new())
    };

    let executor = CliTaskExecutor::with_stub_service(store.clone());
    let queue_executor = QueueExecutor::new(
        queue.clone(),
        Arc::new(executor),
        QueueExecutorConfig::default(),
    );

    let ws_hub = WsHub::new();

    wire_queue_bridge(&queue, &ws_hub);
    wire_store_bridge(&store, &ws_hub);

    queue_executor.start();

    let state = AppState {
        queue,
        store,
        executor: queue_executor,
        ws_hub,
        started_at: std::time::Instant::now(),
    };

    let addr: SocketAddr = format!("{}:{}", serve.host, serve.port)
        .parse()
        .or_else(|_| format!("0.0.0.0:{}", serve.port).parse())
        .expect("valid bind address");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(%local_addr, "server listening");

    let router = app(state.clone());
    let join_handle = tokio::spawn(async move { axum::serve(listener, router).await });

    Ok(ServerHandle {
        state,
        local_addr,
        join_handle,
    })
}

/// Subscribes to A's `change` events and broadcasts a `queue-updated`
/// snapshot for each, per §4.4.5.
fn wire_queue_bridge(queue: &Arc<TaskQueueManager>, hub: &Arc<WsHub>) {
    let queue_for_snapshot = queue.clone();
    let hub = hub.clone();
    queue.on(Box::new(move |_event: ChangeEvent| {
        let snapshot = crate::ws::messages::QueueSnapshot {
            queued: queue_for_snapshot.get_queued().iter().map(Into::into).collect(),
            running: queue_for_snapshot.get_running().iter().map(Into::into).collect(),
            history: queue_for_snapshot.get_history().iter().map(Into::into).collect(),
            stats: queue_for_snapshot.get_stats(),
        };
        hub.broadcast(ServerMessage::QueueUpdated { queue: snapshot });
    }));
}

/// Subscribes to C's `change` events and bridges each to the matching
/// `ServerMessage`, broadcast with workspace filtering applied by the hub.
fn wire_store_bridge(store: &Arc<dyn ProcessStore>, hub: &Arc<WsHub>) {
    let hub = hub.clone();
    store.set_on_change(Box::new(move |event: ProcessChangeEvent| {
        let message = match event {
            ProcessChangeEvent::ProcessAdded { process } => ServerMessage::ProcessAdded {
                process: (&process).into(),
            },
            ProcessChangeEvent::ProcessUpdated { process } => ServerMessage::ProcessUpdated {
                process: (&process).into(),
            },
            ProcessChangeEvent::ProcessRemoved { process } => ServerMessage::ProcessRemoved {
                process: (&process).into(),
            },
            ProcessChangeEvent::ProcessesCleared => ServerMessage::ProcessesCleared,
        };
        hub.broadcast(message);
    }));
}

/// Resolves on the first Ctrl+C or SIGTERM, whichever arrives first.
pub async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl+C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}

pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = SHUTDOWN_TIMEOUT;
