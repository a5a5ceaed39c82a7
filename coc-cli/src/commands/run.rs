//! `coc run` — execute a single task directly, outside the queue, streaming
//! chunks to the terminal as they arrive.

use std::sync::Arc;

use coc_executor::{CliTaskExecutor, TaskExecutor};
use coc_queue::{QueuedTask, TaskConfig, TaskPayload, TaskPriority, TaskStatus};
use coc_shared::config::AppConfig;
use coc_shared::ids::{ProcessId, TaskId};
use coc_shared::time::now;
use coc_store::{FileProcessStore, InMemoryProcessStore, ProcessOutputEvent, ProcessStore};
use tokio_util::sync::CancellationToken;

use crate::output;

pub(crate) struct RunArgs {
    pub prompt: String,
    pub working_directory: Option<String>,
}

pub(crate) async fn handle_run(config: &AppConfig, args: RunArgs) -> i32 {
    let store: Arc<dyn ProcessStore> = if config.persist {
        let data_dir = coc_shared::config::expand_tilde(&config.serve.data_dir);
        Arc::new(FileProcessStore::new(data_dir).await)
    } else {
        Arc::new(InMemoryProcessStore::new())
    };

    let task = QueuedTask {
        id: TaskId::new_v4(),
        priority: TaskPriority::Normal,
        status: TaskStatus::Running,
        created_at: now(),
        started_at: Some(now()),
        completed_at: None,
        display_name: "coc run".to_string(),
        payload: TaskPayload::AiClarification {
            prompt: args.prompt,
            working_directory: args.working_directory,
        },
        config: TaskConfig::default(),
        process_id: None,
        result: None,
        error: None,
        retry_count: 0,
    };

    // Subscribe before executing so no chunk emitted right after `add_process`
    // is missed.
    spawn_chunk_relay(store.clone(), ProcessId::for_task(&task.id));

    let executor = CliTaskExecutor::with_stub_service(store);
    let cancel = CancellationToken::new();
    let cancel_for_signal = cancel.clone();

    output::dim("running...");

    let outcome = tokio::select! {
        outcome = executor.execute(&task, cancel) => outcome,
        _ = tokio::signal::ctrl_c() => {
            cancel_for_signal.cancel();
            output::warning("cancelled");
            return 130;
        }
    };

    if outcome.success {
        output::success("task completed");
        if let Some(result) = &outcome.result {
            output::label("  Result", result);
        }
        0
    } else {
        let error = outcome.error.unwrap_or_else(|| "unknown error".to_string());
        output::error(format!("task failed: {error}"));
        if error.to_lowercase().contains("unavailable") {
            3
        } else {
            1
        }
    }
}

fn spawn_chunk_relay(store: Arc<dyn ProcessStore>, process_id: ProcessId) {
    let mut receiver = store.subscribe_output(&process_id);
    tokio::spawn(async move {
        while let Ok(event) = receiver.recv().await {
            if let ProcessOutputEvent::Chunk { content } = event {
                output::plain(content);
            }
        }
    });
}
