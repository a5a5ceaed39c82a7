//! `coc serve` — boot the full HTTP/WebSocket/SSE stack in-process.

use coc_server::bootstrap::{bootstrap, wait_for_shutdown_signal, DEFAULT_SHUTDOWN_TIMEOUT};
use coc_shared::config::AppConfig;

use crate::output;

pub(crate) async fn handle_serve(config: &AppConfig) -> i32 {
    let handle = match bootstrap(config).await {
        Ok(handle) => handle,
        Err(error) => {
            output::error(format!("failed to bind server: {error}"));
            return 2;
        }
    };

    output::success(format!("listening on {}", handle.local_addr));
    output::dim("press Ctrl+C to stop");

    wait_for_shutdown_signal().await;
    output::dim("shutting down...");

    match tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, handle.stop()).await {
        Ok(()) => {
            output::success("shutdown complete");
            0
        }
        Err(_) => {
            output::error("graceful shutdown timed out");
            1
        }
    }
}
