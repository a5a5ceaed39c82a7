//! `coc-serve` — thin wrapper binary: load config, bootstrap the server,
//! wait for shutdown.

use coc_server::bootstrap::{bootstrap, wait_for_shutdown_signal, DEFAULT_SHUTDOWN_TIMEOUT};
use coc_shared::{config::load_app_config, logging};

#[tokio::main]
async fn main() {
    logging::init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting core orchestration console server");

    let config = load_app_config();
    let handle = match bootstrap(&config).await {
        Ok(handle) => handle,
        Err(error) => {
            tracing::error!(%error, "failed to bind server");
            std::process::exit(1);
        }
    };

    tracing::info!(addr = %handle.local_addr, "server listening, press Ctrl+C to shut down");
    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, stopping gracefully");

    match tokio::time::timeout(DEFAULT_SHUTDOWN_TIMEOUT, handle.stop()).await {
        Ok(()) => tracing::info!("shutdown complete"),
        Err(_) => tracing::error!(timeout = ?DEFAULT_SHUTDOWN_TIMEOUT, "graceful shutdown timed out, forcing exit"),
    }
}
