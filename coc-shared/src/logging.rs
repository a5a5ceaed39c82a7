//! Structured logging init, shared by the `serve` binary and the CLI.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the global tracing subscriber. Safe to call once at process
/// start; subsequent calls are no-ops (the underlying `set_global_default`
/// error is swallowed, so both the server binary and test harnesses can
/// call this unconditionally).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "coc=info,tower_http=info".into());

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
