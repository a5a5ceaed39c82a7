//! `coc` — thin CLI wrapper over the core orchestration console. Argv
//! parsing and config loading only; the actual queue/store/executor/server
//! machinery lives in `coc-queue`/`coc-store`/`coc-executor`/`coc-server`.

mod commands;
mod output;

use clap::{Parser, Subcommand};
use coc_shared::config::load_app_config;

use commands::list::ListArgs;
use commands::run::RunArgs;
use commands::{handle_list, handle_run, handle_serve, handle_validate};

#[derive(Parser)]
#[command(name = "coc", version, about = "Core orchestration console CLI", styles = output::clap_styles())]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a single task directly, outside the queue.
    Run {
        /// The prompt to run.
        prompt: String,
        /// Working directory for the task, if different from the current one.
        #[arg(long)]
        working_directory: Option<String>,
    },
    /// Validate the loaded configuration.
    Validate,
    /// List processes recorded in the store.
    List {
        #[arg(long)]
        workspace: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Start the HTTP/WebSocket/SSE server.
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        host: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    coc_shared::logging::init_tracing();

    let cli = Cli::parse();
    let mut config = load_app_config();

    let exit_code = match cli.command {
        Command::Run {
            prompt,
            working_directory,
        } => handle_run(&config, RunArgs { prompt, working_directory }).await,
        Command::Validate => handle_validate(&config),
        Command::List {
            workspace,
            status,
            limit,
        } => handle_list(&config, ListArgs { workspace, status, limit }).await,
        Command::Serve { port, host } => {
            if let Some(port) = port {
                config.serve.port = port;
            }
            if let Some(host) = host {
                config.serve.host = host;
            }
            handle_serve(&config).await
        }
    };

    std::process::exit(exit_code);
}
