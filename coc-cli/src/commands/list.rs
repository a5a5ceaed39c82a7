//! `coc list` — print processes from the store, formatted per
//! `config.output` (table/json/csv/markdown).

use std::sync::Arc;

use coc_shared::config::{AppConfig, OutputFormat};
use coc_shared::ids::WorkspaceId;
use coc_store::{AIProcess, FileProcessStore, InMemoryProcessStore, ProcessFilter, ProcessStatus, ProcessStore};

use crate::output;

pub(crate) struct ListArgs {
    pub workspace: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

pub(crate) async fn handle_list(config: &AppConfig, args: ListArgs) -> i32 {
    let store: Arc<dyn ProcessStore> = if config.persist {
        let data_dir = coc_shared::config::expand_tilde(&config.serve.data_dir);
        Arc::new(FileProcessStore::new(data_dir).await)
    } else {
        Arc::new(InMemoryProcessStore::new())
    };

    let filter = ProcessFilter {
        workspace_id: args.workspace.map(WorkspaceId::from),
        status: args
            .status
            .as_deref()
            .and_then(parse_status)
            .map(|s| vec![s])
            .unwrap_or_default(),
        process_type: None,
        since: None,
        limit: args.limit,
        offset: None,
    };

    let processes = store.get_all_processes(&filter).await;

    match config.output {
        OutputFormat::Json => print_json(&processes),
        OutputFormat::Csv => print_csv(&processes),
        OutputFormat::Markdown => print_markdown(&processes),
        OutputFormat::Table => print_table(&processes),
    }

    0
}

fn parse_status(raw: &str) -> Option<ProcessStatus> {
    match raw {
        "queued" => Some(ProcessStatus::Queued),
        "running" => Some(ProcessStatus::Running),
        "completed" => Some(ProcessStatus::Completed),
        "failed" => Some(ProcessStatus::Failed),
        "cancelled" => Some(ProcessStatus::Cancelled),
        _ => None,
    }
}

fn print_table(processes: &[AIProcess]) {
    if processes.is_empty() {
        output::dim("no processes");
        return;
    }
    output::header(format!("{} process(es)", processes.len()));
    for process in processes {
        output::item(format!(
            "{}  {:?}  {}",
            process.id, process.status, process.prompt_preview
        ));
    }
}

fn print_json(processes: &[AIProcess]) {
    match serde_json::to_string_pretty(processes) {
        Ok(json) => output::plain(json),
        Err(error) => output::error(format!("failed to serialize processes: {error}")),
    }
}

fn print_csv(processes: &[AIProcess]) {
    output::plain("id,type,status,promptPreview");
    for process in processes {
        output::plain(format!(
            "{},{},{:?},{}",
            process.id,
            process.process_type,
            process.status,
            process.prompt_preview.replace(',', " ")
        ));
    }
}

fn print_markdown(processes: &[AIProcess]) {
    output::plain("| id | type | status | prompt |");
    output::plain("| --- | --- | --- | --- |");
    for process in processes {
        output::plain(format!(
            "| {} | {} | {:?} | {} |",
            process.id, process.process_type, process.status, process.prompt_preview
        ));
    }
}
