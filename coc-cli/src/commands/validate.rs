//! `coc validate` — check the loaded config against the constraints in
//! spec.md §6's configuration table without starting anything.

use coc_shared::config::AppConfig;

use crate::output;

pub(crate) fn handle_validate(config: &AppConfig) -> i32 {
    let mut problems = Vec::new();

    if let Some(parallel) = config.parallel {
        if parallel == 0 {
            problems.push("parallel must be > 0".to_string());
        }
    }
    if let Some(timeout) = config.timeout {
        if timeout == 0 {
            problems.push("timeout must be > 0".to_string());
        }
    }
    if config.serve.port == 0 {
        problems.push("serve.port must be > 0".to_string());
    }
    if config.serve.host.trim().is_empty() {
        problems.push("serve.host must not be empty".to_string());
    }

    if problems.is_empty() {
        output::success("configuration is valid");
        output::label("  Model", config.model.as_deref().unwrap_or("(default)"));
        output::label("  Output", format!("{:?}", config.output).to_lowercase());
        output::label("  Persist", config.persist);
        output::label(
            "  Serve",
            format!("{}:{}", config.serve.host, config.serve.port),
        );
        0
    } else {
        output::error(format!("configuration has {} problem(s)", problems.len()));
        for problem in &problems {
            output::item(problem);
        }
        2
    }
}
