//! Command handlers for the `coc` CLI.
//!
//! Each module handles one subcommand and returns a process exit code,
//! matching the wire contract in spec.md §6: 0 success, 1 execution error,
//! 2 config/IO error, 3 AI unavailable, 130 cancelled.

pub(crate) mod list;
pub(crate) mod run;
pub(crate) mod serve;
pub(crate) mod validate;

pub(crate) use list::handle_list;
pub(crate) use run::handle_run;
pub(crate) use serve::handle_serve;
pub(crate) use validate::handle_validate;
