//! Shared foundation for the Core Orchestration Console: error taxonomy,
//! configuration, logging, and id newtypes used by every other crate in the
//! workspace.

pub mod config;
pub mod error;
pub mod ids;
pub mod logging;
pub mod time;

pub use error::{CocError, CocResult};
pub use ids::{ClientId, ProcessId, TaskId, WorkspaceId};
