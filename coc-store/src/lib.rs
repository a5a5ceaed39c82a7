//! Component C: the process registry, its change-event bus, and per-process
//! output streams.

pub mod error;
pub mod persisted;
pub mod store;
pub mod store_file;
pub mod store_memory;
pub mod types;

pub use error::StoreError;
pub use store::{ChangeCallback, ProcessStore, DEFAULT_LIST_LIMIT, OUTPUT_CHANNEL_CAPACITY};
pub use store_file::FileProcessStore;
pub use store_memory::InMemoryProcessStore;
pub use types::{
    AIProcess, ProcessChangeEvent, ProcessFilter, ProcessOutputEvent, ProcessStatus,
    ProcessSummary, ProcessUpdate, WorkspaceInfo,
};
