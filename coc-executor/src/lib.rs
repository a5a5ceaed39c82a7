//! Component B: the worker pool draining the priority queue against a
//! pluggable executor.

pub mod cli_executor;
pub mod events;
pub mod executor;
pub mod queue_executor;

pub use cli_executor::{ChunkCallback, CliTaskExecutor, CopilotResponse, CopilotSdkService, StubCopilotService};
pub use events::{TaskEvent, TaskEventHandler};
pub use executor::{ExecutionOutcome, TaskExecutor};
pub use queue_executor::{QueueExecutor, QueueExecutorConfig};
