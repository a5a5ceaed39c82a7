//! Opaque id newtypes used at every component boundary.
//!
//! Wrapping `String` keeps the types distinct at compile time (a `TaskId`
//! can never be passed where a `ProcessId` is expected) while still
//! serializing as a bare JSON string on the wire.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(
            Debug, Clone, PartialEq, Eq, Hash, Display, From, Serialize, Deserialize, PartialOrd, Ord,
        )]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new_v4() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

id_newtype!(TaskId);
id_newtype!(ProcessId);
id_newtype!(WorkspaceId);
id_newtype!(ClientId);

impl ProcessId {
    /// Format used by the executor when it creates a tracking process for a task:
    /// `queue-{taskId}`.
    pub fn for_task(task_id: &TaskId) -> Self {
        Self(format!("queue-{}", task_id.0))
    }
}
