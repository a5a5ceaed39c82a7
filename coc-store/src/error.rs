use thiserror::Error;

/// Persistence failures are always logged and swallowed by the store itself
/// (per spec: "write failures must not crash the server"); this type exists
/// only so `FileProcessStore` has something concrete to log with `warn!`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize process {id}: {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },
}
