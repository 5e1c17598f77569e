//! Error types for scheduling and dispatch.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the pin scheduler.
#[derive(Debug, Error)]
pub enum PinError {
    /// The file-backed backlog was configured without a storage directory.
    #[error("queue data dir is not set")]
    MissingQueueDir,
    /// Configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem failure underneath the backlog.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted backlog record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The pin function did not finish before its deadline.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(Duration),
    /// The pin function returned an error.
    #[error("pin execution failed: {0}")]
    Execution(String),
    /// The status hook failed while reporting an earlier failure.
    #[error("status hook failed: {hook} (while reporting: {cause})")]
    StatusHook {
        /// Error returned by the hook.
        hook: String,
        /// The failure the hook was reporting.
        cause: String,
    },
    /// An internal channel lost its other end.
    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),
    /// A worker thread could not be started.
    #[error("failed to spawn worker: {0}")]
    WorkerSpawn(String),
}

/// Application-facing result using anyhow for collaborator contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
