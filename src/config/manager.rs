//! Pin manager configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::PinError;

/// Longest a single pin execution may run.
pub const MAX_PIN_DURATION: Duration = Duration::from_millis(MAX_PIN_DURATION_MS);

const MAX_PIN_DURATION_MS: u64 = 24 * 60 * 60 * 1000;

/// Smallest accepted worker thread stack.
pub const MIN_STACK_SIZE: usize = 64 * 1024;

/// Backlog storage backend selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueBackendConfig {
    /// JSON-lines files under `queue_data_dir`.
    #[default]
    File,
    /// Process-local queues, lost on exit.
    InMemory,
}

/// Settings consumed when a pin manager is constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinManagerConfig {
    /// Per-user active job limit. Stored and exposed; the dispatch loop does not enforce it.
    pub max_active_per_user: usize,
    /// Directory holding the backlog files. Reused across restarts.
    pub queue_data_dir: PathBuf,
    /// Backlog storage backend.
    pub queue_backend: QueueBackendConfig,
    /// Deadline applied to each pin execution, in milliseconds.
    pub max_pin_duration_ms: u64,
    /// Stack size of worker threads in bytes.
    pub worker_stack_size: usize,
    /// Label attached to the manager's tracing span.
    pub name: String,
}

impl Default for PinManagerConfig {
    fn default() -> Self {
        Self {
            max_active_per_user: 15,
            queue_data_dir: std::env::temp_dir().join("pinqueue"),
            queue_backend: QueueBackendConfig::File,
            max_pin_duration_ms: MAX_PIN_DURATION_MS,
            worker_stack_size: 2 * 1024 * 1024,
            name: "pinner".into(),
        }
    }
}

impl PinManagerConfig {
    /// Start from the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the backlog directory.
    #[must_use]
    pub fn with_queue_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.queue_data_dir = dir.into();
        self
    }

    /// Set the backlog backend.
    #[must_use]
    pub const fn with_queue_backend(mut self, backend: QueueBackendConfig) -> Self {
        self.queue_backend = backend;
        self
    }

    /// Set the per-user limit.
    #[must_use]
    pub const fn with_max_active_per_user(mut self, limit: usize) -> Self {
        self.max_active_per_user = limit;
        self
    }

    /// Set the per-job deadline. Sub-millisecond durations round up to one millisecond.
    #[must_use]
    pub fn with_max_pin_duration(mut self, duration: Duration) -> Self {
        self.max_pin_duration_ms = u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        self
    }

    /// Set the span label.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Per-job deadline as a duration.
    #[must_use]
    pub const fn max_pin_duration(&self) -> Duration {
        Duration::from_millis(self.max_pin_duration_ms)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns [`PinError::MissingQueueDir`] when the file backend has no directory,
    /// and [`PinError::InvalidConfig`] for out-of-range values.
    pub fn validate(&self) -> Result<(), PinError> {
        if self.queue_backend == QueueBackendConfig::File
            && self.queue_data_dir.as_os_str().is_empty()
        {
            return Err(PinError::MissingQueueDir);
        }
        if self.max_pin_duration_ms == 0 {
            return Err(PinError::InvalidConfig(
                "max_pin_duration_ms must be greater than 0".into(),
            ));
        }
        if self.max_pin_duration_ms > MAX_PIN_DURATION_MS {
            return Err(PinError::InvalidConfig(format!(
                "max_pin_duration_ms must not exceed {MAX_PIN_DURATION_MS}"
            )));
        }
        if self.worker_stack_size < MIN_STACK_SIZE {
            return Err(PinError::InvalidConfig(format!(
                "worker_stack_size must be at least {MIN_STACK_SIZE}"
            )));
        }
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a parse or validation error.
    pub fn from_json_str(input: &str) -> Result<Self, PinError> {
        let cfg: Self = serde_json::from_str(input)?;
        cfg.validate()?;
        Ok(cfg)
    }
}
