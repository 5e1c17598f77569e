//! Scheduling core: jobs, backlog, workers and the dispatch coordinator.

pub mod backlog;
pub mod coordinator;
pub mod dedup;
pub mod error;
pub mod executor;
pub mod job;
pub mod worker_pool;

pub use backlog::{Backlog, EnqueueOutcome, JobQueue, Lane, SharedBacklog};
pub use coordinator::PinManager;
pub use dedup::DuplicateGuard;
pub use error::{AppResult, PinError};
pub use executor::{NoopStatusHook, PinContext, PinExecutor, Progress, StatusHook};
pub use job::{Fingerprint, JobRecord, JobState, PeerAddr, PinJob, PinRequest, PinStatus};
pub use worker_pool::{PoolStats, WorkerPool};
