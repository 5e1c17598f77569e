//! Durable priority/normal backlog with its duplicate guard.
//!
//! Both queues and the guard sit behind the single mutex of [`SharedBacklog`],
//! so "is this fingerprint already pending" always agrees with queue contents.
//! Dequeue order is strict: the priority queue drains before the normal queue
//! is looked at, with no aging, so sustained priority traffic starves normal
//! work.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{PinManagerConfig, QueueBackendConfig};
use crate::core::dedup::DuplicateGuard;
use crate::core::job::PinJob;
use crate::core::PinError;
use crate::infra::queue::{FileQueue, MemoryQueue};

/// Abstraction for FIFO queue backends.
pub trait JobQueue: Send {
    /// Append a job at the tail.
    ///
    /// # Errors
    ///
    /// Backend storage failure.
    fn enqueue(&mut self, job: Arc<PinJob>) -> Result<(), PinError>;
    /// Remove the head, if any.
    ///
    /// # Errors
    ///
    /// Backend storage failure.
    fn dequeue(&mut self) -> Result<Option<Arc<PinJob>>, PinError>;
    /// Jobs currently held, head first.
    fn pending(&self) -> Vec<Arc<PinJob>>;
    /// Current depth.
    fn len(&self) -> usize;
    /// Whether the queue holds nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Which backlog queue a job lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    /// System-owned or limiter-bypassing work.
    Priority,
    /// Everything else.
    Normal,
}

impl Lane {
    /// Lane a job is routed to.
    #[must_use]
    pub const fn for_job(job: &PinJob) -> Self {
        if job.request().is_priority() {
            Self::Priority
        } else {
            Self::Normal
        }
    }

    /// Stable name, also used as the file stem of durable queues.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Priority => "priority",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of offering a job to the backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Appended to the given lane.
    Queued(Lane),
    /// Dropped because an identical fingerprint is pending.
    Duplicate,
}

/// Backlog handle shared by the coordinator and the workers.
pub type SharedBacklog = Arc<Mutex<Backlog>>;

/// Priority and normal queues plus the duplicate guard.
pub struct Backlog {
    priority: Box<dyn JobQueue>,
    normal: Box<dyn JobQueue>,
    guard: DuplicateGuard,
}

impl Backlog {
    /// Assemble a backlog from two queues, marking whatever they already hold.
    #[must_use]
    pub fn new(priority: Box<dyn JobQueue>, normal: Box<dyn JobQueue>) -> Self {
        let mut guard = DuplicateGuard::new();
        for job in priority.pending().iter().chain(normal.pending().iter()) {
            guard.insert(job.fingerprint().clone());
        }
        Self {
            priority,
            normal,
            guard,
        }
    }

    /// Non-durable backlog.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryQueue::new()), Box::new(MemoryQueue::new()))
    }

    /// Open the backlog described by `config`, recovering persisted work.
    ///
    /// # Errors
    ///
    /// Invalid configuration or storage that cannot be opened.
    pub fn open(config: &PinManagerConfig) -> Result<Self, PinError> {
        config.validate()?;
        match config.queue_backend {
            QueueBackendConfig::InMemory => Ok(Self::in_memory()),
            QueueBackendConfig::File => {
                let dir = &config.queue_data_dir;
                let priority = FileQueue::open(dir, Lane::Priority.as_str())?;
                let normal = FileQueue::open(dir, Lane::Normal.as_str())?;
                let backlog = Self::new(Box::new(priority), Box::new(normal));
                tracing::info!(
                    dir = %dir.display(),
                    recovered = backlog.len(),
                    "opened durable backlog"
                );
                Ok(backlog)
            }
        }
    }

    /// Wrap for sharing.
    #[must_use]
    pub fn into_shared(self) -> SharedBacklog {
        Arc::new(Mutex::new(self))
    }

    /// Offer a job. Duplicates of pending work are dropped without error.
    ///
    /// # Errors
    ///
    /// Queue storage failure; the guard is left untouched in that case.
    pub fn enqueue(&mut self, job: Arc<PinJob>) -> Result<EnqueueOutcome, PinError> {
        if self.guard.contains(job.fingerprint()) {
            tracing::debug!(job_id = %job.id(), cid = %job.request().cid, "dropping duplicate pin job");
            return Ok(EnqueueOutcome::Duplicate);
        }

        let lane = Lane::for_job(&job);
        let fingerprint = job.fingerprint().clone();
        self.queue_mut(lane).enqueue(job)?;
        self.guard.insert(fingerprint);
        Ok(EnqueueOutcome::Queued(lane))
    }

    /// Remove the next job: priority head first, then normal head.
    ///
    /// # Errors
    ///
    /// Queue storage failure.
    pub fn pop_next(&mut self) -> Result<Option<Arc<PinJob>>, PinError> {
        let lane = if !self.priority.is_empty() {
            Lane::Priority
        } else if !self.normal.is_empty() {
            Lane::Normal
        } else {
            return Ok(None);
        };
        self.queue_mut(lane).dequeue()
    }

    /// Clear a successfully pinned job's fingerprint.
    pub fn release(&mut self, job: &PinJob) -> bool {
        self.guard.remove(job.fingerprint())
    }

    /// Combined depth of both queues.
    #[must_use]
    pub fn len(&self) -> usize {
        self.priority.len() + self.normal.len()
    }

    /// Whether both queues are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Depth of one queue.
    #[must_use]
    pub fn lane_len(&self, lane: Lane) -> usize {
        match lane {
            Lane::Priority => self.priority.len(),
            Lane::Normal => self.normal.len(),
        }
    }

    /// Fingerprints currently marked as pending.
    #[must_use]
    pub fn guarded(&self) -> usize {
        self.guard.len()
    }

    fn queue_mut(&mut self, lane: Lane) -> &mut dyn JobQueue {
        match lane {
            Lane::Priority => self.priority.as_mut(),
            Lane::Normal => self.normal.as_mut(),
        }
    }
}
