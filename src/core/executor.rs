//! Collaborator traits: the pin function and the status-change hook.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::Instant;
use uuid::Uuid;

use super::{AppResult, PinJob, PinStatus};

/// Execution context handed to the pin function.
#[derive(Debug, Clone, Copy)]
pub struct PinContext {
    /// Job being executed.
    pub job_id: Uuid,
    /// Instant after which the execution is abandoned and the job failed.
    pub deadline: Instant,
}

/// Progress reporter for one job.
///
/// Cheap to clone and safe to call from several threads at once; every call
/// counts as one fetched item and adds `bytes` to the job's total.
#[derive(Debug, Clone)]
pub struct Progress {
    job: Arc<PinJob>,
}

impl Progress {
    pub(crate) const fn new(job: Arc<PinJob>) -> Self {
        Self { job }
    }

    /// Report `bytes` more fetched.
    pub fn report(&self, bytes: u64) {
        self.job.record_progress(bytes);
    }
}

/// Fetches and pins the content a job names.
///
/// Implementations are called once per dispatched job, from a worker thread
/// running its own single-threaded tokio runtime. The future is dropped when
/// the context deadline passes.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use pin_scheduler::core::{AppResult, PinContext, PinExecutor, PinJob, Progress};
///
/// #[derive(Clone)]
/// struct IpfsPinner;
///
/// #[async_trait]
/// impl PinExecutor for IpfsPinner {
///     async fn pin(&self, _ctx: PinContext, job: Arc<PinJob>, progress: Progress) -> AppResult<()> {
///         for block in fetch_dag(&job.request().cid).await? {
///             progress.report(block.len() as u64);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait PinExecutor: Send + Sync + 'static {
    /// Execute the pin. An error fails the job.
    async fn pin(&self, ctx: PinContext, job: Arc<PinJob>, progress: Progress) -> AppResult<()>;
}

/// Notified when a job fails.
#[async_trait]
pub trait StatusHook: Send + Sync + 'static {
    /// Record a status change for the job's container at `location`.
    async fn status_changed(
        &self,
        container_id: u64,
        location: &str,
        status: PinStatus,
    ) -> AppResult<()>;
}

/// Hook that accepts every notification and does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStatusHook;

#[async_trait]
impl StatusHook for NoopStatusHook {
    async fn status_changed(
        &self,
        _container_id: u64,
        _location: &str,
        _status: PinStatus,
    ) -> AppResult<()> {
        Ok(())
    }
}
