//! Fixed-size pool of pin workers.
//!
//! Every worker is a dedicated OS thread with its own single-threaded tokio
//! runtime, so a slow pin function never blocks the coordinator. All workers
//! receive from one shared dispatch channel; with a zero-capacity channel each
//! handoff reaches exactly one idle worker.
//!
//! # Design
//!
//! - **Competing consumers**: no per-worker queues, the channel load-balances
//! - **Always signal**: a completion is sent after every job, failed or not
//! - **Lock order**: backlog lock, then job lock, never the reverse

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, error, info, warn, Span};

use crate::core::backlog::SharedBacklog;
use crate::core::executor::{PinContext, PinExecutor, Progress, StatusHook};
use crate::core::{PinError, PinJob, PinStatus};

/// Statistics about pool utilization.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of worker threads.
    pub worker_count: usize,
    /// Jobs currently executing.
    pub active_jobs: u64,
    /// Jobs waiting in the backlog.
    pub queued_jobs: u64,
    /// Jobs that reached `pinned`.
    pub pinned_jobs: u64,
    /// Jobs that reached `failed`.
    pub failed_jobs: u64,
}

/// Internal counters for pool statistics (thread-safe).
#[derive(Debug, Default)]
pub(crate) struct PoolCounters {
    pub active_jobs: AtomicU64,
    pub pinned_jobs: AtomicU64,
    pub failed_jobs: AtomicU64,
}

impl PoolCounters {
    /// Get a snapshot of current statistics.
    pub fn snapshot(&self, worker_count: usize, queued_jobs: usize) -> PoolStats {
        PoolStats {
            worker_count,
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            queued_jobs: queued_jobs as u64,
            pinned_jobs: self.pinned_jobs.load(Ordering::Relaxed),
            failed_jobs: self.failed_jobs.load(Ordering::Relaxed),
        }
    }
}

/// Everything a worker needs, shared by all workers of a pool.
#[derive(Clone)]
pub(crate) struct WorkerContext {
    pub dispatch: Receiver<Arc<PinJob>>,
    pub completions: Sender<Arc<PinJob>>,
    pub backlog: SharedBacklog,
    pub executor: Arc<dyn PinExecutor>,
    pub hook: Arc<dyn StatusHook>,
    pub deadline: Duration,
    pub counters: Arc<PoolCounters>,
    pub span: Span,
}

/// Running worker threads.
///
/// There is no shutdown: workers live until the process exits.
pub struct WorkerPool {
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `count` workers.
    pub(crate) fn spawn(
        count: usize,
        stack_size: usize,
        ctx: &WorkerContext,
    ) -> Result<Self, PinError> {
        let workers = (0..count)
            .map(|worker_id| spawn_worker(worker_id, ctx.clone(), stack_size))
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            worker_count = count,
            deadline_ms = u64::try_from(ctx.deadline.as_millis()).unwrap_or(u64::MAX),
            "pin worker pool started"
        );
        Ok(Self { workers })
    }

    /// Number of workers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Whether the pool has no workers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }
}

/// Spawn a worker thread.
///
/// The runtime is built before the thread starts, so a pool never counts a
/// worker that cannot execute jobs.
fn spawn_worker(
    worker_id: usize,
    ctx: WorkerContext,
    stack_size: usize,
) -> Result<JoinHandle<()>, PinError> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PinError::WorkerSpawn(format!("worker {worker_id} runtime: {e}")))?;

    thread::Builder::new()
        .name(format!("pin-worker-{worker_id}"))
        .stack_size(stack_size)
        .spawn(move || {
            let span = tracing::info_span!(parent: &ctx.span, "pin_worker", worker_id);
            let _entered = span.enter();
            debug!("worker thread started");

            // Blocks until the coordinator hands over a job.
            while let Ok(job) = ctx.dispatch.recv() {
                ctx.counters.active_jobs.fetch_add(1, Ordering::Relaxed);
                debug!(job_id = %job.id(), cid = %job.request().cid, "worker executing pin job");

                let outcome = rt.block_on(do_pinning(&ctx, &job));
                ctx.counters.active_jobs.fetch_sub(1, Ordering::Relaxed);
                match outcome {
                    Ok(Outcome::Pinned) => {
                        ctx.counters.pinned_jobs.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(Outcome::Skipped) => {}
                    Err(e) => {
                        ctx.counters.failed_jobs.fetch_add(1, Ordering::Relaxed);
                        error!(job_id = %job.id(), error = %e, "pinning queue error");
                    }
                }

                if ctx.completions.send(job).is_err() {
                    warn!("completion channel closed");
                    break;
                }
            }

            debug!("worker thread exiting");
        })
        .map_err(|e| PinError::WorkerSpawn(e.to_string()))
}

/// How a dispatched job was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// The pin function succeeded and the job is now `pinned`.
    Pinned,
    /// The job was not `queued` when it arrived; nothing was executed.
    Skipped,
}

/// Run one job to a terminal state.
///
/// Returns the execution failure (or the hook failure that happened while
/// reporting it); the job's own state is already final either way. A job that
/// already left `queued` (a finished job submitted again) is skipped.
pub(crate) async fn do_pinning(ctx: &WorkerContext, job: &Arc<PinJob>) -> Result<Outcome, PinError> {
    if !job.begin() {
        warn!(job_id = %job.id(), status = %job.status(), "skipping pin job that is not queued");
        return Ok(Outcome::Skipped);
    }

    let pin_ctx = PinContext {
        job_id: job.id(),
        deadline: tokio::time::Instant::now() + ctx.deadline,
    };
    let progress = Progress::new(Arc::clone(job));
    let pinned = ctx.executor.pin(pin_ctx, Arc::clone(job), progress);

    let err = match tokio::time::timeout(ctx.deadline, pinned).await {
        Ok(Ok(())) => {
            complete(&ctx.backlog, job);
            info!(job_id = %job.id(), cid = %job.request().cid, "pin job pinned");
            return Ok(Outcome::Pinned);
        }
        Ok(Err(e)) => PinError::Execution(format!("{e:#}")),
        Err(_) => PinError::DeadlineExceeded(ctx.deadline),
    };

    job.fail(&err);
    let request = job.request();
    if let Err(hook_err) = ctx
        .hook
        .status_changed(request.container_id, &request.location, PinStatus::Failed)
        .await
    {
        return Err(PinError::StatusHook {
            hook: format!("{hook_err:#}"),
            cause: err.to_string(),
        });
    }
    Err(err)
}

/// Mark the job pinned and release its fingerprint.
pub(crate) fn complete(backlog: &SharedBacklog, job: &PinJob) {
    let mut backlog = backlog.lock();
    if job.mark_pinned() {
        backlog.release(job);
    }
}
