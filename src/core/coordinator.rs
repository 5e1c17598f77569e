//! Dispatch coordinator.
//!
//! [`PinManager`] accepts submissions, keeps one job *staged* ahead of the
//! workers, and parks everything else in the backlog. The loop in
//! [`PinManager::run`] reacts to three event sources with no preference
//! between them:
//!
//! - a submission arrives: it becomes the staged job if the slot is empty,
//!   otherwise it is offered to the backlog (duplicates are dropped);
//! - a worker is ready to take the staged job: it is handed over and the next
//!   backlog entry is staged;
//! - a worker signals completion: if nothing is staged, the next backlog entry
//!   is staged.
//!
//! The staged job is handed over through a zero-capacity channel, so the hot
//! dispatch path never touches the backlog lock.

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Select, Sender};
use tracing::{debug, info, Span};

use crate::config::PinManagerConfig;
use crate::core::backlog::{Backlog, EnqueueOutcome, SharedBacklog};
use crate::core::executor::{NoopStatusHook, PinExecutor, StatusHook};
use crate::core::worker_pool::{PoolCounters, PoolStats, WorkerContext, WorkerPool};
use crate::core::{PinError, PinJob};

/// Capacity of the completion channel.
const COMPLETION_BUFFER: usize = 64;

/// Pin job scheduler: durable backlog, staged slot and worker pool.
pub struct PinManager {
    config: PinManagerConfig,
    backlog: SharedBacklog,
    inbound_tx: Sender<Arc<PinJob>>,
    inbound_rx: Receiver<Arc<PinJob>>,
    dispatch_tx: Sender<Arc<PinJob>>,
    dispatch_rx: Receiver<Arc<PinJob>>,
    complete_tx: Sender<Arc<PinJob>>,
    complete_rx: Receiver<Arc<PinJob>>,
    executor: Arc<dyn PinExecutor>,
    hook: Arc<dyn StatusHook>,
    counters: Arc<PoolCounters>,
    worker_count: AtomicUsize,
    span: Span,
}

impl PinManager {
    /// Create a manager, opening (and recovering) the backlog described by `config`.
    ///
    /// Without a hook, failures are not reported anywhere but the job and the log.
    ///
    /// # Errors
    ///
    /// Invalid configuration, a missing queue directory, or backlog storage that
    /// cannot be opened.
    pub fn new(
        executor: Arc<dyn PinExecutor>,
        hook: Option<Arc<dyn StatusHook>>,
        config: PinManagerConfig,
    ) -> Result<Self, PinError> {
        let span = tracing::info_span!("pin_manager", name = %config.name);
        Self::with_span(executor, hook, config, span)
    }

    /// Like [`PinManager::new`], logging under the given span.
    ///
    /// # Errors
    ///
    /// Same as [`PinManager::new`].
    pub fn with_span(
        executor: Arc<dyn PinExecutor>,
        hook: Option<Arc<dyn StatusHook>>,
        config: PinManagerConfig,
        span: Span,
    ) -> Result<Self, PinError> {
        let backlog = span.in_scope(|| Backlog::open(&config))?.into_shared();
        let (inbound_tx, inbound_rx) = unbounded();
        let (dispatch_tx, dispatch_rx) = bounded(0);
        let (complete_tx, complete_rx) = bounded(COMPLETION_BUFFER);

        Ok(Self {
            config,
            backlog,
            inbound_tx,
            inbound_rx,
            dispatch_tx,
            dispatch_rx,
            complete_tx,
            complete_rx,
            executor,
            hook: hook.unwrap_or_else(|| Arc::new(NoopStatusHook)),
            counters: Arc::new(PoolCounters::default()),
            worker_count: AtomicUsize::new(0),
            span,
        })
    }

    /// Submit a job. Never blocks and never reports back; duplicates of
    /// pending backlog work are dropped silently.
    pub fn submit(&self, job: Arc<PinJob>) {
        if self.inbound_tx.send(job).is_err() {
            // unreachable while `self` holds the receiver
            tracing::warn!(parent: &self.span, "inbound channel closed, submission lost");
        }
    }

    /// Combined length of both backlog queues.
    ///
    /// Excludes the staged job and jobs executing in workers.
    #[must_use]
    pub fn queue_size(&self) -> usize {
        self.backlog.lock().len()
    }

    /// Configured per-user limit. Stored only; dispatch does not enforce it.
    #[must_use]
    pub const fn max_active_per_user(&self) -> usize {
        self.config.max_active_per_user
    }

    /// Configuration the manager was built with.
    #[must_use]
    pub const fn config(&self) -> &PinManagerConfig {
        &self.config
    }

    /// Snapshot of worker and backlog counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        self.counters
            .snapshot(self.worker_count.load(Ordering::Relaxed), self.queue_size())
    }

    /// Start `workers` workers, then run the dispatch loop forever.
    ///
    /// # Errors
    ///
    /// Returns only on an unrecoverable failure: a worker thread that cannot be
    /// spawned or backlog storage that stops working.
    pub fn run(&self, workers: usize) -> Result<Infallible, PinError> {
        let _entered = self.span.enter();
        let pool = WorkerPool::spawn(workers, self.config.worker_stack_size, &self.worker_context())?;
        self.worker_count.store(pool.len(), Ordering::Relaxed);
        info!(workers = pool.len(), queued = self.queue_size(), "pin dispatch loop started");

        let mut staged = self.backlog.lock().pop_next()?;
        loop {
            staged = self.step(staged)?;
        }
    }

    /// Run the dispatch loop on a dedicated thread.
    ///
    /// # Errors
    ///
    /// The coordinator thread could not be spawned.
    pub fn spawn(self: &Arc<Self>, workers: usize) -> Result<JoinHandle<Result<Infallible, PinError>>, PinError> {
        let manager = Arc::clone(self);
        thread::Builder::new()
            .name("pin-coordinator".into())
            .spawn(move || {
                let result = manager.run(workers);
                if let Err(e) = &result {
                    tracing::error!(parent: &manager.span, error = %e, "pin dispatch loop stopped");
                }
                result
            })
            .map_err(|e| PinError::WorkerSpawn(e.to_string()))
    }

    /// Wait for one event and return the new staged job.
    fn step(&self, mut staged: Option<Arc<PinJob>>) -> Result<Option<Arc<PinJob>>, PinError> {
        let mut sel = Select::new();
        let inbound = sel.recv(&self.inbound_rx);
        let completed = sel.recv(&self.complete_rx);
        // dispatch is only armed while a job is staged
        let dispatch = staged.as_ref().map(|_| sel.send(&self.dispatch_tx));

        let oper = sel.select();
        let index = oper.index();
        if index == inbound {
            let job = oper
                .recv(&self.inbound_rx)
                .map_err(|_| PinError::ChannelClosed("inbound"))?;
            if staged.is_none() {
                debug!(job_id = %job.id(), "staging submitted pin job");
                return Ok(Some(job));
            }
            let job_id = job.id();
            match self.backlog.lock().enqueue(job)? {
                EnqueueOutcome::Queued(lane) => {
                    debug!(job_id = %job_id, lane = %lane, "pin job queued");
                }
                EnqueueOutcome::Duplicate => {}
            }
        } else if index == completed {
            let job = oper
                .recv(&self.complete_rx)
                .map_err(|_| PinError::ChannelClosed("completion"))?;
            debug!(job_id = %job.id(), status = %job.status(), "pin job completed");
            if staged.is_none() {
                staged = self.backlog.lock().pop_next()?;
            }
        } else if let (Some(job), Some(_)) = (staged.take(), dispatch) {
            let job_id = job.id();
            oper.send(&self.dispatch_tx, job)
                .map_err(|_| PinError::ChannelClosed("dispatch"))?;
            debug!(job_id = %job_id, "pin job dispatched");
            staged = self.backlog.lock().pop_next()?;
        }
        Ok(staged)
    }

    fn worker_context(&self) -> WorkerContext {
        WorkerContext {
            dispatch: self.dispatch_rx.clone(),
            completions: self.complete_tx.clone(),
            backlog: Arc::clone(&self.backlog),
            executor: Arc::clone(&self.executor),
            hook: Arc::clone(&self.hook),
            deadline: self.config.max_pin_duration(),
            counters: Arc::clone(&self.counters),
            span: self.span.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QueueBackendConfig;
    use crate::core::executor::{PinContext, Progress};
    use crate::core::{AppResult, PinRequest, PinStatus};
    use async_trait::async_trait;
    use std::time::{Duration, Instant};

    struct Succeed;

    #[async_trait]
    impl PinExecutor for Succeed {
        async fn pin(&self, _ctx: PinContext, _job: Arc<PinJob>, _progress: Progress) -> AppResult<()> {
            Ok(())
        }
    }

    fn manager() -> Arc<PinManager> {
        let config = PinManagerConfig::new().with_queue_backend(QueueBackendConfig::InMemory);
        Arc::new(PinManager::new(Arc::new(Succeed), None, config).unwrap())
    }

    fn job(name: &str, user_id: u64) -> Arc<PinJob> {
        PinJob::shared(PinRequest {
            cid: format!("bafy-{name}"),
            name: name.into(),
            user_id,
            ..PinRequest::default()
        })
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        cond()
    }

    #[test]
    fn test_step_stages_first_submission() {
        let mgr = manager();
        let first = job("a", 3);
        mgr.submit(Arc::clone(&first));

        let staged = mgr.step(None).unwrap().unwrap();
        assert!(Arc::ptr_eq(&staged, &first));
        assert_eq!(mgr.queue_size(), 0);
    }

    #[test]
    fn test_step_backlogs_while_staged() {
        let mgr = manager();
        let staged = job("staged", 0);
        mgr.submit(job("b", 3));

        // no workers: dispatch can never fire, the submission must be taken
        let still = mgr.step(Some(Arc::clone(&staged))).unwrap().unwrap();
        assert!(Arc::ptr_eq(&still, &staged));
        assert_eq!(mgr.queue_size(), 1);
    }

    #[test]
    fn test_completion_restages_from_backlog() {
        let mgr = manager();
        mgr.backlog.lock().enqueue(job("queued", 0)).unwrap();
        mgr.complete_tx.send(job("done", 0)).unwrap();

        let staged = mgr.step(None).unwrap().unwrap();
        assert_eq!(staged.request().name, "queued");
        assert_eq!(mgr.queue_size(), 0);
    }

    #[test]
    fn test_run_drains_backlog() {
        let mgr = manager();
        let jobs: Vec<_> = (0..6).map(|i| job(&format!("j{i}"), i % 2)).collect();
        for j in &jobs {
            mgr.submit(Arc::clone(j));
        }
        let _handle = mgr.spawn(2).unwrap();

        assert!(wait_until(|| jobs.iter().all(|j| j.status() == PinStatus::Pinned)));
        assert_eq!(mgr.queue_size(), 0);
        let stats = mgr.stats();
        assert_eq!(stats.worker_count, 2);
        assert_eq!(stats.pinned_jobs, 6);
        assert_eq!(stats.failed_jobs, 0);
    }
}
