//! # Pin Scheduler
//!
//! A durable, priority-aware scheduling and dispatch engine for pin jobs.
//!
//! Producers submit requests to fetch and pin content; the scheduler holds them
//! in a backlog that survives restarts, hands them to a fixed pool of workers,
//! tracks each job's status and progress, and reports failures to a status hook.
//!
//! ## Core Problem Solved
//!
//! Pinning is slow, bursty and I/O-bound:
//!
//! - **Unbounded submission**: producers must never block, however busy the workers are
//! - **Fixed capacity**: only `N` pins may run at once
//! - **System work first**: system-owned and limiter-bypassing jobs jump the line
//! - **Duplicate requests**: identical work already waiting is not queued twice
//! - **Failures are local**: one failed or stuck pin never stalls the pipeline
//!
//! ## Key Features
//!
//! - **Staged dispatch**: one job is always staged ahead of the workers, so handoff
//!   is a lock-free channel rendezvous
//! - **Durable Backlog**: priority and normal FIFO queues persisted as JSON lines
//! - **Duplicate Guard**: fingerprint set updated atomically with the backlog
//! - **Worker Threads**: dedicated OS threads, each with its own tokio runtime
//! - **Deadlines**: every pin is abandoned after at most 24 hours
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use pin_scheduler::builders::PinManagerBuilder;
//! use pin_scheduler::config::PinManagerConfig;
//! use pin_scheduler::core::{PinJob, PinRequest};
//!
//! let manager = Arc::new(
//!     PinManagerBuilder::new(Arc::new(my_pinner))
//!         .status_hook(Arc::new(my_status_writer))
//!         .config(PinManagerConfig::new().with_queue_data_dir("/var/lib/pinner/queue"))
//!         .build()?,
//! );
//! manager.spawn(8)?;
//!
//! let job = PinJob::shared(PinRequest {
//!     cid: "bafybeigdyrzt5sfp7udm7hu76uh7y26nf3efuylqabf3oclgtqy55fbzdi".into(),
//!     name: "dataset.car".into(),
//!     user_id: 42,
//!     container_id: 1001,
//!     ..PinRequest::default()
//! });
//! manager.submit(Arc::clone(&job));
//! println!("{} jobs waiting", manager.queue_size());
//! ```
//!
//! For complete scenarios, see `tests/coordinator_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Builders to construct scheduler components from configuration.
pub mod builders;
/// Configuration models for the manager and backlog storage.
pub mod config;
/// Core scheduling abstractions: jobs, backlog, workers, coordinator.
pub mod core;
/// Backlog storage backends.
pub mod infra;
/// Shared utilities.
pub mod util;

pub use crate::core::{PinError, PinJob, PinManager, PinRequest, PinStatus};
