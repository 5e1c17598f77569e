//! In-memory FIFO queue.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::core::{JobQueue, PinError, PinJob};

/// Non-durable queue for tests and embedded use.
#[derive(Debug, Default)]
pub struct MemoryQueue {
    jobs: VecDeque<Arc<PinJob>>,
}

impl MemoryQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobQueue for MemoryQueue {
    fn enqueue(&mut self, job: Arc<PinJob>) -> Result<(), PinError> {
        self.jobs.push_back(job);
        Ok(())
    }

    fn dequeue(&mut self) -> Result<Option<Arc<PinJob>>, PinError> {
        Ok(self.jobs.pop_front())
    }

    fn pending(&self) -> Vec<Arc<PinJob>> {
        self.jobs.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.jobs.len()
    }
}
