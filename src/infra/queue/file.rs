//! File-backed FIFO queue.
//!
//! Each queue is one JSON-lines file under a fixed directory. Enqueue appends a
//! record, dequeue rewrites the remaining tail, and opening the queue replays
//! the file, so work queued before a restart is picked up again as long as the
//! directory is reused.

use std::collections::VecDeque;
use std::fs::{create_dir_all, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{JobQueue, JobRecord, PinError, PinJob};

/// File-backed queue using JSON lines for durability.
pub struct FileQueue {
    path: PathBuf,
    stream: String,
    jobs: VecDeque<Arc<PinJob>>,
}

impl FileQueue {
    /// Open (or create) the queue `stream` under `path`, replaying persisted entries.
    ///
    /// # Errors
    ///
    /// Fails if the directory cannot be created or the file cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>, stream: impl Into<String>) -> Result<Self, PinError> {
        let path = path.as_ref().to_path_buf();
        let stream = stream.into();
        create_dir_all(&path)?;
        let mut queue = Self {
            path,
            stream,
            jobs: VecDeque::new(),
        };
        queue.load_from_disk()?;
        Ok(queue)
    }

    /// Location of the backing file.
    #[must_use]
    pub fn file_path(&self) -> PathBuf {
        self.path.join(format!("{}.jsonl", self.stream))
    }

    fn load_from_disk(&mut self) -> Result<(), PinError> {
        let file_path = self.file_path();
        if !file_path.exists() {
            return Ok(());
        }
        let file = OpenOptions::new().read(true).open(&file_path)?;
        let reader = BufReader::new(file);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: JobRecord = serde_json::from_str(&line)?;
            self.jobs.push_back(Arc::new(PinJob::from_record(record)));
        }
        if !self.jobs.is_empty() {
            tracing::info!(
                queue = %self.stream,
                recovered = self.jobs.len(),
                "recovered persisted pin jobs"
            );
        }
        Ok(())
    }

    fn append_to_disk(&self, job: &PinJob) -> Result<(), PinError> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.file_path())?;
        let line = serde_json::to_string(&job.record())?;
        writeln!(file, "{line}")?;
        Ok(())
    }

    /// Rewrite the file with every job after the first `skip`.
    ///
    /// Each dequeue rewrites the whole tail, so draining `n` jobs costs
    /// O(n^2) bytes written; backlogs are expected to stay small.
    fn rewrite_disk(&self, skip: usize) -> Result<(), PinError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.file_path())?;
        let mut writer = BufWriter::new(file);
        for job in self.jobs.iter().skip(skip) {
            serde_json::to_writer(&mut writer, &job.record())?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl JobQueue for FileQueue {
    fn enqueue(&mut self, job: Arc<PinJob>) -> Result<(), PinError> {
        self.append_to_disk(&job)?;
        self.jobs.push_back(job);
        Ok(())
    }

    fn dequeue(&mut self) -> Result<Option<Arc<PinJob>>, PinError> {
        if self.jobs.is_empty() {
            return Ok(None);
        }
        // the head stays in memory until the file no longer holds it
        self.rewrite_disk(1)?;
        Ok(self.jobs.pop_front())
    }

    fn pending(&self) -> Vec<Arc<PinJob>> {
        self.jobs.iter().cloned().collect()
    }

    fn len(&self) -> usize {
        self.jobs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::PinRequest;

    fn scratch_dir() -> PathBuf {
        std::env::temp_dir().join(format!("pin-file-queue-{}", uuid::Uuid::new_v4()))
    }

    fn job(name: &str) -> Arc<PinJob> {
        PinJob::shared(PinRequest {
            cid: format!("bafy-{name}"),
            name: name.into(),
            user_id: 9,
            ..PinRequest::default()
        })
    }

    #[test]
    fn test_fifo_order() {
        let dir = scratch_dir();
        let mut q = FileQueue::open(&dir, "normal").unwrap();
        for name in ["a", "b", "c"] {
            q.enqueue(job(name)).unwrap();
        }

        let names: Vec<String> = std::iter::from_fn(|| q.dequeue().unwrap())
            .map(|j| j.request().name.clone())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(q.is_empty());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_reopen_recovers_remaining_jobs() {
        let dir = scratch_dir();
        let first = job("a");
        {
            let mut q = FileQueue::open(&dir, "priority").unwrap();
            q.enqueue(Arc::clone(&first)).unwrap();
            q.enqueue(job("b")).unwrap();
            q.enqueue(job("c")).unwrap();
            let head = q.dequeue().unwrap().unwrap();
            assert!(Arc::ptr_eq(&head, &first));
        }

        let mut reopened = FileQueue::open(&dir, "priority").unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.dequeue().unwrap().unwrap().request().name, "b");
        assert_eq!(reopened.dequeue().unwrap().unwrap().request().name, "c");
        assert!(reopened.dequeue().unwrap().is_none());
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = scratch_dir();
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("normal.jsonl"), "not json\n").unwrap();

        let err = FileQueue::open(&dir, "normal").err().unwrap();
        assert!(matches!(err, PinError::Serialization(_)));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_failed_rewrite_keeps_head() {
        let dir = scratch_dir();
        let mut q = FileQueue::open(&dir, "normal").unwrap();
        q.enqueue(job("a")).unwrap();
        q.enqueue(job("b")).unwrap();

        // a directory in place of the file makes the rewrite fail
        std::fs::remove_file(q.file_path()).unwrap();
        std::fs::create_dir(q.file_path()).unwrap();
        assert!(matches!(q.dequeue(), Err(PinError::Io(_))));
        assert_eq!(q.len(), 2);

        std::fs::remove_dir(q.file_path()).unwrap();
        assert_eq!(q.dequeue().unwrap().unwrap().request().name, "a");
        let reopened = FileQueue::open(&dir, "normal").unwrap();
        assert_eq!(reopened.len(), 1);
        assert_eq!(reopened.pending()[0].request().name, "b");
        let _ = std::fs::remove_dir_all(dir);
    }
}
