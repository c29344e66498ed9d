//! Worker threads of a [`WorkerPool`](super::WorkerPool)

use super::queue::TaskQueue;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, trace, warn};

/// A pool thread pulling jobs off the shared queue
pub(crate) struct Worker {
    id: usize,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    /// Start a worker that adds one to `executed` per finished job
    pub fn spawn(
        id: usize,
        name_prefix: &str,
        queue: Arc<TaskQueue>,
        executed: Arc<AtomicU64>,
    ) -> std::io::Result<Self> {
        let handle = thread::Builder::new()
            .name(format!("{}-{}", name_prefix, id))
            .spawn(move || worker_loop(id, queue, executed))?;

        Ok(Self {
            id,
            handle: Some(handle),
        })
    }

    /// Wait for the thread to exit. Safe to call more than once.
    pub fn join(&mut self) {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!(worker = self.id, "Worker thread panicked");
            }
        }
    }
}

fn worker_loop(id: usize, queue: Arc<TaskQueue>, executed: Arc<AtomicU64>) {
    debug!(worker = id, "Worker started");

    let mut ran = 0u64;
    // Jobs catch their own panics, so a job never takes the worker down
    while let Some(job) = queue.pop() {
        trace!(worker = id, "Running job");
        job();
        ran += 1;
        executed.fetch_add(1, Ordering::Relaxed);
    }

    debug!(worker = id, executed = ran, "Worker exiting");
}
