//! Shared FIFO of pending jobs
//!
//! A mutex-guarded deque paired with a condition variable. Workers wait in a
//! predicate loop, so spurious wake-ups and notifications that arrive before
//! the wait are both harmless. The lifecycle state lives under the same lock
//! as the deque: a job can never be accepted after shutdown has drained it.

use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;

/// A unit of work, consumed exactly once by exactly one worker
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// Lifecycle of a worker pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolState {
    /// Accepting work
    Running,
    /// Close requested; workers are being woken and joined
    ShuttingDown,
    /// Every worker has been joined
    Terminated,
}

struct Inner {
    jobs: VecDeque<Job>,
    state: PoolState,
}

pub(crate) struct TaskQueue {
    inner: Mutex<Inner>,
    available: Condvar,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                jobs: VecDeque::new(),
                state: PoolState::Running,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue a batch of jobs under a single lock acquisition.
    ///
    /// Returns the rejected batch if the queue no longer accepts work.
    pub fn push_batch(&self, batch: Vec<Job>) -> Result<(), Vec<Job>> {
        let count = batch.len();
        {
            let mut inner = self.inner.lock();
            if inner.state != PoolState::Running {
                return Err(batch);
            }
            inner.jobs.extend(batch);
        }

        if count == 1 {
            self.available.notify_one();
        } else if count > 1 {
            self.available.notify_all();
        }
        Ok(())
    }

    /// Block until a job is available.
    ///
    /// Returns `None` once shutdown has been requested.
    pub fn pop(&self) -> Option<Job> {
        let mut inner = self.inner.lock();
        loop {
            if inner.state != PoolState::Running {
                return None;
            }
            if let Some(job) = inner.jobs.pop_front() {
                return Some(job);
            }
            self.available.wait(&mut inner);
        }
    }

    /// Stop accepting work and wake every waiting worker.
    ///
    /// Returns the jobs that never started, or `None` if shutdown was already
    /// requested. Callers drop the drained jobs outside the lock.
    pub fn shutdown(&self) -> Option<Vec<Job>> {
        let drained = {
            let mut inner = self.inner.lock();
            if inner.state != PoolState::Running {
                return None;
            }
            inner.state = PoolState::ShuttingDown;
            inner.jobs.drain(..).collect()
        };
        self.available.notify_all();
        Some(drained)
    }

    pub fn mark_terminated(&self) {
        self.inner.lock().state = PoolState::Terminated;
    }

    pub fn state(&self) -> PoolState {
        self.inner.lock().state
    }

    /// Number of jobs waiting for a worker
    pub fn len(&self) -> usize {
        self.inner.lock().jobs.len()
    }
}
