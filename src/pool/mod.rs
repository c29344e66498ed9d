//! Fixed-size worker pool with an order-preserving parallel map
//!
//! A [`WorkerPool`] owns a set of OS threads that all pull jobs from one
//! shared queue. Its only operation besides shutdown is mapping a
//! function over a sequence: one job per element, results returned in input
//! order once every job has reported back.
//!
//! Completion is collected over a per-call channel. Every job sends exactly
//! one `(index, outcome)` message, so the submitter's wait is a counted
//! receive loop; a job that is dropped without running (pool closed under
//! it) drops its sender instead, which the submitter sees as a disconnect.

mod queue;
mod worker;

pub use queue::PoolState;

use crate::config::PoolConfig;
use crate::error::{PoolError, Result, TaskError, TaskFailure};
use crate::interrupt::Interrupt;
use crossbeam_channel::{never, select, unbounded, Receiver};
use parking_lot::Mutex;
use queue::{Job, TaskQueue};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};
use worker::Worker;

type Outcome<R> = std::result::Result<R, TaskError>;

/// A fixed number of worker threads executing submitted map calls.
///
/// One pool can serve any number of map calls, from any number of threads,
/// for its whole lifetime. Dropping the pool closes it.
///
/// # Reentrancy
///
/// Do not call `map` on a pool from inside a function already running on
/// that same pool. With every worker blocked waiting for jobs queued behind
/// it, the pool deadlocks. Nested work should use a separate pool.
pub struct WorkerPool {
    queue: Arc<TaskQueue>,
    workers: Mutex<Vec<Worker>>,
    executed: Arc<AtomicU64>,
    threads: usize,
}

impl WorkerPool {
    /// Spawn a pool of `threads` workers.
    ///
    /// Fails with [`PoolError::InvalidConfiguration`] if `threads` is zero.
    pub fn new(threads: usize) -> Result<Self> {
        Self::with_config(&PoolConfig::new(Some(threads)))
    }

    pub fn with_config(config: &PoolConfig) -> Result<Self> {
        let threads = config.resolved_threads();
        if threads == 0 {
            return Err(PoolError::InvalidConfiguration(
                "number of threads must be positive".to_string(),
            ));
        }

        let queue = Arc::new(TaskQueue::new());
        let executed = Arc::new(AtomicU64::new(0));
        let mut workers = Vec::with_capacity(threads);
        for id in 0..threads {
            let spawned = Worker::spawn(
                id,
                config.name_prefix(),
                Arc::clone(&queue),
                Arc::clone(&executed),
            );
            match spawned {
                Ok(worker) => workers.push(worker),
                Err(e) => {
                    // Leave nothing running behind a failed construction
                    queue.shutdown();
                    for worker in workers.iter_mut() {
                        worker.join();
                    }
                    return Err(PoolError::Spawn(e));
                }
            }
        }

        debug!(threads, prefix = config.name_prefix(), "Worker pool started");

        Ok(Self {
            queue,
            workers: Mutex::new(workers),
            executed,
            threads,
        })
    }

    /// Number of worker threads
    pub fn threads(&self) -> usize {
        self.threads
    }

    pub fn state(&self) -> PoolState {
        self.queue.state()
    }

    /// Total jobs run by all workers so far
    ///
    /// Never blocks, not even while the pool is closing.
    pub fn executed(&self) -> u64 {
        self.executed.load(Ordering::Relaxed)
    }

    /// Apply `f` to every input in parallel, preserving order.
    ///
    /// A panic inside `f` fails the call with a [`TaskFailure`]; see
    /// [`try_map`](Self::try_map) for how failures are aggregated.
    pub fn map<T, R, F>(&self, f: F, inputs: Vec<T>) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> R + Send + Sync + 'static,
    {
        self.dispatch(move |input| Ok(f(input)), inputs, None)
    }

    /// Apply a fallible `f` to every input in parallel, preserving order.
    ///
    /// Blocks until every task has finished, successfully or not. If any
    /// failed, the first failure received is returned with every later one
    /// attached as suppressed. Tasks already running are never aborted.
    pub fn try_map<T, R, E, F>(&self, f: F, inputs: Vec<T>) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Into<anyhow::Error>,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.dispatch(
            move |input| f(input).map_err(|e| TaskError::Failed(e.into())),
            inputs,
            None,
        )
    }

    /// Like [`try_map`](Self::try_map), but returns
    /// [`PoolError::Interrupted`] as soon as `interrupt` is triggered.
    ///
    /// Jobs of the abandoned call that have not started yet are skipped;
    /// jobs already running finish and their results are discarded.
    pub fn try_map_interruptible<T, R, E, F>(
        &self,
        f: F,
        inputs: Vec<T>,
        interrupt: &Interrupt,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        E: Into<anyhow::Error>,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.dispatch(
            move |input| f(input).map_err(|e| TaskError::Failed(e.into())),
            inputs,
            Some(interrupt),
        )
    }

    fn dispatch<T, R, F>(
        &self,
        f: F,
        inputs: Vec<T>,
        interrupt: Option<&Interrupt>,
    ) -> Result<Vec<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Outcome<R> + Send + Sync + 'static,
    {
        if self.queue.state() != PoolState::Running {
            return Err(PoolError::ShutDown);
        }
        if interrupt.is_some_and(Interrupt::is_triggered) {
            return Err(PoolError::Interrupted);
        }
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let count = inputs.len();
        let f = Arc::new(f);
        let abandoned = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded::<(usize, Outcome<R>)>();

        let jobs: Vec<Job> = inputs
            .into_iter()
            .enumerate()
            .map(|(index, input)| {
                let f = Arc::clone(&f);
                let tx = tx.clone();
                let abandoned = Arc::clone(&abandoned);
                Box::new(move || {
                    if abandoned.load(Ordering::Acquire) {
                        return;
                    }
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(input)))
                        .unwrap_or_else(|payload| Err(TaskError::from_panic(payload)));
                    // The submitter may have been interrupted and gone away
                    let _ = tx.send((index, outcome));
                }) as Job
            })
            .collect();
        drop(tx);

        self.queue
            .push_batch(jobs)
            .map_err(|_rejected| PoolError::ShutDown)?;
        debug!(tasks = count, "Dispatched map call");

        let collected = collect(&rx, count, interrupt);
        if collected.is_err() {
            abandoned.store(true, Ordering::Release);
        }
        collected
    }

    /// Stop the pool and join every worker thread.
    ///
    /// Jobs still queued are dropped; map calls waiting on them fail with
    /// [`PoolError::ShutDown`]. Calling `close` again, or concurrently from
    /// another thread, returns only once every worker has exited.
    ///
    /// Must not be called from one of this pool's own jobs.
    pub fn close(&self) {
        if let Some(drained) = self.queue.shutdown() {
            debug!(
                threads = self.threads,
                dropped = drained.len(),
                "Shutting down worker pool"
            );
            drop(drained);
        }

        let mut workers = self.workers.lock();
        for worker in workers.iter_mut() {
            worker.join();
        }
        self.queue.mark_terminated();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("threads", &self.threads)
            .field("state", &self.state())
            .field("pending", &self.queue.len())
            .finish()
    }
}

/// Wait for `count` completions, filling result slots by index
fn collect<R>(
    rx: &Receiver<(usize, Outcome<R>)>,
    count: usize,
    interrupt: Option<&Interrupt>,
) -> Result<Vec<R>> {
    let idle = never();
    let signal = interrupt.map_or(&idle, Interrupt::signal);

    let mut slots: Vec<Option<R>> = (0..count).map(|_| None).collect();
    let mut first_failure: Option<TaskFailure> = None;
    let mut completed = 0;

    while completed < count {
        select! {
            recv(rx) -> message => match message {
                Ok((index, Ok(value))) => slots[index] = Some(value),
                Ok((index, Err(error))) => {
                    warn!(task = index, error = %error, "Task failed");
                    let failure = TaskFailure::new(index, error);
                    match first_failure.as_mut() {
                        Some(primary) => primary.add_suppressed(failure),
                        None => first_failure = Some(failure),
                    }
                }
                Err(_) => {
                    debug!(completed, count, "Pool closed while waiting for tasks");
                    return Err(PoolError::ShutDown);
                }
            },
            recv(signal) -> _ => {
                debug!(completed, count, "Map call interrupted");
                return Err(PoolError::Interrupted);
            }
        }
        completed += 1;
    }

    if let Some(failure) = first_failure {
        return Err(failure.into());
    }

    let results: Vec<R> = slots.into_iter().flatten().collect();
    debug_assert_eq!(results.len(), count);
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_threads_rejected() {
        let err = WorkerPool::new(0).unwrap_err();
        assert!(matches!(err, PoolError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_thread_names_use_prefix() {
        let config = PoolConfig::new(Some(2)).thread_name("mapper");
        let pool = WorkerPool::with_config(&config).unwrap();
        let names = pool
            .map(
                |_: u8| std::thread::current().name().map(str::to_string),
                vec![0; 8],
            )
            .unwrap();
        assert!(names
            .iter()
            .all(|n| n.as_deref().is_some_and(|n| n.starts_with("mapper-"))));
    }

    #[test]
    fn test_state_transitions() {
        let pool = WorkerPool::new(2).unwrap();
        assert_eq!(pool.state(), PoolState::Running);
        pool.close();
        assert_eq!(pool.state(), PoolState::Terminated);
    }

    #[test]
    fn test_every_job_runs_once() {
        let pool = WorkerPool::new(3).unwrap();
        pool.map(|x: u32| x, (0..50).collect()).unwrap();
        pool.map(|x: u32| x, (0..25).collect()).unwrap();
        // Counters settle once the workers are joined
        pool.close();
        assert_eq!(pool.executed(), 75);
    }

    #[test]
    fn test_executed_readable_from_job_during_close() {
        let pool = Arc::new(WorkerPool::new(1).unwrap());
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);

        let runner = Arc::clone(&pool);
        let observer = Arc::clone(&pool);
        let submitter = std::thread::spawn(move || {
            runner.map(
                move |_: u8| {
                    let _ = started_tx.send(());
                    std::thread::sleep(std::time::Duration::from_millis(100));
                    observer.executed()
                },
                vec![0],
            )
        });

        started_rx.recv().unwrap();
        // Joins the worker while its job is still reading the counter
        pool.close();

        let seen = submitter.join().unwrap().unwrap();
        assert_eq!(seen, vec![0]);
        assert_eq!(pool.executed(), 1);
    }
}
