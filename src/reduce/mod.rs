//! Chunk, compute, merge: the skeleton behind every parallel list operation
//!
//! A [`Reduction`] says how to summarise one contiguous chunk, how to combine
//! the per-chunk summaries, and what to return for empty input. The
//! [`PartitionedReducer`] owns everything else: splitting the input, running
//! the chunks on a worker pool, and handing the partials to `merge` in chunk
//! order.
//!
//! The number of chunks is `min(threads, len)`, so `merge` must be
//! associative and give the same answer however the input was split.

pub mod chunks;

pub use chunks::{partition, Chunk};

use crate::config::PoolConfig;
use crate::error::{PoolError, Result};
use crate::interrupt::Interrupt;
use crate::pool::WorkerPool;
use std::sync::Arc;
use tracing::debug;

/// One parallel list algorithm, expressed per chunk
pub trait Reduction<T>: Send + Sync + 'static {
    /// Summary of a single chunk
    type Partial: Send + 'static;
    /// Final result of the whole reduction
    type Output;

    fn compute(&self, chunk: &Chunk<T>) -> anyhow::Result<Self::Partial>;

    /// Combine partials, given in chunk order
    fn merge(&self, partials: Vec<Self::Partial>) -> anyhow::Result<Self::Output>;

    /// Result for an empty input; no chunk is computed in that case
    fn default_result(&self) -> Result<Self::Output>;
}

/// Drives a [`Reduction`] over a worker pool.
///
/// Without a shared pool, every [`run`](Self::run) spawns a private pool
/// sized to its chunk count and joins it before returning, whether the
/// reduction succeeded or not. A shared pool must not be the pool the
/// reducer itself is running on.
#[derive(Debug, Clone, Default)]
pub struct PartitionedReducer {
    pool: Option<Arc<WorkerPool>>,
    interrupt: Option<Interrupt>,
}

impl PartitionedReducer {
    /// Reducer that creates a private pool per call
    pub fn new() -> Self {
        Self::default()
    }

    /// Reducer that runs every call on a long-lived shared pool
    pub fn with_pool(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool: Some(pool),
            interrupt: None,
        }
    }

    /// Abandon waiting for chunks once `interrupt` is triggered
    pub fn interruptible(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = Some(interrupt);
        self
    }

    pub fn run<T, D>(&self, threads: usize, values: Arc<[T]>, reduction: D) -> Result<D::Output>
    where
        T: Send + Sync + 'static,
        D: Reduction<T>,
    {
        if threads == 0 {
            return Err(PoolError::InvalidConfiguration(
                "number of threads must be positive".to_string(),
            ));
        }
        if values.is_empty() {
            return reduction.default_result();
        }

        let chunks: Vec<Chunk<T>> = partition(values.len(), threads)
            .into_iter()
            .map(|range| Chunk::new(Arc::clone(&values), range))
            .collect();

        let reduction = Arc::new(reduction);
        let partials = match &self.pool {
            Some(pool) => self.compute_all(pool, &reduction, chunks)?,
            None => {
                debug!(threads = chunks.len(), "Starting private pool for reduction");
                let config = PoolConfig::new(Some(chunks.len())).thread_name("chunkwise-reduce");
                let pool = WorkerPool::with_config(&config)?;
                // Dropping the pool joins its workers on every path out
                self.compute_all(&pool, &reduction, chunks)?
            }
        };

        reduction.merge(partials).map_err(PoolError::Merge)
    }

    fn compute_all<T, D>(
        &self,
        pool: &WorkerPool,
        reduction: &Arc<D>,
        chunks: Vec<Chunk<T>>,
    ) -> Result<Vec<D::Partial>>
    where
        T: Send + Sync + 'static,
        D: Reduction<T>,
    {
        let reduction = Arc::clone(reduction);
        let compute = move |chunk: Chunk<T>| reduction.compute(&chunk);

        match &self.interrupt {
            Some(interrupt) => pool.try_map_interruptible(compute, chunks, interrupt),
            None => pool.try_map(compute, chunks),
        }
    }
}
