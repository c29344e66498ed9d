//! chunkwise - a fixed-size worker pool and the parallel list operations
//! built on it.
//!
//! [`WorkerPool`] maps a function over a sequence on its worker threads and
//! returns the results in input order. [`ParallelOps`] splits a list into
//! contiguous chunks, computes one partial result per chunk on a pool, and
//! merges the partials: maximum, minimum, any, all, count, filter, map and
//! join are all expressed that way through [`PartitionedReducer`].
//!
//! ```no_run
//! use chunkwise::ParallelOps;
//!
//! let ops = ParallelOps::new();
//! let max = ops.maximum(4, vec![3i64, 1, 4, 1, 5, 9, 2, 6], |a: &i64, b: &i64| a.cmp(b))?;
//! assert_eq!(max, 9);
//! # Ok::<(), chunkwise::PoolError>(())
//! ```

pub mod config;
pub mod error;
pub mod interrupt;
pub mod ops;
pub mod pool;
pub mod reduce;

pub use config::PoolConfig;
pub use error::{PoolError, Result, TaskError, TaskFailure};
pub use interrupt::Interrupt;
pub use ops::ParallelOps;
pub use pool::{PoolState, WorkerPool};
pub use reduce::{Chunk, PartitionedReducer, Reduction};
