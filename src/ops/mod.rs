//! Parallel list operations built on [`PartitionedReducer`]
//!
//! Every operation takes the number of threads to split the work across,
//! the input values, and the predicate, comparator or transform it needs.
//! Inputs are accepted as anything convertible into `Arc<[T]>` (a `Vec<T>`
//! moves without copying; a slice is cloned once) so that chunks can be
//! handed to pool threads.

pub mod reductions;

use crate::error::Result;
use crate::interrupt::Interrupt;
use crate::pool::WorkerPool;
use crate::reduce::{PartitionedReducer, Reduction};
use reductions::{Count, Extremum, Filter, FindAny, Join, MapEach};
use std::cmp::Ordering;
use std::fmt::Display;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct ParallelOps {
    reducer: PartitionedReducer,
}

impl ParallelOps {
    /// Operations that spawn a private pool per call
    pub fn new() -> Self {
        Self::default()
    }

    /// Operations that share one long-lived pool
    pub fn with_pool(pool: Arc<WorkerPool>) -> Self {
        Self {
            reducer: PartitionedReducer::with_pool(pool),
        }
    }

    pub fn interruptible(self, interrupt: Interrupt) -> Self {
        Self {
            reducer: self.reducer.interruptible(interrupt),
        }
    }

    /// Greatest value under `compare`. Fails with `NoSuchElement` when empty.
    pub fn maximum<T, C>(&self, threads: usize, values: impl Into<Arc<[T]>>, compare: C) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.reducer.run(threads, values.into(), Extremum::new(compare))
    }

    /// Least value under `compare`. Fails with `NoSuchElement` when empty.
    pub fn minimum<T, C>(&self, threads: usize, values: impl Into<Arc<[T]>>, compare: C) -> Result<T>
    where
        T: Clone + Send + Sync + 'static,
        C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.maximum(threads, values, move |a: &T, b: &T| compare(b, a))
    }

    pub fn any<T, P>(&self, threads: usize, values: impl Into<Arc<[T]>>, predicate: P) -> Result<bool>
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Ok(self.find_any(threads, values, predicate)?.is_some())
    }

    pub fn all<T, P>(&self, threads: usize, values: impl Into<Arc<[T]>>, predicate: P) -> Result<bool>
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Ok(!self.any(threads, values, move |v: &T| !predicate(v))?)
    }

    /// Index of some value matching `predicate`, not necessarily the first
    pub fn find_any<T, P>(
        &self,
        threads: usize,
        values: impl Into<Arc<[T]>>,
        predicate: P,
    ) -> Result<Option<usize>>
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.reducer.run(threads, values.into(), FindAny::new(predicate))
    }

    pub fn count<T, P>(&self, threads: usize, values: impl Into<Arc<[T]>>, predicate: P) -> Result<usize>
    where
        T: Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.reducer.run(threads, values.into(), Count::new(predicate))
    }

    /// Values matching `predicate`, in input order
    pub fn filter<T, P>(&self, threads: usize, values: impl Into<Arc<[T]>>, predicate: P) -> Result<Vec<T>>
    where
        T: Clone + Send + Sync + 'static,
        P: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.reducer.run(threads, values.into(), Filter::new(predicate))
    }

    /// `f` applied to every value, in input order
    pub fn map<T, U, F>(&self, threads: usize, values: impl Into<Arc<[T]>>, f: F) -> Result<Vec<U>>
    where
        T: Send + Sync + 'static,
        U: Send + 'static,
        F: Fn(&T) -> U + Send + Sync + 'static,
    {
        self.reducer.run(threads, values.into(), MapEach::new(f))
    }

    /// Display forms of every value, concatenated without separators
    pub fn join<T>(&self, threads: usize, values: impl Into<Arc<[T]>>) -> Result<String>
    where
        T: Display + Send + Sync + 'static,
    {
        self.reducer.run(threads, values.into(), Join)
    }

    /// Run a caller-defined reduction on the same chunking and pool
    pub fn reduce<T, D>(&self, threads: usize, values: impl Into<Arc<[T]>>, reduction: D) -> Result<D::Output>
    where
        T: Send + Sync + 'static,
        D: Reduction<T>,
    {
        self.reducer.run(threads, values.into(), reduction)
    }
}
