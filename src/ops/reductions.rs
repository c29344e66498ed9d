//! Per-chunk halves of the list operations in [`ParallelOps`](super::ParallelOps)

use crate::error::{PoolError, Result};
use crate::reduce::{Chunk, Reduction};
use std::cmp::Ordering;
use std::fmt::{Display, Write};
use std::sync::atomic::{AtomicBool, Ordering as MemOrdering};

/// Greatest element under `compare`; ties keep the earlier element
pub struct Extremum<C> {
    compare: C,
}

impl<C> Extremum<C> {
    pub fn new(compare: C) -> Self {
        Self { compare }
    }
}

impl<T, C> Reduction<T> for Extremum<C>
where
    T: Clone + Send + Sync + 'static,
    C: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
{
    type Partial = T;
    type Output = T;

    fn compute(&self, chunk: &Chunk<T>) -> anyhow::Result<T> {
        chunk
            .iter()
            .reduce(|a, b| if (self.compare)(a, b).is_ge() { a } else { b })
            .cloned()
            .ok_or_else(|| PoolError::NoSuchElement.into())
    }

    fn merge(&self, partials: Vec<T>) -> anyhow::Result<T> {
        partials
            .into_iter()
            .reduce(|a, b| if (self.compare)(&a, &b).is_ge() { a } else { b })
            .ok_or_else(|| PoolError::NoSuchElement.into())
    }

    fn default_result(&self) -> Result<T> {
        Err(PoolError::NoSuchElement)
    }
}

/// Index of some element matching `predicate`.
///
/// Chunks share a `found` flag, checked once per element, so scans stop early
/// once any chunk has a match. That only saves work: chunks already past the
/// check still finish their current element.
pub struct FindAny<P> {
    predicate: P,
    found: AtomicBool,
}

impl<P> FindAny<P> {
    pub fn new(predicate: P) -> Self {
        Self {
            predicate,
            found: AtomicBool::new(false),
        }
    }
}

impl<T, P> Reduction<T> for FindAny<P>
where
    T: Send + Sync + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    type Partial = Option<usize>;
    type Output = Option<usize>;

    fn compute(&self, chunk: &Chunk<T>) -> anyhow::Result<Option<usize>> {
        for (i, value) in chunk.iter().enumerate() {
            if self.found.load(MemOrdering::Relaxed) {
                return Ok(None);
            }
            if (self.predicate)(value) {
                self.found.store(true, MemOrdering::Relaxed);
                return Ok(Some(chunk.offset() + i));
            }
        }
        Ok(None)
    }

    fn merge(&self, partials: Vec<Option<usize>>) -> anyhow::Result<Option<usize>> {
        Ok(partials.into_iter().flatten().next())
    }

    fn default_result(&self) -> Result<Option<usize>> {
        Ok(None)
    }
}

pub struct Count<P> {
    predicate: P,
}

impl<P> Count<P> {
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<T, P> Reduction<T> for Count<P>
where
    T: Send + Sync + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    type Partial = usize;
    type Output = usize;

    fn compute(&self, chunk: &Chunk<T>) -> anyhow::Result<usize> {
        Ok(chunk.iter().filter(|&v| (self.predicate)(v)).count())
    }

    fn merge(&self, partials: Vec<usize>) -> anyhow::Result<usize> {
        Ok(partials.into_iter().sum())
    }

    fn default_result(&self) -> Result<usize> {
        Ok(0)
    }
}

pub struct Filter<P> {
    predicate: P,
}

impl<P> Filter<P> {
    pub fn new(predicate: P) -> Self {
        Self { predicate }
    }
}

impl<T, P> Reduction<T> for Filter<P>
where
    T: Clone + Send + Sync + 'static,
    P: Fn(&T) -> bool + Send + Sync + 'static,
{
    type Partial = Vec<T>;
    type Output = Vec<T>;

    fn compute(&self, chunk: &Chunk<T>) -> anyhow::Result<Vec<T>> {
        Ok(chunk
            .iter()
            .filter(|&v| (self.predicate)(v))
            .cloned()
            .collect())
    }

    fn merge(&self, partials: Vec<Vec<T>>) -> anyhow::Result<Vec<T>> {
        Ok(concat(partials))
    }

    fn default_result(&self) -> Result<Vec<T>> {
        Ok(Vec::new())
    }
}

pub struct MapEach<F> {
    f: F,
}

impl<F> MapEach<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<T, U, F> Reduction<T> for MapEach<F>
where
    T: Send + Sync + 'static,
    U: Send + 'static,
    F: Fn(&T) -> U + Send + Sync + 'static,
{
    type Partial = Vec<U>;
    type Output = Vec<U>;

    fn compute(&self, chunk: &Chunk<T>) -> anyhow::Result<Vec<U>> {
        Ok(chunk.iter().map(&self.f).collect())
    }

    fn merge(&self, partials: Vec<Vec<U>>) -> anyhow::Result<Vec<U>> {
        Ok(concat(partials))
    }

    fn default_result(&self) -> Result<Vec<U>> {
        Ok(Vec::new())
    }
}

/// Concatenation of every element's `Display` form
pub struct Join;

impl<T> Reduction<T> for Join
where
    T: Display + Send + Sync + 'static,
{
    type Partial = String;
    type Output = String;

    fn compute(&self, chunk: &Chunk<T>) -> anyhow::Result<String> {
        let mut out = String::new();
        for value in chunk.iter() {
            write!(out, "{}", value)?;
        }
        Ok(out)
    }

    fn merge(&self, partials: Vec<String>) -> anyhow::Result<String> {
        Ok(partials.concat())
    }

    fn default_result(&self) -> Result<String> {
        Ok(String::new())
    }
}

fn concat<T>(partials: Vec<Vec<T>>) -> Vec<T> {
    let total = partials.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(total);
    for part in partials {
        out.extend(part);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn whole<T>(values: Vec<T>) -> Chunk<T> {
        let len = values.len();
        Chunk::new(Arc::from(values), 0..len)
    }

    #[test]
    fn test_extremum_keeps_first_of_equals() {
        let by_key = Extremum::new(|a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0));
        let chunk = whole(vec![(1, 'a'), (7, 'b'), (7, 'c'), (2, 'd')]);
        assert_eq!(by_key.compute(&chunk).unwrap(), (7, 'b'));
        assert_eq!(by_key.merge(vec![(7, 'x'), (7, 'y')]).unwrap(), (7, 'x'));
    }

    #[test]
    fn test_extremum_empty_chunk_is_no_such_element() {
        let max = Extremum::new(|a: &i32, b: &i32| a.cmp(b));
        let err = max.compute(&whole(Vec::new())).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PoolError>(),
            Some(PoolError::NoSuchElement)
        ));
    }

    #[test]
    fn test_find_any_reports_global_index() {
        let find = FindAny::new(|v: &i32| *v > 10);
        let values: Arc<[i32]> = vec![1, 2, 3, 40, 5].into();
        let chunk = Chunk::new(values, 2..5);
        assert_eq!(find.compute(&chunk).unwrap(), Some(3));
    }

    #[test]
    fn test_find_any_stops_after_flag_is_set() {
        let find = FindAny::new(|_: &i32| true);
        find.found.store(true, MemOrdering::Relaxed);
        assert_eq!(find.compute(&whole(vec![1, 2, 3])).unwrap(), None);
    }

    #[test]
    fn test_find_any_merge_takes_first_hit() {
        let find = FindAny::new(|_: &i32| true);
        assert_eq!(
            Reduction::<i32>::merge(&find, vec![None, Some(4), Some(9)]).unwrap(),
            Some(4)
        );
    }

    #[test]
    fn test_join_concatenates_in_order() {
        assert_eq!(Join.compute(&whole(vec![1, 22, 333])).unwrap(), "122333");
        assert_eq!(
            Reduction::<i32>::merge(&Join, vec!["ab".into(), "".into(), "c".into()]).unwrap(),
            "abc"
        );
    }
}
