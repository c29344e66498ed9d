use std::ops::{Deref, Range};
use std::sync::Arc;

/// Split `len` items into `min(parts, len)` contiguous ranges.
///
/// Every range holds `len / parts` items and the first `len % parts` ranges
/// hold one more, so no range is empty and together they cover `0..len`
/// exactly once.
pub fn partition(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.min(len);
    if parts == 0 {
        return Vec::new();
    }

    let base = len / parts;
    let extra = len % parts;

    let mut ranges = Vec::with_capacity(parts);
    let mut start = 0;
    for i in 0..parts {
        let size = base + usize::from(i < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// A contiguous window over shared input, owned by one chunk task
#[derive(Debug)]
pub struct Chunk<T> {
    values: Arc<[T]>,
    range: Range<usize>,
}

impl<T> Chunk<T> {
    pub(crate) fn new(values: Arc<[T]>, range: Range<usize>) -> Self {
        Self { values, range }
    }

    /// Position of the chunk's first element in the whole input
    pub fn offset(&self) -> usize {
        self.range.start
    }
}

impl<T> Deref for Chunk<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        &self.values[self.range.clone()]
    }
}
