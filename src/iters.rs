//! Lazy composition of successor-list sub-sequences (C3): interval
//! expansion, masked copy from a reference list, strictly-increasing
//! merge with dedup, residual decoding, and a snapshot wrapper — all
//! expressed as variants of one sum type rather than as trait objects,
//! so cloning an iterator never allocates and composition stays
//! zero-cost.

use std::sync::Arc;

use crate::bits::{BitReader, ByteSource, Code};
use crate::error::Result;
use crate::utils::nat2int;

/// A finite lazy sequence of node identifiers. Unless stated otherwise,
/// output is strictly increasing.
#[derive(Clone)]
pub enum Iter<S: ByteSource + Clone> {
    Empty,
    /// Expands `(left[i], left[i]+1, ..., left[i]+len[i]-1)` for each `i`.
    Interval(IntervalIter),
    /// Copies the non-excluded values of an underlying iterator, per a
    /// run-length include/exclude mask.
    Masked(MaskedIter<S>),
    /// Strictly-increasing merge of two sub-iterators, deduplicating
    /// equal values, optionally bounded by a hard output count.
    Merge(Box<MergeIter<S>>),
    /// Decodes residual deltas directly from a bit reader.
    Residual(ResidualIter<S>),
    /// An owned, already-materialized snapshot of a sub-range.
    Captured(CapturedIter),
}

impl<S: ByteSource + Clone> Iter<S> {
    pub fn empty() -> Self {
        Iter::Empty
    }

    /// Builds a strictly-increasing, deduplicating merge of `a` and `b`,
    /// optionally bounded by a hard output count.
    pub fn merge(a: Iter<S>, b: Iter<S>, bound: Option<u64>) -> Result<Self> {
        Ok(Iter::Merge(Box::new(MergeIter::new(a, b, bound)?)))
    }

    pub fn has_next(&self) -> bool {
        match self {
            Iter::Empty => false,
            Iter::Interval(it) => it.has_next(),
            Iter::Masked(it) => it.has_next(),
            Iter::Merge(it) => it.has_next(),
            Iter::Residual(it) => it.has_next(),
            Iter::Captured(it) => it.has_next(),
        }
    }

    pub fn next(&mut self) -> Result<Option<u64>> {
        match self {
            Iter::Empty => Ok(None),
            Iter::Interval(it) => Ok(it.next()),
            Iter::Masked(it) => it.next(),
            Iter::Merge(it) => it.next(),
            Iter::Residual(it) => it.next(),
            Iter::Captured(it) => Ok(it.next()),
        }
    }

    /// Advances past up to `n` elements, returning how many were
    /// actually skipped.
    pub fn skip(&mut self, n: usize) -> Result<usize> {
        let mut skipped = 0;
        while skipped < n && self.has_next() {
            if self.next()?.is_none() {
                break;
            }
            skipped += 1;
        }
        Ok(skipped)
    }

    /// Materializes the remainder of this iterator into an owned vector,
    /// so it can be stored in a window slot independent of whatever it
    /// was borrowing from (the "capture wrapper").
    pub fn captured(mut self) -> Result<Iter<S>> {
        let mut values = Vec::new();
        while self.has_next() {
            if let Some(v) = self.next()? {
                values.push(v);
            }
        }
        Ok(Iter::Captured(CapturedIter::new(values)))
    }

    pub fn collect_vec(mut self) -> Result<Vec<u64>> {
        let mut values = Vec::new();
        while self.has_next() {
            if let Some(v) = self.next()? {
                values.push(v);
            }
        }
        Ok(values)
    }
}

/// Expands a list of `(left, len)` pairs into their constituent runs.
#[derive(Clone, Debug)]
pub struct IntervalIter {
    intervals: Arc<[(u64, u64)]>,
    idx: usize,
    /// Offset within the current interval.
    within: u64,
}

impl IntervalIter {
    pub fn new(intervals: Vec<(u64, u64)>) -> Self {
        Self {
            intervals: intervals.into(),
            idx: 0,
            within: 0,
        }
    }

    pub fn has_next(&self) -> bool {
        self.idx < self.intervals.len()
    }

    pub fn next(&mut self) -> Option<u64> {
        let (left, len) = *self.intervals.get(self.idx)?;
        if self.within >= len {
            return None;
        }
        let value = left + self.within;
        self.within += 1;
        if self.within >= len {
            self.idx += 1;
            self.within = 0;
        }
        Some(value)
    }
}

/// Filters an underlying sorted iterator through an alternating
/// include/exclude run-length mask: the first `mask[0]` values are
/// included, the next `mask[1]` excluded, and so on. If the mask has an
/// even number of entries the remainder of the underlying iterator is
/// included; if odd, the remainder is excluded.
#[derive(Clone)]
pub struct MaskedIter<S: ByteSource + Clone> {
    parent: Box<Iter<S>>,
    /// Run lengths; a trailing "include the rest" run is appended up
    /// front by [`MaskedIter::new`] when the mask count is even, so
    /// `next` never special-cases the tail.
    blocks: Vec<u64>,
    block_idx: usize,
    remaining: u64,
}

impl<S: ByteSource + Clone> MaskedIter<S> {
    /// `parent_len` is the underlying iterator's total element count,
    /// needed to compute the size of the implicit trailing run.
    pub fn new(parent: Iter<S>, mut blocks: Vec<u64>, parent_len: u64) -> Self {
        let cumsum: u64 = blocks.iter().sum();
        let remainder = parent_len.saturating_sub(cumsum);
        if remainder != 0 && blocks.len() % 2 == 0 {
            blocks.push(remainder);
        }
        let remaining = blocks_len_or_zero(&blocks, 0);
        Self {
            parent: Box::new(parent),
            blocks,
            block_idx: 0,
            remaining,
        }
    }

    pub fn has_next(&self) -> bool {
        self.remaining > 0 || self.block_idx + 1 < self.blocks.len()
    }

    pub fn next(&mut self) -> Result<Option<u64>> {
        loop {
            if self.block_idx >= self.blocks.len() {
                return Ok(None);
            }
            if self.remaining == 0 {
                // finished a copy block: skip over the next (exclude) block
                self.block_idx += 1;
                if self.block_idx >= self.blocks.len() {
                    return Ok(None);
                }
                let mut to_skip = self.blocks[self.block_idx];
                while to_skip > 0 {
                    self.parent.next()?;
                    to_skip -= 1;
                }
                self.block_idx += 1;
                if self.block_idx >= self.blocks.len() {
                    return Ok(None);
                }
                self.remaining = self.blocks[self.block_idx];
                debug_assert_ne!(self.remaining, 0);
            }
            if let Some(v) = self.parent.next()? {
                self.remaining -= 1;
                return Ok(Some(v));
            }
            return Ok(None);
        }
    }
}

fn blocks_len_or_zero(blocks: &[u64], idx: usize) -> u64 {
    blocks.get(idx).copied().unwrap_or(0)
}

/// Strictly-increasing merge of two sorted iterators, deduplicating
/// equal values, optionally bounded by a hard output count (used to cap
/// the block+extras merge at the decoded outdegree).
#[derive(Clone)]
pub struct MergeIter<S: ByteSource + Clone> {
    a: Iter<S>,
    b: Iter<S>,
    next_a: Option<u64>,
    next_b: Option<u64>,
    bound: Option<u64>,
    emitted: u64,
}

impl<S: ByteSource + Clone> MergeIter<S> {
    /// Primes both sub-iterators eagerly so `has_next` is exact without
    /// itself needing to be fallible.
    pub fn new(mut a: Iter<S>, mut b: Iter<S>, bound: Option<u64>) -> Result<Self> {
        let next_a = a.next()?;
        let next_b = b.next()?;
        Ok(Self {
            a,
            b,
            next_a,
            next_b,
            bound,
            emitted: 0,
        })
    }

    pub fn has_next(&self) -> bool {
        if let Some(bound) = self.bound {
            if self.emitted >= bound {
                return false;
            }
        }
        self.next_a.is_some() || self.next_b.is_some()
    }

    pub fn next(&mut self) -> Result<Option<u64>> {
        if let Some(bound) = self.bound {
            if self.emitted >= bound {
                return Ok(None);
            }
        }
        let result = match (self.next_a, self.next_b) {
            (None, None) => None,
            (Some(x), None) => {
                self.next_a = self.a.next()?;
                Some(x)
            }
            (None, Some(y)) => {
                self.next_b = self.b.next()?;
                Some(y)
            }
            (Some(x), Some(y)) => {
                if x < y {
                    self.next_a = self.a.next()?;
                    Some(x)
                } else if y < x {
                    self.next_b = self.b.next()?;
                    Some(y)
                } else {
                    self.next_a = self.a.next()?;
                    self.next_b = self.b.next()?;
                    Some(x)
                }
            }
        };
        if result.is_some() {
            self.emitted += 1;
        }
        Ok(result)
    }
}

/// Decodes residual deltas directly from a bit reader: the first value
/// is `start + nat2int(code)`, and each subsequent value is
/// `previous + code + 1`.
#[derive(Clone)]
pub struct ResidualIter<S: ByteSource + Clone> {
    reader: BitReader<S>,
    code: Code,
    remaining: u64,
    previous: Option<u64>,
    start: i64,
}

impl<S: ByteSource + Clone> ResidualIter<S> {
    pub fn new(reader: BitReader<S>, code: Code, start: i64, count: u64) -> Self {
        Self {
            reader,
            code,
            remaining: count,
            previous: None,
            start,
        }
    }

    pub fn has_next(&self) -> bool {
        self.remaining > 0
    }

    pub fn next(&mut self) -> Result<Option<u64>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        let value = match self.previous {
            None => {
                let code = self.reader.read_code(self.code)?;
                (self.start + nat2int(code)) as u64
            }
            Some(prev) => {
                let code = self.reader.read_code(self.code)?;
                prev + code + 1
            }
        };
        self.previous = Some(value);
        Ok(Some(value))
    }

    /// Hands back the underlying reader once this residual run (and
    /// everything composed after it) has been fully consumed, so the
    /// caller can continue decoding subsequent nodes from the same
    /// cursor.
    pub fn into_reader(self) -> BitReader<S> {
        self.reader
    }
}

/// An owned, already-materialized snapshot of a sub-range of some
/// other sequence. Used so a successor list can be made self-contained
/// once read, decoupling its lifetime from a window slot that may be
/// overwritten by the time the caller advances past it.
#[derive(Clone, Debug)]
pub struct CapturedIter {
    values: Arc<[u64]>,
    idx: usize,
}

impl CapturedIter {
    pub fn new(values: Vec<u64>) -> Self {
        Self {
            values: values.into(),
            idx: 0,
        }
    }

    pub fn from_arc(values: Arc<[u64]>) -> Self {
        Self { values, idx: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.idx < self.values.len()
    }

    pub fn next(&mut self) -> Option<u64> {
        let v = self.values.get(self.idx).copied()?;
        self.idx += 1;
        Some(v)
    }

    pub fn len(&self) -> usize {
        self.values.len() - self.idx
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bits::MemoryByteSource;

    fn captured(values: Vec<u64>) -> Iter<MemoryByteSource> {
        Iter::Captured(CapturedIter::new(values))
    }

    #[test]
    fn interval_iter_expands_runs() {
        let mut it = IntervalIter::new(vec![(3, 4), (10, 3), (20, 1)]);
        let mut out = Vec::new();
        while it.has_next() {
            out.push(it.next().unwrap());
        }
        assert_eq!(out, vec![3, 4, 5, 6, 10, 11, 12, 20]);
    }

    #[test]
    fn merge_dedups_equal_values() {
        let a = captured(vec![1, 2, 4, 5, 7]);
        let b = captured(vec![1, 2, 4, 5, 8]);
        let mut m = MergeIter::new(a, b, None).unwrap();
        let mut out = Vec::new();
        while m.has_next() {
            if let Some(v) = m.next().unwrap() {
                out.push(v);
            }
        }
        assert_eq!(out, vec![1, 2, 4, 5, 7, 8]);
    }

    #[test]
    fn masked_iter_include_exclude_runs() {
        // reference list [1,2,4,5,7], mask [4] (include first 4, exclude the rest)
        let parent = captured(vec![1, 2, 4, 5, 7]);
        let mut masked = MaskedIter::new(parent, vec![4], 5);
        let mut out = Vec::new();
        while masked.has_next() {
            if let Some(v) = masked.next().unwrap() {
                out.push(v);
            }
        }
        assert_eq!(out, vec![1, 2, 4, 5]);
    }
}
