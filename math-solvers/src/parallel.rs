//! Parallel utilities with feature-gated implementations
//!
//! Work is always split into static contiguous blocks (see [`block_ranges`]),
//! so the partition and the order in which reductions are combined depend only
//! on the block count. With the `rayon` feature the blocks run on the rayon
//! pool; without it they run in order on the calling thread.
//!
//! Every call is fork-join: it returns only after all blocks are done.

use std::ops::Range;

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Parallel execution configuration shared by the kernels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Enable block-parallel execution
    pub enabled: bool,
    /// Number of blocks to split work into (None = one per rayon thread)
    pub num_workers: Option<usize>,
    /// Inputs shorter than this run as a single block
    pub min_len: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            num_workers: None,
            min_len: 1024,
        }
    }
}

impl ParallelConfig {
    /// Run everything as one block on the calling thread
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            num_workers: Some(1),
            min_len: 0,
        }
    }

    /// Split every input into exactly `workers` blocks (clamped to the input length)
    pub fn with_workers(workers: usize) -> Self {
        Self {
            enabled: true,
            num_workers: Some(workers.max(1)),
            min_len: 0,
        }
    }

    /// Number of blocks used for an input of `len` elements
    pub fn workers_for(&self, len: usize) -> usize {
        if !self.enabled || len < self.min_len {
            return 1;
        }
        let workers = self.num_workers.unwrap_or_else(default_workers);
        workers.clamp(1, len.max(1))
    }
}

#[cfg(feature = "rayon")]
fn default_workers() -> usize {
    rayon::current_num_threads()
}

#[cfg(not(feature = "rayon"))]
fn default_workers() -> usize {
    1
}

/// Split `0..len` into `workers` contiguous ranges.
///
/// Sizes differ by at most one; the first `len % workers` ranges hold the extra
/// element. Returns no ranges when `len == 0`.
pub fn block_ranges(len: usize, workers: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, len);
    let base = len / workers;
    let extra = len % workers;

    let mut ranges = Vec::with_capacity(workers);
    let mut start = 0;
    for block in 0..workers {
        let size = base + usize::from(block < extra);
        ranges.push(start..start + size);
        start += size;
    }
    ranges
}

/// Split `data` into disjoint mutable blocks matching [`block_ranges`].
///
/// Each block is paired with the index of its first element.
fn split_blocks<'a, T>(data: &'a mut [T], ranges: &[Range<usize>]) -> Vec<(usize, &'a mut [T])> {
    let mut blocks = Vec::with_capacity(ranges.len());
    let mut rest = data;
    for range in ranges {
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
        blocks.push((range.start, head));
        rest = tail;
    }
    blocks
}

/// Run `f(offset, block)` over disjoint contiguous blocks of `data`.
///
/// `offset` is the index of `block[0]` within `data`. Blocks never overlap, so
/// `f` can write freely without synchronization.
#[cfg(feature = "rayon")]
pub fn for_each_block_mut<T, F>(data: &mut [T], config: &ParallelConfig, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    let workers = config.workers_for(data.len());
    if workers <= 1 {
        f(0, data);
        return;
    }
    let ranges = block_ranges(data.len(), workers);
    split_blocks(data, &ranges)
        .into_par_iter()
        .for_each(|(offset, block)| f(offset, block));
}

/// Run `f(offset, block)` over contiguous blocks of `data` (sequential fallback)
#[cfg(not(feature = "rayon"))]
pub fn for_each_block_mut<T, F>(data: &mut [T], config: &ParallelConfig, f: F)
where
    F: Fn(usize, &mut [T]),
{
    let workers = config.workers_for(data.len());
    if workers <= 1 {
        f(0, data);
        return;
    }
    let ranges = block_ranges(data.len(), workers);
    for (offset, block) in split_blocks(data, &ranges) {
        f(offset, block);
    }
}

/// Parallel reduction over `0..len`.
///
/// `fold` computes a partial result for one block; partials are then combined
/// left to right in block order, starting from `identity`. For a fixed block
/// count the result is deterministic.
#[cfg(feature = "rayon")]
pub fn fold_blocks<A, F, C>(len: usize, config: &ParallelConfig, identity: A, fold: F, combine: C) -> A
where
    A: Send,
    F: Fn(Range<usize>) -> A + Sync + Send,
    C: Fn(A, A) -> A,
{
    let workers = config.workers_for(len);
    if workers <= 1 {
        return combine(identity, fold(0..len));
    }
    let partials: Vec<A> = block_ranges(len, workers)
        .into_par_iter()
        .map(fold)
        .collect();
    partials.into_iter().fold(identity, combine)
}

/// Reduction over `0..len` (sequential fallback)
#[cfg(not(feature = "rayon"))]
pub fn fold_blocks<A, F, C>(len: usize, config: &ParallelConfig, identity: A, fold: F, combine: C) -> A
where
    F: Fn(Range<usize>) -> A,
    C: Fn(A, A) -> A,
{
    let workers = config.workers_for(len);
    if workers <= 1 {
        return combine(identity, fold(0..len));
    }
    block_ranges(len, workers)
        .into_iter()
        .map(fold)
        .fold(identity, combine)
}
