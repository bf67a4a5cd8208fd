//! Rayon-based parallelisation utilities.
//!
//! Instruments and currency buckets are processed in parallel once their
//! count reaches [`ParallelConfig::parallel_threshold`]. Every task owns
//! its item exclusively, so per-instrument caches need no locking.

use rayon::prelude::*;

/// Minimum number of items handed to one rayon task.
pub const DEFAULT_BATCH_SIZE: usize = 4;

/// Item count from which work is spread over the rayon pool.
///
/// A single instrument already costs a regression and a per-path
/// pseudo-inverse, so the threshold is low.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 8;

/// Parallel map over shared items.
///
/// # Arguments
///
/// * `items` - Slice of items to process
/// * `mapper` - Function to apply to each item
///
/// # Returns
///
/// Vector of mapped results, in input order.
pub fn parallel_map<T, R, F>(items: &[T], mapper: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    items.par_iter().map(mapper).collect()
}

/// Parallel map over exclusively borrowed items.
///
/// Each item is visited by exactly one task; at least `batch_size` items
/// go to a task.
pub fn parallel_map_mut<T, R, F>(items: &mut [T], batch_size: usize, mapper: F) -> Vec<R>
where
    T: Send,
    R: Send,
    F: Fn(&mut T) -> R + Sync + Send,
{
    items
        .par_iter_mut()
        .with_min_len(batch_size.max(1))
        .map(mapper)
        .collect()
}

/// Configuration for parallel execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParallelConfig {
    /// Minimum items per rayon task
    pub batch_size: usize,
    /// Minimum items before using parallelism
    pub parallel_threshold: usize,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ParallelConfig {
    /// Creates a new parallel configuration.
    pub fn new(batch_size: usize, parallel_threshold: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            parallel_threshold,
        }
    }

    /// Sequential execution regardless of item count.
    pub fn sequential() -> Self {
        Self::new(DEFAULT_BATCH_SIZE, usize::MAX)
    }

    /// Returns whether to use parallel processing for the given item count.
    #[inline]
    pub fn should_parallelize(&self, n_items: usize) -> bool {
        n_items >= self.parallel_threshold
    }
}
