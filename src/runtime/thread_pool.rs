//! Fixed-size worker pool for kernel passes.
//!
//! Wraps [`rayon::ThreadPool`] with named workers and a single blocking
//! data-parallel primitive, [`ThreadPool::launch`], which hands every task a
//! disjoint block of output rows.

use core::ops::Range;
use rayon::prelude::*;

use crate::config::RuntimeConfig;
use crate::error::Result;

/// Rows owned by `task_id` when `rows` rows are split over `task_count` tasks.
///
/// Tasks receive contiguous blocks of `ceil(rows / task_count)` rows; trailing
/// tasks may receive a shorter or empty range.
///
/// # Example
///
/// ```
/// use qreduce::runtime::task_rows;
/// assert_eq!(task_rows(0, 4, 10), 0..3);
/// assert_eq!(task_rows(3, 4, 10), 9..10);
/// ```
#[must_use]
pub fn task_rows(task_id: usize, task_count: usize, rows: usize) -> Range<usize> {
    let per_task = rows.div_ceil(task_count.max(1));
    let start = (task_id * per_task).min(rows);
    let end = (start + per_task).min(rows);
    start..end
}

/// A CPU worker pool shared by all passes of a [`Context`](super::Context).
pub struct ThreadPool {
    pool: rayon::ThreadPool,
    thread_num: usize,
}

impl core::fmt::Debug for ThreadPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ThreadPool")
            .field("thread_num", &self.thread_num)
            .finish_non_exhaustive()
    }
}

impl ThreadPool {
    /// Builds a pool with `config.thread_num` named workers.
    ///
    /// # Errors
    /// Invalid configurations and rayon build failures.
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        let config = config.clone().checked()?;
        let prefix = config.thread_name_prefix;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.thread_num)
            .thread_name(move |idx| format!("{prefix}-{idx}"))
            .build()?;
        log::debug!("thread pool ready with {} workers", config.thread_num);
        Ok(Self {
            pool,
            thread_num: config.thread_num,
        })
    }

    /// Number of workers, which is also the task count of every launch.
    #[must_use]
    pub fn thread_num(&self) -> usize {
        self.thread_num
    }

    /// Runs one parallel job over `rows` rows of `row_len` elements of `dst`.
    ///
    /// The rows are split with [`task_rows`] over `thread_num` tasks and
    /// `task(task_id, rows, block)` receives the matching `rows.len() * row_len`
    /// slice of `dst`. The call blocks until every task finished; the first
    /// task error is returned and remaining tasks are skipped where rayon
    /// allows it.
    ///
    /// # Panics
    /// Panics if `dst.len() != rows * row_len`.
    pub fn launch<T, F>(&self, dst: &mut [T], rows: usize, row_len: usize, task: F) -> Result<()>
    where
        T: Send,
        F: Fn(usize, Range<usize>, &mut [T]) -> Result<()> + Sync,
    {
        assert_eq!(dst.len(), rows * row_len, "launch buffer does not match rows");
        if dst.is_empty() {
            return Ok(());
        }
        let task_count = self.thread_num.min(rows).max(1);
        let block_len = rows.div_ceil(task_count) * row_len;

        self.pool.install(|| {
            dst.par_chunks_mut(block_len)
                .enumerate()
                .try_for_each(|(task_id, block)| {
                    task(task_id, task_rows(task_id, task_count, rows), block)
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReduceError;
    use proptest::prelude::*;

    fn pool(threads: usize) -> ThreadPool {
        ThreadPool::new(&RuntimeConfig::default().with_thread_num(threads)).unwrap()
    }

    #[test]
    fn launch_hands_out_disjoint_row_blocks() {
        let pool = pool(3);
        let mut dst = vec![0usize; 7 * 2];
        pool.launch(&mut dst, 7, 2, |_, rows, block| {
            assert_eq!(block.len(), rows.len() * 2);
            for (row, chunk) in rows.zip(block.chunks_mut(2)) {
                chunk.fill(row);
            }
            Ok(())
        })
        .unwrap();
        assert_eq!(dst, vec![0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6]);
    }

    #[test]
    fn launch_propagates_task_error() {
        let pool = pool(4);
        let mut dst = vec![0i32; 8];
        let err = pool
            .launch(&mut dst, 8, 1, |task_id, _, _| {
                if task_id == 2 {
                    Err(ReduceError::InvalidConfig("boom"))
                } else {
                    Ok(())
                }
            })
            .unwrap_err();
        assert!(matches!(err, ReduceError::InvalidConfig("boom")));
    }

    #[test]
    fn zero_threads_is_rejected() {
        assert!(ThreadPool::new(&RuntimeConfig::default().with_thread_num(0)).is_err());
    }

    proptest! {
        #[test]
        fn task_rows_cover_every_row_once(rows in 0usize..200, tasks in 1usize..16) {
            let mut next = 0;
            for task_id in 0..tasks {
                let range = task_rows(task_id, tasks, rows);
                prop_assert!(range.start == next || range.is_empty());
                next = next.max(range.end);
            }
            prop_assert_eq!(next, rows);
        }
    }
}
