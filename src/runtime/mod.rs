//! Lightweight execution runtime.
//!
//! A [`Context`] bundles what a kernel invocation needs from its
//! environment: a worker pool to run passes on and an allocator for scratch
//! buffers. Kernels never create threads or allocate working memory on their
//! own.
//!
//! ```rust
//! use qreduce::config::RuntimeConfig;
//! use qreduce::runtime::Context;
//!
//! let ctx = Context::new(&RuntimeConfig::default().with_thread_num(2)).unwrap();
//! assert_eq!(ctx.thread_num(), 2);
//! ```

mod allocator;
mod thread_pool;

pub use self::allocator::{Allocator, DefaultAllocator};
pub use self::thread_pool::{task_rows, ThreadPool};

use std::sync::Arc;

use crate::config::RuntimeConfig;
use crate::error::Result;

/// Execution context shared by kernel invocations.
pub struct Context {
    pool: ThreadPool,
    allocator: Arc<dyn Allocator>,
}

impl core::fmt::Debug for Context {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Context")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

impl Context {
    /// Builds a context with its own pool and the [`DefaultAllocator`].
    ///
    /// # Errors
    /// Invalid configurations and thread pool build failures.
    pub fn new(config: &RuntimeConfig) -> Result<Self> {
        Ok(Self {
            pool: ThreadPool::new(config)?,
            allocator: Arc::new(DefaultAllocator),
        })
    }

    /// Replaces the scratch allocator.
    #[must_use]
    pub fn with_allocator(mut self, allocator: Arc<dyn Allocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Worker count, which is also the task count of each parallel pass.
    #[must_use]
    pub fn thread_num(&self) -> usize {
        self.pool.thread_num()
    }

    /// The worker pool.
    #[must_use]
    pub fn pool(&self) -> &ThreadPool {
        &self.pool
    }

    /// The scratch allocator.
    #[must_use]
    pub fn allocator(&self) -> &dyn Allocator {
        self.allocator.as_ref()
    }
}
