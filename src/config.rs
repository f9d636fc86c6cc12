//! Runtime configuration.
//!
//! This module holds the process-wide default worker count and the
//! [`RuntimeConfig`] used to build a [`Context`](crate::runtime::Context).
//!
//! # Sources
//!
//! - `RuntimeConfig::default()`: uses the global default thread count.
//! - `RuntimeConfig::from_env()`: honours `QREDUCE_NUM_THREADS` when set.
//! - Builder methods override individual fields.
//!
//! The global default is stored in an `AtomicUsize`, so it can be changed at
//! any time; contexts that already exist keep their pool size.

use briny::prelude::*;
use core::sync::atomic::{AtomicUsize, Ordering};
use std::sync::OnceLock;

use crate::error::{ReduceError, Result};

/// Environment variable overriding the worker count.
pub const THREADS_ENV: &str = "QREDUCE_NUM_THREADS";

const DEFAULT_THREAD_NAME_PREFIX: &str = "qreduce-worker";

/// `0` means "ask the OS".
static GLOBAL_DEFAULT_THREAD_NUM: AtomicUsize = AtomicUsize::new(0);

/// Sets the worker count used by [`RuntimeConfig::default`].
///
/// Passing `0` restores the automatic choice.
///
/// # Example
///
/// ```
/// use qreduce::config::{set_default_thread_num, default_thread_num};
/// set_default_thread_num(2);
/// assert_eq!(default_thread_num(), 2);
/// set_default_thread_num(0);
/// ```
pub fn set_default_thread_num(n: usize) {
    GLOBAL_DEFAULT_THREAD_NUM.store(n, Ordering::Release);
}

/// Returns the default worker count.
///
/// Falls back to the available parallelism of the host (at least one).
pub fn default_thread_num() -> usize {
    match GLOBAL_DEFAULT_THREAD_NUM.load(Ordering::Acquire) {
        0 => std::thread::available_parallelism().map_or(1, |n| n.get()),
        n => n,
    }
}

fn env_thread_num() -> Option<usize> {
    static FROM_ENV: OnceLock<Option<usize>> = OnceLock::new();
    *FROM_ENV.get_or_init(|| {
        let raw = std::env::var(THREADS_ENV).ok()?;
        match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => {
                log::warn!("ignoring {THREADS_ENV}={raw:?}: expected a positive integer");
                None
            }
        }
    })
}

/// Settings for a runtime [`Context`](crate::runtime::Context).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Worker threads in the pool, also the task count of every parallel pass.
    pub thread_num: usize,
    /// Prefix for worker thread names.
    pub thread_name_prefix: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            thread_num: default_thread_num(),
            thread_name_prefix: DEFAULT_THREAD_NAME_PREFIX.to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Defaults, with `QREDUCE_NUM_THREADS` applied when set.
    #[must_use]
    pub fn from_env() -> Self {
        let config = Self::default();
        match env_thread_num() {
            Some(n) => config.with_thread_num(n),
            None => config,
        }
    }

    /// Overrides the worker count.
    #[must_use]
    pub fn with_thread_num(mut self, thread_num: usize) -> Self {
        self.thread_num = thread_num;
        self
    }

    /// Overrides the worker name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Validates the configuration and returns it unchanged.
    ///
    /// # Errors
    /// [`ReduceError::InvalidConfig`] for a zero worker count or an empty prefix.
    pub fn checked(self) -> Result<Self> {
        if self.thread_num == 0 {
            return Err(ReduceError::InvalidConfig("thread_num must be at least 1"));
        }
        let trusted = TrustedData::new(self)
            .map_err(|_| ReduceError::InvalidConfig("thread name prefix must not be empty"))?;
        Ok(trusted.into_inner())
    }
}

impl Validate for RuntimeConfig {
    fn validate(&self) -> core::result::Result<(), ValidationError> {
        if self.thread_num == 0 || self.thread_name_prefix.is_empty() {
            return Err(ValidationError);
        }
        Ok(())
    }
}
