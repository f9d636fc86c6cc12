//! Error types shared by the runtime and the reduce kernels.
//!
//! Every failure of a kernel invocation is fatal to that invocation. Callers
//! that need the integer status convention of the surrounding runtime can use
//! [`ReduceError::status_code`].

use thiserror::Error;

use crate::ops::cpu::reduce_int8::{ReduceMode, RunStage};

/// Status returned by a successful invocation.
pub const STATUS_OK: i32 = 0;
/// Generic failure status.
pub const STATUS_ERROR: i32 = -1;
/// Allocation failure status.
pub const STATUS_NULL_PTR: i32 = -2;
/// Unsupported operation status.
pub const STATUS_NOT_SUPPORT: i32 = -3;

/// Integer overflow detected while folding a reduction lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// An `i32` addition overflowed.
    #[error("int32 addition overflow")]
    AddOverflow,
    /// An `i32` multiplication overflowed.
    #[error("int32 multiplication overflow")]
    MulOverflow,
}

/// Errors produced while planning or running a reduction.
#[derive(Debug, Error)]
pub enum ReduceError {
    #[error("allocation of {bytes} bytes failed")]
    ResourceExhausted { bytes: usize },

    #[error("unsupported reduce mode: {0}")]
    UnsupportedMode(i32),

    #[error("reduce {mode} failed at {stage}, task {task_id}: {source}")]
    TaskFailure {
        mode: ReduceMode,
        stage: RunStage,
        task_id: usize,
        #[source]
        source: ArithmeticError,
    },

    #[error("axis {axis} is out of range for rank {rank}")]
    InvalidAxis { axis: i32, rank: usize },

    #[error("axis {axis} is reduced more than once")]
    DuplicateAxis { axis: usize },

    #[error("invalid shape {shape:?}: {reason}")]
    InvalidShape {
        shape: Vec<usize>,
        reason: &'static str,
    },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("tensor carries no quantization parameters")]
    MissingQuantParams,

    #[error("invalid quantization parameters: scale={scale}, zero_point={zero_point}")]
    InvalidQuantParams { scale: f64, zero_point: i32 },

    #[error("cannot derive a fixed-point multiplier from {0}")]
    InvalidMultiplier(f64),

    #[error("invalid runtime configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("failed to build thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl ReduceError {
    /// Maps the error onto the runtime's non-zero status codes.
    #[must_use]
    pub const fn status_code(&self) -> i32 {
        match self {
            Self::ResourceExhausted { .. } => STATUS_NULL_PTR,
            Self::UnsupportedMode(_) => STATUS_NOT_SUPPORT,
            _ => STATUS_ERROR,
        }
    }
}

/// Convenience result alias.
pub type Result<T> = core::result::Result<T, ReduceError>;
