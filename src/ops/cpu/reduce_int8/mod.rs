//! Quantized int8 reduction over arbitrary axes.
//!
//! # Pipeline
//!
//! ```text
//! int8 input ──widen──▶ i32 ──pass 0──▶ scratch 0 ──pass 1──▶ … ──final pass──▶ int8 output
//! ```
//!
//! A reduction over `N` axes runs as `N` sequential passes, one per axis, in
//! the order the caller listed them. Every pass but the last writes `i32`
//! values, still in the input's quantized domain, into a scratch buffer. The
//! last pass rescales into the output domain and saturates to int8.
//!
//! ## Submodules
//!
//! - [`plan`] — axis normalization, per-pass geometry and output shape
//! - [`quant_args`] — fixed-point multipliers per mode and per pass
//! - [`scratch`] — scoped scratch buffers released on every exit path
//! - [`reducers`] — per-mode lane reducers for non-terminal and final passes
//! - [`kernel`] — the driver tying the above together
//!
//! ## Order Dependence
//!
//! `SumSquare` and `Prod` requantize between passes, so reducing axes
//! `[2, 3]` and `[3, 2]` can give different results. The order given by the
//! caller is always kept.

pub mod kernel;
pub mod plan;
pub mod quant_args;
pub mod reducers;
pub mod scratch;

pub use self::kernel::ReduceInt8Kernel;
pub use self::plan::{AxisPass, ReductionPlan};
pub use self::quant_args::{PassQuantArgs, ReduceQuantArgs};
pub use self::reducers::ReducerPair;
pub use self::scratch::ScratchBuffers;

use core::fmt;

use crate::error::ReduceError;

/// Reduction applied along each axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ReduceMode {
    Mean = 0,
    Max = 1,
    Min = 2,
    Prod = 3,
    Sum = 4,
    SumSquare = 5,
}

impl TryFrom<i32> for ReduceMode {
    type Error = ReduceError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Mean),
            1 => Ok(Self::Max),
            2 => Ok(Self::Min),
            3 => Ok(Self::Prod),
            4 => Ok(Self::Sum),
            5 => Ok(Self::SumSquare),
            other => Err(ReduceError::UnsupportedMode(other)),
        }
    }
}

impl fmt::Display for ReduceMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mean => "mean",
            Self::Max => "max",
            Self::Min => "min",
            Self::Prod => "prod",
            Self::Sum => "sum",
            Self::SumSquare => "sum_square",
        })
    }
}

/// Operator attributes of a reduce node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReduceParameter {
    pub mode: ReduceMode,
    /// Axes to reduce, in pass order. Negative values count from the back;
    /// an empty list reduces every axis.
    pub axes: Vec<i32>,
    /// Keep reduced axes as size-1 dimensions in the output shape.
    pub keep_dims: bool,
    /// Extend a single axis `a` to all axes `a..rank`.
    pub reduce_to_end: bool,
}

impl ReduceParameter {
    #[must_use]
    pub fn new(mode: ReduceMode, axes: impl Into<Vec<i32>>) -> Self {
        Self {
            mode,
            axes: axes.into(),
            keep_dims: false,
            reduce_to_end: false,
        }
    }

    /// Reduces every axis of the input.
    #[must_use]
    pub fn all_axes(mode: ReduceMode) -> Self {
        Self::new(mode, Vec::<i32>::new())
    }

    #[must_use]
    pub fn keep_dims(mut self, keep_dims: bool) -> Self {
        self.keep_dims = keep_dims;
        self
    }

    #[must_use]
    pub fn reduce_to_end(mut self, reduce_to_end: bool) -> Self {
        self.reduce_to_end = reduce_to_end;
        self
    }
}

/// Stage of a kernel invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    Setup,
    WidenInput,
    /// Non-terminal pass writing scratch buffer `i`.
    ReducePass(usize),
    FinalReducePass,
    Cleanup,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Setup => f.write_str("setup"),
            Self::WidenInput => f.write_str("input widening"),
            Self::ReducePass(i) => write!(f, "reduce pass {i}"),
            Self::FinalReducePass => f.write_str("final reduce pass"),
            Self::Cleanup => f.write_str("cleanup"),
            Self::Done => f.write_str("done"),
        }
    }
}
