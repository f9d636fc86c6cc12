//! Decomposition of a multi-axis reduction into sequential passes.

use crate::error::{ReduceError, Result};

use super::ReduceParameter;

/// Geometry of one reduction pass over a row-major buffer.
///
/// The source is viewed as `[outer_size, axis_size, inner_size]` and the
/// pass produces `[outer_size, inner_size]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisPass {
    pub outer_size: usize,
    pub inner_size: usize,
    pub axis_size: usize,
}

impl AxisPass {
    /// Elements written by this pass.
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.outer_size * self.inner_size
    }
}

/// Ordered pass list for one input shape and set of axes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReductionPlan {
    /// Normalized axes, in pass order.
    pub axes: Vec<usize>,
    /// One pass per axis.
    pub passes: Vec<AxisPass>,
    /// Scratch sizes (in `i32` elements) for every pass but the last.
    pub buffer_sizes: Vec<usize>,
    pub input_shape: Vec<usize>,
    pub output_shape: Vec<usize>,
}

impl ReductionPlan {
    /// Plans the reduction of `input_shape` described by `param`.
    ///
    /// # Errors
    /// - [`ReduceError::InvalidShape`] for rank-0 shapes or zero-sized dims.
    /// - [`ReduceError::InvalidAxis`] for axes outside `-rank..rank`.
    /// - [`ReduceError::DuplicateAxis`] if an axis is listed twice.
    pub fn new(input_shape: &[usize], param: &ReduceParameter) -> Result<Self> {
        if input_shape.is_empty() {
            return Err(ReduceError::InvalidShape {
                shape: Vec::new(),
                reason: "rank must be at least 1",
            });
        }
        if input_shape.contains(&0) {
            return Err(ReduceError::InvalidShape {
                shape: input_shape.to_vec(),
                reason: "dimensions must be non-zero",
            });
        }

        let axes = normalize_axes(input_shape.len(), param)?;

        let mut working = input_shape.to_vec();
        let mut passes = Vec::with_capacity(axes.len());
        for &axis in &axes {
            passes.push(AxisPass {
                outer_size: working[..axis].iter().product(),
                inner_size: working[axis + 1..].iter().product(),
                axis_size: working[axis],
            });
            working[axis] = 1;
        }

        let buffer_sizes = passes[..passes.len() - 1]
            .iter()
            .map(AxisPass::output_len)
            .collect();

        let mut output_shape: Vec<usize> = if param.keep_dims {
            working
        } else {
            input_shape
                .iter()
                .enumerate()
                .filter(|(i, _)| !axes.contains(i))
                .map(|(_, &d)| d)
                .collect()
        };
        if output_shape.is_empty() {
            output_shape.push(1);
        }

        Ok(Self {
            axes,
            passes,
            buffer_sizes,
            input_shape: input_shape.to_vec(),
            output_shape,
        })
    }

    /// Number of reduced axes (and passes).
    #[must_use]
    pub fn num_axes(&self) -> usize {
        self.passes.len()
    }

    /// Element count of the final output.
    #[must_use]
    pub fn output_len(&self) -> usize {
        self.output_shape.iter().product()
    }
}

fn normalize_axes(rank: usize, param: &ReduceParameter) -> Result<Vec<usize>> {
    if param.axes.is_empty() {
        return Ok((0..rank).collect());
    }

    let mut axes = Vec::with_capacity(param.axes.len());
    for &raw in &param.axes {
        let axis = if raw < 0 {
            i64::from(raw) + rank as i64
        } else {
            i64::from(raw)
        };
        if axis < 0 || axis >= rank as i64 {
            return Err(ReduceError::InvalidAxis { axis: raw, rank });
        }
        let axis = axis as usize;
        if axes.contains(&axis) {
            return Err(ReduceError::DuplicateAxis { axis });
        }
        axes.push(axis);
    }

    if param.reduce_to_end && axes.len() == 1 {
        let begin = axes[0];
        axes = (begin..rank).collect();
    }
    Ok(axes)
}
