//! Per-mode lane reducers.
//!
//! A reducer folds every `(outer, inner)` lane of its row block: `axis_size`
//! values read from `src` with stride `inner_size`. Non-terminal reducers
//! write `i32` values that stay in the input's quantized domain (the input
//! zero point is added back), so the next pass can treat them like input.
//! Terminal reducers rescale into the output domain and saturate to int8.
//!
//! All accumulation is checked; overflow aborts the task.

use core::iter::{Copied, StepBy, Take};
use core::ops::Range;
use core::slice;

use crate::error::ArithmeticError;

use super::plan::AxisPass;
use super::quant_args::PassQuantArgs;
use super::ReduceMode;

/// Folds the lanes of a block of outer rows into `dst`.
pub type Reducer<T> = fn(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [T],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError>;

/// Reducer writing an intermediate `i32` buffer.
pub type ReduceFn = Reducer<i32>;

/// Reducer of the final pass, writing the int8 output.
pub type ReduceLastFn = Reducer<i8>;

/// Reducers of one mode, chosen once at kernel setup.
#[derive(Clone, Copy)]
pub struct ReducerPair {
    pub reduce: ReduceFn,
    pub reduce_last: ReduceLastFn,
}

impl core::fmt::Debug for ReducerPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("ReducerPair")
    }
}

impl ReducerPair {
    #[must_use]
    pub fn for_mode(mode: ReduceMode) -> Self {
        match mode {
            ReduceMode::Mean => Self {
                reduce: reduce_mean,
                reduce_last: reduce_mean_last,
            },
            ReduceMode::Sum => Self {
                reduce: reduce_sum,
                reduce_last: reduce_sum_last,
            },
            ReduceMode::Max => Self {
                reduce: reduce_max,
                reduce_last: reduce_max_last,
            },
            ReduceMode::Min => Self {
                reduce: reduce_min,
                reduce_last: reduce_min_last,
            },
            ReduceMode::Prod => Self {
                reduce: reduce_prod,
                reduce_last: reduce_prod_last,
            },
            ReduceMode::SumSquare => Self {
                reduce: reduce_sum_square,
                reduce_last: reduce_sum_square_last,
            },
        }
    }
}

type Lane<'a> = Take<StepBy<Copied<slice::Iter<'a, i32>>>>;

/// Applies `fold` to every lane of `rows`, writing results row-major to `dst`.
fn reduce_lanes<T>(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [T],
    mut fold: impl FnMut(Lane<'_>) -> Result<T, ArithmeticError>,
) -> Result<(), ArithmeticError> {
    let AxisPass {
        inner_size,
        axis_size,
        ..
    } = *pass;
    debug_assert_eq!(dst.len(), rows.len() * inner_size);

    for (outer, row) in rows.zip(dst.chunks_mut(inner_size)) {
        let base = outer * axis_size * inner_size;
        for (k, slot) in row.iter_mut().enumerate() {
            let lane = src[base + k..]
                .iter()
                .copied()
                .step_by(inner_size)
                .take(axis_size);
            *slot = fold(lane)?;
        }
    }
    Ok(())
}

#[inline]
fn centered(v: i32, zp: i32) -> Result<i32, ArithmeticError> {
    v.checked_sub(zp).ok_or(ArithmeticError::AddOverflow)
}

#[inline]
fn add(a: i32, b: i32) -> Result<i32, ArithmeticError> {
    a.checked_add(b).ok_or(ArithmeticError::AddOverflow)
}

#[inline]
fn saturate(x: i32) -> i8 {
    x.clamp(i32::from(i8::MIN), i32::from(i8::MAX)) as i8
}

fn centered_sum(mut lane: Lane<'_>, zp: i32) -> Result<i32, ArithmeticError> {
    lane.try_fold(0i32, |acc, v| add(acc, centered(v, zp)?))
}

fn centered_prod(mut lane: Lane<'_>, zp: i32) -> Result<i32, ArithmeticError> {
    lane.try_fold(1i32, |acc, v| {
        acc.checked_mul(centered(v, zp)?)
            .ok_or(ArithmeticError::MulOverflow)
    })
}

fn centered_sum_square(mut lane: Lane<'_>, zp: i32) -> Result<i32, ArithmeticError> {
    lane.try_fold(0i32, |acc, v| {
        let c = centered(v, zp)?;
        let sq = c.checked_mul(c).ok_or(ArithmeticError::MulOverflow)?;
        add(acc, sq)
    })
}

fn reduce_mean(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i32],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let mean = args.axis.apply(centered_sum(lane, args.in_zp)?);
        add(mean, args.in_zp)
    })
}

fn reduce_mean_last(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i8],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let mean = args.axis.apply(centered_sum(lane, args.in_zp)?);
        let scaled = args.in_out.apply(mean);
        Ok(saturate(add(scaled, args.out_zp)?))
    })
}

fn reduce_sum(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i32],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        add(centered_sum(lane, args.in_zp)?, args.in_zp)
    })
}

fn reduce_sum_last(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i8],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let scaled = args.in_out.apply(centered_sum(lane, args.in_zp)?);
        Ok(saturate(add(scaled, args.out_zp)?))
    })
}

fn reduce_max(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i32],
    _args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| Ok(lane.fold(i32::MIN, i32::max)))
}

fn reduce_max_last(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i8],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let max = lane.fold(i32::MIN, i32::max);
        let scaled = args.in_out.apply(centered(max, args.in_zp)?);
        Ok(saturate(add(scaled, args.out_zp)?))
    })
}

fn reduce_min(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i32],
    _args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| Ok(lane.fold(i32::MAX, i32::min)))
}

fn reduce_min_last(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i8],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let min = lane.fold(i32::MAX, i32::min);
        let scaled = args.in_out.apply(centered(min, args.in_zp)?);
        Ok(saturate(add(scaled, args.out_zp)?))
    })
}

fn reduce_prod(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i32],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let prod = args.axis.apply(centered_prod(lane, args.in_zp)?);
        add(prod, args.in_zp)
    })
}

// the last multiplier already divides by the output scale
fn reduce_prod_last(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i8],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let prod = args.axis.apply(centered_prod(lane, args.in_zp)?);
        Ok(saturate(add(prod, args.out_zp)?))
    })
}

fn reduce_sum_square(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i32],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let sum = args.axis.apply(centered_sum_square(lane, args.in_zp)?);
        add(sum, args.in_zp)
    })
}

// the last multiplier already divides by the output scale
fn reduce_sum_square_last(
    pass: &AxisPass,
    rows: Range<usize>,
    src: &[i32],
    dst: &mut [i8],
    args: &PassQuantArgs,
) -> Result<(), ArithmeticError> {
    reduce_lanes(pass, rows, src, dst, |lane| {
        let sum = args.axis.apply(centered_sum_square(lane, args.in_zp)?);
        Ok(saturate(add(sum, args.out_zp)?))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::QuantMultiplier;

    fn unit_args(in_zp: i32, out_zp: i32) -> PassQuantArgs {
        let one = QuantMultiplier::from_real(1.0).unwrap();
        PassQuantArgs {
            in_zp,
            out_zp,
            in_out: one,
            axis: one,
        }
    }

    // [2, 3, 2] viewed as outer=2, axis=3, inner=2
    const SRC: [i32; 12] = [1, -4, 2, 5, 3, 0, -1, 7, 6, -2, 0, 9];
    const PASS: AxisPass = AxisPass {
        outer_size: 2,
        inner_size: 2,
        axis_size: 3,
    };

    #[test]
    fn lanes_are_strided_by_inner_size() {
        let mut dst = [0i32; 4];
        reduce_sum(&PASS, 0..2, &SRC, &mut dst, &unit_args(0, 0)).unwrap();
        assert_eq!(dst, [6, 1, 5, 14]);
    }

    #[test]
    fn row_block_writes_only_its_rows() {
        let mut dst = [0i32; 2];
        reduce_max(&PASS, 1..2, &SRC, &mut dst, &unit_args(0, 0)).unwrap();
        assert_eq!(dst, [6, 9]);
    }

    #[test]
    fn sum_keeps_input_domain_between_passes() {
        let mut dst = [0i32; 4];
        reduce_sum(&PASS, 0..2, &SRC, &mut dst, &unit_args(2, 0)).unwrap();
        // sum(v - 2) + 2
        assert_eq!(dst, [2, -3, 1, 10]);
    }

    #[test]
    fn min_last_applies_zero_points() {
        let mut dst = [0i8; 4];
        reduce_min_last(&PASS, 0..2, &SRC, &mut dst, &unit_args(1, 3)).unwrap();
        // (min - 1) + 3
        assert_eq!(dst, [3, -2, 1, 0]);
    }

    #[test]
    fn last_pass_saturates() {
        let src = [100, 100, -100, -100];
        let pass = AxisPass {
            outer_size: 2,
            inner_size: 1,
            axis_size: 2,
        };
        let mut dst = [0i8; 2];
        reduce_sum_last(&pass, 0..2, &src, &mut dst, &unit_args(0, 0)).unwrap();
        assert_eq!(dst, [127, -128]);
    }

    #[test]
    fn prod_overflow_is_reported() {
        let src = [1 << 20, 1 << 20];
        let pass = AxisPass {
            outer_size: 1,
            inner_size: 1,
            axis_size: 2,
        };
        let mut dst = [0i32; 1];
        assert_eq!(
            reduce_prod(&pass, 0..1, &src, &mut dst, &unit_args(0, 0)),
            Err(ArithmeticError::MulOverflow)
        );
    }

    #[test]
    fn sum_overflow_is_reported() {
        let src = [i32::MAX, 1];
        let pass = AxisPass {
            outer_size: 1,
            inner_size: 1,
            axis_size: 2,
        };
        let mut dst = [0i32; 1];
        assert_eq!(
            reduce_sum(&pass, 0..1, &src, &mut dst, &unit_args(0, 0)),
            Err(ArithmeticError::AddOverflow)
        );
    }
}
