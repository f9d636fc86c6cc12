//! Fixed-point arguments for each reduction pass.
//!
//! With `real = (q - zp) * scale` on both sides, each mode folds its scale
//! factors into integer multipliers:
//!
//! | mode        | per-pass multiplier                                   | in/out |
//! |-------------|-------------------------------------------------------|--------|
//! | `Mean`      | `1 / axis_size`                                       | yes    |
//! | `Prod`      | `in_scale ^ (axis_size - 1)`, last pass `in_scale ^ axis_size / out_scale` | no |
//! | `SumSquare` | `in_scale`, last pass `in_scale² / out_scale`         | no     |
//!
//! A per-pass ratio that underflows to zero becomes the zero multiplier, so
//! that pass yields only its zero point.
//! | `Sum`       | -                                                     | yes    |
//! | `Max/Min`   | -                                                     | yes    |

use crate::error::{ReduceError, Result};
use crate::quantize::QuantMultiplier;
use crate::tensors::QuantArg;

use super::{ReduceMode, ReductionPlan};

/// Quantization arguments of one kernel, fixed at setup.
#[derive(Debug, Clone, PartialEq)]
pub struct ReduceQuantArgs {
    pub in_scale: f64,
    pub in_zp: i32,
    pub out_scale: f64,
    pub out_zp: i32,
    /// `in_scale / out_scale`.
    pub in_out: QuantMultiplier,
    /// One entry per pass for `Mean`, `Prod` and `SumSquare`; empty otherwise.
    pub per_axis: Vec<QuantMultiplier>,
}

/// Arguments a reducer sees during one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassQuantArgs {
    pub in_zp: i32,
    pub out_zp: i32,
    pub in_out: QuantMultiplier,
    /// Multiplier of this pass; the default value for modes without one.
    pub axis: QuantMultiplier,
}

impl ReduceQuantArgs {
    /// Computes the multipliers of `mode` for every pass of `plan`.
    ///
    /// # Errors
    /// - [`ReduceError::InvalidMultiplier`] if a scale ratio is degenerate.
    /// - [`ReduceError::ResourceExhausted`] if the per-axis list cannot be
    ///   allocated.
    pub fn calculate(
        mode: ReduceMode,
        input: QuantArg,
        output: QuantArg,
        plan: &ReductionPlan,
    ) -> Result<Self> {
        let in_out = QuantMultiplier::from_real(input.scale / output.scale)?;

        let mut per_axis = Vec::new();
        let ratios: Option<Vec<f64>> = match mode {
            ReduceMode::Mean => Some(
                plan.passes
                    .iter()
                    .map(|p| 1.0 / p.axis_size as f64)
                    .collect(),
            ),
            ReduceMode::Prod => {
                let last = plan.num_axes() - 1;
                Some(
                    plan.passes
                        .iter()
                        .enumerate()
                        .map(|(i, p)| {
                            let ratio = libm::pow(input.scale, p.axis_size as f64 - 1.0);
                            if i == last {
                                ratio * input.scale / output.scale
                            } else {
                                ratio
                            }
                        })
                        .collect(),
                )
            }
            ReduceMode::SumSquare => {
                let last = plan.num_axes() - 1;
                Some(
                    (0..plan.num_axes())
                        .map(|i| {
                            if i == last {
                                input.scale * input.scale / output.scale
                            } else {
                                input.scale
                            }
                        })
                        .collect(),
                )
            }
            ReduceMode::Sum | ReduceMode::Max | ReduceMode::Min => None,
        };

        if let Some(ratios) = ratios {
            per_axis.try_reserve_exact(ratios.len()).map_err(|_| {
                log::error!("{mode}: per-axis multiplier allocation failed");
                ReduceError::ResourceExhausted {
                    bytes: ratios.len() * size_of::<QuantMultiplier>(),
                }
            })?;
            for ratio in ratios {
                let multiplier = if ratio == 0.0 {
                    log::warn!("{mode}: per-axis multiplier underflowed to zero");
                    QuantMultiplier::default()
                } else {
                    QuantMultiplier::from_real(ratio)?
                };
                per_axis.push(multiplier);
            }
        }

        log::trace!(
            "{mode}: in_out={:?}, {} per-axis multipliers",
            in_out,
            per_axis.len()
        );

        Ok(Self {
            in_scale: input.scale,
            in_zp: input.zero_point,
            out_scale: output.scale,
            out_zp: output.zero_point,
            in_out,
            per_axis,
        })
    }

    /// Snapshot of the arguments for pass `index`.
    #[must_use]
    pub fn for_pass(&self, index: usize) -> PassQuantArgs {
        PassQuantArgs {
            in_zp: self.in_zp,
            out_zp: self.out_zp,
            in_out: self.in_out,
            axis: self.per_axis.get(index).copied().unwrap_or_default(),
        }
    }
}
