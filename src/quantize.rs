//! Fixed-point requantization arithmetic.
//!
//! # Fixed-Point Multipliers
//!
//! Real-valued rescaling factors (scale ratios, reciprocals of axis lengths, ...)
//! are converted once into a [`QuantMultiplier`] so that the hot loops only do
//! integer arithmetic:
//!
//! ```text
//! real ≈ multiplier / 2^31 * 2^(left_shift - right_shift)
//! ```
//!
//! Applying a multiplier to an `i32` accumulator is a saturating rounding
//! doubling high multiply followed by a rounding arithmetic right shift
//! (the usual gemmlowp/TFLite formulation).
//!
//! ## Rounding
//!
//! - Multiplier derivation rounds half away from zero (`libm::round`).
//! - [`rounding_divide_by_pot`] rounds half away from zero as well.
//! - [`saturating_rounding_doubling_high_mul`] nudges by `2^30` and truncates
//!   toward zero, saturating only for `i32::MIN * i32::MIN`.
//!
//! ## Example
//!
//! ```rust
//! use qreduce::quantize::QuantMultiplier;
//!
//! let quarter = QuantMultiplier::from_real(0.25).unwrap();
//! assert_eq!(quarter.apply(10), 3); // 2.5 rounds away from zero
//! ```

use crate::error::{ReduceError, Result};

const Q31_ONE: i64 = 1 << 31;

/// Decomposes `real` into a Q31 multiplier and a power-of-two exponent.
///
/// Returns `(multiplier, exponent)` with `multiplier` in `[2^30, 2^31)` and
/// `real ≈ multiplier / 2^31 * 2^exponent`. Zero maps to `(0, 0)`.
#[must_use]
pub fn quantize_multiplier(real: f64) -> (i32, i32) {
    if real == 0.0 {
        return (0, 0);
    }
    let (q, mut exponent) = libm::frexp(real);
    let mut q_fixed = libm::round(q * Q31_ONE as f64) as i64;
    if q_fixed == Q31_ONE {
        q_fixed /= 2;
        exponent += 1;
    }
    (q_fixed as i32, exponent)
}

/// `(a * b * 2) >> 32` with rounding, saturating the single overflowing case.
#[inline]
#[must_use]
pub fn saturating_rounding_doubling_high_mul(a: i32, b: i32) -> i32 {
    if a == i32::MIN && b == i32::MIN {
        return i32::MAX;
    }
    let ab = i64::from(a) * i64::from(b);
    let nudge: i64 = if ab >= 0 { 1 << 30 } else { 1 - (1 << 30) };
    ((ab + nudge) / Q31_ONE) as i32
}

/// Divides by `2^exponent`, rounding half away from zero.
#[inline]
#[must_use]
pub fn rounding_divide_by_pot(x: i32, exponent: u32) -> i32 {
    let exponent = exponent.min(62);
    let x = i64::from(x);
    let mask = (1i64 << exponent) - 1;
    let remainder = x & mask;
    let threshold = (mask >> 1) + i64::from(x < 0);
    ((x >> exponent) + i64::from(remainder > threshold)) as i32
}

/// A real multiplier in fixed-point form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QuantMultiplier {
    /// Q31 mantissa in `[2^30, 2^31)`.
    pub multiplier: i32,
    /// Pre-multiplication left shift (non-zero only for reals `>= 1`).
    pub left_shift: u32,
    /// Post-multiplication rounding right shift.
    pub right_shift: u32,
}

impl QuantMultiplier {
    /// Derives the fixed-point form of `real`.
    ///
    /// Ratios below one yield a pure right shift; ratios of one and above
    /// (e.g. `in_scale / out_scale > 1`) fold the excess into `left_shift`.
    ///
    /// # Errors
    ///
    /// [`ReduceError::InvalidMultiplier`] if `real` is not finite or not positive.
    pub fn from_real(real: f64) -> Result<Self> {
        if !real.is_finite() || real <= 0.0 {
            return Err(ReduceError::InvalidMultiplier(real));
        }
        let (multiplier, exponent) = quantize_multiplier(real);
        Ok(Self {
            multiplier,
            left_shift: exponent.max(0).unsigned_abs(),
            right_shift: exponent.min(0).unsigned_abs(),
        })
    }

    /// The real value this multiplier represents.
    #[must_use]
    pub fn to_real(&self) -> f64 {
        let exponent = self.left_shift as i32 - self.right_shift as i32;
        f64::from(self.multiplier) / Q31_ONE as f64 * libm::pow(2.0, f64::from(exponent))
    }

    /// Rescales an accumulator: `round(x * real)` in integer arithmetic.
    ///
    /// The left shift saturates to the `i32` range before the multiply.
    #[inline]
    #[must_use]
    pub fn apply(&self, x: i32) -> i32 {
        // any shift past 32 saturates a non-zero i32 anyway
        let wide = i64::from(x) << self.left_shift.min(32);
        let shifted = wide.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
        rounding_divide_by_pot(
            saturating_rounding_doubling_high_mul(shifted, self.multiplier),
            self.right_shift,
        )
    }
}
