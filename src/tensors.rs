//! Core tensor data structures.
//!
//! # Quantized Tensors
//!
//! This module defines the in-memory tensor consumed and produced by the
//! kernels: a row-major buffer, its shape, and the affine quantization
//! parameters that map stored integers to real values:
//!
//! ```text
//! real = (quantized - zero_point) * scale
//! ```
//!
//! ## Design Highlights
//! - `Tensor<T>` owns its backing buffer; kernels borrow it for reading or
//!   write into `data_mut()` in place.
//! - Quantization parameters are a list; kernels read the first entry
//!   (per-tensor quantization).
//! - Parameters are validated through `briny`'s `Validate`/`TrustedData` before
//!   a kernel derives fixed-point multipliers from them.
//! - The `tensor!` macro builds tensors from nested literal arrays.
//!
//! ## Limitations
//! - Row-major only
//! - No broadcasting, strides or views
//! - Per-channel quantization is not interpreted
//!
//! ## Example
//!
//! ```rust
//! use qreduce::tensors::Tensor;
//! let t = Tensor::<i8>::new(vec![2, 3], vec![1, 2, 3, 4, 5, 6]).with_quant_param(0.5, 0);
//! assert_eq!(t.shape(), &[2, 3]);
//! assert_eq!(t.elements_num(), 6);
//! ```

use briny::prelude::*;

use crate::error::{ReduceError, Result};

/// Affine quantization parameters of a tensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantArg {
    pub scale: f64,
    pub zero_point: i32,
}

impl QuantArg {
    /// Creates a new parameter pair (unvalidated).
    #[must_use]
    pub const fn new(scale: f64, zero_point: i32) -> Self {
        Self { scale, zero_point }
    }
}

impl Validate for QuantArg {
    fn validate(&self) -> core::result::Result<(), ValidationError> {
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(ValidationError);
        }
        if !(i32::from(i8::MIN)..=i32::from(i8::MAX)).contains(&self.zero_point) {
            return Err(ValidationError);
        }
        Ok(())
    }
}

/// Represents an N-dimensional tensor with a shape and flat row-major data.
///
/// - `shape` defines the structure, e.g. `[2, 3]` for a 2×3 matrix.
/// - `data` holds the flattened content in row-major order.
/// - `quant_params` holds the quantization parameters (may be empty for
///   non-quantized data).
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
    pub quant_params: Vec<QuantArg>,
}

impl<T> Tensor<T> {
    /// Creates a new tensor with the given shape and flat data.
    ///
    /// # Panics
    /// Panics if the number of elements in `data` does not match the shape product.
    pub fn new(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Self {
        let shape = shape.into();
        assert_eq!(
            shape.iter().product::<usize>(),
            data.len(),
            "shape {:?} is incompatible with {} data elements",
            shape,
            data.len()
        );
        Self {
            shape,
            data,
            quant_params: Vec::new(),
        }
    }

    /// Creates a zero-filled tensor of the given shape.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self
    where
        T: Default + Clone,
    {
        let shape = shape.into();
        let len = shape.iter().product();
        Self::new(shape, vec![T::default(); len])
    }

    /// Appends a quantization parameter pair, builder style.
    #[must_use]
    pub fn with_quant_param(mut self, scale: f64, zero_point: i32) -> Self {
        self.quant_params.push(QuantArg::new(scale, zero_point));
        self
    }

    /// Number of elements (product of the shape).
    #[must_use]
    pub fn elements_num(&self) -> usize {
        self.data.len()
    }

    /// The tensor shape.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Read access to the backing buffer.
    #[must_use]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Write access to the backing buffer.
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// The first quantization parameter pair, validated.
    ///
    /// # Errors
    /// - [`ReduceError::MissingQuantParams`] if the tensor has none.
    /// - [`ReduceError::InvalidQuantParams`] if the scale is not a positive
    ///   finite number or the zero point is outside the int8 range.
    pub fn quant_param(&self) -> Result<QuantArg> {
        let raw = *self
            .quant_params
            .first()
            .ok_or(ReduceError::MissingQuantParams)?;
        let trusted = TrustedData::new(raw).map_err(|_| ReduceError::InvalidQuantParams {
            scale: raw.scale,
            zero_point: raw.zero_point,
        })?;
        Ok(trusted.into_inner())
    }
}

impl Tensor<i8> {
    /// Dequantizes every element with the first quantization parameter pair.
    ///
    /// # Errors
    /// Same as [`Tensor::quant_param`].
    pub fn dequantize(&self) -> Result<Vec<f64>> {
        let QuantArg { scale, zero_point } = self.quant_param()?;
        Ok(self
            .data
            .iter()
            .map(|&q| f64::from(i32::from(q) - zero_point) * scale)
            .collect())
    }
}

/// Defines a tensor from nested literal arrays.
///
/// Supports arbitrary dimensionality as long as sublists are uniform in shape.
/// Leaves may be negative literals.
/// The element type is inferred, so annotate the binding for `i8` data.
///
/// # Example
/// ```
/// use qreduce::{tensor, tensors::Tensor};
/// let t: Tensor<i8> = tensor!([[1, 2], [3, 4]]);
/// assert_eq!(t.shape, vec![2, 2]);
/// ```
#[macro_export]
macro_rules! tensor {
    ($lit:literal) => {
        $crate::tensors::Tensor::new(Vec::<usize>::new(), vec![$lit])
    };

    ([ $( $lit:literal ),+ $(,)? ]) => {{
        let data = vec![ $( $lit ),+ ];
        $crate::tensors::Tensor::new(vec![data.len()], data)
    }};

    ([ $( [ $( $inner:tt )* ] ),+ $(,)? ]) => {{
        let children = vec![ $( $crate::tensor!([ $( $inner )* ]) ),+ ];
        let first_shape = children[0].shape.clone();
        assert!(children.iter().all(|c| c.shape == first_shape),
            "ragged tensor literal (rows have mismatched shapes)");
        let mut shape = vec![children.len()];
        shape.extend_from_slice(&first_shape);
        let mut data = Vec::with_capacity(children.len() * children[0].data.len());
        for mut c in children { data.append(&mut c.data); }
        $crate::tensors::Tensor::new(shape, data)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quant_param_reads_first_entry() {
        let t = Tensor::<i8>::zeros([2]).with_quant_param(0.5, 3).with_quant_param(2.0, 0);
        assert_eq!(t.quant_param().unwrap(), QuantArg::new(0.5, 3));
    }

    #[test]
    fn quant_param_missing_is_reported() {
        let t = Tensor::<i8>::zeros([2]);
        assert!(matches!(t.quant_param(), Err(ReduceError::MissingQuantParams)));
    }

    #[test]
    fn quant_param_rejects_bad_scale_and_zero_point() {
        for (scale, zp) in [(0.0, 0), (-1.0, 0), (f64::NAN, 0), (1.0, 200), (1.0, -129)] {
            let t = Tensor::<i8>::zeros([1]).with_quant_param(scale, zp);
            assert!(matches!(
                t.quant_param(),
                Err(ReduceError::InvalidQuantParams { .. })
            ));
        }
    }

    #[test]
    fn dequantize_applies_scale_and_zero_point() {
        let t = Tensor::<i8>::new([3], vec![-2, 0, 4]).with_quant_param(0.5, 2);
        assert_eq!(t.dequantize().unwrap(), vec![-2.0, -1.0, 1.0]);
    }

    #[test]
    fn macro_builds_nested_shapes() {
        let t: Tensor<i8> = crate::tensor!([[[1, 2, 3]], [[4, 5, 6]]]);
        assert_eq!(t.shape, vec![2, 1, 3]);
        assert_eq!(t.data, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn macro_accepts_negative_leaves() {
        let t: Tensor<i8> = crate::tensor!([[-128, 0], [5, -1]]);
        assert_eq!(t.shape, vec![2, 2]);
        assert_eq!(t.data, vec![-128, 0, 5, -1]);

        let row: Tensor<i8> = crate::tensor!([-3, 4, -5]);
        assert_eq!(row.shape, vec![3]);
    }
}
