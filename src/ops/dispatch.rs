//! One-shot Entry Points
//!
//! Functions here set up a kernel for a single call and run it right away.
//! Callers that run the same reduction repeatedly should keep a
//! [`ReduceInt8Kernel`] instead and only pay for setup once.
//!
//! # Example
//! ```rust
//! use qreduce::config::RuntimeConfig;
//! use qreduce::ops::cpu::{ReduceMode, ReduceParameter};
//! use qreduce::ops::dispatch::reduce_into;
//! use qreduce::runtime::Context;
//! use qreduce::tensors::Tensor;
//!
//! let ctx = Context::new(&RuntimeConfig::default()).unwrap();
//! let input = Tensor::<i8>::new(vec![4], vec![10, 20, 30, 40]).with_quant_param(0.5, 0);
//! let mut output = Tensor::<i8>::zeros(vec![1]).with_quant_param(0.5, 0);
//! reduce_into(&ctx, ReduceParameter::all_axes(ReduceMode::Max), &input, &mut output).unwrap();
//! assert_eq!(output.data(), &[40]);
//! ```

use crate::error::Result;
use crate::ops::cpu::{ReduceInt8Kernel, ReduceParameter};
use crate::runtime::Context;
use crate::tensors::Tensor;

/// Reduces `input` into the caller-provided `output`.
///
/// `output` supplies the output quantization parameters and must hold as many
/// elements as the reduced shape.
///
/// # Errors
/// Any setup or run error of [`ReduceInt8Kernel`].
pub fn reduce_into(
    ctx: &Context,
    param: ReduceParameter,
    input: &Tensor<i8>,
    output: &mut Tensor<i8>,
) -> Result<()> {
    let kernel = ReduceInt8Kernel::new(param, input, output)?;
    kernel.run(ctx, input, output)
}

/// Reduces `input` into a new tensor quantized with `out_scale`/`out_zp`.
///
/// # Errors
/// Any setup or run error of [`ReduceInt8Kernel`].
pub fn reduce(
    ctx: &Context,
    param: ReduceParameter,
    input: &Tensor<i8>,
    out_scale: f64,
    out_zp: i32,
) -> Result<Tensor<i8>> {
    let template = Tensor::<i8>::zeros(vec![1]).with_quant_param(out_scale, out_zp);
    let kernel = ReduceInt8Kernel::new(param, input, &template)?;
    let mut output = Tensor::zeros(kernel.output_shape()).with_quant_param(out_scale, out_zp);
    kernel.run(ctx, input, &mut output)?;
    Ok(output)
}
