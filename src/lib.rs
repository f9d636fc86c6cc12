//! qreduce: quantized int8 reduce kernels for CPU inference.
//!
//! Reduces int8 tensors over any set of axes using integer arithmetic only.
//! Scale ratios are turned into fixed-point multipliers once at setup, each
//! axis becomes one parallel pass, and the last pass requantizes into the
//! output tensor.
//!
//! # Features
//!
//! - Mean, max, min, product, sum and sum-of-squares reductions.
//! - Gemmlowp-style fixed-point requantization.
//! - Per-axis passes spread over a rayon worker pool, with results that do not
//!   depend on the worker count.
//! - Scratch memory from a pluggable allocator, released on every exit path.
//!
//! # Modules
//!
//! - [`tensors`] — Quantized tensor type and quantization parameters.
//! - [`quantize`] — Fixed-point multiplier derivation and application.
//! - [`ops`] — Reduce kernels and one-shot entry points.
//! - [`runtime`] — Thread pool, allocator contract and execution context.
//! - [`config`] — Worker count defaults and runtime configuration.
//! - [`error`] — Error type and status codes.
//!
//! # Example
//!
//! ```rust
//! use qreduce::config::RuntimeConfig;
//! use qreduce::ops::cpu::{ReduceInt8Kernel, ReduceMode, ReduceParameter};
//! use qreduce::runtime::Context;
//! use qreduce::tensors::Tensor;
//!
//! let ctx = Context::new(&RuntimeConfig::default().with_thread_num(2)).unwrap();
//! let input = Tensor::<i8>::new(vec![2, 2], vec![1, 2, 3, 4]).with_quant_param(1.0, 0);
//! let mut output = Tensor::<i8>::zeros(vec![1]).with_quant_param(1.0, 0);
//!
//! let kernel = ReduceInt8Kernel::new(ReduceParameter::all_axes(ReduceMode::Mean), &input, &output).unwrap();
//! kernel.run(&ctx, &input, &mut output).unwrap();
//! assert_eq!(output.data(), &[3]); // 2.5 rounds away from zero
//! ```

pub mod config;
pub mod error;
pub mod ops;
pub mod quantize;
pub mod runtime;
pub mod tensors;

pub use crate::error::{ReduceError, Result};
pub use crate::ops::cpu::{ReduceInt8Kernel, ReduceMode, ReduceParameter};
pub use crate::runtime::Context;
pub use crate::tensors::{QuantArg, Tensor};
