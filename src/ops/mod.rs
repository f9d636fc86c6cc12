//! # Operation Layer
//!
//! Kernels and the entry points that drive them.
//!
//! ## Submodules
//!
//! - [`cpu`] — multi-threaded CPU kernels
//! - [`dispatch`] — one-shot entry points that set up and run a kernel
//!
//! ## Example
//!
//! ```rust
//! use qreduce::config::RuntimeConfig;
//! use qreduce::ops::cpu::{ReduceMode, ReduceParameter};
//! use qreduce::ops::dispatch::reduce;
//! use qreduce::runtime::Context;
//! use qreduce::tensors::Tensor;
//!
//! let ctx = Context::new(&RuntimeConfig::default().with_thread_num(2)).unwrap();
//! let input = Tensor::<i8>::new(vec![2, 2], vec![1, 2, 3, 4]).with_quant_param(1.0, 0);
//! let param = ReduceParameter::new(ReduceMode::Sum, [1]);
//! let out = reduce(&ctx, param, &input, 1.0, 0).unwrap();
//! assert_eq!(out.data(), &[3, 7]);
//! ```
//!
//! ## Extending
//!
//! To add a kernel:
//!
//! 1. Implement it under `cpu`, with setup separated from `run`
//! 2. Add a one-shot function to `dispatch`
//! 3. Keep shape checks in the kernel's planning step

pub mod cpu;
pub mod dispatch;
