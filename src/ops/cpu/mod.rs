//! Parallel CPU kernels
//!
//! # CPU Backend
//!
//! Integer kernels for quantized inference. Each kernel is set up once for a
//! shape and set of quantization parameters, then run any number of times on
//! a [`Context`](crate::runtime::Context).
//!
//! ## Features
//!
//! - Parallel passes using [`rayon`](https://docs.rs/rayon) through the
//!   context's thread pool
//! - Fixed-point requantization only; no floating point in the hot loops
//! - Scratch memory drawn from the context's allocator
//!
//! ## Implemented Ops
//!
//! - `reduce_int8`: mean, max, min, product, sum and sum of squares over any
//!   set of axes
//!
//! ## Design Goals
//!
//! - Bit-identical results for any worker count
//! - Every failure reported as a [`ReduceError`](crate::error::ReduceError),
//!   never a panic

pub mod reduce_int8;

pub use self::reduce_int8::{ReduceInt8Kernel, ReduceMode, ReduceParameter};
