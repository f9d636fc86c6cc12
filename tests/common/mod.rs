#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use qreduce::config::RuntimeConfig;
use qreduce::runtime::{Allocator, Context};
use qreduce::tensors::Tensor;
use qreduce::ReduceMode;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Allocator that counts requests and outstanding buffers, optionally
/// refusing the n-th request (1-based) or handing out short buffers.
#[derive(Debug, Default)]
pub struct CountingAllocator {
    calls: AtomicUsize,
    outstanding: AtomicUsize,
    fail_on: Option<usize>,
    shortfall: usize,
}

impl CountingAllocator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_on(call: usize) -> Arc<Self> {
        Arc::new(Self {
            fail_on: Some(call),
            ..Self::default()
        })
    }

    pub fn short_by(shortfall: usize) -> Arc<Self> {
        Arc::new(Self {
            shortfall,
            ..Self::default()
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::SeqCst)
    }
}

impl Allocator for CountingAllocator {
    fn malloc(&self, len: usize) -> Option<Vec<i32>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return None;
        }
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        Some(vec![0; len.saturating_sub(self.shortfall)])
    }

    fn free(&self, _buffer: Vec<i32>) {
        self.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn context(threads: usize) -> Context {
    Context::new(&RuntimeConfig::default().with_thread_num(threads)).unwrap()
}

pub fn context_with(threads: usize, allocator: Arc<CountingAllocator>) -> Context {
    context(threads).with_allocator(allocator)
}

/// Reduces in floating point, then quantizes with the output parameters.
pub fn reference_reduce(
    mode: ReduceMode,
    input: &Tensor<i8>,
    axes: &[usize],
    out_scale: f64,
    out_zp: i32,
) -> Vec<i8> {
    let real = input.dequantize().unwrap();
    let shape = input.shape();

    let mut out_shape = shape.to_vec();
    for &a in axes {
        out_shape[a] = 1;
    }
    let out_len: usize = out_shape.iter().product();
    let init = match mode {
        ReduceMode::Max => f64::NEG_INFINITY,
        ReduceMode::Min => f64::INFINITY,
        ReduceMode::Prod => 1.0,
        _ => 0.0,
    };
    let mut acc = vec![init; out_len];
    let mut count = vec![0usize; out_len];

    for (flat, &x) in real.iter().enumerate() {
        let mut rem = flat;
        let mut out_idx = 0;
        let mut out_stride = 1;
        for d in (0..shape.len()).rev() {
            let i = rem % shape[d];
            rem /= shape[d];
            if !axes.contains(&d) {
                out_idx += i * out_stride;
            }
            out_stride *= out_shape[d];
        }
        let slot = &mut acc[out_idx];
        *slot = match mode {
            ReduceMode::Mean | ReduceMode::Sum => *slot + x,
            ReduceMode::Max => slot.max(x),
            ReduceMode::Min => slot.min(x),
            ReduceMode::Prod => *slot * x,
            ReduceMode::SumSquare => *slot + x * x,
        };
        count[out_idx] += 1;
    }

    acc.iter()
        .zip(&count)
        .map(|(&v, &n)| {
            let v = if mode == ReduceMode::Mean { v / n as f64 } else { v };
            let q = (v / out_scale).round() as i64 + i64::from(out_zp);
            q.clamp(-128, 127) as i8
        })
        .collect()
}
