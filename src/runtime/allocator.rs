//! Scratch memory allocation contract.

/// Source of `i32` working buffers for kernels.
///
/// `malloc` returning `None` is treated as resource exhaustion by every
/// caller. Buffers obtained from `malloc` are handed back through `free`,
/// which lets instrumented allocators account for outstanding memory.
pub trait Allocator: Send + Sync {
    /// Returns a zero-initialized buffer of exactly `len` elements.
    fn malloc(&self, len: usize) -> Option<Vec<i32>>;

    /// Takes back a buffer previously returned by [`Allocator::malloc`].
    fn free(&self, buffer: Vec<i32>);
}

/// Heap allocator backed by `Vec`, reporting failure instead of aborting.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocator;

impl Allocator for DefaultAllocator {
    fn malloc(&self, len: usize) -> Option<Vec<i32>> {
        let mut buffer = Vec::new();
        buffer.try_reserve_exact(len).ok()?;
        buffer.resize(len, 0);
        Some(buffer)
    }

    fn free(&self, buffer: Vec<i32>) {
        drop(buffer);
    }
}
