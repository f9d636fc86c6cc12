//! Scoped scratch memory for a single kernel run.

use crate::error::{ReduceError, Result};
use crate::runtime::Allocator;

/// Intermediate `i32` buffers of one run, returned to the allocator on drop.
///
/// Holds one buffer per non-terminal pass plus the widened copy of the input.
/// A partially failed allocation keeps whatever was obtained so the release
/// path can hand it back.
pub struct ScratchBuffers<'a> {
    allocator: &'a dyn Allocator,
    widened: Option<Vec<i32>>,
    buffers: Vec<Vec<i32>>,
}

impl core::fmt::Debug for ScratchBuffers<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScratchBuffers")
            .field("widened", &self.widened.as_ref().map(Vec::len))
            .field("buffers", &self.buffers.iter().map(Vec::len).collect::<Vec<_>>())
            .finish()
    }
}

impl<'a> ScratchBuffers<'a> {
    #[must_use]
    pub fn new(allocator: &'a dyn Allocator) -> Self {
        Self {
            allocator,
            widened: None,
            buffers: Vec::new(),
        }
    }

    /// Allocates one buffer of `sizes[i]` elements per entry, in order.
    ///
    /// # Errors
    /// [`ReduceError::ResourceExhausted`] on the first refused allocation.
    pub fn allocate(&mut self, sizes: &[usize]) -> Result<()> {
        self.buffers.reserve(sizes.len());
        for &len in sizes {
            let buffer = self.malloc(len)?;
            self.buffers.push(buffer);
        }
        Ok(())
    }

    /// Allocates the buffer holding the sign-extended input.
    ///
    /// # Errors
    /// [`ReduceError::ResourceExhausted`] if the allocator refuses.
    pub fn allocate_input_widen(&mut self, len: usize) -> Result<()> {
        let buffer = self.malloc(len)?;
        if let Some(old) = self.widened.replace(buffer) {
            self.allocator.free(old);
        }
        Ok(())
    }

    /// Copies `input` into the widen buffer, sign-extending each value.
    ///
    /// # Panics
    /// Panics if the widen buffer was not allocated with `input.len()` elements.
    pub fn widen_input(&mut self, input: &[i8]) {
        let widened = self
            .widened
            .as_mut()
            .filter(|w| w.len() == input.len());
        let Some(widened) = widened else {
            panic!("widen buffer does not match input of {} elements", input.len());
        };
        for (dst, &src) in widened.iter_mut().zip(input) {
            *dst = i32::from(src);
        }
    }

    /// Widened input and the pass buffers, borrowed together.
    pub fn split_mut(&mut self) -> (&[i32], &mut [Vec<i32>]) {
        let widened = self.widened.as_deref().unwrap_or(&[]);
        (widened, &mut self.buffers)
    }

    /// Returns every held buffer to the allocator. Safe to call repeatedly.
    pub fn release_all(&mut self) {
        let count = self.len();
        if count == 0 {
            return;
        }
        for buffer in self.buffers.drain(..) {
            self.allocator.free(buffer);
        }
        if let Some(widened) = self.widened.take() {
            self.allocator.free(widened);
        }
        log::trace!("released {count} scratch buffers");
    }

    /// Number of buffers currently held, the widen buffer included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buffers.len() + usize::from(self.widened.is_some())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn malloc(&self, len: usize) -> Result<Vec<i32>> {
        let bytes = len * size_of::<i32>();
        match self.allocator.malloc(len) {
            Some(buffer) if buffer.len() == len => {
                log::trace!("allocated scratch buffer of {bytes} bytes");
                Ok(buffer)
            }
            Some(buffer) => {
                log::error!(
                    "allocator returned {} elements for a request of {len}",
                    buffer.len()
                );
                self.allocator.free(buffer);
                Err(ReduceError::ResourceExhausted { bytes })
            }
            None => {
                log::error!("scratch allocation of {bytes} bytes failed");
                Err(ReduceError::ResourceExhausted { bytes })
            }
        }
    }
}

impl Drop for ScratchBuffers<'_> {
    fn drop(&mut self) {
        self.release_all();
    }
}
