//! Register window trait for memory-mapped hardware.
//!
//! This module defines the `RegisterWindow` trait implemented by every mapped
//! region the control plane touches. It provides:
//! 1. **Identification:** `name`, physical `base` and `size` for diagnostics.
//! 2. **Access:** Bounds-checked 32- and 64-bit reads and writes at window-relative offsets.
//! 3. **Bulk copy:** Word-slice helpers used for bursts into and out of the DMA buffer.
//!
//! Production windows are `mmap`'d device memory; tests and dry runs back the
//! same trait with plain host memory.

use crate::common::{PhysAddr, Result, RigError};

/// A mapped view of one physical address range.
///
/// Reads take `&mut self` because a device register read can have side
/// effects (clear-on-read status, FIFO pops) and fakes need to observe them.
pub trait RegisterWindow: Send {
    /// Returns a short name for this window (e.g., `"data-dma"`, `"bridge"`).
    fn name(&self) -> &str;
    /// Returns the physical base address the window maps.
    fn base(&self) -> PhysAddr;
    /// Returns the window size in bytes.
    fn size(&self) -> usize;
    /// Reads a 32-bit register at the given byte offset.
    fn read_u32(&mut self, offset: usize) -> Result<u32>;
    /// Writes a 32-bit register at the given byte offset.
    fn write_u32(&mut self, offset: usize, val: u32) -> Result<()>;
    /// Reads a 64-bit register at the given byte offset.
    fn read_u64(&mut self, offset: usize) -> Result<u64>;
    /// Writes a 64-bit register at the given byte offset.
    fn write_u64(&mut self, offset: usize, val: u64) -> Result<()>;

    /// Writes consecutive 32-bit words starting at `offset` (default: word-by-word).
    fn write_words(&mut self, offset: usize, words: &[u32]) -> Result<()> {
        check_access(self.name(), self.size(), offset, words.len() * 4)?;
        for (i, word) in words.iter().enumerate() {
            self.write_u32(offset + i * 4, *word)?;
        }
        Ok(())
    }

    /// Reads consecutive 32-bit words starting at `offset` into `out` (default: word-by-word).
    fn read_words(&mut self, offset: usize, out: &mut [u32]) -> Result<()> {
        check_access(self.name(), self.size(), offset, out.len() * 4)?;
        for (i, word) in out.iter_mut().enumerate() {
            *word = self.read_u32(offset + i * 4)?;
        }
        Ok(())
    }
}

/// Validates that `[offset, offset + width)` lies inside a window of `size` bytes.
///
/// # Errors
///
/// Returns `RegisterOutOfBounds` when the access overruns the window.
#[inline]
pub fn check_access(window: &str, size: usize, offset: usize, width: usize) -> Result<()> {
    match offset.checked_add(width) {
        Some(end) if end <= size => Ok(()),
        _ => Err(RigError::RegisterOutOfBounds {
            window: window.to_owned(),
            offset,
            width,
            size,
        }),
    }
}
