//! Streaming DMA buffer.
//!
//! The buffer is a physically contiguous region allocated by an external
//! streaming-buffer driver. The driver publishes two text attributes (decimal
//! size, hexadecimal physical address) and a device node that maps the buffer.
//! This module provides:
//! 1. **Descriptor parsing:** Turning the two attributes into a [`BufferDescriptor`].
//! 2. **`DmaBuffer`:** The mapped view plus the bus address DMA descriptors must use.

use std::io;

use crate::common::{PhysAddr, Result, RigError};
use crate::soc::traits::RegisterWindow;

/// Size and bus address of a streaming buffer, as published by its driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferDescriptor {
    /// Buffer length in bytes.
    pub size: usize,
    /// Bus address of the first byte.
    pub phys_addr: PhysAddr,
}

impl BufferDescriptor {
    /// Parses the decimal `size` attribute.
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the text is not a decimal integer.
    pub fn parse_size(text: &str) -> io::Result<usize> {
        text.trim().parse::<usize>().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad buffer size {:?}: {e}", text.trim()),
            )
        })
    }

    /// Parses the hexadecimal `phys_addr` attribute (with or without `0x`).
    ///
    /// # Errors
    ///
    /// Returns `InvalidData` if the text is not a hexadecimal integer.
    pub fn parse_phys_addr(text: &str) -> io::Result<PhysAddr> {
        let t = text.trim();
        let digits = t
            .strip_prefix("0x")
            .or_else(|| t.strip_prefix("0X"))
            .unwrap_or(t);
        u64::from_str_radix(digits, 16).map(PhysAddr).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("bad buffer phys_addr {t:?}: {e}"),
            )
        })
    }
}

/// The mapped streaming DMA buffer shared by both DMA directions.
///
/// Offsets are in bytes from the start of the buffer; the bus address of a
/// byte is `phys_addr() + offset`.
pub struct DmaBuffer {
    phys_addr: PhysAddr,
    window: Box<dyn RegisterWindow>,
}

impl std::fmt::Debug for DmaBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DmaBuffer")
            .field("phys_addr", &self.phys_addr)
            .field("size", &self.window.size())
            .field("window", &self.window.name())
            .finish()
    }
}

impl DmaBuffer {
    /// Wraps a mapped view of the buffer whose first byte lives at `phys_addr`.
    pub fn new(phys_addr: PhysAddr, window: Box<dyn RegisterWindow>) -> Self {
        Self { phys_addr, window }
    }

    /// Returns the bus address of the first byte.
    pub const fn phys_addr(&self) -> PhysAddr {
        self.phys_addr
    }

    /// Returns the buffer length in bytes.
    pub fn len(&self) -> usize {
        self.window.size()
    }

    /// Returns `true` if the buffer has zero length.
    pub fn is_empty(&self) -> bool {
        self.window.size() == 0
    }

    /// Fails unless `bytes` fit in the buffer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` naming `what` when the buffer is too small.
    pub fn ensure_capacity(&self, what: &'static str, bytes: usize) -> Result<()> {
        if bytes > self.len() {
            return Err(RigError::invalid_field(
                what,
                format!(
                    "{bytes} bytes do not fit the {}-byte DMA buffer",
                    self.len()
                ),
            ));
        }
        Ok(())
    }

    /// Copies `words` into the buffer starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// Propagates out-of-bounds errors from the underlying window.
    pub fn write_words(&mut self, offset: usize, words: &[u32]) -> Result<()> {
        self.window.write_words(offset, words)
    }

    /// Copies words out of the buffer starting at byte `offset`.
    ///
    /// # Errors
    ///
    /// Propagates out-of-bounds errors from the underlying window.
    pub fn read_words(&mut self, offset: usize, out: &mut [u32]) -> Result<()> {
        self.window.read_words(offset, out)
    }
}
