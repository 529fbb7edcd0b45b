//! Mapped memory used by the rig.
//!
//! This module provides:
//! 1. **Windows:** `MappedWindow` for device registers and `RamWindow` for host-backed stand-ins.
//! 2. **Buffer:** The streaming `DmaBuffer` and its driver descriptor.

/// Streaming DMA buffer and descriptor parsing.
pub mod buffer;

/// Register window implementations (`mmap` and host memory).
pub mod window;

pub use buffer::{BufferDescriptor, DmaBuffer};
pub use window::{Caching, MappedWindow, RamWindow};
