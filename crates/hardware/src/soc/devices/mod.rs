//! Memory-mapped devices on the rig.
//!
//! This module contains the register-level drivers for:
//! - **DMA:** The AXI DMA channel carrying bursts and the trigger-buffer command path.
//! - **GPIO:** Debug probes from the memory controller.

/// AXI DMA channel driver and status decoding.
pub mod dma;

/// Dual-channel GPIO.
pub mod gpio;

pub use dma::{DmaDirection, DmaEngine, DmaStatus};
pub use gpio::Gpio;
