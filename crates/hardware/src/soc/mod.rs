//! Rig hardware below the protocol layer.
//!
//! This module organizes everything the host touches on the FPGA: mapped
//! register windows and the streaming buffer, the DMA and GPIO drivers, the
//! command transports, and the resource manager that assembles them.

/// Resource lifecycle: platform access, setup and teardown.
pub mod builder;

/// Register-level device drivers (DMA, GPIO).
pub mod devices;

/// Mapped windows and the streaming DMA buffer.
pub mod memory;

/// Register window trait.
pub mod traits;

/// Command transports.
pub mod transport;

pub use builder::{DevMemPlatform, HardwareContext, MemoryHandle, Platform, ResourceManager};
