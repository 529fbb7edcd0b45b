//! Control plane for an FPGA-hosted DRAM test rig.
//!
//! This crate drives a custom memory controller IP core from the host. It provides:
//! 1. **Resources:** Mapping register windows and the streaming DMA buffer, with all-or-nothing setup.
//! 2. **DMA:** Register-level start/wait of the AXI DMA channels with decoded status snapshots.
//! 3. **Transports:** Three interchangeable command paths (trigger buffer, gated FIFO, circular bridge).
//! 4. **Protocol:** Precharge, activate, read, write and refresh primitives with nCK accounting.
//! 5. **Rows:** Row reads and writes, including a batch write that overlaps DMA with command issue.
//! 6. **Patterns:** A deterministic row pattern for write/verify round trips.
//!
//! The library never installs a `tracing` subscriber; callers choose where
//! logs go.
//!
//! # Examples
//!
//! ```no_run
//! use dramrig_core::{DevMemPlatform, ResourceManager, RigConfig, RowOperations, pattern};
//!
//! # fn main() -> dramrig_core::Result<()> {
//! let config = RigConfig::default();
//! let timing = config.timing;
//! let mut rig = ResourceManager::new(config, DevMemPlatform);
//! rig.setup()?;
//!
//! if let Some(ctx) = rig.context_mut() {
//!     let data = pattern::pattern(0, 0, 0, 0x1234);
//!     let mut rows = RowOperations::new(ctx, timing);
//!     rows.write_row_batch(&data, 0, 0, 0)?;
//!     rows.all_bank_refresh(0)?;
//!
//!     let mut out = vec![0; data.len()];
//!     rows.read_row(&mut out, 0, 0, 0)?;
//!     assert_eq!(pattern::first_mismatch(&data, &out), None);
//! }
//!
//! rig.cleanup();
//! # Ok(())
//! # }
//! ```

/// Common types and constants (addresses, geometry, errors).
pub mod common;
/// Rig configuration (defaults, address map, timings, budgets).
pub mod config;
/// Deterministic row patterns and verification.
pub mod pattern;
/// DRAM command encoding, primitives and row operations.
pub mod protocol;
/// Rig hardware (windows, buffer, DMA, GPIO, transports, resource lifecycle).
pub mod soc;
/// Run statistics.
pub mod stats;

/// Crate-wide error and result types.
pub use crate::common::{Result, RigError};
/// Root configuration type; use `RigConfig::default()` or `RigConfig::from_json`.
pub use crate::config::RigConfig;
/// Protocol entry points.
pub use crate::protocol::{ProtocolEngine, RowOperations};
/// Resource lifecycle types.
pub use crate::soc::{DevMemPlatform, HardwareContext, Platform, ResourceManager};
/// Run statistics.
pub use crate::stats::RunStats;
