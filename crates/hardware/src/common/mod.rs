//! Common types shared across the rig control plane.
//!
//! This module provides:
//! 1. **Addresses:** A strong type for physical (bus) addresses.
//! 2. **Constants:** Burst and row geometry, address field masks.
//! 3. **Errors:** The crate-wide error enum and `Result` alias.

/// Physical address type.
pub mod addr;

/// Burst, row and field-mask constants.
pub mod constants;

/// Error types.
pub mod error;

pub use addr::PhysAddr;
pub use constants::{BURST_BYTES, BURST_WORDS, COLUMNS_PER_ROW, ROW_BYTES, ROW_WORDS};
pub use error::{Result, RigError};
