//! Physical address type.
//!
//! Register windows, the streaming DMA buffer and DMA descriptors all speak in
//! bus (physical) addresses, while the host only ever touches their mapped
//! views. Keeping physical addresses in their own type stops a mapped offset
//! from being handed to a DMA address register by accident.

use std::fmt;

/// A physical (bus) address as seen by the FPGA fabric.
///
/// The DMA engine in the rig is configured for 32-bit addressing, so most
/// consumers call [`PhysAddr::low_u32`] before programming a register.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(self) -> u64 {
        self.0
    }

    /// Returns the address as a 32-bit bus address, or `None` if it lies above 4 GiB.
    #[inline]
    pub fn low_u32(self) -> Option<u32> {
        u32::try_from(self.0).ok()
    }

    /// Returns this address advanced by `bytes`.
    #[inline]
    pub const fn offset(self, bytes: u64) -> Self {
        Self(self.0.wrapping_add(bytes))
    }
}

impl fmt::Display for PhysAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

impl From<u64> for PhysAddr {
    fn from(addr: u64) -> Self {
        Self(addr)
    }
}
