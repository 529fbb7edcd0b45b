//! Register window implementations.
//!
//! This module provides the two backings of [`RegisterWindow`]:
//! 1. **`MappedWindow`:** A `mmap`'d physical range accessed with volatile loads/stores.
//! 2. **`RamWindow`:** Host memory with the same interface, for dry runs and tests.

use std::fs::File;
use std::io;
use std::os::unix::io::AsRawFd;
use std::ptr::{self, NonNull};

use serde::Deserialize;

use crate::common::{PhysAddr, Result, RigError};
use crate::soc::traits::{RegisterWindow, check_access};

/// Caching attribute requested for a mapped window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Caching {
    /// Strongly ordered device memory (`/dev/mem` opened with `O_SYNC`).
    #[default]
    Uncached,
    /// Write-combining mapping served by the rig's kernel window driver.
    ///
    /// Consecutive stores may be merged into bursts before they reach the
    /// fabric, which is what makes command streaming fast.
    WriteCombining,
}

/// A physical range mapped into this process.
///
/// The mapping is released exactly once, when the window is dropped.
#[derive(Debug)]
pub struct MappedWindow {
    name: String,
    base: PhysAddr,
    /// Start of the `mmap` call (page aligned).
    map_ptr: NonNull<u8>,
    map_len: usize,
    /// First byte of the requested range inside the mapping.
    ptr: NonNull<u8>,
    size: usize,
    caching: Caching,
}

// SAFETY: MappedWindow owns its mapping exclusively; the mapping is process-wide
// so moving the owner to another thread does not invalidate it.
unsafe impl Send for MappedWindow {}

impl MappedWindow {
    /// Maps `size` bytes of `file` starting at `file_offset`.
    ///
    /// `base` is the physical address the mapped range corresponds to and is only
    /// used for diagnostics and DMA programming. For `/dev/mem` the file offset
    /// equals `base`; for the write-combining driver and the streaming buffer
    /// device it is zero. Unaligned offsets are rounded down to a page and the
    /// returned window starts at the requested byte.
    ///
    /// # Errors
    ///
    /// Returns `ResourceAcquisition` if `size` is zero or `mmap` fails.
    pub fn map(
        file: &File,
        name: &str,
        base: PhysAddr,
        size: usize,
        file_offset: u64,
        caching: Caching,
    ) -> Result<Self> {
        if size == 0 {
            return Err(RigError::acquisition(
                name,
                io::Error::new(io::ErrorKind::InvalidInput, "window size is 0"),
            ));
        }

        let page = page_size();
        let page_offset = (file_offset % page as u64) as usize;
        let map_offset = file_offset - page_offset as u64;
        let map_len = size + page_offset;
        let off = libc::off_t::try_from(map_offset).map_err(|_| {
            RigError::acquisition(
                name,
                io::Error::new(io::ErrorKind::InvalidInput, "offset exceeds off_t"),
            )
        })?;

        // SAFETY: the fd is open for the duration of the call, the length is
        // non-zero and the offset is page aligned. The result is checked below.
        let raw = unsafe {
            libc::mmap(
                ptr::null_mut(),
                map_len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                file.as_raw_fd(),
                off,
            )
        };
        if raw == libc::MAP_FAILED {
            return Err(RigError::acquisition(name, io::Error::last_os_error()));
        }
        let map_ptr = NonNull::new(raw.cast::<u8>()).ok_or_else(|| {
            RigError::acquisition(name, io::Error::other("mmap returned null"))
        })?;
        // SAFETY: page_offset < page <= map_len, so the result stays inside the mapping.
        let ptr = unsafe { map_ptr.add(page_offset) };

        tracing::debug!(
            window = name,
            base = %base,
            size,
            ?caching,
            "mapped register window at {ptr:p}"
        );

        Ok(Self {
            name: name.to_owned(),
            base,
            map_ptr,
            map_len,
            ptr,
            size,
            caching,
        })
    }

    /// Returns the caching attribute this window was mapped with.
    pub const fn caching(&self) -> Caching {
        self.caching
    }

    #[inline]
    fn check(&self, offset: usize, width: usize) -> Result<()> {
        check_access(&self.name, self.size, offset, width)?;
        if offset % width != 0 {
            return Err(RigError::invalid_field(
                "register offset",
                format!("{offset:#x} is not {width}-byte aligned"),
            ));
        }
        Ok(())
    }
}

impl RegisterWindow for MappedWindow {
    fn name(&self) -> &str {
        &self.name
    }

    fn base(&self) -> PhysAddr {
        self.base
    }

    fn size(&self) -> usize {
        self.size
    }

    fn read_u32(&mut self, offset: usize) -> Result<u32> {
        self.check(offset, 4)?;
        // SAFETY: bounds and alignment checked above; the mapping lives as long as self.
        Ok(unsafe { ptr::read_volatile(self.ptr.as_ptr().add(offset).cast::<u32>()) })
    }

    fn write_u32(&mut self, offset: usize, val: u32) -> Result<()> {
        self.check(offset, 4)?;
        // SAFETY: bounds and alignment checked above; the mapping lives as long as self.
        unsafe { ptr::write_volatile(self.ptr.as_ptr().add(offset).cast::<u32>(), val) };
        Ok(())
    }

    fn read_u64(&mut self, offset: usize) -> Result<u64> {
        self.check(offset, 8)?;
        // SAFETY: bounds and alignment checked above; the mapping lives as long as self.
        Ok(unsafe { ptr::read_volatile(self.ptr.as_ptr().add(offset).cast::<u64>()) })
    }

    fn write_u64(&mut self, offset: usize, val: u64) -> Result<()> {
        self.check(offset, 8)?;
        // SAFETY: bounds and alignment checked above; the mapping lives as long as self.
        unsafe { ptr::write_volatile(self.ptr.as_ptr().add(offset).cast::<u64>(), val) };
        Ok(())
    }
}

impl Drop for MappedWindow {
    fn drop(&mut self) {
        // SAFETY: map_ptr/map_len are exactly what mmap returned; Drop runs once.
        let rc = unsafe { libc::munmap(self.map_ptr.as_ptr().cast(), self.map_len) };
        if rc != 0 {
            tracing::warn!(
                window = %self.name,
                "munmap failed: {}",
                io::Error::last_os_error()
            );
        } else {
            tracing::debug!(window = %self.name, base = %self.base, "unmapped register window");
        }
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let page = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    usize::try_from(page).unwrap_or(4096)
}

/// A register window backed by host memory.
///
/// All registers read back what was last written (initially zero). Used as the
/// backing of a DMA buffer in dry runs and by tests that only need storage.
#[derive(Debug, Clone)]
pub struct RamWindow {
    name: String,
    base: PhysAddr,
    data: Vec<u8>,
}

impl RamWindow {
    /// Creates a zeroed window of `size` bytes that claims to map `base`.
    pub fn new(name: &str, base: PhysAddr, size: usize) -> Self {
        Self {
            name: name.to_owned(),
            base,
            data: vec![0; size],
        }
    }

    /// Returns the raw contents of the window.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }
}

impl RegisterWindow for RamWindow {
    fn name(&self) -> &str {
        &self.name
    }

    fn base(&self) -> PhysAddr {
        self.base
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn read_u32(&mut self, offset: usize) -> Result<u32> {
        check_access(&self.name, self.data.len(), offset, 4)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.data[offset..offset + 4]);
        Ok(u32::from_le_bytes(bytes))
    }

    fn write_u32(&mut self, offset: usize, val: u32) -> Result<()> {
        check_access(&self.name, self.data.len(), offset, 4)?;
        self.data[offset..offset + 4].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }

    fn read_u64(&mut self, offset: usize) -> Result<u64> {
        check_access(&self.name, self.data.len(), offset, 8)?;
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&self.data[offset..offset + 8]);
        Ok(u64::from_le_bytes(bytes))
    }

    fn write_u64(&mut self, offset: usize, val: u64) -> Result<()> {
        check_access(&self.name, self.data.len(), offset, 8)?;
        self.data[offset..offset + 8].copy_from_slice(&val.to_le_bytes());
        Ok(())
    }
}
