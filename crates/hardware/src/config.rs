//! Configuration for the rig control plane.
//!
//! This module defines every knob the control plane reads at setup. It provides:
//! 1. **Defaults:** The address map, device paths and DRAM timings of the reference rig.
//! 2. **Structures:** Window specs, transport selection, buffer descriptor paths, timing and polling.
//! 3. **Loading:** JSON deserialization via `serde_json`, or `RigConfig::default()`.
//!
//! Every field has a default, so a JSON document only needs the parts that
//! differ from the reference rig.

use std::path::PathBuf;

use serde::Deserialize;

use crate::common::{PhysAddr, Result};
use crate::soc::memory::Caching;
use crate::soc::transport::WordWidth;

/// Reference rig defaults.
mod defaults {
    /// Physical memory device for uncached windows.
    pub const DEVMEM_PATH: &str = "/dev/mem";

    /// Character device of the write-combining window driver.
    pub const WC_DEVICE_PATH: &str = "/dev/bram_wc";

    /// Base of the data DMA channel (bursts to and from the DMA buffer).
    pub const DATA_DMA_BASE: u64 = 0xA000_0000;

    /// Base of the command DMA channel used by the trigger-buffer path.
    pub const CMD_DMA_BASE: u64 = 0x8001_0000;

    /// Size of a DMA channel register window (64 KiB).
    pub const DMA_WINDOW_SIZE: usize = 0x0001_0000;

    /// Base of the command BRAM / bridge window.
    pub const CMD_WINDOW_BASE: u64 = 0xB000_0000;

    /// Size of the command BRAM / bridge window (8 KiB).
    pub const CMD_WINDOW_SIZE: usize = 0x2000;

    /// Base of the stream FIFO's lite (control) interface.
    pub const FIFO_CTRL_BASE: u64 = 0xB000_0000;

    /// Base of the stream FIFO's full (burst data) interface.
    pub const FIFO_DATA_BASE: u64 = 0xB001_0000;

    /// Mapped size of each FIFO interface (64 KiB of MMIO, not FIFO depth).
    pub const FIFO_WINDOW_SIZE: usize = 0x0001_0000;

    /// Transmit FIFO depth in words.
    pub const FIFO_DEPTH_WORDS: u32 = 1024;

    /// Trigger packet length in 32-bit words (512 bits).
    pub const TRIGGER_PACKET_WORDS: usize = 16;

    /// Streaming buffer size attribute (decimal bytes).
    pub const BUFFER_SIZE_ATTR: &str = "/sys/class/u-dma-buf/udmabuf0/size";

    /// Streaming buffer physical address attribute (hexadecimal).
    pub const BUFFER_PHYS_ATTR: &str = "/sys/class/u-dma-buf/udmabuf0/phys_addr";

    /// Streaming buffer device node.
    pub const BUFFER_DEVICE: &str = "/dev/udmabuf0";

    /// Modeled DRAM clock period in nanoseconds (666 MHz).
    pub const TCK_NS: f64 = 1.5;

    /// Precharge period: tRP = 14.16 ns.
    pub const N_RP: u32 = 9;

    /// Activate-to-column delay: tRCD = 14.16 ns.
    pub const N_RCD: u32 = 9;

    /// Column-to-column delay, same bank group: tCCD_L = 5.0 ns.
    pub const N_CCD_L: u32 = 3;

    /// Refresh cycle time: tRFC = 350 ns (8 Gb device).
    pub const N_RFC: u32 = 233;

    /// DMA completion polling budget.
    pub const DMA_MAX_ITERATIONS: u32 = 10_000_000;

    /// FIFO vacancy polling budget.
    pub const FIFO_MAX_POLLS: u32 = 1_000_000;
}

/// One physical range to map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct WindowSpec {
    /// Physical base address.
    pub base: u64,
    /// Size in bytes.
    pub size: usize,
    /// Caching attribute (uncached unless stated).
    #[serde(default)]
    pub caching: Caching,
}

impl WindowSpec {
    /// An uncached window.
    pub const fn uncached(base: u64, size: usize) -> Self {
        Self {
            base,
            size,
            caching: Caching::Uncached,
        }
    }

    /// A write-combining window.
    pub const fn write_combining(base: u64, size: usize) -> Self {
        Self {
            base,
            size,
            caching: Caching::WriteCombining,
        }
    }

    /// Returns the physical base address.
    pub const fn phys(&self) -> PhysAddr {
        PhysAddr(self.base)
    }
}

/// Host device paths.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Physical memory device (uncached windows are mapped at their physical offset).
    pub devmem_path: PathBuf,
    /// Write-combining window driver (mapped at offset 0).
    pub wc_device_path: PathBuf,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            devmem_path: PathBuf::from(defaults::DEVMEM_PATH),
            wc_device_path: PathBuf::from(defaults::WC_DEVICE_PATH),
        }
    }
}

/// Where the streaming buffer driver publishes its buffer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Decimal size attribute.
    pub size_attr: PathBuf,
    /// Hexadecimal physical address attribute.
    pub phys_addr_attr: PathBuf,
    /// Device node to map.
    pub device: PathBuf,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            size_attr: PathBuf::from(defaults::BUFFER_SIZE_ATTR),
            phys_addr_attr: PathBuf::from(defaults::BUFFER_PHYS_ATTR),
            device: PathBuf::from(defaults::BUFFER_DEVICE),
        }
    }
}

/// Command transport selection and its windows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind")]
pub enum TransportConfig {
    /// Fixed-size BRAM packet pushed by a dedicated DMA channel.
    TriggerBuffer {
        /// Command DMA channel registers.
        #[serde(default = "TransportConfig::default_cmd_dma")]
        dma: WindowSpec,
        /// BRAM holding the packet. Uncached by default so the slot 0 store
        /// reaches the BRAM before the DMA length write starts the send.
        #[serde(default = "TransportConfig::default_trigger_buffer")]
        buffer: WindowSpec,
        /// Packet length in 32-bit words.
        #[serde(default = "TransportConfig::default_packet_words")]
        packet_words: usize,
    },
    /// Stream FIFO with vacancy polling.
    FifoGated {
        /// Lite (control) interface.
        #[serde(default = "TransportConfig::default_fifo_ctrl")]
        ctrl: WindowSpec,
        /// Full (burst data) interface; `null` writes through the lite data register.
        #[serde(default = "TransportConfig::default_fifo_data")]
        data: Option<WindowSpec>,
        /// Transmit FIFO depth in words.
        #[serde(default = "TransportConfig::default_fifo_depth")]
        depth_words: u32,
    },
    /// Circular write-combining window.
    BridgeCircular {
        /// The circular window.
        #[serde(default = "TransportConfig::default_cmd_window")]
        window: WindowSpec,
        /// Slot width.
        #[serde(default)]
        word_width: WordWidth,
    },
}

impl TransportConfig {
    fn default_cmd_dma() -> WindowSpec {
        WindowSpec::uncached(defaults::CMD_DMA_BASE, defaults::DMA_WINDOW_SIZE)
    }

    fn default_cmd_window() -> WindowSpec {
        WindowSpec::write_combining(defaults::CMD_WINDOW_BASE, defaults::CMD_WINDOW_SIZE)
    }

    fn default_trigger_buffer() -> WindowSpec {
        WindowSpec::uncached(defaults::CMD_WINDOW_BASE, defaults::CMD_WINDOW_SIZE)
    }

    fn default_packet_words() -> usize {
        defaults::TRIGGER_PACKET_WORDS
    }

    fn default_fifo_ctrl() -> WindowSpec {
        WindowSpec::uncached(defaults::FIFO_CTRL_BASE, defaults::FIFO_WINDOW_SIZE)
    }

    #[allow(clippy::unnecessary_wraps)]
    fn default_fifo_data() -> Option<WindowSpec> {
        Some(WindowSpec::uncached(
            defaults::FIFO_DATA_BASE,
            defaults::FIFO_WINDOW_SIZE,
        ))
    }

    fn default_fifo_depth() -> u32 {
        defaults::FIFO_DEPTH_WORDS
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self::BridgeCircular {
            window: Self::default_cmd_window(),
            word_width: WordWidth::default(),
        }
    }
}

/// DRAM timings in modeled clock cycles.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Modeled clock period in nanoseconds.
    pub tck_ns: f64,
    /// Precharge period (tRP / tCK).
    pub n_rp: u32,
    /// Activate-to-column delay (tRCD / tCK).
    pub n_rcd: u32,
    /// Same-bank-group column-to-column delay (tCCD_L / tCK).
    pub n_ccd_l: u32,
    /// Refresh cycle time (tRFC / tCK).
    pub n_rfc: u32,
}

impl TimingConfig {
    /// Derives cycle counts from datasheet times, all in nanoseconds.
    ///
    /// Each count is `t / tck`, truncated.
    pub fn from_datasheet(tck_ns: f64, t_rp: f64, t_rcd: f64, t_ccd_l: f64, t_rfc: f64) -> Self {
        let cycles = |t: f64| (t / tck_ns) as u32;
        Self {
            tck_ns,
            n_rp: cycles(t_rp),
            n_rcd: cycles(t_rcd),
            n_ccd_l: cycles(t_ccd_l),
            n_rfc: cycles(t_rfc),
        }
    }

    /// Returns the wall-clock time `nck` cycles would take at the modeled clock, in seconds.
    pub fn ideal_seconds(&self, nck: u64) -> f64 {
        nck as f64 * self.tck_ns * 1e-9
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tck_ns: defaults::TCK_NS,
            n_rp: defaults::N_RP,
            n_rcd: defaults::N_RCD,
            n_ccd_l: defaults::N_CCD_L,
            n_rfc: defaults::N_RFC,
        }
    }
}

/// Busy-wait budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Status polls before a DMA wait gives up.
    pub dma_max_iterations: u32,
    /// Vacancy polls before a FIFO send gives up.
    pub fifo_max_polls: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            dma_max_iterations: defaults::DMA_MAX_ITERATIONS,
            fifo_max_polls: defaults::FIFO_MAX_POLLS,
        }
    }
}

/// Root configuration.
///
/// # Examples
///
/// ```
/// use dramrig_core::config::{RigConfig, TransportConfig};
///
/// let json = r#"{
///     "transport": { "kind": "FifoGated", "depth_words": 512 },
///     "timing": { "n_rfc": 240 },
///     "polling": { "dma_max_iterations": 1000 }
/// }"#;
///
/// let config = RigConfig::from_json(json).unwrap();
/// assert!(matches!(
///     config.transport,
///     TransportConfig::FifoGated { depth_words: 512, .. }
/// ));
/// assert_eq!(config.timing.n_rfc, 240);
/// assert_eq!(config.timing.n_rp, 9);
/// assert_eq!(config.polling.dma_max_iterations, 1000);
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    /// Host device paths.
    pub platform: PlatformConfig,
    /// Data DMA channel registers.
    pub data_dma: WindowSpec,
    /// Command transport.
    pub transport: TransportConfig,
    /// Optional debug GPIO block.
    pub gpio: Option<WindowSpec>,
    /// Optional read-only status window.
    pub status: Option<WindowSpec>,
    /// Streaming buffer descriptor.
    pub dma_buffer: BufferConfig,
    /// DRAM timings.
    pub timing: TimingConfig,
    /// Polling budgets.
    pub polling: PollConfig,
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig::default(),
            data_dma: WindowSpec::uncached(defaults::DATA_DMA_BASE, defaults::DMA_WINDOW_SIZE),
            transport: TransportConfig::default(),
            gpio: None,
            status: None,
            dma_buffer: BufferConfig::default(),
            timing: TimingConfig::default(),
            polling: PollConfig::default(),
        }
    }
}

impl RigConfig {
    /// Parses a JSON configuration; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
