//! Hardware resource lifecycle.
//!
//! This module turns a [`RigConfig`] into a live [`HardwareContext`]. It performs:
//! 1. **Platform access:** Opens the physical-memory handle and maps each window through a [`Platform`].
//! 2. **Transport assembly:** Builds the configured command transport (resetting the FIFO if selected).
//! 3. **Buffer discovery:** Reads the streaming buffer's size and address attributes and maps it.
//! 4. **Teardown:** Releases everything exactly once, in reverse order of acquisition.
//!
//! Setup is all-or-nothing: every resource is held in a local while the next
//! one is acquired, so an early `?` return drops (unmaps, closes) what was
//! already taken, newest first.

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use crate::common::{PhysAddr, Result, RigError};
use crate::config::{PlatformConfig, RigConfig, TransportConfig, WindowSpec};
use crate::soc::devices::{DmaEngine, Gpio};
use crate::soc::memory::{BufferDescriptor, Caching, DmaBuffer, MappedWindow};
use crate::soc::traits::RegisterWindow;
use crate::soc::transport::{BridgeTransport, CommandTransport, FifoTransport, TriggerTransport};

/// An open handle through which physical ranges are mapped.
///
/// Dropping the handle closes it; windows already mapped stay valid.
pub trait MemoryHandle: Send + fmt::Debug {
    /// Maps `spec` into the process as a register window called `name`.
    ///
    /// # Errors
    ///
    /// `ResourceAcquisition` if the range cannot be mapped.
    fn map(&mut self, name: &str, spec: &WindowSpec) -> Result<Box<dyn RegisterWindow>>;
}

/// Host services the resource manager needs.
///
/// Production uses [`DevMemPlatform`]; tests substitute host memory.
pub trait Platform {
    /// Opens the physical-memory access handle.
    ///
    /// # Errors
    ///
    /// `ResourceAcquisition` if the device cannot be opened.
    fn open_memory(&mut self, config: &PlatformConfig) -> Result<Box<dyn MemoryHandle>>;

    /// Reads one text attribute of the streaming buffer driver.
    ///
    /// # Errors
    ///
    /// `ResourceAcquisition` if the attribute cannot be read.
    fn read_attribute(&mut self, path: &Path) -> Result<String>;

    /// Maps the streaming buffer described by `descriptor` from `device`.
    ///
    /// # Errors
    ///
    /// `ResourceAcquisition` if the device cannot be opened or mapped.
    fn map_buffer(
        &mut self,
        device: &Path,
        descriptor: BufferDescriptor,
    ) -> Result<Box<dyn RegisterWindow>>;
}

fn open_sync(path: &Path) -> io::Result<File> {
    OpenOptions::new()
        .read(true)
        .write(true)
        .custom_flags(libc::O_SYNC)
        .open(path)
}

/// `/dev/mem` plus the write-combining window driver.
#[derive(Debug, Default, Clone, Copy)]
pub struct DevMemPlatform;

/// Open `/dev/mem`; the write-combining device is opened on first use.
#[derive(Debug)]
struct DevMemHandle {
    devmem: File,
    wc_path: PathBuf,
    wc: Option<File>,
}

impl DevMemHandle {
    fn wc_file(&mut self) -> Result<&File> {
        if self.wc.is_none() {
            let file = open_sync(&self.wc_path)
                .map_err(|e| RigError::acquisition(self.wc_path.display().to_string(), e))?;
            tracing::debug!(path = %self.wc_path.display(), "opened write-combining device");
            self.wc = Some(file);
        }
        self.wc.as_ref().ok_or_else(|| {
            RigError::acquisition(
                self.wc_path.display().to_string(),
                io::Error::other("write-combining device not open"),
            )
        })
    }
}

impl MemoryHandle for DevMemHandle {
    fn map(&mut self, name: &str, spec: &WindowSpec) -> Result<Box<dyn RegisterWindow>> {
        let window = match spec.caching {
            Caching::Uncached => MappedWindow::map(
                &self.devmem,
                name,
                spec.phys(),
                spec.size,
                spec.base,
                Caching::Uncached,
            )?,
            // The driver serves one fixed physical range from offset 0.
            Caching::WriteCombining => MappedWindow::map(
                self.wc_file()?,
                name,
                spec.phys(),
                spec.size,
                0,
                Caching::WriteCombining,
            )?,
        };
        Ok(Box::new(window))
    }
}

impl Platform for DevMemPlatform {
    fn open_memory(&mut self, config: &PlatformConfig) -> Result<Box<dyn MemoryHandle>> {
        let devmem = open_sync(&config.devmem_path)
            .map_err(|e| RigError::acquisition(config.devmem_path.display().to_string(), e))?;
        tracing::debug!(path = %config.devmem_path.display(), "opened physical memory");
        Ok(Box::new(DevMemHandle {
            devmem,
            wc_path: config.wc_device_path.clone(),
            wc: None,
        }))
    }

    fn read_attribute(&mut self, path: &Path) -> Result<String> {
        let text = fs::read_to_string(path)
            .map_err(|e| RigError::acquisition(path.display().to_string(), e))?;
        tracing::debug!(path = %path.display(), value = text.trim(), "read buffer attribute");
        Ok(text)
    }

    fn map_buffer(
        &mut self,
        device: &Path,
        descriptor: BufferDescriptor,
    ) -> Result<Box<dyn RegisterWindow>> {
        let file =
            open_sync(device).map_err(|e| RigError::acquisition(device.display().to_string(), e))?;
        let window = MappedWindow::map(
            &file,
            "dma-buffer",
            descriptor.phys_addr,
            descriptor.size,
            0,
            Caching::Uncached,
        )?;
        Ok(Box::new(window))
    }
}

/// Every hardware resource the protocol layer drives.
///
/// Fields drop in declaration order, which is the reverse of the order
/// [`ResourceManager::setup`] acquires them in.
pub struct HardwareContext {
    pub(crate) buffer: DmaBuffer,
    status: Option<Box<dyn RegisterWindow>>,
    gpio: Option<Gpio>,
    pub(crate) transport: CommandTransport,
    pub(crate) data_dma: DmaEngine,
    _memory: Option<Box<dyn MemoryHandle>>,
}

impl fmt::Debug for HardwareContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HardwareContext")
            .field("buffer", &self.buffer)
            .field("status", &self.status.as_ref().map(|w| w.base()))
            .field("gpio", &self.gpio)
            .field("transport", &self.transport)
            .field("data_dma", &self.data_dma)
            .finish_non_exhaustive()
    }
}

impl HardwareContext {
    /// Assembles a context from already-acquired parts.
    pub fn new(data_dma: DmaEngine, transport: CommandTransport, buffer: DmaBuffer) -> Self {
        Self {
            buffer,
            status: None,
            gpio: None,
            transport,
            data_dma,
            _memory: None,
        }
    }

    /// Attaches a debug GPIO block.
    #[must_use]
    pub fn with_gpio(mut self, gpio: Gpio) -> Self {
        self.gpio = Some(gpio);
        self
    }

    /// Attaches a read-only status window.
    #[must_use]
    pub fn with_status(mut self, window: Box<dyn RegisterWindow>) -> Self {
        self.status = Some(window);
        self
    }

    /// Returns the data DMA channel.
    pub fn data_dma_mut(&mut self) -> &mut DmaEngine {
        &mut self.data_dma
    }

    /// Returns the command transport.
    pub const fn transport(&self) -> &CommandTransport {
        &self.transport
    }

    /// Returns the command transport for direct use.
    pub fn transport_mut(&mut self) -> &mut CommandTransport {
        &mut self.transport
    }

    /// Returns the streaming DMA buffer.
    pub const fn buffer(&self) -> &DmaBuffer {
        &self.buffer
    }

    /// Returns the streaming DMA buffer for direct use.
    pub fn buffer_mut(&mut self) -> &mut DmaBuffer {
        &mut self.buffer
    }

    /// Returns the GPIO block, if one was configured.
    pub fn gpio_mut(&mut self) -> Option<&mut Gpio> {
        self.gpio.as_mut()
    }

    /// Reads one 32-bit word of the status window.
    ///
    /// # Errors
    ///
    /// `InvalidField` if no status window was configured, or register access errors.
    pub fn read_status(&mut self, offset: usize) -> Result<u32> {
        match self.status.as_mut() {
            Some(window) => window.read_u32(offset),
            None => Err(RigError::invalid_field(
                "status window",
                "no status window is configured",
            )),
        }
    }
}

/// Owns the platform and, between `setup` and `cleanup`, the hardware context.
pub struct ResourceManager<P: Platform> {
    config: RigConfig,
    platform: P,
    context: Option<HardwareContext>,
}

impl<P: Platform> fmt::Debug for ResourceManager<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceManager")
            .field("transport", &self.config.transport)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

impl<P: Platform> ResourceManager<P> {
    /// Creates a manager; nothing is acquired until [`ResourceManager::setup`].
    pub const fn new(config: RigConfig, platform: P) -> Self {
        Self {
            config,
            platform,
            context: None,
        }
    }

    /// Returns the configuration this manager sets up from.
    pub const fn config(&self) -> &RigConfig {
        &self.config
    }

    /// Returns the platform.
    pub const fn platform(&self) -> &P {
        &self.platform
    }

    /// Returns `true` between a successful `setup` and `cleanup`.
    pub const fn is_active(&self) -> bool {
        self.context.is_some()
    }

    /// Returns the live context, or `None` if not set up.
    pub fn context_mut(&mut self) -> Option<&mut HardwareContext> {
        self.context.as_mut()
    }

    /// Acquires every configured resource.
    ///
    /// Calling `setup` while already active is a no-op.
    ///
    /// # Errors
    ///
    /// The first acquisition failure, after everything acquired before it
    /// has been released.
    pub fn setup(&mut self) -> Result<()> {
        if self.context.is_some() {
            tracing::debug!("resources already acquired");
            return Ok(());
        }
        match acquire(&self.config, &mut self.platform) {
            Ok(context) => {
                tracing::info!(
                    transport = ?context.transport.kind(),
                    buffer = %context.buffer.phys_addr(),
                    buffer_len = context.buffer.len(),
                    "rig resources acquired"
                );
                self.context = Some(context);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "setup failed; partial resources released");
                Err(e)
            }
        }
    }

    /// Releases every resource. Safe to call any number of times.
    pub fn cleanup(&mut self) {
        if let Some(context) = self.context.take() {
            drop(context);
            tracing::info!("rig resources released");
        }
    }
}

impl<P: Platform> Drop for ResourceManager<P> {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn map_transport(
    config: &RigConfig,
    memory: &mut dyn MemoryHandle,
) -> Result<CommandTransport> {
    let transport = match &config.transport {
        TransportConfig::TriggerBuffer {
            dma,
            buffer,
            packet_words,
        } => {
            let dma = DmaEngine::new(memory.map("cmd-dma", dma)?, config.polling.dma_max_iterations);
            let buffer = memory.map("cmd-buffer", buffer)?;
            CommandTransport::TriggerBuffer(TriggerTransport::new(buffer, dma, *packet_words)?)
        }
        TransportConfig::FifoGated {
            ctrl,
            data,
            depth_words,
        } => {
            let ctrl = memory.map("fifo-ctrl", ctrl)?;
            let data = data
                .as_ref()
                .map(|spec| memory.map("fifo-data", spec))
                .transpose()?;
            let mut fifo =
                FifoTransport::new(ctrl, data, *depth_words, config.polling.fifo_max_polls);
            fifo.reset()?;
            CommandTransport::FifoGated(fifo)
        }
        TransportConfig::BridgeCircular { window, word_width } => {
            let window = memory.map("bridge", window)?;
            CommandTransport::BridgeCircular(BridgeTransport::new(window, *word_width)?)
        }
    };
    Ok(transport)
}

fn read_descriptor<P: Platform>(config: &RigConfig, platform: &mut P) -> Result<BufferDescriptor> {
    let paths = &config.dma_buffer;
    let size_text = platform.read_attribute(&paths.size_attr)?;
    let size = BufferDescriptor::parse_size(&size_text)
        .map_err(|e| RigError::acquisition(paths.size_attr.display().to_string(), e))?;
    let phys_text = platform.read_attribute(&paths.phys_addr_attr)?;
    let phys_addr: PhysAddr = BufferDescriptor::parse_phys_addr(&phys_text)
        .map_err(|e| RigError::acquisition(paths.phys_addr_attr.display().to_string(), e))?;
    Ok(BufferDescriptor { size, phys_addr })
}

fn acquire<P: Platform>(config: &RigConfig, platform: &mut P) -> Result<HardwareContext> {
    let mut memory = platform.open_memory(&config.platform)?;

    let data_dma = DmaEngine::new(
        memory.map("data-dma", &config.data_dma)?,
        config.polling.dma_max_iterations,
    );
    let transport = map_transport(config, memory.as_mut())?;
    let gpio = config
        .gpio
        .as_ref()
        .map(|spec| memory.map("gpio", spec).map(Gpio::new))
        .transpose()?;
    let status = config
        .status
        .as_ref()
        .map(|spec| memory.map("status", spec))
        .transpose()?;

    let descriptor = read_descriptor(config, platform)?;
    let buffer_window = platform.map_buffer(&config.dma_buffer.device, descriptor)?;
    let buffer = DmaBuffer::new(descriptor.phys_addr, buffer_window);

    Ok(HardwareContext {
        buffer,
        status,
        gpio,
        transport,
        data_dma,
        _memory: Some(memory),
    })
}
