//! AXI DMA channel driver (simple, non scatter-gather mode).
//!
//! Each direction of the channel is programmed independently. It provides:
//! 1. **Start:** Enable Run/Stop if needed, program the 32-bit address, write the length to arm.
//! 2. **Wait:** Poll the Idle bit against an iteration budget, failing with a decoded snapshot.
//! 3. **Diagnostics:** A pure decode of the control/status pair into named flags.
//!
//! `start` never blocks; `wait` is the only call that spins, and only for as
//! many polls as it is told.

use std::fmt;

use crate::common::{PhysAddr, Result, RigError};
use crate::soc::traits::RegisterWindow;

/// Register offsets of the DMA channel.
pub mod regs {
    /// MM2S control register.
    pub const MM2S_DMACR: usize = 0x00;
    /// MM2S status register.
    pub const MM2S_DMASR: usize = 0x04;
    /// MM2S source address (low 32 bits).
    pub const MM2S_SA: usize = 0x18;
    /// MM2S source address (high 32 bits).
    pub const MM2S_SA_MSB: usize = 0x1C;
    /// MM2S transfer length in bytes; writing it starts the transfer.
    pub const MM2S_LENGTH: usize = 0x28;
    /// S2MM control register.
    pub const S2MM_DMACR: usize = 0x30;
    /// S2MM status register.
    pub const S2MM_DMASR: usize = 0x34;
    /// S2MM destination address (low 32 bits).
    pub const S2MM_DA: usize = 0x48;
    /// S2MM destination address (high 32 bits).
    pub const S2MM_DA_MSB: usize = 0x4C;
    /// S2MM transfer length in bytes; writing it arms the channel.
    pub const S2MM_LENGTH: usize = 0x58;
}

/// Control register bits.
pub mod cr {
    /// Run (1) / Stop (0).
    pub const RUN_STOP: u32 = 1 << 0;
    /// Soft reset in progress.
    pub const RESET: u32 = 1 << 2;
    /// Interrupt-on-complete enable.
    pub const IOC_IRQ_EN: u32 = 1 << 12;
    /// Delay interrupt enable.
    pub const DLY_IRQ_EN: u32 = 1 << 13;
    /// Error interrupt enable.
    pub const ERR_IRQ_EN: u32 = 1 << 14;
}

/// Status register bits.
pub mod sr {
    /// Channel halted.
    pub const HALTED: u32 = 1 << 0;
    /// Channel idle (last transfer complete).
    pub const IDLE: u32 = 1 << 1;
    /// Scatter-gather engine included in the IP.
    pub const SG_INCLD: u32 = 1 << 2;
    /// DMA internal error.
    pub const DMA_INT_ERR: u32 = 1 << 3;
    /// DMA slave error.
    pub const DMA_SLV_ERR: u32 = 1 << 4;
    /// DMA decode error.
    pub const DMA_DEC_ERR: u32 = 1 << 5;
    /// Interrupt on complete.
    pub const IOC_IRQ: u32 = 1 << 12;
    /// Delay interrupt.
    pub const DLY_IRQ: u32 = 1 << 13;
    /// Error interrupt.
    pub const ERR_IRQ: u32 = 1 << 14;
    /// Any of the three transfer error bits.
    pub const ERROR_MASK: u32 = DMA_INT_ERR | DMA_SLV_ERR | DMA_DEC_ERR;
}

/// Largest length the simple-mode length register accepts (26-bit field).
pub const MAX_TRANSFER_BYTES: u32 = (1 << 26) - 1;

/// Direction of a DMA channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DmaDirection {
    /// Memory to stream (host buffer → fabric).
    Send,
    /// Stream to memory (fabric → host buffer).
    Receive,
}

impl DmaDirection {
    const fn control(self) -> usize {
        match self {
            Self::Send => regs::MM2S_DMACR,
            Self::Receive => regs::S2MM_DMACR,
        }
    }

    const fn status(self) -> usize {
        match self {
            Self::Send => regs::MM2S_DMASR,
            Self::Receive => regs::S2MM_DMASR,
        }
    }

    const fn address(self) -> usize {
        match self {
            Self::Send => regs::MM2S_SA,
            Self::Receive => regs::S2MM_DA,
        }
    }

    const fn address_hi(self) -> usize {
        match self {
            Self::Send => regs::MM2S_SA_MSB,
            Self::Receive => regs::S2MM_DA_MSB,
        }
    }

    const fn length(self) -> usize {
        match self {
            Self::Send => regs::MM2S_LENGTH,
            Self::Receive => regs::S2MM_LENGTH,
        }
    }
}

impl fmt::Display for DmaDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Send => "MM2S",
            Self::Receive => "S2MM",
        })
    }
}

/// Decoded control/status register pair of one DMA direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct DmaStatus {
    /// Raw control register.
    pub control: u32,
    /// Raw status register.
    pub status: u32,
    /// Run/Stop bit set.
    pub running: bool,
    /// Soft reset in progress.
    pub resetting: bool,
    /// Channel halted.
    pub halted: bool,
    /// Channel idle.
    pub idle: bool,
    /// Scatter-gather included.
    pub sg_included: bool,
    /// Internal error.
    pub internal_error: bool,
    /// Slave error.
    pub slave_error: bool,
    /// Decode error.
    pub decode_error: bool,
    /// Interrupt on complete pending.
    pub ioc_irq: bool,
    /// Delay interrupt pending.
    pub delay_irq: bool,
    /// Error interrupt pending.
    pub error_irq: bool,
}

impl DmaStatus {
    /// Decodes a raw control/status pair.
    pub const fn decode(control: u32, status: u32) -> Self {
        Self {
            control,
            status,
            running: control & cr::RUN_STOP != 0,
            resetting: control & cr::RESET != 0,
            halted: status & sr::HALTED != 0,
            idle: status & sr::IDLE != 0,
            sg_included: status & sr::SG_INCLD != 0,
            internal_error: status & sr::DMA_INT_ERR != 0,
            slave_error: status & sr::DMA_SLV_ERR != 0,
            decode_error: status & sr::DMA_DEC_ERR != 0,
            ioc_irq: status & sr::IOC_IRQ != 0,
            delay_irq: status & sr::DLY_IRQ != 0,
            error_irq: status & sr::ERR_IRQ != 0,
        }
    }

    /// Returns `true` if any internal, slave or decode error is latched.
    pub const fn has_error(&self) -> bool {
        self.internal_error || self.slave_error || self.decode_error
    }

    /// Returns `true` if the channel is running and not in reset.
    pub const fn is_enabled(&self) -> bool {
        self.running && !self.resetting
    }
}

impl fmt::Display for DmaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DMACR={:#010x} DMASR={:#010x}", self.control, self.status)?;
        let flags = [
            (self.halted, "halted"),
            (self.idle, "idle"),
            (self.sg_included, "sg"),
            (self.internal_error, "internal-err"),
            (self.slave_error, "slave-err"),
            (self.decode_error, "decode-err"),
            (self.ioc_irq, "ioc"),
            (self.delay_irq, "dly"),
            (self.error_irq, "err-irq"),
        ];
        for (_, name) in flags.iter().filter(|(set, _)| *set) {
            write!(f, " {name}")?;
        }
        Ok(())
    }
}

/// One AXI DMA channel (both directions) behind a register window.
pub struct DmaEngine {
    window: Box<dyn RegisterWindow>,
    max_iterations: u32,
}

impl fmt::Debug for DmaEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DmaEngine")
            .field("window", &self.window.name())
            .field("base", &self.window.base())
            .field("max_iterations", &self.max_iterations)
            .finish()
    }
}

impl DmaEngine {
    /// Creates an engine over `window`; `send`/`recv` poll at most `max_iterations` times.
    pub fn new(window: Box<dyn RegisterWindow>, max_iterations: u32) -> Self {
        Self {
            window,
            max_iterations,
        }
    }

    /// Returns the default polling budget used by `send` and `recv`.
    pub const fn max_iterations(&self) -> u32 {
        self.max_iterations
    }

    /// Arms one transfer and returns immediately.
    ///
    /// Sets Run/Stop only if it is clear, programs the 32-bit address (high
    /// word written as zero), then writes the length, which starts the
    /// transfer.
    ///
    /// # Errors
    ///
    /// Returns `InvalidField` for addresses above 4 GiB or lengths the length
    /// register cannot hold, before any register is written.
    pub fn start(&mut self, direction: DmaDirection, addr: PhysAddr, length: u32) -> Result<()> {
        let addr_lo = addr.low_u32().ok_or_else(|| {
            RigError::invalid_field("DMA address", format!("{addr} needs more than 32 bits"))
        })?;
        if length == 0 || length > MAX_TRANSFER_BYTES {
            return Err(RigError::invalid_field(
                "DMA length",
                format!("{length} bytes is outside 1..={MAX_TRANSFER_BYTES}"),
            ));
        }

        let control = self.window.read_u32(direction.control())?;
        if control & cr::RUN_STOP == 0 {
            self.window
                .write_u32(direction.control(), control | cr::RUN_STOP)?;
        }
        self.window.write_u32(direction.address(), addr_lo)?;
        self.window.write_u32(direction.address_hi(), 0)?;
        self.window.write_u32(direction.length(), length)?;

        tracing::trace!(%direction, %addr, length, "DMA armed");
        Ok(())
    }

    /// Polls until the channel reports Idle, at most `max_iterations` times.
    ///
    /// Returns the number of polls it took.
    ///
    /// # Errors
    ///
    /// - `DmaFault` as soon as an error bit is seen.
    /// - `DmaTimeout` once the budget is spent, carrying the final decoded
    ///   control/status pair.
    pub fn wait(&mut self, direction: DmaDirection, max_iterations: u32) -> Result<u32> {
        let mut polls = 0;
        while polls < max_iterations {
            let status = self.window.read_u32(direction.status())?;
            polls += 1;
            if status & sr::IDLE != 0 {
                return Ok(polls);
            }
            if status & sr::ERROR_MASK != 0 {
                let snapshot = self.status(direction)?;
                tracing::warn!(%direction, %snapshot, polls, "DMA fault");
                return Err(RigError::DmaFault {
                    direction,
                    snapshot,
                });
            }
        }

        let snapshot = self.status(direction)?;
        tracing::warn!(%direction, %snapshot, polls, "DMA timed out");
        Err(RigError::DmaTimeout {
            direction,
            polls,
            snapshot,
        })
    }

    /// Memory-to-stream transfer: `start` then `wait` with the default budget.
    ///
    /// # Errors
    ///
    /// See [`DmaEngine::start`] and [`DmaEngine::wait`].
    pub fn send(&mut self, addr: PhysAddr, length: u32) -> Result<()> {
        self.start(DmaDirection::Send, addr, length)?;
        self.wait(DmaDirection::Send, self.max_iterations)
            .map(|_| ())
    }

    /// Stream-to-memory transfer: `start` then `wait` with the default budget.
    ///
    /// # Errors
    ///
    /// See [`DmaEngine::start`] and [`DmaEngine::wait`].
    pub fn recv(&mut self, addr: PhysAddr, length: u32) -> Result<()> {
        self.start(DmaDirection::Receive, addr, length)?;
        self.wait(DmaDirection::Receive, self.max_iterations)
            .map(|_| ())
    }

    /// Reads and decodes the control/status pair of one direction.
    ///
    /// # Errors
    ///
    /// Propagates register access errors.
    pub fn status(&mut self, direction: DmaDirection) -> Result<DmaStatus> {
        let control = self.window.read_u32(direction.control())?;
        let status = self.window.read_u32(direction.status())?;
        Ok(DmaStatus::decode(control, status))
    }

    /// Returns `true` if the direction is running and not in reset.
    ///
    /// # Errors
    ///
    /// Propagates register access errors.
    pub fn is_enabled(&mut self, direction: DmaDirection) -> Result<bool> {
        Ok(self.status(direction)?.is_enabled())
    }

    /// Returns `true` if an internal, slave or decode error is latched.
    ///
    /// # Errors
    ///
    /// Propagates register access errors.
    pub fn has_error(&mut self, direction: DmaDirection) -> Result<bool> {
        Ok(self.status(direction)?.has_error())
    }

    /// Fails if the direction is in reset or has a latched error.
    ///
    /// # Errors
    ///
    /// Returns `DmaFault` with the decoded snapshot.
    pub fn check_health(&mut self, direction: DmaDirection) -> Result<()> {
        let snapshot = self.status(direction)?;
        if snapshot.resetting || snapshot.has_error() {
            return Err(RigError::DmaFault {
                direction,
                snapshot,
            });
        }
        Ok(())
    }
}
