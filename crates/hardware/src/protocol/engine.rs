//! DRAM command primitives.
//!
//! The engine turns each DRAM operation into a command word, hands it to the
//! command transport with its padding, and moves burst data through the data
//! DMA channel and the streaming buffer. Every primitive returns the number
//! of modeled DRAM clock cycles it occupies, `1 + interval`, whatever
//! transport carries it.
//!
//! Protocol preconditions (an activated row before column commands) are the
//! caller's responsibility and are not checked here.

use crate::common::{BURST_BYTES, BURST_WORDS, Result, RigError};
use crate::soc::builder::HardwareContext;

use super::command::{Command, CommandWord};

/// Cycles occupied by a command followed by `interval` padding words.
#[inline]
pub const fn nck(interval: u32) -> u64 {
    1 + interval as u64
}

/// Issues DRAM commands against a borrowed hardware context.
///
/// The exclusive borrow makes the engine the only writer to the transport,
/// the DMA channel and the buffer for its lifetime.
#[derive(Debug)]
pub struct ProtocolEngine<'a> {
    ctx: &'a mut HardwareContext,
}

impl<'a> ProtocolEngine<'a> {
    /// Creates an engine over `ctx`.
    pub fn new(ctx: &'a mut HardwareContext) -> Self {
        Self { ctx }
    }

    /// Returns the underlying context.
    pub fn context_mut(&mut self) -> &mut HardwareContext {
        &mut *self.ctx
    }

    pub(crate) fn issue(&mut self, cmd: Command, interval: u32) -> Result<u64> {
        let word = CommandWord::from(cmd);
        self.ctx.transport.send(word.raw(), interval)?;
        tracing::trace!(?word, interval, "command issued");
        Ok(nck(interval))
    }

    /// Precharges `bank`, or all banks when `all_banks` is set.
    ///
    /// `rank` is accepted for interface symmetry but not encoded; the command
    /// word has no rank field.
    ///
    /// # Errors
    ///
    /// Transport errors (e.g. `PacketTooLong`).
    pub fn precharge(&mut self, bank: u8, _rank: u8, all_banks: bool, interval: u32) -> Result<u64> {
        self.issue(Command::Precharge { bank, all_banks }, interval)
    }

    /// Activates `row` in `bank`. `rank` is not encoded.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub fn activate(&mut self, bank: u8, row: u32, _rank: u8, interval: u32) -> Result<u64> {
        self.issue(Command::Activate { bank, row }, interval)
    }

    /// Reads the burst at `col` of the open row into `out`.
    ///
    /// Issues the read command, receives one 64-byte burst into the start of
    /// the streaming buffer, then copies it out.
    ///
    /// # Errors
    ///
    /// `InvalidField` if `out` is not exactly one burst, transport or DMA errors.
    pub fn read(&mut self, out: &mut [u32], bank: u8, col: u16, interval: u32) -> Result<u64> {
        check_burst("read buffer", out.len())?;
        self.ctx.buffer.ensure_capacity("read burst", BURST_BYTES)?;

        let nck = self.issue(Command::Read { bank, col }, interval)?;
        let phys = self.ctx.buffer.phys_addr();
        self.ctx.data_dma.recv(phys, BURST_BYTES as u32)?;
        self.ctx.buffer.read_words(0, out)?;
        Ok(nck)
    }

    /// Writes `data` to the burst at `col` of the open row.
    ///
    /// The burst lands in the controller (buffer copy, DMA send) before the
    /// write command that consumes it is issued.
    ///
    /// # Errors
    ///
    /// `InvalidField` if `data` is not exactly one burst, transport or DMA errors.
    pub fn write(&mut self, data: &[u32], bank: u8, col: u16, interval: u32) -> Result<u64> {
        check_burst("write buffer", data.len())?;
        self.ctx.buffer.ensure_capacity("write burst", BURST_BYTES)?;

        self.ctx.buffer.write_words(0, data)?;
        let phys = self.ctx.buffer.phys_addr();
        self.ctx.data_dma.send(phys, BURST_BYTES as u32)?;
        self.issue(Command::Write { bank, col }, interval)
    }

    /// Refreshes.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub fn refresh(&mut self, interval: u32) -> Result<u64> {
        self.issue(Command::Refresh, interval)
    }
}

fn check_burst(field: &'static str, len: usize) -> Result<()> {
    if len == BURST_WORDS {
        Ok(())
    } else {
        Err(RigError::invalid_field(
            field,
            format!("{len} words given, a burst is {BURST_WORDS}"),
        ))
    }
}
