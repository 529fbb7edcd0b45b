//! Flow-controlled stream FIFO transport.
//!
//! Words are pushed into the FIFO's transmit data port and held until the
//! transmit length register is written, at which point the FIFO emits them as
//! one stream packet. Before a packet is written, the vacancy register is
//! polled until it reports room for the whole packet.
//!
//! The data port is either the full (memory-mapped burst) interface, written
//! as 64-bit words at offset 0 of its own window, or the lite interface's
//! 32-bit TDFD register.

use std::fmt;
use std::thread;
use std::time::Duration;

use crate::common::{Result, RigError};
use crate::soc::traits::RegisterWindow;

use super::check_packet;

/// Interrupt status register (write 1 to clear).
pub const REG_ISR: usize = 0x00;
/// Transmit data FIFO vacancy, in words.
pub const REG_TDFV: usize = 0x0C;
/// Transmit data FIFO data port (lite interface).
pub const REG_TDFD: usize = 0x10;
/// Transmit length in bytes; writing it releases the packet.
pub const REG_TLR: usize = 0x14;
/// Transmit data FIFO reset.
pub const REG_TDFR: usize = 0x18;
/// Value that must be written to `REG_TDFR` to reset the FIFO.
pub const RESET_KEY: u32 = 0xA5;

/// Largest packet the transmit length register can express.
const MAX_PACKET_BYTES: usize = u32::MAX as usize;

/// Settling time after a FIFO reset.
const RESET_SETTLE: Duration = Duration::from_millis(1);

/// Stream FIFO behind a control window and an optional burst data window.
pub struct FifoTransport {
    ctrl: Box<dyn RegisterWindow>,
    data: Option<Box<dyn RegisterWindow>>,
    depth_words: u32,
    max_polls: u32,
}

impl fmt::Debug for FifoTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FifoTransport")
            .field("ctrl", &self.ctrl.base())
            .field("data", &self.data.as_ref().map(|d| d.base()))
            .field("depth_words", &self.depth_words)
            .field("max_polls", &self.max_polls)
            .finish()
    }
}

impl FifoTransport {
    /// Creates a FIFO transport of `depth_words` entries.
    ///
    /// With a `data` window, words are written 64 bits at a time through the
    /// burst interface; without one, 32 bits at a time through `REG_TDFD`.
    /// `max_polls` bounds the vacancy wait of each `send`.
    pub fn new(
        ctrl: Box<dyn RegisterWindow>,
        data: Option<Box<dyn RegisterWindow>>,
        depth_words: u32,
        max_polls: u32,
    ) -> Self {
        Self {
            ctrl,
            data,
            depth_words,
            max_polls,
        }
    }

    /// Returns the data port width in bytes.
    pub const fn word_bytes(&self) -> usize {
        if self.data.is_some() { 8 } else { 4 }
    }

    /// Returns the FIFO depth in bytes, capped at what `REG_TLR` can hold.
    pub const fn capacity_bytes(&self) -> usize {
        let bytes = (self.depth_words as usize).saturating_mul(self.word_bytes());
        if bytes > MAX_PACKET_BYTES {
            MAX_PACKET_BYTES
        } else {
            bytes
        }
    }

    /// Resets the transmit FIFO and clears every pending interrupt.
    ///
    /// # Errors
    ///
    /// Propagates register access errors.
    pub fn reset(&mut self) -> Result<()> {
        self.ctrl.write_u32(REG_TDFR, RESET_KEY)?;
        thread::sleep(RESET_SETTLE);
        self.ctrl.write_u32(REG_ISR, 0xFFFF_FFFF)?;
        tracing::debug!(base = %self.ctrl.base(), "stream FIFO reset");
        Ok(())
    }

    /// Reads the current transmit vacancy in words.
    ///
    /// # Errors
    ///
    /// Propagates register access errors.
    pub fn vacancy(&mut self) -> Result<u32> {
        self.ctrl.read_u32(REG_TDFV)
    }

    fn wait_vacancy(&mut self, needed: u32) -> Result<()> {
        let mut vacancy = 0;
        for _ in 0..self.max_polls {
            vacancy = self.ctrl.read_u32(REG_TDFV)?;
            if vacancy >= needed {
                return Ok(());
            }
        }
        Err(RigError::FifoVacancyTimeout {
            needed,
            vacancy,
            polls: self.max_polls,
        })
    }

    /// Waits for room, writes the command and its padding, then releases the packet.
    ///
    /// # Errors
    ///
    /// `PacketTooLong` if the packet exceeds the FIFO depth or the length
    /// register, `FifoVacancyTimeout` if room never appears.
    pub fn send(&mut self, word: u32, interval: u32) -> Result<()> {
        let word_bytes = self.word_bytes();
        let words = check_packet(interval, word_bytes, self.capacity_bytes())?;
        // Bounded by capacity_bytes, so the byte count fits the length register.
        let packet_bytes = (words as usize * word_bytes) as u32;
        let words = words as u32;

        self.wait_vacancy(words)?;

        match self.data.as_mut() {
            Some(data) => {
                data.write_u64(0, u64::from(word))?;
                for _ in 0..interval {
                    data.write_u64(0, 0)?;
                }
            }
            None => {
                self.ctrl.write_u32(REG_TDFD, word)?;
                for _ in 0..interval {
                    self.ctrl.write_u32(REG_TDFD, 0)?;
                }
            }
        }
        self.ctrl.write_u32(REG_TLR, packet_bytes)
    }
}
