//! Trigger-buffer transport.
//!
//! The oldest command path: the command word goes to slot 0 of a small BRAM
//! and a dedicated DMA channel streams a fixed-size packet out of it. The
//! packet length never changes, so the trailing slots are zeroed once at
//! construction and act as padding for every command. Intervals longer than
//! the packet cannot be represented and are rejected.

use std::fmt;

use crate::common::{Result, RigError};
use crate::soc::devices::dma::DmaEngine;
use crate::soc::traits::RegisterWindow;

use super::check_packet;

/// Slot width of the trigger buffer.
pub const WORD_BYTES: usize = 4;

/// Packet length the stream interface expects (512 bits).
pub const DEFAULT_PACKET_WORDS: usize = 16;

/// BRAM packet plus the DMA channel that pushes it.
pub struct TriggerTransport {
    buffer: Box<dyn RegisterWindow>,
    dma: DmaEngine,
    packet_words: usize,
}

impl fmt::Debug for TriggerTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TriggerTransport")
            .field("buffer", &self.buffer.name())
            .field("base", &self.buffer.base())
            .field("dma", &self.dma)
            .field("packet_words", &self.packet_words)
            .finish()
    }
}

impl TriggerTransport {
    /// Builds the transport and clears the packet's padding slots.
    ///
    /// # Errors
    ///
    /// `InvalidField` if the packet is empty or larger than the buffer window.
    pub fn new(
        mut buffer: Box<dyn RegisterWindow>,
        dma: DmaEngine,
        packet_words: usize,
    ) -> Result<Self> {
        if packet_words == 0 || packet_words * WORD_BYTES > buffer.size() {
            return Err(RigError::invalid_field(
                "trigger packet",
                format!(
                    "{packet_words} words do not fit the {}-byte trigger buffer",
                    buffer.size()
                ),
            ));
        }
        buffer.write_words(0, &vec![0; packet_words])?;
        Ok(Self {
            buffer,
            dma,
            packet_words,
        })
    }

    /// Returns the packet size in bytes.
    pub const fn capacity_bytes(&self) -> usize {
        self.packet_words * WORD_BYTES
    }

    /// Writes the command to slot 0 and streams the whole packet.
    ///
    /// # Errors
    ///
    /// `PacketTooLong` for intervals beyond the packet, or DMA errors.
    pub fn send(&mut self, word: u32, interval: u32) -> Result<()> {
        let _ = check_packet(interval, WORD_BYTES, self.capacity_bytes())?;
        self.buffer.write_u32(0, word)?;
        let base = self.buffer.base();
        self.dma.send(base, self.capacity_bytes() as u32)
    }
}
