//! Circular bridge-window transport.
//!
//! The memory controller exposes a write-combining window that it drains in
//! order, wrapping at the end. The host writes command and padding words into
//! consecutive slots and never checks for room: the consumer is assumed to
//! keep up. The only guard is that a single packet must fit the window.

use std::fmt;

use crate::common::{Result, RigError};
use crate::soc::traits::RegisterWindow;

use super::{WordWidth, check_packet};

/// Circular command window with a private write index.
pub struct BridgeTransport {
    window: Box<dyn RegisterWindow>,
    width: WordWidth,
    capacity: usize,
    index: usize,
}

impl fmt::Debug for BridgeTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgeTransport")
            .field("window", &self.window.name())
            .field("base", &self.window.base())
            .field("width", &self.width)
            .field("capacity", &self.capacity)
            .field("index", &self.index)
            .finish()
    }
}

impl BridgeTransport {
    /// Wraps `window` as a circular buffer of `width`-sized slots, starting at slot 0.
    ///
    /// # Errors
    ///
    /// `InvalidField` if the window cannot hold a single slot.
    pub fn new(window: Box<dyn RegisterWindow>, width: WordWidth) -> Result<Self> {
        let capacity = window.size() / width.bytes();
        if capacity == 0 {
            return Err(RigError::invalid_field(
                "bridge window",
                format!("{} bytes hold no {}-byte slot", window.size(), width.bytes()),
            ));
        }
        Ok(Self {
            window,
            width,
            capacity,
            index: 0,
        })
    }

    /// Returns the slot width.
    pub const fn word_width(&self) -> WordWidth {
        self.width
    }

    /// Returns the number of slots in the window.
    pub const fn capacity_words(&self) -> usize {
        self.capacity
    }

    /// Returns the window capacity in bytes.
    pub const fn capacity_bytes(&self) -> usize {
        self.capacity * self.width.bytes()
    }

    /// Returns the slot the next packet starts at.
    pub const fn index(&self) -> usize {
        self.index
    }

    fn write_slot(&mut self, slot: usize, value: u32) -> Result<()> {
        match self.width {
            WordWidth::Bits32 => self.window.write_u32(slot * 4, value),
            WordWidth::Bits64 => self.window.write_u64(slot * 8, u64::from(value)),
        }
    }

    /// Writes the command and its padding at the current index and advances it.
    ///
    /// # Errors
    ///
    /// `PacketTooLong` if the packet is longer than the whole window.
    pub fn send(&mut self, word: u32, interval: u32) -> Result<()> {
        // Bounded by capacity, which is a usize.
        let words = check_packet(interval, self.width.bytes(), self.capacity_bytes())? as usize;

        self.write_slot(self.index, word)?;
        for k in 1..words {
            self.write_slot((self.index + k) % self.capacity, 0)?;
        }
        self.index = (self.index + words) % self.capacity;
        Ok(())
    }
}
