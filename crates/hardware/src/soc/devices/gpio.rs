//! Dual-channel AXI GPIO.
//!
//! The rig wires debug probes from the memory controller to a two-channel
//! GPIO block. Each channel has a data register and a tri-state (direction)
//! register; a set tri-state bit makes the pin an input.

use std::fmt;

use crate::common::{Result, RigError};
use crate::soc::traits::RegisterWindow;

/// Channel 1 data register.
const REG_GPIO_DATA: usize = 0x00;
/// Channel 1 tri-state register.
const REG_GPIO_TRI: usize = 0x04;
/// Channel 2 data register.
const REG_GPIO2_DATA: usize = 0x08;
/// Channel 2 tri-state register.
const REG_GPIO2_TRI: usize = 0x0C;

/// GPIO block behind a register window.
pub struct Gpio {
    window: Box<dyn RegisterWindow>,
}

impl fmt::Debug for Gpio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gpio")
            .field("window", &self.window.name())
            .field("base", &self.window.base())
            .finish()
    }
}

impl Gpio {
    /// Wraps the GPIO register window.
    pub fn new(window: Box<dyn RegisterWindow>) -> Self {
        Self { window }
    }

    fn offsets(channel: u8) -> Result<(usize, usize)> {
        match channel {
            1 => Ok((REG_GPIO_DATA, REG_GPIO_TRI)),
            2 => Ok((REG_GPIO2_DATA, REG_GPIO2_TRI)),
            _ => Err(RigError::InvalidChannel { channel }),
        }
    }

    /// Reads the data register of `channel` (1 or 2).
    ///
    /// # Errors
    ///
    /// Returns `InvalidChannel` for any other channel number.
    pub fn read(&mut self, channel: u8) -> Result<u32> {
        let (data, _) = Self::offsets(channel)?;
        self.window.read_u32(data)
    }

    /// Writes the data register of `channel` (1 or 2).
    ///
    /// # Errors
    ///
    /// Returns `InvalidChannel` for any other channel number.
    pub fn write(&mut self, channel: u8, value: u32) -> Result<()> {
        let (data, _) = Self::offsets(channel)?;
        self.window.write_u32(data, value)
    }

    /// Reads the tri-state register of `channel`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChannel` for any other channel number.
    pub fn direction(&mut self, channel: u8) -> Result<u32> {
        let (_, tri) = Self::offsets(channel)?;
        self.window.read_u32(tri)
    }

    /// Writes the tri-state register of `channel`; set bits are inputs.
    ///
    /// # Errors
    ///
    /// Returns `InvalidChannel` for any other channel number.
    pub fn set_direction(&mut self, channel: u8, inputs: u32) -> Result<()> {
        let (_, tri) = Self::offsets(channel)?;
        self.window.write_u32(tri, inputs)
    }

    /// Reads both channels' data registers, for a one-shot debug dump.
    ///
    /// # Errors
    ///
    /// Propagates register access errors.
    pub fn snapshot(&mut self) -> Result<[u32; 2]> {
        Ok([self.read(1)?, self.read(2)?])
    }
}
