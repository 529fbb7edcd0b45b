//! Command transports.
//!
//! A transport delivers one command word followed by `interval` zero words
//! ("NOP" padding) to the memory controller, which replays them one per DRAM
//! clock. Three hardware paths exist and all satisfy the same contract:
//! 1. **Trigger buffer:** Command written to a small BRAM, streamed by a fixed-size DMA send.
//! 2. **FIFO gated:** Flow-controlled stream FIFO; vacancy is polled before writing.
//! 3. **Bridge circular:** Words written straight into a circular window, 32 or 64 bits wide.
//!
//! Every variant rejects a packet that cannot fit its window with
//! `PacketTooLong` before touching a register.

/// Circular memory-window transport.
pub mod bridge;

/// Flow-controlled FIFO transport.
pub mod fifo;

/// Trigger-buffer transport.
pub mod trigger;

use serde::Deserialize;

use crate::common::{Result, RigError};

pub use bridge::BridgeTransport;
pub use fifo::FifoTransport;
pub use trigger::TriggerTransport;

/// Width of one transport word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum WordWidth {
    /// 32-bit slots.
    Bits32,
    /// 64-bit slots; the command occupies the low half.
    #[default]
    Bits64,
}

impl WordWidth {
    /// Returns the word width in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }
}

/// Which hardware path a transport uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Fixed-size BRAM packet pushed by a DMA send.
    TriggerBuffer,
    /// Stream FIFO with vacancy polling.
    FifoGated,
    /// Circular write-combining window.
    BridgeCircular,
}

/// Returns the packet length in words for `interval`, or `PacketTooLong`.
pub(crate) fn check_packet(interval: u32, word_bytes: usize, capacity_bytes: usize) -> Result<u64> {
    let words = 1 + u64::from(interval);
    let fits = usize::try_from(words)
        .ok()
        .and_then(|w| w.checked_mul(word_bytes))
        .is_some_and(|bytes| bytes <= capacity_bytes);
    if fits {
        Ok(words)
    } else {
        Err(RigError::PacketTooLong {
            words,
            word_bytes,
            capacity_bytes,
        })
    }
}

/// The command path selected at configuration time.
#[derive(Debug)]
pub enum CommandTransport {
    /// See [`TriggerTransport`].
    TriggerBuffer(TriggerTransport),
    /// See [`FifoTransport`].
    FifoGated(FifoTransport),
    /// See [`BridgeTransport`].
    BridgeCircular(BridgeTransport),
}

impl CommandTransport {
    /// Delivers `word` followed by `interval` zero words and releases them to the fabric.
    ///
    /// # Errors
    ///
    /// `PacketTooLong` if the packet cannot fit the transport, plus any
    /// variant-specific timeout or register error.
    pub fn send(&mut self, word: u32, interval: u32) -> Result<()> {
        match self {
            Self::TriggerBuffer(t) => t.send(word, interval),
            Self::FifoGated(t) => t.send(word, interval),
            Self::BridgeCircular(t) => t.send(word, interval),
        }
    }

    /// Returns which hardware path this is.
    pub const fn kind(&self) -> TransportKind {
        match self {
            Self::TriggerBuffer(_) => TransportKind::TriggerBuffer,
            Self::FifoGated(_) => TransportKind::FifoGated,
            Self::BridgeCircular(_) => TransportKind::BridgeCircular,
        }
    }

    /// Returns the transport word width in bytes.
    pub const fn word_bytes(&self) -> usize {
        match self {
            Self::TriggerBuffer(_) => trigger::WORD_BYTES,
            Self::FifoGated(t) => t.word_bytes(),
            Self::BridgeCircular(t) => t.word_width().bytes(),
        }
    }

    /// Returns the largest packet the transport accepts, in bytes.
    pub const fn capacity_bytes(&self) -> usize {
        match self {
            Self::TriggerBuffer(t) => t.capacity_bytes(),
            Self::FifoGated(t) => t.capacity_bytes(),
            Self::BridgeCircular(t) => t.capacity_bytes(),
        }
    }

    /// Returns the largest interval a single `send` can carry.
    pub const fn max_interval(&self) -> u32 {
        let words = self.capacity_bytes() / self.word_bytes();
        if words == 0 {
            0
        } else if words - 1 > u32::MAX as usize {
            u32::MAX
        } else {
            (words - 1) as u32
        }
    }
}
