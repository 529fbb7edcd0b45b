//! Error taxonomy for the rig control plane.
//!
//! Every fallible operation in the crate returns [`Result`]. The variants map
//! onto the failure classes an operator has to tell apart:
//! 1. **Acquisition:** a window, descriptor or buffer could not be opened or mapped.
//! 2. **Transfer:** a DMA channel timed out or reported a bus error.
//! 3. **Framing:** a command packet does not fit the selected transport.
//! 4. **Validation:** a caller-supplied field, channel or buffer is out of range.
//! 5. **Configuration:** the JSON configuration is malformed.
//!
//! None of these terminate the process; the caller decides what is fatal.

use std::io;

use thiserror::Error;

use crate::soc::devices::dma::{DmaDirection, DmaStatus};

/// Result type alias for rig operations.
pub type Result<T> = std::result::Result<T, RigError>;

/// Errors raised by the rig control plane.
#[derive(Debug, Error)]
pub enum RigError {
    /// Opening, reading or mapping a hardware resource failed during setup.
    #[error("failed to acquire {resource}: {source}")]
    ResourceAcquisition {
        /// Human-readable name of the resource (window name or descriptor path).
        resource: String,
        /// Underlying OS or parse error.
        #[source]
        source: io::Error,
    },

    /// A DMA channel did not report Idle within its polling budget.
    #[error("{direction} DMA timed out after {polls} polls ({snapshot})")]
    DmaTimeout {
        /// Channel that timed out.
        direction: DmaDirection,
        /// Number of status polls performed.
        polls: u32,
        /// Decoded control/status registers read after the budget ran out.
        snapshot: DmaStatus,
    },

    /// A DMA channel raised an internal, slave or decode error while polling.
    #[error("{direction} DMA fault ({snapshot})")]
    DmaFault {
        /// Channel that faulted.
        direction: DmaDirection,
        /// Decoded control/status registers at the time of the fault.
        snapshot: DmaStatus,
    },

    /// A command plus its padding does not fit the transport window.
    #[error(
        "packet of {words} words x {word_bytes} bytes exceeds transport capacity of {capacity_bytes} bytes"
    )]
    PacketTooLong {
        /// Words requested (`1 + interval`).
        words: u64,
        /// Transport word width in bytes.
        word_bytes: usize,
        /// Addressable capacity of the transport in bytes.
        capacity_bytes: usize,
    },

    /// The FIFO never reported enough vacancy for a packet.
    #[error("FIFO vacancy stayed at {vacancy} (< {needed} words) after {polls} polls")]
    FifoVacancyTimeout {
        /// Words the packet needs.
        needed: u32,
        /// Last vacancy value read.
        vacancy: u32,
        /// Number of vacancy polls performed.
        polls: u32,
    },

    /// A GPIO channel other than 1 or 2 was addressed.
    #[error("invalid GPIO channel {channel} (expected 1 or 2)")]
    InvalidChannel {
        /// The requested channel.
        channel: u8,
    },

    /// A caller-supplied value cannot be represented by the hardware.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// A register access fell outside its window.
    #[error("register access at {offset:#x} (+{width} bytes) outside {window} window of {size:#x} bytes")]
    RegisterOutOfBounds {
        /// Window name.
        window: String,
        /// Byte offset of the access.
        offset: usize,
        /// Access width in bytes.
        width: usize,
        /// Window size in bytes.
        size: usize,
    },

    /// The configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl RigError {
    /// Create a resource acquisition error.
    pub fn acquisition(resource: impl Into<String>, source: io::Error) -> Self {
        Self::ResourceAcquisition {
            resource: resource.into(),
            source,
        }
    }

    /// Create an invalid field error.
    pub fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            reason: reason.into(),
        }
    }

    /// Returns `true` for errors raised by a polling budget running out.
    pub const fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::DmaTimeout { .. } | Self::FifoVacancyTimeout { .. }
        )
    }
}
