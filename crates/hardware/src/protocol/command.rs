//! DRAM command word encoding.
//!
//! A command word is 32 bits wide:
//! - bits 0-2: opcode (1 = precharge, 2 = activate, 3 = read, 4 = write, 5 = refresh);
//! - bits 3-6: bank address;
//! - bits 7 and up: row address (activate, 15 bits), column address
//!   (read/write, 10 bits) or the all-banks flag (precharge, 1 bit).
//!
//! A zero word is a NOP and is what transports pad with.

use std::fmt;

use crate::common::constants::{BANK_MASK, COL_MASK, ROW_MASK};

/// Bit mask for the opcode field (bits 0-2).
pub const OPCODE_MASK: u32 = 0x7;
/// Bit position of the bank field.
pub const BANK_SHIFT: u32 = 3;
/// Bit position of the row/column/all-banks field.
pub const ADDR_SHIFT: u32 = 7;

/// Command opcodes understood by the memory controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum Opcode {
    /// Close the open row of one bank (or all banks).
    Precharge = 1,
    /// Open a row.
    Activate = 2,
    /// Read one burst from the open row.
    Read = 3,
    /// Write one burst to the open row.
    Write = 4,
    /// Refresh all banks.
    Refresh = 5,
}

impl Opcode {
    /// Decodes the low three bits of a word, if they name a command.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits & OPCODE_MASK {
            1 => Some(Self::Precharge),
            2 => Some(Self::Activate),
            3 => Some(Self::Read),
            4 => Some(Self::Write),
            5 => Some(Self::Refresh),
            _ => None,
        }
    }
}

/// A decoded DRAM command with fields already in range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    /// Precharge `bank`, or every bank when `all_banks` is set.
    Precharge {
        /// Bank address (4 bits).
        bank: u8,
        /// Precharge all banks.
        all_banks: bool,
    },
    /// Open `row` in `bank`.
    Activate {
        /// Bank address (4 bits).
        bank: u8,
        /// Row address (15 bits).
        row: u32,
    },
    /// Read the burst at `col` of the open row in `bank`.
    Read {
        /// Bank address (4 bits).
        bank: u8,
        /// Column address (10 bits).
        col: u16,
    },
    /// Write the burst at `col` of the open row in `bank`.
    Write {
        /// Bank address (4 bits).
        bank: u8,
        /// Column address (10 bits).
        col: u16,
    },
    /// Refresh.
    Refresh,
}

impl Command {
    /// Returns the opcode of this command.
    pub const fn opcode(&self) -> Opcode {
        match self {
            Self::Precharge { .. } => Opcode::Precharge,
            Self::Activate { .. } => Opcode::Activate,
            Self::Read { .. } => Opcode::Read,
            Self::Write { .. } => Opcode::Write,
            Self::Refresh => Opcode::Refresh,
        }
    }

    /// Encodes the command; out-of-range fields are masked with a warning.
    pub fn encode(self) -> CommandWord {
        match self {
            Self::Precharge { bank, all_banks } => CommandWord::precharge(bank, all_banks),
            Self::Activate { bank, row } => CommandWord::activate(bank, row),
            Self::Read { bank, col } => CommandWord::read(bank, col),
            Self::Write { bank, col } => CommandWord::write(bank, col),
            Self::Refresh => CommandWord::refresh(),
        }
    }
}

/// Truncates `value` to `mask`, warning if any set bit was dropped.
fn masked(field: &'static str, value: u32, mask: u32) -> u32 {
    let kept = value & mask;
    if kept != value {
        tracing::warn!(field, value, kept, "address field truncated");
    }
    kept
}

/// An encoded 32-bit command word.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CommandWord(pub u32);

impl CommandWord {
    fn compose(opcode: Opcode, bank: u8, addr: u32) -> Self {
        let bank = masked("bank", u32::from(bank), u32::from(BANK_MASK));
        Self(opcode as u32 | (bank << BANK_SHIFT) | (addr << ADDR_SHIFT))
    }

    /// Precharge `bank`, or all banks.
    pub fn precharge(bank: u8, all_banks: bool) -> Self {
        Self::compose(Opcode::Precharge, bank, u32::from(all_banks))
    }

    /// Activate `row` in `bank`.
    pub fn activate(bank: u8, row: u32) -> Self {
        Self::compose(Opcode::Activate, bank, masked("row", row, ROW_MASK))
    }

    /// Read the burst at `col`.
    pub fn read(bank: u8, col: u16) -> Self {
        let col = masked("col", u32::from(col), u32::from(COL_MASK));
        Self::compose(Opcode::Read, bank, col)
    }

    /// Write the burst at `col`.
    pub fn write(bank: u8, col: u16) -> Self {
        let col = masked("col", u32::from(col), u32::from(COL_MASK));
        Self::compose(Opcode::Write, bank, col)
    }

    /// Refresh.
    pub const fn refresh() -> Self {
        Self(Opcode::Refresh as u32)
    }

    /// Returns the raw word.
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Returns `true` for the all-zero padding word.
    pub const fn is_nop(self) -> bool {
        self.0 == 0
    }

    /// Returns the opcode, or `None` for NOPs and unassigned opcodes.
    pub const fn opcode(self) -> Option<Opcode> {
        Opcode::from_bits(self.0)
    }

    /// Decodes the word back into a [`Command`].
    ///
    /// Bits above each command's field are ignored.
    pub const fn decode(self) -> Option<Command> {
        let bank = ((self.0 >> BANK_SHIFT) & BANK_MASK as u32) as u8;
        let addr = self.0 >> ADDR_SHIFT;
        let cmd = match Opcode::from_bits(self.0) {
            Some(Opcode::Precharge) => Command::Precharge {
                bank,
                all_banks: addr & 1 != 0,
            },
            Some(Opcode::Activate) => Command::Activate {
                bank,
                row: addr & ROW_MASK,
            },
            Some(Opcode::Read) => Command::Read {
                bank,
                col: (addr & COL_MASK as u32) as u16,
            },
            Some(Opcode::Write) => Command::Write {
                bank,
                col: (addr & COL_MASK as u32) as u16,
            },
            Some(Opcode::Refresh) => Command::Refresh,
            None => return None,
        };
        Some(cmd)
    }
}

impl From<Command> for CommandWord {
    fn from(cmd: Command) -> Self {
        cmd.encode()
    }
}

impl fmt::Debug for CommandWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.decode() {
            Some(cmd) => write!(f, "CommandWord({:#010x}: {cmd:?})", self.0),
            None => write!(f, "CommandWord({:#010x})", self.0),
        }
    }
}
