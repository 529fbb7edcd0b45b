//! Protocol-level constants shared by the engine, the row operations and the
//! pattern generator.
//!
//! Register offsets live next to the device that owns them; this module only
//! holds the shape of the data moved through the rig.

/// Number of 32-bit words in one column burst (512 bits).
pub const BURST_WORDS: usize = 16;

/// Size of one column burst in bytes.
pub const BURST_BYTES: usize = BURST_WORDS * 4;

/// Column bursts per DRAM row.
pub const COLUMNS_PER_ROW: usize = 128;

/// Column address distance between consecutive bursts (burst length 8).
pub const COLUMN_STRIDE: u16 = 8;

/// Number of 32-bit words in one row (2048).
pub const ROW_WORDS: usize = COLUMNS_PER_ROW * BURST_WORDS;

/// Size of one row in bytes (8 KiB).
pub const ROW_BYTES: usize = ROW_WORDS * 4;

/// Mask applied to bank addresses (4 bits).
pub const BANK_MASK: u8 = 0xF;

/// Mask applied to row addresses.
pub const ROW_MASK: u32 = 0x7FFF;

/// Mask applied to column addresses (10 bits).
pub const COL_MASK: u16 = 0x3FF;
