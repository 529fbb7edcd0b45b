//! DRAM protocol layer.
//!
//! This module sits on top of the hardware context and provides:
//! 1. **Command words:** Encoding and decoding of the 32-bit command format.
//! 2. **Engine:** Precharge, activate, read, write and refresh primitives with cycle accounting.
//! 3. **Rows:** Row-sized reads and writes, the pipelined batch write, and all-bank refresh.

/// Command word encoding.
pub mod command;

/// Single-command primitives.
pub mod engine;

/// Row-granularity sequences.
pub mod rows;

pub use command::{Command, CommandWord, Opcode};
pub use engine::{ProtocolEngine, nck};
pub use rows::RowOperations;
