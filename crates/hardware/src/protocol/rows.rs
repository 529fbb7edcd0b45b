//! Row-granularity operations.
//!
//! A row is 128 column bursts of 16 words (8 KiB), addressed at column
//! stride 8. This module provides:
//! 1. **`write_row` / `read_row`:** Precharge, activate, then one DMA round trip per burst.
//! 2. **`write_row_batch`:** Precharge, activate, one bulk DMA send overlapped with all 128 write commands.
//! 3. **`all_bank_refresh`:** Precharge all banks, then refresh.
//!
//! Waits between commands come from [`TimingConfig`].

use crate::common::constants::COLUMN_STRIDE;
use crate::common::{BURST_WORDS, COLUMNS_PER_ROW, ROW_BYTES, ROW_WORDS, Result, RigError};
use crate::config::TimingConfig;
use crate::soc::builder::HardwareContext;
use crate::soc::devices::DmaDirection;

use super::command::Command;
use super::engine::ProtocolEngine;

/// Row operations over a protocol engine.
#[derive(Debug)]
pub struct RowOperations<'a> {
    engine: ProtocolEngine<'a>,
    timing: TimingConfig,
}

/// Column address of burst `i` in a row.
#[inline]
const fn column(i: usize) -> u16 {
    // i < COLUMNS_PER_ROW, so this stays within the 10-bit column field.
    i as u16 * COLUMN_STRIDE
}

fn check_row(field: &'static str, len: usize) -> Result<()> {
    if len == ROW_WORDS {
        Ok(())
    } else {
        Err(RigError::invalid_field(
            field,
            format!("{len} words given, a row is {ROW_WORDS}"),
        ))
    }
}

impl<'a> RowOperations<'a> {
    /// Creates row operations over `ctx` with the given timings.
    pub fn new(ctx: &'a mut HardwareContext, timing: TimingConfig) -> Self {
        Self::from_engine(ProtocolEngine::new(ctx), timing)
    }

    /// Wraps an existing engine.
    pub const fn from_engine(engine: ProtocolEngine<'a>, timing: TimingConfig) -> Self {
        Self { engine, timing }
    }

    /// Returns the timings in use.
    pub const fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Returns the engine for single-burst commands.
    pub fn engine_mut(&mut self) -> &mut ProtocolEngine<'a> {
        &mut self.engine
    }

    fn open_row(&mut self, bank: u8, row: u32, rank: u8) -> Result<u64> {
        let mut nck = self.engine.precharge(bank, rank, false, self.timing.n_rp)?;
        nck += self.engine.activate(bank, row, rank, self.timing.n_rcd)?;
        Ok(nck)
    }

    /// Writes a whole row, one burst per DMA send.
    ///
    /// # Errors
    ///
    /// `InvalidField` if `data` is not exactly one row, plus any engine error.
    pub fn write_row(&mut self, data: &[u32], bank: u8, row: u32, rank: u8) -> Result<u64> {
        check_row("row data", data.len())?;
        let mut nck = self.open_row(bank, row, rank)?;
        for (i, burst) in data.chunks_exact(BURST_WORDS).enumerate() {
            nck += self
                .engine
                .write(burst, bank, column(i), self.timing.n_ccd_l)?;
        }
        Ok(nck)
    }

    /// Reads a whole row into `out`, one burst per DMA receive.
    ///
    /// # Errors
    ///
    /// `InvalidField` if `out` is not exactly one row, plus any engine error.
    pub fn read_row(&mut self, out: &mut [u32], bank: u8, row: u32, rank: u8) -> Result<u64> {
        check_row("row buffer", out.len())?;
        let mut nck = self.open_row(bank, row, rank)?;
        for (i, burst) in out.chunks_exact_mut(BURST_WORDS).enumerate() {
            nck += self
                .engine
                .read(burst, bank, column(i), self.timing.n_ccd_l)?;
        }
        Ok(nck)
    }

    /// Writes a whole row with a single bulk DMA send.
    ///
    /// The row is copied into the streaming buffer and the send is started
    /// before the first write command is issued; the 128 write commands then
    /// go out back to back and the send is waited on once, after the last.
    /// If a command fails part way, the send is still waited on before the
    /// command error is returned.
    ///
    /// # Errors
    ///
    /// `InvalidField` if `data` is not exactly one row or the buffer is too
    /// small, transport errors, or the DMA error of the bulk send.
    pub fn write_row_batch(&mut self, data: &[u32], bank: u8, row: u32, rank: u8) -> Result<u64> {
        check_row("row data", data.len())?;
        self.engine
            .context_mut()
            .buffer()
            .ensure_capacity("row batch", ROW_BYTES)?;

        let mut nck = self.open_row(bank, row, rank)?;

        let ctx = self.engine.context_mut();
        ctx.buffer.write_words(0, data)?;
        let phys = ctx.buffer.phys_addr();
        ctx.data_dma
            .start(DmaDirection::Send, phys, ROW_BYTES as u32)?;
        tracing::debug!(bank, row, %phys, "bulk row send started");

        let mut issued: Result<()> = Ok(());
        for i in 0..COLUMNS_PER_ROW {
            let cmd = Command::Write {
                bank,
                col: column(i),
            };
            match self.engine.issue(cmd, self.timing.n_ccd_l) {
                Ok(n) => nck += n,
                Err(e) => {
                    issued = Err(e);
                    break;
                }
            }
        }

        let dma = &mut self.engine.context_mut().data_dma;
        let budget = dma.max_iterations();
        let waited = dma.wait(DmaDirection::Send, budget);

        match (issued, waited) {
            (Ok(()), Ok(polls)) => {
                tracing::debug!(bank, row, polls, "bulk row send complete");
                Ok(nck)
            }
            (Ok(()), Err(e)) => Err(e),
            (Err(e), waited) => {
                if let Err(dma_err) = waited {
                    tracing::warn!(error = %dma_err, "bulk row send failed after command error");
                }
                Err(e)
            }
        }
    }

    /// Precharges every bank, then refreshes.
    ///
    /// # Errors
    ///
    /// Transport errors.
    pub fn all_bank_refresh(&mut self, rank: u8) -> Result<u64> {
        let mut nck = self.engine.precharge(0, rank, true, self.timing.n_rp)?;
        nck += self.engine.refresh(self.timing.n_rfc)?;
        Ok(nck)
    }
}
