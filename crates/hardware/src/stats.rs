//! Run statistics collection and reporting.
//!
//! This module tracks how long a sequence of DRAM operations took on the host
//! against how long it would take at the modeled DRAM clock. It provides:
//! 1. **Cycles:** Accumulated nCK returned by the protocol primitives.
//! 2. **Traffic:** Bytes written to and read from DRAM.
//! 3. **Overhead:** Host wall time divided by the ideal `nCK x tCK` latency.

use std::fmt;
use std::time::{Duration, Instant};

use crate::config::TimingConfig;

/// Statistics for one run of DRAM operations.
#[derive(Debug, Clone)]
pub struct RunStats {
    start_time: Instant,
    timing: TimingConfig,
    /// Modeled DRAM clock cycles issued.
    pub nck: u64,
    /// Bytes written to DRAM.
    pub bytes_written: u64,
    /// Bytes read from DRAM.
    pub bytes_read: u64,
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new(TimingConfig::default())
    }
}

impl RunStats {
    /// Starts a run at the given timings.
    pub fn new(timing: TimingConfig) -> Self {
        Self {
            start_time: Instant::now(),
            timing,
            nck: 0,
            bytes_written: 0,
            bytes_read: 0,
        }
    }

    /// Clears the counters and restarts the clock.
    pub fn restart(&mut self) {
        *self = Self::new(self.timing);
    }

    /// Adds cycles returned by a protocol call.
    pub fn add_cycles(&mut self, nck: u64) {
        self.nck += nck;
    }

    /// Adds bytes written to DRAM.
    pub fn add_written(&mut self, bytes: usize) {
        self.bytes_written += bytes as u64;
    }

    /// Adds bytes read from DRAM.
    pub fn add_read(&mut self, bytes: usize) {
        self.bytes_read += bytes as u64;
    }

    /// Returns the host time since the run started.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the latency the issued cycles take at the modeled clock, in seconds.
    pub fn ideal_seconds(&self) -> f64 {
        self.timing.ideal_seconds(self.nck)
    }

    /// Freezes the current values into a summary.
    pub fn summary(&self) -> RunSummary {
        RunSummary::new(
            self.elapsed().as_secs_f64(),
            self.ideal_seconds(),
            self.nck,
            self.bytes_written,
            self.bytes_read,
        )
    }

    /// Logs the summary at info level.
    pub fn report(&self) {
        let s = self.summary();
        tracing::info!(
            nck = s.nck,
            host_seconds = s.host_seconds,
            ideal_seconds = s.ideal_seconds,
            overhead_ratio = s.overhead_ratio,
            write_mib_s = s.write_mib_per_sec,
            read_mib_s = s.read_mib_per_sec,
            "run statistics"
        );
    }
}

/// A point-in-time view of [`RunStats`] with derived rates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunSummary {
    /// Host wall time in seconds.
    pub host_seconds: f64,
    /// `nck x tCK` in seconds.
    pub ideal_seconds: f64,
    /// Modeled cycles.
    pub nck: u64,
    /// Host time over ideal time (0 when no cycles were issued).
    pub overhead_ratio: f64,
    /// Write throughput over host time.
    pub write_mib_per_sec: f64,
    /// Read throughput over host time.
    pub read_mib_per_sec: f64,
}

impl RunSummary {
    /// Derives the rates from raw measurements.
    pub fn new(
        host_seconds: f64,
        ideal_seconds: f64,
        nck: u64,
        bytes_written: u64,
        bytes_read: u64,
    ) -> Self {
        const MIB: f64 = 1024.0 * 1024.0;
        let ratio = |num: f64, den: f64| if den > 0.0 { num / den } else { 0.0 };
        Self {
            host_seconds,
            ideal_seconds,
            nck,
            overhead_ratio: ratio(host_seconds, ideal_seconds),
            write_mib_per_sec: ratio(bytes_written as f64 / MIB, host_seconds),
            read_mib_per_sec: ratio(bytes_read as f64 / MIB, host_seconds),
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "host_seconds             {:.6} s", self.host_seconds)?;
        writeln!(f, "dram_nck                 {}", self.nck)?;
        writeln!(f, "ideal_seconds            {:.9} s", self.ideal_seconds)?;
        writeln!(f, "overhead_ratio           {:.2}", self.overhead_ratio)?;
        writeln!(f, "write_throughput         {:.2} MiB/s", self.write_mib_per_sec)?;
        write!(f, "read_throughput          {:.2} MiB/s", self.read_mib_per_sec)
    }
}
