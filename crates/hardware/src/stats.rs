//! Per-core statistics.
//!
//! This module tracks the counters maintained by one out-of-order core. It provides:
//! 1. **Stall accounting:** Issue slots lost per `StallCause`, plus fetch-side losses.
//! 2. **Instruction mix:** Admitted ops per opcode class and committed instructions.
//! 3. **Occupancy:** Running averages of ROB and retiring ROB usage and fetch bucket size.
//! 4. **Replays:** Recovery episodes, wasted work, and load speculation classification.
//!
//! Every update takes the op's (or core's) statistics flag; updates outside a
//! sampling window are dropped. Statistics serialize with serde for export.

use std::fmt;

use serde::Serialize;

use crate::common::error::StallCause;
use crate::core::pipeline::dinst::Opcode;

/// Running mean of sampled values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Average {
    sum: f64,
    count: u64,
}

impl Average {
    /// Adds a sample if `enabled`.
    pub fn sample(&mut self, value: f64, enabled: bool) {
        if enabled {
            self.sum += value;
            self.count += 1;
        }
    }

    /// Number of samples taken.
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Mean of the samples, or 0 if none were taken.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }
}

/// Counters for one out-of-order core.
#[derive(Clone, Debug, Default, Serialize)]
pub struct CoreStats {
    /// Active clock cycles.
    pub clock_ticks: u64,
    /// Committed instructions (excluding ops committed while flushing).
    pub committed: u64,
    /// Issue slots lost per stall cause, indexed by `StallCause::index`.
    pub stalls: [u64; StallCause::COUNT],
    /// Admitted ops per opcode class, indexed by `Opcode::index`.
    pub admitted: [u64; Opcode::COUNT],
    /// Cycles with no room in the instruction queue for a new bucket.
    pub no_fetch: u64,
    /// Cycles with room in the instruction queue but no bucket ready.
    pub no_fetch2: u64,
    /// Replay recovery episodes started.
    pub replays: u64,
    /// Loads admitted behind unresolved memory ops, branches, or divides.
    pub spec_loads: u64,
    /// Loads admitted with no unresolved older hazard.
    pub safe_loads: u64,
    /// ROB occupancy after pre-retirement.
    pub rob_used: Average,
    /// Retiring ROB occupancy after pre-retirement.
    pub rrob_used: Average,
    /// Instructions per fetched bucket.
    pub fetch_width: Average,
    /// Instructions in flight (fetch to ROB) when a replay started.
    pub replay_inst: Average,
}

impl CoreStats {
    /// Charges `slots` lost issue slots to `cause`.
    pub fn add_stall(&mut self, cause: StallCause, slots: usize, enabled: bool) {
        if enabled {
            self.stalls[cause.index()] += slots as u64;
        }
    }

    /// Issue slots lost to `cause`.
    pub const fn stall(&self, cause: StallCause) -> u64 {
        self.stalls[cause.index()]
    }

    /// Admitted ops of class `opcode`.
    pub const fn admitted(&self, opcode: Opcode) -> u64 {
        self.admitted[opcode.index()]
    }

    /// Committed instructions per active cycle.
    pub fn ipc(&self) -> f64 {
        if self.clock_ticks == 0 {
            0.0
        } else {
            self.committed as f64 / self.clock_ticks as f64
        }
    }
}

impl fmt::Display for CoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "core.clock_ticks         {}", self.clock_ticks)?;
        writeln!(f, "core.committed           {}", self.committed)?;
        writeln!(f, "core.ipc                 {:.4}", self.ipc())?;
        writeln!(f, "core.rob_used            {:.2}", self.rob_used.mean())?;
        writeln!(f, "core.rrob_used           {:.2}", self.rrob_used.mean())?;
        writeln!(f, "core.fetch_width         {:.2}", self.fetch_width.mean())?;
        writeln!(f, "core.no_fetch            {}", self.no_fetch)?;
        writeln!(f, "core.no_fetch2           {}", self.no_fetch2)?;
        writeln!(f, "core.replays             {}", self.replays)?;
        writeln!(f, "core.replay_inst         {:.2}", self.replay_inst.mean())?;
        writeln!(f, "core.spec_loads          {}", self.spec_loads)?;
        writeln!(f, "core.safe_loads          {}", self.safe_loads)?;
        for cause in StallCause::ALL {
            writeln!(
                f,
                "core.stall.{:<20} {}",
                format!("{cause:?}"),
                self.stall(cause)
            )?;
        }
        Ok(())
    }
}
