//! Register Alias Table (RAT).
//!
//! Maps each logical register to a weak handle on its latest in-flight
//! producer, or `None` if the value is architectural. Rename captures source
//! producers here before publishing its own destinations, so an instruction
//! reading its own destination (e.g. `ADDI x5, x5, 16`) links to the previous
//! producer. The same structure, indexed by logical register window, backs the
//! level-2 serialization table.

use crate::common::constants::{NUM_LOGICAL_REGS, REG_ZERO};
use crate::core::pipeline::dinst::InstHandle;

/// Fixed array of optional producer handles indexed by logical register.
#[derive(Clone, Debug)]
pub struct RegisterAliasTable {
    entries: [Option<InstHandle>; NUM_LOGICAL_REGS],
}

impl Default for RegisterAliasTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterAliasTable {
    /// Creates a table with no pending producers.
    pub const fn new() -> Self {
        Self {
            entries: [None; NUM_LOGICAL_REGS],
        }
    }

    /// Records `handle` as the latest producer of `reg`.
    /// No-op for the zero register and out-of-range indices.
    pub fn set_producer(&mut self, reg: u8, handle: InstHandle) {
        if reg == REG_ZERO {
            return;
        }
        if let Some(slot) = self.entries.get_mut(reg as usize) {
            *slot = Some(handle);
        }
    }

    /// Latest producer of `reg`, if one is still recorded.
    pub fn producer(&self, reg: u8) -> Option<InstHandle> {
        self.entries.get(reg as usize).copied().flatten()
    }

    /// Forgets the producer of `reg` unconditionally.
    pub fn clear(&mut self, reg: u8) {
        if let Some(slot) = self.entries.get_mut(reg as usize) {
            *slot = None;
        }
    }

    /// Clears `reg` only if it still names `handle`, so an older op never
    /// erases a newer producer (WAW).
    pub fn clear_if_match(&mut self, reg: u8, handle: InstHandle) {
        if let Some(slot) = self.entries.get_mut(reg as usize) {
            if *slot == Some(handle) {
                *slot = None;
            }
        }
    }
}
