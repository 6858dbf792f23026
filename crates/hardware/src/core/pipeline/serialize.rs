//! Dynamic memory serialization.
//!
//! After replays arrive too close together the core arms a countdown budget
//! (`serialize_for`). While the budget lasts, each admitted op consumes one unit
//! and memory ops are forced into dependency chains through their third source:
//! 1. **Level 0:** Every memory op chains after the previous memory op.
//! 2. **Level 1:** Loads and stores chain after the previous store.
//! 3. **Level 2:** Memory ops chain only within the same logical register window.
//!
//! Level 3 is a sentinel set by recovery when progress was slow; the next
//! admission treats it as level 2.

use crate::common::constants::SERIALIZE_LEVEL_MAX;
use crate::core::pipeline::dinst::{InstHandle, InstPool, Instruction};
use crate::core::pipeline::rat::RegisterAliasTable;

/// Per-thread serialization state.
#[derive(Clone, Debug)]
pub struct Serializer {
    serialize_for: u32,
    level: u8,
    last_serialized: Option<InstHandle>,
    last_serialized_st: Option<InstHandle>,
    /// Last memory op seen per logical register window (level 2).
    window_rat: RegisterAliasTable,
    window: Option<u8>,
    last_pc: Option<u64>,
}

impl Serializer {
    /// Creates an idle serializer starting at `level`.
    pub const fn new(level: u8) -> Self {
        Self {
            serialize_for: 0,
            level,
            last_serialized: None,
            last_serialized_st: None,
            window_rat: RegisterAliasTable::new(),
            window: None,
            last_pc: None,
        }
    }

    /// Remaining admissions that are subject to serialization.
    pub const fn remaining(&self) -> u32 {
        self.serialize_for
    }

    /// Current level (may be the sentinel 3 right after recovery).
    pub const fn level(&self) -> u8 {
        self.level
    }

    /// Arms the countdown budget.
    pub const fn arm(&mut self, budget: u32) {
        self.serialize_for = budget;
    }

    /// Requests the most permissive level, taken as level 2 on the next admission.
    pub const fn reset_level(&mut self) {
        self.level = SERIALIZE_LEVEL_MAX + 1;
    }

    /// Moves one level toward full serialization (floor 0).
    pub const fn tighten(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    /// Last op recorded by the level 0/1 chains.
    pub const fn last_serialized(&self) -> Option<InstHandle> {
        self.last_serialized
    }

    /// Applies the active policy to a freshly admitted op.
    ///
    /// # Arguments
    ///
    /// * `pool` - In-flight instructions; `handle` must resolve in it.
    /// * `handle` - The op being admitted.
    /// * `recovering` - Whether a replay drain is in progress (serialization is suspended).
    pub fn apply(&mut self, pool: &mut InstPool, handle: InstHandle, recovering: bool) {
        if self.level > SERIALIZE_LEVEL_MAX {
            self.level = SERIALIZE_LEVEL_MAX;
        }
        if self.serialize_for == 0 || recovering {
            return;
        }
        self.serialize_for -= 1;

        let Some(d) = pool.get(handle) else {
            return;
        };
        let inst = d.inst;
        let pc = d.pc;
        let src3_ready = d.is_src3_ready();

        match self.level {
            0 => {
                if inst.opcode.is_memory() && src3_ready {
                    let prev = self.last_serialized;
                    chain_if_unissued(pool, prev, handle);
                    self.last_serialized = Some(handle);
                }
            }
            1 => {
                if inst.opcode.is_load() && src3_ready {
                    chain_if_unissued(pool, self.last_serialized_st, handle);
                    self.last_serialized = Some(handle);
                }
                if inst.opcode.is_store() && src3_ready {
                    chain_if_unissued(pool, self.last_serialized_st, handle);
                    self.last_serialized_st = Some(handle);
                }
            }
            _ => self.apply_window(pool, handle, inst, pc),
        }
    }

    fn apply_window(
        &mut self,
        pool: &mut InstPool,
        handle: InstHandle,
        inst: Instruction,
        pc: u64,
    ) {
        if let Some(src1) = inst.src1 {
            self.window = Some(src1);
        } else if self.last_pc != Some(pc) {
            self.window = None;
        }
        self.last_pc = Some(pc);

        let Some(window) = self.window else {
            return;
        };

        if inst.opcode.is_memory() {
            if let Some(prev) = self.window_rat.producer(window) {
                if pool.get(prev).is_some() {
                    if let Some(d) = pool.get_mut(handle) {
                        if d.is_src3_ready() {
                            d.deps[2] = Some(prev);
                        }
                    }
                }
            }
            if let Some(d) = pool.get_mut(handle) {
                d.serialize_entry = Some(window);
            }
            self.window_rat.set_producer(window, handle);
        } else {
            for dst in [inst.dst1, inst.dst2].into_iter().flatten() {
                self.window_rat.clear(dst);
            }
        }
    }

    /// Drops every back-pointer naming a committing op.
    pub fn on_retire(&mut self, handle: InstHandle, entry: Option<u8>) {
        if self.last_serialized == Some(handle) {
            self.last_serialized = None;
        }
        if self.last_serialized_st == Some(handle) {
            self.last_serialized_st = None;
        }
        if let Some(window) = entry {
            self.window_rat.clear_if_match(window, handle);
        }
    }

    /// Last memory op recorded for a logical register window.
    pub fn window_producer(&self, window: u8) -> Option<InstHandle> {
        self.window_rat.producer(window)
    }
}

fn chain_if_unissued(pool: &mut InstPool, prev: Option<InstHandle>, handle: InstHandle) {
    let Some(prev) = prev else {
        return;
    };
    if pool.get(prev).is_some_and(|p| !p.is_issued()) {
        if let Some(d) = pool.get_mut(handle) {
            d.deps[2] = Some(prev);
        }
    }
}
