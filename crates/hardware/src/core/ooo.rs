//! Out-of-order core engine.
//!
//! `OooCore` is the engine context of one hardware thread. It owns every piece
//! of per-thread state and drives the per-cycle stage sequence:
//! 1. **Fetch:** Ask the front end for a bucket; a blocked front end keeps the core busy.
//! 2. **Decode:** Move a decoded bucket into the instruction queue when a full bucket fits.
//! 3. **Recovery:** While draining a replay, charge lost slots and only retire.
//! 4. **Rename:** Dispatch from the instruction queue (`rename.rs`).
//! 5. **Retire:** Two-phase in-order commit (`retire.rs`).
//!
//! Execution itself happens in the cluster, which reports progress through
//! `executing`, `executed`, and `performed`.

use std::collections::VecDeque;

use tracing::{debug, trace};

use crate::common::error::{ConfigError, StallCause};
use crate::config::CoreConfig;
use crate::core::pipeline::dinst::{DynInst, HartId, InstHandle, InstPool, InstState};
use crate::core::pipeline::rat::RegisterAliasTable;
use crate::core::pipeline::replay::Recovery;
use crate::core::pipeline::retire::RetireLock;
use crate::core::pipeline::rob::Rob;
use crate::core::pipeline::serialize::Serializer;
use crate::core::pipeline::traits::{Cluster, Emulator, FrontEnd};
use crate::stats::CoreStats;

/// Register budget used when `total_regs` is configured as 0.
const UNLIMITED_REGS: i64 = 1 << 30;

/// Out-of-order engine for one hardware thread.
///
/// Generic over its collaborators so that each simulated thread owns an
/// independent instance with no shared mutable state.
#[derive(Debug)]
pub struct OooCore<F, C, E> {
    pub(crate) config: CoreConfig,
    pub(crate) hart: HartId,
    pub(crate) front_end: F,
    pub(crate) cluster: C,
    pub(crate) emul: E,
    pub(crate) pool: InstPool,
    pub(crate) rob: Rob,
    pub(crate) rrob: Rob,
    pub(crate) rat: RegisterAliasTable,
    pub(crate) serializer: Serializer,
    pub(crate) recovery: Recovery,
    pub(crate) lock: RetireLock,
    /// Decoded buckets waiting for rename, oldest first.
    pub(crate) inst_queue: VecDeque<VecDeque<DynInst>>,
    /// Ops held in the instruction queue; one bucket may overfill it.
    pub(crate) queued: usize,
    pub(crate) free_regs: i64,
    pub(crate) clock: u64,
    pub(crate) active: bool,
    pub(crate) busy: bool,
    pub(crate) stats_flag: bool,
    pub(crate) stats: CoreStats,
}

impl<F: FrontEnd, C: Cluster, E: Emulator> OooCore<F, C, E> {
    /// Builds an inactive core for `hart`.
    ///
    /// # Arguments
    ///
    /// * `config` - Core parameters; validated here.
    /// * `hart` - Hardware thread this engine serves.
    /// * `front_end`, `cluster`, `emul` - External collaborators.
    ///
    /// # Returns
    ///
    /// The core, or the first configuration problem found.
    pub fn new(
        config: CoreConfig,
        hart: HartId,
        front_end: F,
        cluster: C,
        emul: E,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let free_regs = if config.total_regs == 0 {
            UNLIMITED_REGS
        } else {
            config.total_regs
        };
        Ok(Self {
            hart,
            front_end,
            cluster,
            emul,
            pool: InstPool::with_capacity(config.max_rob_size + config.inst_queue_size),
            rob: Rob::new(config.max_rob_size),
            rrob: Rob::new(config.max_rob_size),
            rat: RegisterAliasTable::new(),
            serializer: Serializer::new(config.serialize_level),
            recovery: Recovery::default(),
            lock: RetireLock::default(),
            inst_queue: VecDeque::new(),
            queued: 0,
            free_regs,
            clock: 0,
            active: false,
            busy: false,
            stats_flag: false,
            stats: CoreStats::default(),
            config,
        })
    }

    /// Starts simulating this thread.
    pub fn activate(&mut self) {
        debug!(hart = self.hart.0, "core activated");
        self.active = true;
    }

    /// Stops simulating this thread; `advance_clock` becomes a no-op.
    pub fn deactivate(&mut self) {
        debug!(hart = self.hart.0, "core deactivated");
        self.active = false;
    }

    /// Returns true while the thread is active.
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Advances the core by one cycle.
    ///
    /// # Returns
    ///
    /// `true` while the core still has work in flight.
    pub fn advance_clock(&mut self) -> bool {
        if !self.active {
            return false;
        }

        self.fetch();

        if let Some(top) = self.rob.top().and_then(|h| self.pool.get(h)) {
            self.stats_flag = top.stats_flag;
        }
        self.clock += 1;
        if self.stats_flag {
            self.stats.clock_ticks += 1;
        }
        if self.clock % self.config.lock_check_interval == 0 {
            self.retire_lock_check();
        }

        if !self.busy {
            return false;
        }

        self.decode();

        if self.recovery.recovering {
            if self.rob.is_empty() && self.rrob.is_empty() {
                self.finish_recovery();
            } else {
                self.stats.add_stall(
                    StallCause::Replays,
                    self.config.realistic_width,
                    self.stats_flag,
                );
                self.retire();
                return true;
            }
        }

        if !self.inst_queue.is_empty() {
            let issued = self.issue();
            self.queued -= issued;
        } else if self.rob.is_empty() && self.rrob.is_empty() {
            self.busy = self.front_end.has_outstanding();
            return true;
        }

        self.retire();
        true
    }

    fn fetch(&mut self) {
        if self.front_end.is_blocked(self.hart) {
            self.busy = true;
            return;
        }
        let fetched = self.front_end.fetch(self.hart);
        if fetched > 0 {
            self.stats.fetch_width.sample(fetched as f64, self.stats_flag);
            self.busy = true;
        }
    }

    fn decode(&mut self) {
        if self.space_in_inst_queue() < self.config.fetch_width {
            if self.stats_flag {
                self.stats.no_fetch += 1;
            }
            return;
        }
        match self.front_end.next_bucket() {
            Some(bucket) if !bucket.is_empty() => {
                self.queued += bucket.len();
                self.inst_queue.push_back(bucket);
            }
            _ => {
                if self.stats_flag {
                    self.stats.no_fetch2 += 1;
                }
            }
        }
    }

    /// Called by the cluster when an op leaves its scheduler for a functional unit.
    ///
    /// An issued op no longer takes new serialization edges as a predecessor.
    pub fn issued(&mut self, handle: InstHandle) {
        if let Some(d) = self.pool.get_mut(handle) {
            if d.state < InstState::Issued {
                d.state = InstState::Issued;
            }
        }
    }

    /// Called by the cluster when an op starts executing.
    ///
    /// With late register allocation the op takes its register here.
    pub fn executing(&mut self, handle: InstHandle) {
        let late = self.config.late_alloc_register;
        let Some(d) = self.pool.get_mut(handle) else {
            return;
        };
        if d.state < InstState::Executing {
            d.state = InstState::Executing;
        }
        if late && d.inst.has_dst_register() && !d.reg_allocated {
            d.reg_allocated = true;
            self.free_regs -= 1;
        }
    }

    /// Called by the cluster when an op's result is available.
    ///
    /// Stamps the completion cycle and drops RAT entries that still name the op.
    /// Non-store ops are considered performed at this point.
    pub fn executed(&mut self, handle: InstHandle) {
        let clock = self.clock;
        let Some(d) = self.pool.get_mut(handle) else {
            return;
        };
        d.state = InstState::Executed;
        d.executed_time = clock;
        if !d.inst.opcode.is_store() {
            d.performed = true;
        }
        for reg in [d.inst.dst1, d.inst.dst2].into_iter().flatten() {
            self.rat.clear_if_match(reg, handle);
        }
        trace!(id = handle.id().0, clock, "executed");
    }

    /// Called by the memory system when an op's memory effect completes.
    ///
    /// An op that already committed is released to the emulator here.
    pub fn performed(&mut self, handle: InstHandle) {
        let retired = match self.pool.get_mut(handle) {
            Some(d) => {
                d.performed = true;
                d.state == InstState::Retired
            }
            None => return,
        };
        if retired {
            if let Some(d) = self.pool.remove(handle) {
                trace!(id = d.id.0, "performed after retirement");
                self.emul.destroy(d);
            }
        }
    }

    /// Returns true if the ROB holds no op.
    pub fn is_rob_empty(&self) -> bool {
        self.rob.is_empty()
    }

    /// ROB occupancy.
    pub fn rob_size(&self) -> usize {
        self.rob.len()
    }

    /// Retiring ROB occupancy.
    pub fn rrob_size(&self) -> usize {
        self.rrob.len()
    }

    /// Resolves a handle to an in-flight op.
    pub fn inst(&self, handle: InstHandle) -> Option<&DynInst> {
        self.pool.get(handle)
    }

    /// ROB entries from oldest to youngest.
    pub fn rob_handles(&self) -> Vec<InstHandle> {
        self.rob.iter().collect()
    }

    /// Retiring ROB entries from oldest to youngest.
    pub fn rrob_handles(&self) -> Vec<InstHandle> {
        self.rrob.iter().collect()
    }

    /// Latest in-flight producer of logical register `reg`.
    pub fn producer(&self, reg: u8) -> Option<InstHandle> {
        self.rat.producer(reg)
    }

    /// Remaining register budget.
    pub const fn free_regs(&self) -> i64 {
        self.free_regs
    }

    /// Current serialization level.
    pub const fn serialize_level(&self) -> u8 {
        self.serializer.level()
    }

    /// Remaining serialized admissions.
    pub const fn serialize_for(&self) -> u32 {
        self.serializer.remaining()
    }

    /// Arms the serialization budget directly.
    pub const fn set_serialize_for(&mut self, budget: u32) {
        self.serializer.arm(budget);
    }

    /// Returns true while a replay drain is in progress.
    pub const fn is_recovering(&self) -> bool {
        self.recovery.recovering
    }

    /// Highest op ID known to require replay.
    pub const fn replay_id(&self) -> u64 {
        self.recovery.replay_id
    }

    /// Returns true while committed ops are being discarded after a replay.
    pub const fn is_flushing(&self) -> bool {
        self.recovery.flushing
    }

    /// Returns true once the retire-lock check has fired.
    pub const fn lock_detected(&self) -> bool {
        self.lock.detected
    }

    /// Returns true while the core has work in flight.
    pub const fn is_busy(&self) -> bool {
        self.busy
    }

    /// Cycles simulated while active.
    pub const fn clock(&self) -> u64 {
        self.clock
    }

    /// Free instruction queue slots.
    pub const fn space_in_inst_queue(&self) -> usize {
        self.config.inst_queue_size.saturating_sub(self.queued)
    }

    /// Statistics gathered so far.
    pub const fn stats(&self) -> &CoreStats {
        &self.stats
    }

    /// Hardware thread served by this core.
    pub const fn hart(&self) -> HartId {
        self.hart
    }

    /// Front end collaborator.
    pub const fn front_end(&self) -> &F {
        &self.front_end
    }

    /// Front end collaborator, mutably.
    pub const fn front_end_mut(&mut self) -> &mut F {
        &mut self.front_end
    }

    /// Cluster collaborator.
    pub const fn cluster(&self) -> &C {
        &self.cluster
    }

    /// Cluster collaborator, mutably.
    pub const fn cluster_mut(&mut self) -> &mut C {
        &mut self.cluster
    }

    /// Emulator collaborator.
    pub const fn emulator(&self) -> &E {
        &self.emul
    }
}
