//! Rename / dispatch stage.
//!
//! Admits fetched ops into the ROB. Admission checks run in a fixed
//! precedence and the first failing check is reported:
//! 1. **Replay drain:** Ops younger than the replay point wait until recovery completes.
//! 2. **ROB capacity:** ROB plus retiring ROB must stay below `max_rob_size - 1`.
//! 3. **Register budget:** At least one free physical register.
//! 4. **Cluster:** The target cluster may report a structural hazard.
//!
//! A refused op is handed back unchanged inside the `Stall`, so retrying it
//! next cycle is idempotent. Source producers are captured from the RAT
//! before the op publishes its own destinations.

use std::collections::VecDeque;

use thiserror::Error;
use tracing::trace;

use crate::common::error::StallCause;
use crate::core::ooo::OooCore;
use crate::core::pipeline::dinst::{DynInst, InstHandle, InstState};
use crate::core::pipeline::traits::{Cluster, Emulator, FrontEnd};

/// A refused dispatch: the cause plus the op, returned for retry.
#[derive(Debug, Error)]
#[error("dispatch of instruction {} stalled: {cause:?}", inst.id.0)]
pub struct Stall {
    /// Why the op could not be admitted.
    pub cause: StallCause,
    /// The op, unchanged.
    pub inst: DynInst,
}

impl<F: FrontEnd, C: Cluster, E: Emulator> OooCore<F, C, E> {
    /// Renames `inst` into the ROB.
    ///
    /// # Arguments
    ///
    /// * `inst` - A fetched op, in program order relative to earlier admissions.
    ///
    /// # Returns
    ///
    /// The op's handle, or a `Stall` carrying the op back to the caller.
    pub fn add_inst(&mut self, inst: DynInst) -> Result<InstHandle, Stall> {
        if self.recovery.recovering && inst.id.0 > self.recovery.replay_id {
            return Err(Stall {
                cause: StallCause::Replays,
                inst,
            });
        }
        if self.rob.len() + self.rrob.len() >= self.config.max_rob_size - 1 {
            return Err(Stall {
                cause: StallCause::SmallRob,
                inst,
            });
        }
        if self.free_regs <= 0 {
            return Err(Stall {
                cause: StallCause::SmallReg,
                inst,
            });
        }
        if let Err(cause) = self.cluster.can_issue(&inst) {
            return Err(Stall { cause, inst });
        }

        let mut inst = inst;
        if inst.inst.has_dst_register() && !self.config.late_alloc_register {
            self.free_regs -= 1;
            inst.reg_allocated = true;
        }
        if inst.inst.opcode.is_load() {
            let speculative = self.load_is_spec();
            inst.is_spec = speculative;
            inst.is_safe = !speculative;
            if speculative {
                self.stats.spec_loads += u64::from(inst.stats_flag);
            } else {
                self.stats.safe_loads += u64::from(inst.stats_flag);
            }
        }
        inst.renamed_time = self.clock;
        if inst.stats_flag {
            self.stats.admitted[inst.inst.opcode.index()] += 1;
        }

        let handle = self.pool.insert(inst);
        self.serializer
            .apply(&mut self.pool, handle, self.recovery.recovering);

        let pushed = self.rob.push(handle);
        debug_assert!(pushed, "ROB overflow despite the occupancy check");

        let rat = &mut self.rat;
        if let Some(d) = self.pool.get_mut(handle) {
            d.deps[0] = d.inst.src1.and_then(|r| rat.producer(r));
            if !d.src2_late {
                d.deps[1] = d.inst.src2.and_then(|r| rat.producer(r));
            }
            d.state = InstState::Renamed;
            self.cluster.add_inst(d);
            if !d.is_executed() {
                for reg in [d.inst.dst1, d.inst.dst2].into_iter().flatten() {
                    rat.set_producer(reg, handle);
                }
            }
            trace!(id = d.id.0, pc = d.pc, opcode = ?d.inst.opcode, "renamed");
        }
        Ok(handle)
    }

    /// Dispatches from the instruction queue, up to `issue_width` ops.
    ///
    /// On the first stall, the unused slots of a realistic-width cycle are
    /// charged to that cause and dispatch stops for this cycle.
    ///
    /// # Returns
    ///
    /// The number of ops admitted (instruction queue slots freed).
    pub(crate) fn issue(&mut self) -> usize {
        let mut issued = 0;
        while issued < self.config.issue_width {
            let Some(bucket) = self.inst_queue.front_mut() else {
                break;
            };
            let Some(inst) = bucket.pop_front() else {
                let _ = self.inst_queue.pop_front();
                continue;
            };
            let drained = bucket.is_empty();
            if drained {
                let _ = self.inst_queue.pop_front();
            }

            match self.add_inst(inst) {
                Ok(_) => issued += 1,
                Err(Stall { cause, inst }) => {
                    trace!(id = inst.id.0, ?cause, "dispatch stalled");
                    if issued < self.config.realistic_width {
                        self.stats.add_stall(
                            cause,
                            self.config.realistic_width - issued,
                            inst.stats_flag,
                        );
                    }
                    if drained {
                        self.inst_queue.push_front(VecDeque::from([inst]));
                    } else if let Some(bucket) = self.inst_queue.front_mut() {
                        bucket.push_front(inst);
                    }
                    break;
                }
            }
        }
        issued
    }

    /// Returns true if a load admitted now would be speculative: the ROB holds
    /// a memory op not yet executing, or a branch or divide not yet executed.
    fn load_is_spec(&self) -> bool {
        self.rob.iter().filter_map(|h| self.pool.get(h)).any(|d| {
            let op = d.inst.opcode;
            (op.is_memory() && !d.is_executing())
                || ((op.is_branch() || op.is_long_latency()) && !d.is_executed())
        })
    }
}
