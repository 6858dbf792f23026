//! Retire stage.
//!
//! Retirement runs every cycle in two phases:
//! 1. **Promotion:** ROB head ops that their cluster accepts for pre-retirement
//!    move to the retiring ROB. Bounded only by readiness, never by width.
//! 2. **Commit:** Up to `retire_width` retiring-ROB ops commit, each no earlier
//!    than `retire_delay` cycles after it executed.
//!
//! Commit returns the op's register, clears back-pointers to it, and releases
//! it to the emulator (or, if its memory effect is still pending, keeps it
//! until `performed`). A periodic lock check flags a retirement that made no
//! progress over a whole interval.

use tracing::{error, trace, warn};

use crate::core::ooo::OooCore;
use crate::core::pipeline::dinst::{InstId, InstState};
use crate::core::pipeline::traits::{Cluster, Emulator, FrontEnd};

/// Snapshot compared across lock-check intervals.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct RetireSample {
    commits: u64,
    rob_head: Option<InstId>,
    rrob_head: Option<InstId>,
}

/// Retire-lock detector state.
#[derive(Clone, Copy, Debug, Default)]
pub struct RetireLock {
    /// Every commit, regardless of statistics sampling or flushing.
    commits: u64,
    last: Option<RetireSample>,
    /// Set once a lock has been observed; never cleared.
    pub detected: bool,
}

impl<F: FrontEnd, C: Cluster, E: Emulator> OooCore<F, C, E> {
    /// Runs both retirement phases for this cycle.
    pub(crate) fn retire(&mut self) {
        let flushing = self.recovery.flushing;
        while let Some(handle) = self.rob.top() {
            let Some(d) = self.pool.get(handle) else {
                warn!(id = handle.id().0, "released op found at ROB head");
                let _ = self.rob.pop();
                continue;
            };
            if !self.cluster.preretire(d, flushing) {
                break;
            }
            let _ = self.rob.pop();
            let pushed = self.rrob.push(handle);
            debug_assert!(pushed, "retiring ROB overflow");
        }
        self.stats
            .rob_used
            .sample(self.rob.len() as f64, self.stats_flag);
        self.stats
            .rrob_used
            .sample(self.rrob.len() as f64, self.stats_flag);

        for _ in 0..self.config.retire_width {
            let Some(handle) = self.rrob.top() else {
                break;
            };
            let Some(d) = self.pool.get_mut(handle) else {
                warn!(id = handle.id().0, "released op found at retiring ROB head");
                let _ = self.rrob.pop();
                continue;
            };
            if d.executed_time + self.config.retire_delay >= self.clock {
                break;
            }
            if !self.cluster.retire(d, self.recovery.flushing) {
                break;
            }
            let _ = self.rrob.pop();

            let hart = d.hart;
            if d.replay {
                self.recovery.flushing = true;
                self.recovery.flushing_hart = hart;
            }
            if !self.recovery.flushing && d.stats_flag {
                self.stats.committed += 1;
            }
            self.lock.commits += 1;

            if d.reg_allocated {
                d.reg_allocated = false;
                self.free_regs += 1;
            }
            for reg in [d.inst.dst1, d.inst.dst2].into_iter().flatten() {
                self.rat.clear_if_match(reg, handle);
            }
            self.serializer.on_retire(handle, d.serialize_entry);
            trace!(id = d.id.0, clock = self.clock, performed = d.performed, "committed");

            if d.performed {
                if let Some(d) = self.pool.remove(handle) {
                    self.emul.destroy(d);
                }
            } else {
                d.state = InstState::Retired;
                self.emul.reexecute_tail(hart);
            }
        }
    }

    /// Compares the retirement state with the previous sample and flags a
    /// lock if nothing moved while instructions are pending.
    pub(crate) fn retire_lock_check(&mut self) {
        let sample = RetireSample {
            commits: if self.active { self.lock.commits } else { 0 },
            rob_head: self.rob.top().map(|h| h.id()),
            rrob_head: self.rrob.top().map(|h| h.id()),
        };
        let pending = sample.rob_head.is_some() || sample.rrob_head.is_some();
        if self.active && pending && self.lock.last == Some(sample) {
            error!(
                hart = self.hart.0,
                clock = self.clock,
                rob_head = ?sample.rob_head,
                rrob_head = ?sample.rrob_head,
                "retire lock detected"
            );
            self.lock.detected = true;
        }
        self.lock.last = Some(sample);
    }
}
