//! Replay / recovery controller.
//!
//! The memory consistency layer reports ordering violations through `replay`.
//! The controller then:
//! 1. **Marks:** Flags the violating op and raises the replay point to its ID.
//! 2. **Drains:** Blocks admission past the replay point until ROB and retiring ROB are empty.
//! 3. **Adapts:** On completion, moves the serialization level based on replay spacing.
//!
//! Requests that arrive while a serialization budget is active are ignored so
//! that replays cannot feed on themselves.

use tracing::debug;

use crate::core::ooo::OooCore;
use crate::core::pipeline::dinst::{HartId, InstHandle};
use crate::core::pipeline::traits::{Cluster, Emulator, FrontEnd};

/// Replay and flush bookkeeping of one hardware thread.
#[derive(Clone, Copy, Debug, Default)]
pub struct Recovery {
    /// Highest instruction ID known to require replay.
    pub replay_id: u64,
    /// Set while the core drains after a replay.
    pub recovering: bool,
    /// Set once the replayed op commits; later commits are not counted.
    pub flushing: bool,
    /// Hardware thread whose emulation stream is resynchronized at the end of the drain.
    pub flushing_hart: HartId,
    /// Replay point of the previous completed recovery.
    pub last_replay: u64,
}

impl<F: FrontEnd, C: Cluster, E: Emulator> OooCore<F, C, E> {
    /// Requests a replay starting at the op named by `handle`.
    ///
    /// Repeated calls while a drain is in progress only raise the replay point.
    pub fn replay(&mut self, handle: InstHandle) {
        if self.serializer.remaining() > 0 || !self.config.memory_replay {
            return;
        }
        let Some(d) = self.pool.get_mut(handle) else {
            return;
        };
        d.replay = true;
        let stats_flag = d.stats_flag;
        self.recovery.replay_id = self.recovery.replay_id.max(handle.id().0);

        if self.recovery.recovering {
            return;
        }
        self.recovery.recovering = true;

        let wasted = self.queued + self.front_end.in_flight() + self.rob.len();
        self.stats.replay_inst.sample(wasted as f64, stats_flag);
        if stats_flag {
            self.stats.replays += 1;
        }
        debug!(
            hart = self.hart.0,
            replay_id = self.recovery.replay_id,
            wasted,
            "replay recovery started"
        );
    }

    /// Ends a drained recovery and adapts the serialization level.
    ///
    /// Replays far apart (more than twice the forward-progress threshold)
    /// request the most permissive level; replays closer than the threshold
    /// tighten the level by one and arm the serialization budget.
    pub(crate) fn finish_recovery(&mut self) {
        self.emul.sync_head_tail(self.recovery.flushing_hart);
        self.recovery.recovering = false;
        self.recovery.flushing = false;

        let threshold = self.config.forward_progress_threshold;
        let last = self.recovery.last_replay;
        let id = self.recovery.replay_id;
        if last.saturating_add(threshold.saturating_mul(2)) < id {
            self.serializer.reset_level();
        }
        if last.saturating_add(threshold) > id {
            self.serializer.tighten();
            self.serializer.arm(self.config.serialize);
        }
        self.recovery.last_replay = id;

        debug!(
            hart = self.hart.0,
            replay_id = id,
            level = self.serializer.level(),
            serialize_for = self.serializer.remaining(),
            "replay recovery complete"
        );
    }
}
