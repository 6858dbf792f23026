//! External collaborator interfaces of the out-of-order engine.
//!
//! The engine owns rename, the ROB, replay recovery and retirement. Everything
//! around it is consumed through three narrow traits:
//! 1. **`FrontEnd`:** Fetch and branch prediction; delivers decoded buckets in program order.
//! 2. **`Cluster`:** Resource allocation and execution; grants or refuses dispatch and retirement.
//! 3. **`Emulator`:** Functional emulation; owns the architectural stream and takes retired ops back.
//!
//! Each hardware thread's `OooCore` is generic over one implementation of each.

use std::collections::VecDeque;

use crate::common::error::StallCause;
use crate::core::pipeline::dinst::{DynInst, HartId};

/// Instruction fetch front end.
pub trait FrontEnd {
    /// Returns true while fetch for `hart` is blocked (e.g. waiting on a branch).
    ///
    /// A blocked front end keeps the core busy so that the blocking
    /// instruction can make progress.
    fn is_blocked(&self, hart: HartId) -> bool;

    /// Fetches one bucket's worth of instructions for `hart` into the fetch pipeline.
    ///
    /// # Returns
    ///
    /// The number of instructions fetched (0 if nothing could be fetched).
    fn fetch(&mut self, hart: HartId) -> usize;

    /// Pops the oldest decoded bucket, if one has cleared the fetch pipeline.
    ///
    /// Buckets are never empty and are ordered oldest first.
    fn next_bucket(&mut self) -> Option<VecDeque<DynInst>>;

    /// Returns true if instructions are still travelling through the fetch pipeline.
    fn has_outstanding(&self) -> bool;

    /// Number of instructions between fetch and decode (replay wasted-work accounting).
    fn in_flight(&self) -> usize;
}

/// Execution cluster: scheduling window, functional units, and per-op resources.
///
/// Implementations drive execution and report progress back through
/// `OooCore::executing`, `OooCore::executed` and `OooCore::performed`.
pub trait Cluster {
    /// Checks whether `inst` can be dispatched this cycle.
    ///
    /// # Returns
    ///
    /// `Ok(())` if resources are available, otherwise the structural hazard.
    /// A refusal must not change any state.
    fn can_issue(&mut self, inst: &DynInst) -> Result<(), StallCause>;

    /// Inserts a dispatched op into the scheduling window.
    fn add_inst(&mut self, inst: &DynInst);

    /// Returns true if the ROB head may move to the retiring ROB.
    fn preretire(&mut self, inst: &DynInst, flushing: bool) -> bool;

    /// Returns true if the op may commit this cycle.
    fn retire(&mut self, inst: &DynInst, flushing: bool) -> bool;
}

/// Functional emulation layer that produced the instruction stream.
pub trait Emulator {
    /// Resynchronizes the emulated stream of `hart` after a replay drain.
    fn sync_head_tail(&mut self, hart: HartId);

    /// Asks the emulator to re-execute the tail of `hart`; issued when an op
    /// commits before its memory effect has been performed.
    fn reexecute_tail(&mut self, hart: HartId);

    /// Takes back a fully retired op.
    fn destroy(&mut self, inst: DynInst);
}
