//! Stall, fault, and configuration error definitions.
//!
//! This module defines the discrete result codes used across the simulator. It provides:
//! 1. **Dispatch Stalls:** Recoverable reasons why rename could not admit an operation.
//! 2. **Page Faults:** Terminal outcomes of a page table walk.
//! 3. **Configuration Errors:** Rejections of an inconsistent parameter set.
//!
//! Nothing here is thrown across a component boundary; every fallible operation
//! returns one of these values.

use thiserror::Error;

/// Reason a micro-operation could not be dispatched this cycle.
///
/// Every stall is recoverable: the operation is retried next cycle with
/// identical inputs and no state is modified by the failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StallCause {
    /// The scheduling window of the target cluster is full.
    SmallWindow,
    /// ROB plus retiring ROB occupancy reached capacity.
    SmallRob,
    /// No free physical register left in the budget.
    SmallReg,
    /// Too many outstanding loads in the target cluster.
    OutstandingLoads,
    /// Too many outstanding stores in the target cluster.
    OutstandingStores,
    /// Too many outstanding branches in the target cluster.
    OutstandingBranches,
    /// The core is draining after a memory-ordering replay.
    Replays,
    /// A serializing system operation is in flight.
    Syscall,
}

impl StallCause {
    /// Number of stall causes (size of per-cause statistics arrays).
    pub const COUNT: usize = 8;

    /// All stall causes, in statistics index order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::SmallWindow,
        Self::SmallRob,
        Self::SmallReg,
        Self::OutstandingLoads,
        Self::OutstandingStores,
        Self::OutstandingBranches,
        Self::Replays,
        Self::Syscall,
    ];

    /// Index of this cause in statistics arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Fault raised by a page table walk.
///
/// A fault is terminal for the translation request: it is delivered exactly
/// once through the completion handler and never retried by the walker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Error)]
pub enum PageFault {
    /// Both the L1 TLB and backing memory were probed and neither held the entry.
    #[error("page table entry not found in L1 TLB or memory")]
    AccessFault,
    /// The entry is invalid, uses reserved bits or an illegal R/W combination,
    /// or the last level is not a leaf.
    #[error("invalid page table entry")]
    InvalidPte,
    /// The leaf does not grant the requested permissions.
    #[error("insufficient page permissions")]
    NoPermission,
    /// A superpage leaf has non-zero low physical page number bits.
    #[error("misaligned superpage")]
    PageMisalign,
    /// The leaf's accessed bit is clear.
    #[error("page accessed bit clear")]
    PageAccess,
    /// A store hit a leaf whose dirty bit is clear.
    #[error("page dirty bit clear on store")]
    PageWrite,
}

/// Rejection of an inconsistent configuration.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The ROB cannot hold anything with the admission margin of one entry.
    #[error("max_rob_size must be at least 2 (got {0})")]
    RobTooSmall(usize),
    /// A per-cycle width parameter is zero.
    #[error("{0} must be non-zero")]
    ZeroWidth(&'static str),
    /// The instruction queue cannot accept a full fetch bucket.
    #[error("inst_queue_size ({queue}) must be at least fetch_width ({fetch})")]
    InstQueueTooSmall {
        /// Configured instruction queue size.
        queue: usize,
        /// Configured fetch width.
        fetch: usize,
    },
    /// Serialization level outside 0..=2.
    #[error("serialize_level must be 0, 1 or 2 (got {0})")]
    SerializeLevel(u8),
    /// The walker pool is empty.
    #[error("ptw_count must be non-zero")]
    NoWalkers,
    /// The configuration text could not be parsed.
    #[error("invalid configuration JSON: {0}")]
    Parse(String),
}
