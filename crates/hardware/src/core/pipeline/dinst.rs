//! Dynamic instructions (micro-operations) and the in-flight instruction pool.
//!
//! A `DynInst` is one dynamic instance of an instruction. It is created by the
//! front end, owned by the core's `InstPool` while in flight, and released back
//! to the emulation layer at commit (or, for stores that perform late, when the
//! memory effect completes). This module provides:
//! 1. **Static Description:** `Instruction` with opcode class and logical registers.
//! 2. **Dynamic State:** `DynInst` lifecycle state, timestamps, and dependency edges.
//! 3. **Handles:** `InstHandle`, a weak reference that goes stale once its op is released.
//! 4. **Pool:** `InstPool`, a slot arena with explicit slot reset instead of reallocation.

use crate::common::constants::REG_ZERO;

/// Monotonically increasing dynamic instruction identifier (program order).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstId(pub u64);

/// Hardware thread (flow) identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct HartId(pub u32);

/// Opcode class of an instruction, as seen by scheduling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Opcode {
    /// No operation.
    #[default]
    Nop,
    /// Simple integer ALU operation.
    Alu,
    /// Integer multiply.
    Mult,
    /// Integer divide (long latency).
    Div,
    /// Branch or jump.
    Branch,
    /// Memory load.
    Load,
    /// Memory store.
    Store,
    /// Floating-point add/compare/convert.
    FpAlu,
    /// Floating-point multiply.
    FpMult,
    /// Floating-point divide or square root (long latency).
    FpDiv,
}

impl Opcode {
    /// Number of opcode classes (size of per-opcode statistics arrays).
    pub const COUNT: usize = 10;

    /// Index of this opcode in statistics arrays.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns true for loads and stores.
    #[inline]
    pub const fn is_memory(self) -> bool {
        matches!(self, Self::Load | Self::Store)
    }

    /// Returns true for loads.
    #[inline]
    pub const fn is_load(self) -> bool {
        matches!(self, Self::Load)
    }

    /// Returns true for stores.
    #[inline]
    pub const fn is_store(self) -> bool {
        matches!(self, Self::Store)
    }

    /// Returns true for branches.
    #[inline]
    pub const fn is_branch(self) -> bool {
        matches!(self, Self::Branch)
    }

    /// Returns true for divides, whose unresolved results make younger loads speculative.
    #[inline]
    pub const fn is_long_latency(self) -> bool {
        matches!(self, Self::Div | Self::FpDiv)
    }
}

/// Static description of an instruction, as delivered by the decoder.
///
/// Logical registers are indices below `NUM_LOGICAL_REGS`; `None` means the
/// operand slot is unused.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Instruction {
    /// Opcode class.
    pub opcode: Opcode,
    /// First source register.
    pub src1: Option<u8>,
    /// Second source register.
    pub src2: Option<u8>,
    /// First destination register.
    pub dst1: Option<u8>,
    /// Second destination register.
    pub dst2: Option<u8>,
}

impl Instruction {
    /// Creates an instruction with no register operands.
    pub const fn new(opcode: Opcode) -> Self {
        Self {
            opcode,
            src1: None,
            src2: None,
            dst1: None,
            dst2: None,
        }
    }

    /// Sets the source registers.
    #[must_use]
    pub const fn with_srcs(mut self, src1: Option<u8>, src2: Option<u8>) -> Self {
        self.src1 = src1;
        self.src2 = src2;
        self
    }

    /// Sets the first destination register.
    #[must_use]
    pub const fn with_dst(mut self, dst: u8) -> Self {
        self.dst1 = Some(dst);
        self
    }

    /// Sets the second destination register.
    #[must_use]
    pub const fn with_dst2(mut self, dst: u8) -> Self {
        self.dst2 = Some(dst);
        self
    }

    /// Returns true if the instruction writes a register other than the zero register.
    pub fn has_dst_register(&self) -> bool {
        [self.dst1, self.dst2]
            .into_iter()
            .flatten()
            .any(|r| r != REG_ZERO)
    }
}

/// Lifecycle state of a dynamic instruction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum InstState {
    /// Delivered by the front end, not yet renamed.
    #[default]
    Fetched,
    /// Renamed into the ROB.
    Renamed,
    /// Selected for execution by its cluster.
    Issued,
    /// Executing in a functional unit.
    Executing,
    /// Execution complete, result available.
    Executed,
    /// Committed; only still in the pool if its memory effect is pending.
    Retired,
}

/// Weak reference to an in-flight instruction.
///
/// A handle names both the pool slot and the instruction ID stored in it, so a
/// handle to a released instruction never resolves to whatever reuses the slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InstHandle {
    index: u32,
    id: InstId,
}

impl InstHandle {
    /// Instruction ID this handle refers to.
    #[inline]
    pub const fn id(&self) -> InstId {
        self.id
    }
}

/// One dynamic instance of an instruction.
#[derive(Clone, Debug, Default)]
pub struct DynInst {
    /// Program-order identifier.
    pub id: InstId,
    /// Program counter.
    pub pc: u64,
    /// Static description.
    pub inst: Instruction,
    /// Owning hardware thread.
    pub hart: HartId,
    /// Whether this instruction is inside a statistics sampling window.
    pub stats_flag: bool,
    /// Current lifecycle state.
    pub state: InstState,
    /// Producer edges: src1, src2, and the serialization (third) source.
    pub deps: [Option<InstHandle>; 3],
    /// Set by the consistency layer before rename when src2 resolves at retirement.
    pub src2_late: bool,
    /// Load admitted while older memory ops, branches, or divides were unresolved.
    pub is_spec: bool,
    /// Load admitted with no unresolved older hazards.
    pub is_safe: bool,
    /// Marked by a memory-ordering replay.
    pub replay: bool,
    /// Memory effect performed (always true for non-memory ops once executed).
    pub performed: bool,
    /// Whether this op currently holds a register from the budget.
    pub reg_allocated: bool,
    /// Serialization window this op was recorded in (level 2 only).
    pub serialize_entry: Option<u8>,
    /// Cycle at which rename admitted the op.
    pub renamed_time: u64,
    /// Cycle at which execution completed.
    pub executed_time: u64,
}

impl DynInst {
    /// Creates a freshly fetched instruction.
    pub fn new(id: u64, pc: u64, inst: Instruction) -> Self {
        Self {
            id: InstId(id),
            pc,
            inst,
            stats_flag: true,
            ..Self::default()
        }
    }

    /// Sets the owning hardware thread.
    #[must_use]
    pub fn on_hart(mut self, hart: HartId) -> Self {
        self.hart = hart;
        self
    }

    /// Marks src2 as resolved at retirement (memory consistency dependency).
    #[must_use]
    pub fn with_late_src2(mut self) -> Self {
        self.src2_late = true;
        self
    }

    /// Returns true if no serialization dependency has been attached.
    #[inline]
    pub const fn is_src3_ready(&self) -> bool {
        self.deps[2].is_none()
    }

    /// Returns true once the cluster has issued the op.
    #[inline]
    pub fn is_issued(&self) -> bool {
        self.state >= InstState::Issued
    }

    /// Returns true once the op has started executing.
    #[inline]
    pub fn is_executing(&self) -> bool {
        self.state >= InstState::Executing
    }

    /// Returns true once execution has completed.
    #[inline]
    pub fn is_executed(&self) -> bool {
        self.state >= InstState::Executed
    }
}

/// Slot arena holding every in-flight instruction of one core.
///
/// Released slots are reset in place and recycled through a free list.
#[derive(Debug, Default)]
pub struct InstPool {
    slots: Vec<Option<DynInst>>,
    free: Vec<u32>,
}

impl InstPool {
    /// Creates a pool with `capacity` pre-allocated slots.
    pub fn with_capacity(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        let free = (0..capacity as u32).rev().collect();
        Self { slots, free }
    }

    /// Number of live instructions.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns true if no instruction is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores an instruction and returns its handle. Grows if every slot is taken.
    pub fn insert(&mut self, inst: DynInst) -> InstHandle {
        let id = inst.id;
        let index = if let Some(index) = self.free.pop() {
            self.slots[index as usize] = Some(inst);
            index
        } else {
            self.slots.push(Some(inst));
            (self.slots.len() - 1) as u32
        };
        InstHandle { index, id }
    }

    /// Resolves a handle; `None` if the instruction has been released.
    pub fn get(&self, handle: InstHandle) -> Option<&DynInst> {
        self.slots
            .get(handle.index as usize)
            .and_then(Option::as_ref)
            .filter(|d| d.id == handle.id)
    }

    /// Resolves a handle mutably; `None` if the instruction has been released.
    pub fn get_mut(&mut self, handle: InstHandle) -> Option<&mut DynInst> {
        self.slots
            .get_mut(handle.index as usize)
            .and_then(Option::as_mut)
            .filter(|d| d.id == handle.id)
    }

    /// Releases an instruction, returning ownership to the caller.
    pub fn remove(&mut self, handle: InstHandle) -> Option<DynInst> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.as_ref().is_some_and(|d| d.id == handle.id) {
            self.free.push(handle.index);
            slot.take()
        } else {
            None
        }
    }
}
