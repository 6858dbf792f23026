//! Page Table Walker (PTW) pool for RISC-V SV48.
//!
//! This module implements a fixed pool of walker slots, each running the
//! four-level SV48 radix walk as an explicit state machine:
//! 1. **Allocation:** `translate` claims the first free slot and starts walking at level 3.
//! 2. **Probing:** A PTE that is not yet known is requested from the L1 TLB first,
//!    then from backing memory. Each probe suspends the walker until `complete_probe`.
//! 3. **Checking:** A fetched PTE is validated, then either descended through or
//!    checked as a leaf (permissions, superpage alignment, A/D bits).
//! 4. **Completion:** The request's handler runs exactly once and the slot is freed.
//!
//! Probes leave the walker as `PteProbe` messages; whoever services them
//! answers through `complete_probe`, which re-drives the walk in the same call.

use std::collections::VecDeque;
use std::fmt;

use tracing::{debug, trace, warn};

use crate::common::addr::{PhysAddr, VirtAddr};
use crate::common::constants::{
    PAGE_SHIFT, PTE_SIZE, SV48_LEVELS, SV48_ROOT_LEVEL, VPN_BITS_PER_LEVEL,
};
use crate::common::error::PageFault;
use crate::core::units::mmu::pte::Sv48Pte;

/// A translation request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TranslateRequest {
    /// Caller-chosen identifier echoed in the response.
    pub req_id: u64,
    /// Address to translate.
    pub vaddr: VirtAddr,
    /// Read permission required.
    pub r: bool,
    /// Write permission required.
    pub w: bool,
    /// Execute permission required.
    pub x: bool,
    /// User mode access required.
    pub u: bool,
    /// The access is a store (requires the dirty bit).
    pub is_store: bool,
}

impl TranslateRequest {
    /// A load from `vaddr`.
    pub const fn load(req_id: u64, vaddr: VirtAddr) -> Self {
        Self {
            req_id,
            vaddr,
            r: true,
            w: false,
            x: false,
            u: false,
            is_store: false,
        }
    }

    /// A store to `vaddr`.
    pub const fn store(req_id: u64, vaddr: VirtAddr) -> Self {
        Self {
            req_id,
            vaddr,
            r: false,
            w: true,
            x: false,
            u: false,
            is_store: true,
        }
    }

    /// An instruction fetch from `vaddr`.
    pub const fn fetch(req_id: u64, vaddr: VirtAddr) -> Self {
        Self {
            req_id,
            vaddr,
            r: false,
            w: false,
            x: true,
            u: false,
            is_store: false,
        }
    }

    /// Marks the access as coming from user mode.
    #[must_use]
    pub const fn user(mut self) -> Self {
        self.u = true;
        self
    }
}

/// Result of a translation, delivered once to the request's handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TranslateResponse {
    /// Identifier of the originating request.
    pub req_id: u64,
    /// Physical address, or the fault that ended the walk.
    pub outcome: Result<PhysAddr, PageFault>,
}

/// Completion handler registered with a request.
pub type TranslateHandler = Box<dyn FnOnce(TranslateResponse)>;

/// Where a probe is directed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ProbeKind {
    /// The private L1 TLB (PTE cache).
    L1Tlb,
    /// Backing memory.
    Memory,
}

/// An outstanding PTE lookup issued by a walker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PteProbe {
    /// Walker slot that issued the probe.
    pub slot: usize,
    /// Walk the probe belongs to; a reused slot starts a new walk.
    pub walk: u64,
    /// Page table level being resolved.
    pub level: u32,
    /// Probe target.
    pub kind: ProbeKind,
    /// Physical address of the PTE.
    pub addr: PhysAddr,
}

/// Observable state of one walker slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkState {
    /// Available for allocation.
    Free,
    /// Resolving the given level (3 down to 0).
    Walking(u32),
}

/// Per-level probe bookkeeping.
#[derive(Clone, Copy, Debug, Default)]
struct LevelProbe {
    l1tlb_ongoing: bool,
    l1tlb_complete: bool,
    mem_ongoing: bool,
    mem_complete: bool,
    pte: Option<Sv48Pte>,
}

/// A busy walker slot.
struct Walk {
    id: u64,
    request: TranslateRequest,
    level: u32,
    /// Base of the page table being indexed at `level`.
    table: PhysAddr,
    levels: [LevelProbe; SV48_LEVELS],
    handler: Option<TranslateHandler>,
}

impl fmt::Debug for Walk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walk")
            .field("id", &self.id)
            .field("request", &self.request)
            .field("level", &self.level)
            .field("table", &self.table)
            .field("levels", &self.levels)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

enum Step {
    Descend,
    Done(Result<PhysAddr, PageFault>),
}

/// Pool of SV48 page table walkers.
#[derive(Debug)]
pub struct PageTableWalker {
    slots: Vec<Option<Walk>>,
    root: PhysAddr,
    probes: VecDeque<PteProbe>,
    next_walk: u64,
}

impl PageTableWalker {
    /// Creates a pool of `count` walkers over the page table rooted at `root_ppn`.
    pub fn new(count: usize, root_ppn: u64) -> Self {
        let mut slots = Vec::with_capacity(count);
        slots.resize_with(count, || None);
        Self {
            slots,
            root: PhysAddr::from_ppn(root_ppn, 0),
            probes: VecDeque::new(),
            next_walk: 0,
        }
    }

    /// Points subsequent walks at a new root page table.
    pub fn set_root(&mut self, root_ppn: u64) {
        self.root = PhysAddr::from_ppn(root_ppn, 0);
    }

    /// Physical address of the root page table.
    pub const fn root(&self) -> PhysAddr {
        self.root
    }

    /// Number of walker slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if at least one slot is free.
    pub fn has_free_walker(&self) -> bool {
        self.slots.iter().any(Option::is_none)
    }

    /// Number of slots currently walking.
    pub fn busy_walkers(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// State of slot `slot`; out-of-range slots read as free.
    pub fn state(&self, slot: usize) -> WalkState {
        match self.slots.get(slot).and_then(Option::as_ref) {
            Some(walk) => WalkState::Walking(walk.level),
            None => WalkState::Free,
        }
    }

    /// Takes the oldest probe awaiting service.
    pub fn pop_probe(&mut self) -> Option<PteProbe> {
        self.probes.pop_front()
    }

    /// Number of probes awaiting service.
    pub fn pending_probes(&self) -> usize {
        self.probes.len()
    }

    /// Starts translating `request`.
    ///
    /// The walk runs synchronously up to its first probe; `handler` is invoked
    /// exactly once when the walk completes.
    ///
    /// # Returns
    ///
    /// `false` (and no side effect) if every walker is busy.
    pub fn translate<H>(&mut self, request: TranslateRequest, handler: H) -> bool
    where
        H: FnOnce(TranslateResponse) + 'static,
    {
        let Some(idx) = self.slots.iter().position(Option::is_none) else {
            trace!(req_id = request.req_id, "no free walker");
            return false;
        };
        let id = self.next_walk;
        self.next_walk += 1;
        self.slots[idx] = Some(Walk {
            id,
            request,
            level: SV48_ROOT_LEVEL,
            table: self.root,
            levels: [LevelProbe::default(); SV48_LEVELS],
            handler: Some(Box::new(handler)),
        });
        debug!(
            slot = idx,
            req_id = request.req_id,
            vaddr = request.vaddr.val(),
            "walk started"
        );
        self.drive(idx);
        true
    }

    /// Delivers the answer to a probe and re-drives its walker.
    ///
    /// # Arguments
    ///
    /// * `probe` - The probe being answered, as popped from `pop_probe`.
    /// * `pte` - The raw entry, or `None` if the target did not hold it.
    ///
    /// # Returns
    ///
    /// `false` if the probe is stale (its walk finished or it was already answered).
    pub fn complete_probe(&mut self, probe: PteProbe, pte: Option<u64>) -> bool {
        let Some(walk) = self
            .slots
            .get_mut(probe.slot)
            .and_then(Option::as_mut)
            .filter(|w| w.id == probe.walk && w.level == probe.level)
        else {
            warn!(?probe, "completion for a finished walk");
            return false;
        };
        let lp = &mut walk.levels[probe.level as usize];
        match probe.kind {
            ProbeKind::L1Tlb if lp.l1tlb_ongoing => {
                lp.l1tlb_ongoing = false;
                lp.l1tlb_complete = true;
            }
            ProbeKind::Memory if lp.mem_ongoing => {
                lp.mem_ongoing = false;
                lp.mem_complete = true;
            }
            _ => {
                warn!(?probe, "unsolicited probe completion");
                return false;
            }
        }
        if lp.pte.is_none() {
            lp.pte = pte.map(Sv48Pte::new);
        }
        self.drive(probe.slot);
        true
    }

    /// Runs slot `idx` until it suspends on a probe or completes.
    fn drive(&mut self, idx: usize) {
        let outcome = loop {
            let Some(walk) = self.slots.get_mut(idx).and_then(Option::as_mut) else {
                return;
            };
            let level = walk.level;
            let lp = walk.levels[level as usize];

            if let Some(pte) = lp.pte {
                match Self::step(walk, pte) {
                    Step::Descend => continue,
                    Step::Done(outcome) => break outcome,
                }
            }

            let addr = PhysAddr::new(
                walk.table.val() + PTE_SIZE * walk.request.vaddr.vpn_index(level),
            );
            let kind = if !lp.l1tlb_ongoing && !lp.l1tlb_complete {
                walk.levels[level as usize].l1tlb_ongoing = true;
                ProbeKind::L1Tlb
            } else if !lp.mem_ongoing && !lp.mem_complete {
                walk.levels[level as usize].mem_ongoing = true;
                ProbeKind::Memory
            } else if lp.l1tlb_complete && lp.mem_complete {
                break Err(PageFault::AccessFault);
            } else {
                return;
            };
            trace!(slot = idx, level, ?kind, addr = addr.val(), "probe issued");
            self.probes.push_back(PteProbe {
                slot: idx,
                walk: walk.id,
                level,
                kind,
                addr,
            });
            return;
        };
        self.finish(idx, outcome);
    }

    /// Checks a fetched PTE at the walker's current level.
    fn step(walk: &mut Walk, pte: Sv48Pte) -> Step {
        let level = walk.level;
        if pte.is_malformed() {
            return Step::Done(Err(PageFault::InvalidPte));
        }
        if !pte.is_leaf() {
            if level == 0 {
                return Step::Done(Err(PageFault::InvalidPte));
            }
            walk.level -= 1;
            walk.table = PhysAddr::from_ppn(pte.ppn(), 0);
            return Step::Descend;
        }

        let req = &walk.request;
        if (req.r && !pte.can_read())
            || (req.w && !pte.can_write())
            || (req.x && !pte.can_exec())
            || (req.u && !pte.is_user())
        {
            return Step::Done(Err(PageFault::NoPermission));
        }
        let low_mask = (1u64 << (VPN_BITS_PER_LEVEL * level as u64)) - 1;
        if pte.ppn() & low_mask != 0 {
            return Step::Done(Err(PageFault::PageMisalign));
        }
        if !pte.is_accessed() {
            return Step::Done(Err(PageFault::PageAccess));
        }
        if req.is_store && !pte.is_dirty() {
            return Step::Done(Err(PageFault::PageWrite));
        }
        let ppn = pte.ppn() | (req.vaddr.vpn() & low_mask);
        Step::Done(Ok(PhysAddr::new(
            (ppn << PAGE_SHIFT) | req.vaddr.page_offset(),
        )))
    }

    /// Frees slot `idx` and runs its handler.
    fn finish(&mut self, idx: usize, outcome: Result<PhysAddr, PageFault>) {
        let Some(mut walk) = self.slots.get_mut(idx).and_then(Option::take) else {
            return;
        };
        debug!(slot = idx, req_id = walk.request.req_id, ?outcome, "walk done");
        if let Some(handler) = walk.handler.take() {
            handler(TranslateResponse {
                req_id: walk.request.req_id,
                outcome,
            });
        }
    }
}
