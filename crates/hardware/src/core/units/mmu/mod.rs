//! Memory Management Unit (MMU).
//!
//! This module implements SV48 address translation for one memory hierarchy
//! level. It ties together:
//! 1. **Walkers:** A pool of page table walkers (`ptw`).
//! 2. **L1 TLB:** A private cache of page table entries (`tlb`), probed first.
//! 3. **Backing memory:** Any `PteMemory`, read when the L1 TLB misses; responses fill the L1 TLB.
//!
//! Probes complete after a fixed latency per target, measured in calls to `tick`.

/// Typed SV48 page table entries.
pub mod pte;

/// Page table walker pool for SV48 virtual memory.
pub mod ptw;

/// L1 TLB caching page table entries by physical address.
pub mod tlb;

use std::collections::BTreeMap;

use tracing::trace;

use crate::common::addr::PhysAddr;
use crate::common::constants::PTE_SIZE;
use crate::common::error::ConfigError;
use crate::config::MmuConfig;

use self::ptw::{PageTableWalker, ProbeKind, PteProbe, TranslateRequest, TranslateResponse};
use self::tlb::PteCache;

/// Backing store read by page table walks.
pub trait PteMemory {
    /// Reads the 8-byte entry at `addr`.
    ///
    /// # Returns
    ///
    /// The raw entry, or `None` if `addr` is not backed by memory.
    fn read_pte(&self, addr: PhysAddr) -> Option<u64>;
}

/// A sparse physical memory region holding page tables.
///
/// Addresses inside the region that were never written read as zero;
/// addresses outside it are not backed.
#[derive(Clone, Debug, Default)]
pub struct PageTableMemory {
    base: u64,
    size: u64,
    words: BTreeMap<u64, u64>,
}

impl PageTableMemory {
    /// Creates an empty region of `size` bytes starting at `base`.
    pub const fn new(base: u64, size: u64) -> Self {
        Self {
            base,
            size,
            words: BTreeMap::new(),
        }
    }

    /// Returns true if `addr` falls inside the region.
    pub const fn contains(&self, addr: PhysAddr) -> bool {
        addr.val() >= self.base && addr.val() - self.base < self.size
    }

    /// Stores a raw entry at `addr`. Returns false if `addr` is outside the region.
    pub fn write_pte(&mut self, addr: PhysAddr, pte: u64) -> bool {
        if !self.contains(addr) {
            return false;
        }
        let _ = self.words.insert(addr.val() & !(PTE_SIZE - 1), pte);
        true
    }
}

impl PteMemory for PageTableMemory {
    fn read_pte(&self, addr: PhysAddr) -> Option<u64> {
        if !self.contains(addr) {
            return None;
        }
        Some(
            self.words
                .get(&(addr.val() & !(PTE_SIZE - 1)))
                .copied()
                .unwrap_or(0),
        )
    }
}

/// Address translation unit: walkers, L1 TLB, and backing memory.
#[derive(Debug)]
pub struct Mmu<M> {
    walker: PageTableWalker,
    l1tlb: PteCache,
    memory: M,
    l1tlb_latency: u64,
    memory_latency: u64,
    clock: u64,
    /// Outstanding probes with the cycle they complete, in issue order.
    in_flight: Vec<(u64, PteProbe)>,
}

impl<M: PteMemory> Mmu<M> {
    /// Creates an MMU over `memory`.
    ///
    /// # Arguments
    ///
    /// * `config` - Walker count, L1 TLB geometry, latencies and root page table.
    /// * `memory` - Backing store for page tables.
    pub fn new(config: &MmuConfig, memory: M) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            walker: PageTableWalker::new(config.ptw_count, config.root_ppn),
            l1tlb: PteCache::new(config.l1tlb_entries),
            memory,
            l1tlb_latency: config.l1tlb_latency,
            memory_latency: config.memory_latency,
            clock: 0,
            in_flight: Vec::new(),
        })
    }

    /// Starts a translation; `handler` runs exactly once when it completes.
    ///
    /// # Returns
    ///
    /// `false` if every walker is busy; the caller must retry.
    pub fn translate<H>(&mut self, request: TranslateRequest, handler: H) -> bool
    where
        H: FnOnce(TranslateResponse) + 'static,
    {
        let accepted = self.walker.translate(request, handler);
        self.collect_probes();
        accepted
    }

    /// Advances one cycle, completing every probe whose latency has elapsed.
    pub fn tick(&mut self) {
        self.clock += 1;
        let clock = self.clock;
        let (ready, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|(at, _)| *at <= clock);
        self.in_flight = waiting;

        for (_, probe) in ready {
            let pte = match probe.kind {
                ProbeKind::L1Tlb => self.l1tlb.lookup(probe.addr),
                ProbeKind::Memory => {
                    let pte = self.memory.read_pte(probe.addr);
                    if let Some(raw) = pte {
                        self.l1tlb.insert(probe.addr, raw);
                    }
                    pte
                }
            };
            trace!(slot = probe.slot, kind = ?probe.kind, hit = pte.is_some(), "probe answered");
            let _ = self.walker.complete_probe(probe, pte);
        }
        self.collect_probes();
    }

    fn collect_probes(&mut self) {
        while let Some(probe) = self.walker.pop_probe() {
            let latency = match probe.kind {
                ProbeKind::L1Tlb => self.l1tlb_latency,
                ProbeKind::Memory => self.memory_latency,
            };
            self.in_flight.push((self.clock + latency, probe));
        }
    }

    /// Returns true if at least one walker is free.
    pub fn has_free_walker(&self) -> bool {
        self.walker.has_free_walker()
    }

    /// Number of walks in progress.
    pub fn busy_walkers(&self) -> usize {
        self.walker.busy_walkers()
    }

    /// Returns true if no walk is in progress.
    pub fn is_idle(&self) -> bool {
        self.walker.busy_walkers() == 0 && self.in_flight.is_empty()
    }

    /// Invalidates the L1 TLB.
    pub fn flush(&mut self) {
        self.l1tlb.flush();
    }

    /// Points later walks at a new root page table.
    pub fn set_root(&mut self, root_ppn: u64) {
        self.walker.set_root(root_ppn);
    }

    /// The walker pool.
    pub const fn walker(&self) -> &PageTableWalker {
        &self.walker
    }

    /// The L1 TLB.
    pub const fn l1tlb(&self) -> &PteCache {
        &self.l1tlb
    }

    /// Backing memory, mutably (for page table setup).
    pub const fn memory_mut(&mut self) -> &mut M {
        &mut self.memory
    }

    /// Cycles elapsed.
    pub const fn clock(&self) -> u64 {
        self.clock
    }
}
