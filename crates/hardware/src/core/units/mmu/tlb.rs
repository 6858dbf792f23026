//! L1 TLB (page table entry cache).
//!
//! A direct-mapped cache of raw page table entries, tagged by the physical
//! address the entry was read from. Walkers probe it before going to memory,
//! and memory responses fill it.

use crate::common::addr::PhysAddr;
use crate::common::constants::PTE_SIZE;

/// A single cached PTE.
#[derive(Clone, Copy, Debug, Default)]
struct PteCacheEntry {
    /// Physical address of the PTE (tag).
    addr: u64,
    /// Raw entry.
    pte: u64,
    /// Entry validity flag.
    valid: bool,
}

/// Direct-mapped PTE cache.
#[derive(Clone, Debug)]
pub struct PteCache {
    /// Cache lines.
    entries: Vec<PteCacheEntry>,
    /// Mask used for indexing (size - 1).
    mask: usize,
}

impl PteCache {
    /// Creates a cache with the specified number of entries.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of entries (rounded up to the next power of 2).
    pub fn new(size: usize) -> Self {
        let safe_size = size.max(1).next_power_of_two();
        Self {
            entries: vec![PteCacheEntry::default(); safe_size],
            mask: safe_size - 1,
        }
    }

    /// Number of entries.
    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    const fn index(&self, addr: PhysAddr) -> usize {
        ((addr.val() / PTE_SIZE) as usize) & self.mask
    }

    /// Looks up the PTE stored at `addr`.
    ///
    /// # Returns
    ///
    /// The raw entry if cached, otherwise `None`.
    pub fn lookup(&self, addr: PhysAddr) -> Option<u64> {
        self.entries
            .get(self.index(addr))
            .filter(|e| e.valid && e.addr == addr.val())
            .map(|e| e.pte)
    }

    /// Caches the PTE read from `addr`, evicting whatever shared its line.
    pub fn insert(&mut self, addr: PhysAddr, pte: u64) {
        let idx = self.index(addr);
        if let Some(entry) = self.entries.get_mut(idx) {
            *entry = PteCacheEntry {
                addr: addr.val(),
                pte,
                valid: true,
            };
        }
    }

    /// Invalidates every entry (e.g. on `SFENCE.VMA` or a root change).
    pub fn flush(&mut self) {
        for e in &mut self.entries {
            e.valid = false;
        }
    }
}
