//! Physical and Virtual Address types.
//!
//! This module defines strong types for physical and virtual addresses to prevent
//! accidental mixing of address spaces. It provides the following:
//! 1. **Type Safety:** Distinguishes between virtual and physical address spaces at compile time.
//! 2. **Address Slicing:** Page offset and per-level SV48 VPN extraction for the page walker.
//! 3. **Page Composition:** Building a physical address from a page number and an offset.

use super::constants::{PAGE_OFFSET_MASK, PAGE_SHIFT, VPN_BITS_PER_LEVEL, VPN_ENTRY_MASK};

/// A virtual address in the simulated address space.
///
/// Virtual addresses are produced by memory operations and must be translated
/// by the page walker before they can address backing memory.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtAddr(pub u64);

/// A physical address in the simulated address space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PhysAddr(pub u64);

impl VirtAddr {
    /// Creates a new virtual address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Extracts the page offset (lower 12 bits).
    #[inline(always)]
    pub const fn page_offset(&self) -> u64 {
        self.0 & PAGE_OFFSET_MASK
    }

    /// Full virtual page number (address without the page offset).
    #[inline(always)]
    pub const fn vpn(&self) -> u64 {
        self.0 >> PAGE_SHIFT
    }

    /// Extracts the 9-bit VPN slice used to index the page table at `level`.
    ///
    /// Level 3 is the root table in SV48, level 0 the last.
    ///
    /// # Arguments
    ///
    /// * `level` - Page table level (0..=3).
    ///
    /// # Returns
    ///
    /// The page table index at that level (0..512).
    #[inline(always)]
    pub const fn vpn_index(&self, level: u32) -> u64 {
        (self.0 >> (PAGE_SHIFT + level as u64 * VPN_BITS_PER_LEVEL)) & VPN_ENTRY_MASK
    }
}

impl PhysAddr {
    /// Creates a new physical address from a raw 64-bit value.
    #[inline(always)]
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    /// Returns the raw 64-bit address value.
    #[inline(always)]
    pub const fn val(&self) -> u64 {
        self.0
    }

    /// Builds a physical address from a physical page number and a page offset.
    #[inline(always)]
    pub const fn from_ppn(ppn: u64, offset: u64) -> Self {
        Self((ppn << PAGE_SHIFT) | (offset & PAGE_OFFSET_MASK))
    }
}
