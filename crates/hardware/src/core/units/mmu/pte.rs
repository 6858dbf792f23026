//! SV48 page table entry.
//!
//! A typed view of a raw 64-bit PTE: flag bits 0..=7, physical page number in
//! bits 10..=53, and bits 54..=63 reserved (must be zero).

/// Valid bit (bit 0).
pub const PTE_V: u64 = 1;

/// Read permission bit (bit 1).
pub const PTE_R: u64 = 1 << 1;

/// Write permission bit (bit 2).
pub const PTE_W: u64 = 1 << 2;

/// Execute permission bit (bit 3).
pub const PTE_X: u64 = 1 << 3;

/// User mode accessible bit (bit 4).
pub const PTE_U: u64 = 1 << 4;

/// Accessed bit (bit 6).
pub const PTE_A: u64 = 1 << 6;

/// Dirty bit (bit 7).
pub const PTE_D: u64 = 1 << 7;

/// Bit shift to extract the physical page number (bits 10..=53).
const PTE_PPN_SHIFT: u32 = 10;

/// Width mask of the physical page number field (44 bits).
const PTE_PPN_MASK: u64 = (1 << 44) - 1;

/// Bits 54..=63, reserved in SV48.
const PTE_RESERVED_MASK: u64 = !((1 << 54) - 1);

/// A strongly-typed wrapper around a raw SV48 page table entry.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Sv48Pte(u64);

impl Sv48Pte {
    /// Wraps a raw 64-bit entry.
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Builds an entry from a physical page number and flag bits.
    pub const fn from_parts(ppn: u64, flags: u64) -> Self {
        Self(((ppn & PTE_PPN_MASK) << PTE_PPN_SHIFT) | (flags & 0xFF))
    }

    /// Returns the underlying raw value.
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns true if the Valid (V) bit is set.
    pub const fn is_valid(self) -> bool {
        self.0 & PTE_V != 0
    }

    /// Returns true if the Read (R) bit is set.
    pub const fn can_read(self) -> bool {
        self.0 & PTE_R != 0
    }

    /// Returns true if the Write (W) bit is set.
    pub const fn can_write(self) -> bool {
        self.0 & PTE_W != 0
    }

    /// Returns true if the Execute (X) bit is set.
    pub const fn can_exec(self) -> bool {
        self.0 & PTE_X != 0
    }

    /// Returns true if the User (U) bit is set.
    pub const fn is_user(self) -> bool {
        self.0 & PTE_U != 0
    }

    /// Returns true if the Accessed (A) bit is set.
    pub const fn is_accessed(self) -> bool {
        self.0 & PTE_A != 0
    }

    /// Returns true if the Dirty (D) bit is set.
    pub const fn is_dirty(self) -> bool {
        self.0 & PTE_D != 0
    }

    /// Returns true if any of R/W/X is set; otherwise the entry points to the next level.
    pub const fn is_leaf(self) -> bool {
        self.0 & (PTE_R | PTE_W | PTE_X) != 0
    }

    /// Returns true if any reserved bit (54..=63) is set.
    pub const fn has_reserved_bits(self) -> bool {
        self.0 & PTE_RESERVED_MASK != 0
    }

    /// Returns true for encodings the walker must reject: not valid,
    /// writable without readable, or reserved bits in use.
    pub const fn is_malformed(self) -> bool {
        !self.is_valid() || (!self.can_read() && self.can_write()) || self.has_reserved_bits()
    }

    /// Physical page number.
    pub const fn ppn(self) -> u64 {
        (self.0 >> PTE_PPN_SHIFT) & PTE_PPN_MASK
    }
}
