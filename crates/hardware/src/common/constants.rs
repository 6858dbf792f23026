//! Global Simulator Constants.
//!
//! This module defines constants shared across the simulator. It includes:
//! 1. **Memory Constants:** Page sizes, masks, and shifts for address translation.
//! 2. **SV48 Constants:** Level count, VPN slicing, and page table entry size.
//! 3. **Register Constants:** The size of the logical register space tracked by rename.

/// Page size in bytes (4KB).
pub const PAGE_SIZE: u64 = 4096;

/// Number of bits to shift to convert between bytes and pages.
pub const PAGE_SHIFT: u64 = 12;

/// Mask for extracting the page offset from an address.
pub const PAGE_OFFSET_MASK: u64 = PAGE_SIZE - 1;

/// Number of page table levels in SV48 (L3, L2, L1, L0).
pub const SV48_LEVELS: usize = 4;

/// Level at which every SV48 walk starts.
pub const SV48_ROOT_LEVEL: u32 = 3;

/// Number of bits used for VPN indexing at each level.
pub const VPN_BITS_PER_LEVEL: u64 = 9;

/// Mask extracting one VPN slice (9 bits).
pub const VPN_ENTRY_MASK: u64 = 0x1FF;

/// Size of a page table entry in bytes.
pub const PTE_SIZE: u64 = 8;

/// Number of logical registers tracked by rename (32 integer + 32 floating point).
pub const NUM_LOGICAL_REGS: usize = 64;

/// Logical register 0 is the hardwired zero and never has a producer.
pub const REG_ZERO: u8 = 0;

/// Maximum serialization level (finest grain).
pub const SERIALIZE_LEVEL_MAX: u8 = 2;
