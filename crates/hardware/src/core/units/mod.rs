//! Functional units attached to the core.
//!
//! The out-of-order engine itself lives in `core::ooo`; this module holds the
//! units it talks to through message-passing interfaces.

/// Memory Management Unit with page table walkers and L1 TLB.
pub mod mmu;
