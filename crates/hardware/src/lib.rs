//! Out-of-order core simulator library.
//!
//! This crate implements the timing and ordering state machines of a
//! cycle-level out-of-order core:
//! 1. **Engine:** Rename/dispatch, ROB and retiring ROB, in-order two-phase retirement.
//! 2. **Recovery:** Memory-ordering replays with an adaptive serialization throttle.
//! 3. **Translation:** A pool of SV48 page table walkers with an L1 TLB and backing memory.
//! 4. **Configuration:** JSON-deserializable parameters with validation.
//! 5. **Statistics:** Stall, occupancy, and replay counters.
//!
//! The front end, execution clusters, and functional emulator are supplied by
//! the caller through the traits in `core::pipeline::traits`.

/// Common types and constants (addresses, SV48 geometry, errors).
pub mod common;
/// Simulator configuration (defaults, hierarchical config structures).
pub mod config;
/// Out-of-order core (engine, pipeline structures, MMU).
pub mod core;
/// Per-core statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or `Config::from_json`.
pub use crate::config::Config;
/// Out-of-order engine for one hardware thread.
pub use crate::core::OooCore;
/// Dispatch refusal returned by `OooCore::add_inst`.
pub use crate::core::pipeline::rename::Stall;
/// Address translation unit.
pub use crate::core::units::mmu::Mmu;
