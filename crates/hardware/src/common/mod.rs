//! Common utilities and types used throughout the simulator.
//!
//! This module provides fundamental building blocks that are shared across all components
//! of the simulator. It includes:
//! 1. **Address Types:** Strong types for virtual and physical addresses.
//! 2. **Constants:** Paging and register-space constants.
//! 3. **Error Handling:** Dispatch stall causes, page faults, and configuration errors.

/// Address type definitions (physical and virtual addresses).
pub mod addr;

/// Common constants used throughout the simulator.
pub mod constants;

/// Stall causes, page faults, and configuration errors.
pub mod error;

pub use addr::{PhysAddr, VirtAddr};
pub use constants::{NUM_LOGICAL_REGS, PAGE_SHIFT};
pub use error::{ConfigError, PageFault, StallCause};
