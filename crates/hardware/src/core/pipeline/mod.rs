//! Out-of-order pipeline structures and stages.
//!
//! This module contains the per-thread pieces the engine is built from:
//! 1. **Instructions:** Dynamic ops, handles, and the in-flight pool.
//! 2. **Tracking:** Register alias table and the ROB ring.
//! 3. **Stages:** Rename/dispatch, replay recovery, serialization, and retirement.
//! 4. **Traits:** Interfaces to the front end, clusters, and emulator.

/// Dynamic instructions, handles, and the instruction pool.
pub mod dinst;

/// Register alias table (logical register to latest producer).
pub mod rat;

/// Rename and dispatch stage.
pub mod rename;

/// Replay and recovery controller.
pub mod replay;

/// Two-phase retirement and retire-lock detection.
pub mod retire;

/// ROB / retiring ROB ring queue.
pub mod rob;

/// Dynamic memory serialization after replays.
pub mod serialize;

/// Front end, cluster, and emulator interfaces.
pub mod traits;
