//! Core processor implementation.
//!
//! This module contains the out-of-order engine, the pipeline structures it is
//! built from, and the address translation unit.

/// Out-of-order engine for one hardware thread.
pub mod ooo;

/// Pipeline structures and stages (ROB, RAT, rename, replay, retire).
pub mod pipeline;

/// Functional units (MMU).
pub mod units;

pub use self::ooo::OooCore;
