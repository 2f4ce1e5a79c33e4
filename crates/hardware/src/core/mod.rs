//! Core processor implementation.
//!
//! This module contains the out-of-order pipeline, its execution units, the
//! owned machine state and the driver that advances it one cycle at a time.

/// Machine state and the cycle driver.
pub mod cpu;

/// Pipeline structures and stage functions.
pub mod pipeline;

/// Execution units (functional-unit pools, branch predictor).
pub mod units;

pub use self::cpu::Cpu;
