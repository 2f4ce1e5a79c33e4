//! Execution units.
//!
//! This module contains the functional-unit pools instances execute on, the
//! branch prediction unit consulted by fetch and the data cache loads and
//! committed stores pass through.

/// Branch prediction unit (static, bimodal, gshare) and BTB.
pub mod bru;

/// Set-associative data cache and its replacement policies.
pub mod cache;

/// Functional-unit pools.
pub mod fu;

/// Tag/index/offset address splitting.
pub mod indexing;
