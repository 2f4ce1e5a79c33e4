//! Out-of-order instruction pipeline.
//!
//! This module contains the speculative structures and the stage functions
//! that move instances through them. It includes the following components:
//! 1. **Instances:** The arena owning every in-flight instruction.
//! 2. **Renaming:** The register-to-producer table.
//! 3. **Scheduling:** Reservation stations, the reorder buffer and the load/store queue.
//! 4. **Stages:** Fetch, Dispatch, Issue, Execute (with the memory phase) and Commit.
//!
//! Stage functions take the whole [`CpuState`](crate::core::cpu::CpuState)
//! and are called once per cycle by the driver, commit first.

/// Commit stage.
pub mod commit;

/// Dispatch stage (rename and allocation).
pub mod dispatch;

/// Execute completion, memory phase and misprediction recovery.
pub mod execute;

/// Fetch stage.
pub mod fetch;

/// In-flight instances and their arena.
pub mod instance;

/// Issue stage.
pub mod issue;

/// Load/store queue.
pub mod lsq;

/// Register rename table.
pub mod rename;

/// Reservation stations.
pub mod reservation;

/// Reorder buffer.
pub mod rob;
