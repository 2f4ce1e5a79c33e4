//! Common types shared across the simulator.
//!
//! This module provides the building blocks every other component uses:
//! 1. **Values:** Raw bit patterns tagged with the data type they are read as.
//! 2. **Registers:** The architectural register file and dense register ids.
//! 3. **Errors:** The error taxonomy and the fault descriptor of a halted run.

/// Error taxonomy and fault descriptors.
pub mod error;

/// Architectural register file.
pub mod reg;

/// Typed values.
pub mod value;

pub use error::{ConfigError, FaultDescriptor, FaultKind, MemoryFault, SemanticsError, SimError};
pub use reg::{ArchRegister, RegId, RegisterFile, RegisterKind};
pub use value::{DataType, Value};
