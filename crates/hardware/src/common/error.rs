//! Error taxonomy and fault descriptors.
//!
//! This module defines every failure the simulator can report. It provides:
//! 1. **`ConfigError`:** Invalid machine parameters, rejected before a run starts.
//! 2. **`SemanticsError`:** Malformed instruction specifications or operand mismatches.
//! 3. **`MemoryFault`:** Out-of-range or misaligned accesses.
//! 4. **`SimError`:** The top-level error returned across the driver boundary.
//! 5. **`FaultDescriptor`:** The fault record exposed after a run halts on a fault.
//!
//! Faults detected while executing are not errors in the `Result` sense: they
//! travel with the instruction to the reorder buffer and surface as a
//! [`FaultDescriptor`] once the instruction reaches commit.

use serde::Serialize;
use thiserror::Error;

use crate::common::value::DataType;
use crate::core::cpu::SimStatus;
use crate::core::pipeline::instance::InstanceId;

/// Invalid machine configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A parameter is outside its legal range.
    #[error("invalid configuration value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Human-readable constraint that was violated.
        reason: String,
    },

    /// The program needs a functional-unit class that is not configured.
    #[error("instruction `{opcode}` needs a {class:?} unit but none is configured")]
    MissingUnit {
        /// Opcode that cannot be executed.
        opcode: String,
        /// Unit class it maps to.
        class: crate::isa::semantics::FuClass,
    },

    /// The configuration text is not valid JSON for [`crate::config::Config`].
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration file could not be read.
    #[error("failed to read configuration: {0}")]
    Io(#[from] std::io::Error),
}

/// Malformed instruction specification or operand mismatch.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
pub enum SemanticsError {
    /// No semantics are registered under this opcode.
    #[error("unknown opcode `{0}`")]
    UnknownOpcode(String),

    /// An instruction was given the wrong number of arguments.
    #[error("`{opcode}` expects {expected} arguments, found {found}")]
    ArgumentCount {
        /// Opcode being checked.
        opcode: String,
        /// Number of declared arguments.
        expected: usize,
        /// Number of supplied arguments.
        found: usize,
    },

    /// An argument is of the wrong kind (register vs immediate, register file).
    #[error("`{opcode}` argument `{argument}`: {reason}")]
    ArgumentKind {
        /// Opcode being checked.
        opcode: String,
        /// Declared argument name.
        argument: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A register name or alias does not exist.
    #[error("unknown register `{0}`")]
    UnknownRegister(String),

    /// A label or memory location name could not be resolved.
    #[error("unknown symbol `{0}`")]
    UnknownSymbol(String),

    /// An operand's type disagrees with the declaration or its partner operand.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type required by the declaration or operator.
        expected: DataType,
        /// Type actually supplied.
        found: DataType,
    },

    /// The operator is not defined for this operand type.
    #[error("operator `{op}` is not defined for {ty}")]
    UnsupportedOperation {
        /// Operator token.
        op: &'static str,
        /// Operand type.
        ty: DataType,
    },

    /// A semantics string failed to parse.
    #[error("malformed expression `{expression}`: {reason}")]
    Malformed {
        /// The full source text.
        expression: String,
        /// Parse failure detail.
        reason: String,
    },

    /// Two definitions share a name.
    #[error("duplicate definition `{0}`")]
    Duplicate(String),
}

/// Out-of-range or misaligned memory access.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq, Serialize)]
pub enum MemoryFault {
    /// The access extends past the end of the memory image.
    #[error("access of {width} bytes at {address:#x} is out of range")]
    OutOfRange {
        /// First byte accessed.
        address: u64,
        /// Access width in bytes.
        width: usize,
    },

    /// The address is not a multiple of the access width.
    #[error("access of {width} bytes at {address:#x} is misaligned")]
    Misaligned {
        /// First byte accessed.
        address: u64,
        /// Access width in bytes.
        width: usize,
    },
}

/// Top-level error returned by the simulator API.
#[derive(Debug, Error)]
pub enum SimError {
    /// Configuration was rejected.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// ISA data or the program failed validation.
    #[error(transparent)]
    Semantics(#[from] SemanticsError),

    /// Program memory could not be placed.
    #[error(transparent)]
    Memory(#[from] MemoryFault),

    /// `step()` was called on a driver that has already stopped.
    #[error("simulation has already stopped ({0:?})")]
    Stopped(SimStatus),
}

/// What went wrong with a faulting instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum FaultKind {
    /// Memory access fault raised by a load or store.
    Memory(MemoryFault),
    /// Evaluation failure raised by the semantics interpreter.
    Semantics(SemanticsError),
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Memory(fault) => write!(f, "{fault}"),
            Self::Semantics(err) => write!(f, "{err}"),
        }
    }
}

/// Fault surfaced when a faulting instruction reaches the reorder-buffer head.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FaultDescriptor {
    /// Fault cause.
    pub kind: FaultKind,
    /// Offending instruction instance.
    pub instance: InstanceId,
    /// Address of the offending instruction.
    pub pc: u64,
    /// Source line of the offending instruction.
    pub line: usize,
    /// Cycle on which commit observed the fault.
    pub cycle: u64,
}

impl std::fmt::Display for FaultDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (instance {}, pc {:#x}, line {}, cycle {})",
            self.kind, self.instance.0, self.pc, self.line, self.cycle
        )
    }
}
