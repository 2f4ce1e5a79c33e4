//! Instruction set definitions.
//!
//! Instructions are described by data rather than code. This module provides:
//! 1. **Expressions:** The postfix expression language and its evaluator.
//! 2. **Semantics:** Per-opcode declarations parsed once into effects.
//! 3. **Programs:** The static instruction list handed over by the assembler.
//! 4. **Decoding:** Binding source lines to semantics, registers and symbols.
//! 5. **Built-in ISA:** An RV32IMF subset expressed in the same data format.

/// Static decoding of source instructions.
pub mod decode;

/// Expression trees for instruction semantics.
pub mod expr;

/// Static program representation.
pub mod instruction;

/// Built-in RV32IMF subset.
pub mod rv32;

/// Declarative instruction semantics.
pub mod semantics;

pub use decode::{DecodedInstruction, DecodedOperand};
pub use instruction::{Argument, MemoryLocation, Program, StaticInstruction};
pub use semantics::{
    AccessWidth, ArgumentKind, ArgumentSpec, Effect, FuClass, InstructionClass,
    InstructionSemantics, InstructionSet, InstructionSpec, Outcome,
};
