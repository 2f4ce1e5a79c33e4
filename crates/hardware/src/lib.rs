//! Superscalar out-of-order CPU simulator library.
//!
//! This crate implements a cycle-level, Tomasulo-style pipeline simulator with the following:
//! 1. **ISA:** Data-driven instruction semantics parsed from a postfix expression language.
//! 2. **Core:** Fetch with branch prediction, register renaming, reservation stations,
//!    functional-unit pools, a load/store queue and in-order commit through a reorder buffer.
//! 3. **Memory:** A flat byte-addressable data memory with bounds and alignment faults.
//! 4. **Simulation:** Program loading, configuration, a steppable driver and statistics.
//!
//! ```
//! use sssim_core::common::RegisterFile;
//! use sssim_core::isa::{Argument, InstructionSet, Program, StaticInstruction};
//! use sssim_core::{Config, Cpu};
//!
//! let isa = InstructionSet::riscv().unwrap();
//! let program = Program::new(vec![
//!     StaticInstruction::new("addi", [Argument::reg("x1"), Argument::reg("x0"), Argument::imm(5)]),
//!     StaticInstruction::new("halt", []),
//! ]);
//! let mut cpu = Cpu::new(Config::default(), &isa, RegisterFile::riscv(), &program).unwrap();
//! let _ = cpu.run(100).unwrap();
//! assert!(cpu.sim_ended());
//! assert_eq!(cpu.snapshot().registers["x1"], 5);
//! ```

/// Common types (values, registers, errors).
pub mod common;
/// Simulator configuration (defaults, enums, hierarchical config structures).
pub mod config;
/// CPU core (pipeline, units, state, driver).
pub mod core;
/// Instruction set (expressions, semantics, programs, decoding, built-in RV32IMF subset).
pub mod isa;
/// Data memory image.
pub mod memory;
/// Program loader.
pub mod sim;
/// Simulation statistics collection and reporting.
pub mod stats;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Main driver type; owns the machine state of one run.
pub use crate::core::Cpu;
/// Error returned across the driver boundary.
pub use crate::common::error::SimError;
