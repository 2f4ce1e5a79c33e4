//! Static program representation handed over by the assembler.
//!
//! The assembler is an external collaborator: it produces an ordered list of
//! [`StaticInstruction`]s, the instruction index of every code label, and the
//! data directives as [`MemoryLocation`]s. Instruction `i` lives at byte
//! address `i * INSTRUCTION_SIZE`.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Size of one instruction in bytes.
pub const INSTRUCTION_SIZE: u64 = 4;

/// One argument as written in the source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Argument {
    /// Register name or alias.
    Register(String),
    /// Numeric immediate.
    Immediate(i64),
    /// Code label or memory location name.
    Label(String),
}

impl Argument {
    /// Register argument.
    pub fn reg(name: &str) -> Self {
        Self::Register(name.to_owned())
    }

    /// Immediate argument.
    pub const fn imm(value: i64) -> Self {
        Self::Immediate(value)
    }

    /// Label argument.
    pub fn label(name: &str) -> Self {
        Self::Label(name.to_owned())
    }
}

/// One source line, as parsed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticInstruction {
    /// Opcode mnemonic.
    pub opcode: String,
    /// Arguments in source order.
    pub args: Vec<Argument>,
    /// Source line number.
    #[serde(default)]
    pub line: usize,
}

impl StaticInstruction {
    /// Creates an instruction without line information.
    pub fn new(opcode: &str, args: impl IntoIterator<Item = Argument>) -> Self {
        Self {
            opcode: opcode.to_owned(),
            args: args.into_iter().collect(),
            line: 0,
        }
    }

    /// Sets the source line.
    #[must_use]
    pub const fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }
}

/// A named, initialised block of data memory.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLocation {
    /// Symbol bound to the first byte.
    pub name: String,
    /// Required alignment in bytes (power of two).
    #[serde(default = "MemoryLocation::default_alignment")]
    pub alignment: u64,
    /// Initial contents.
    pub bytes: Vec<u8>,
}

impl MemoryLocation {
    const fn default_alignment() -> u64 {
        4
    }

    /// A block of little-endian 32-bit words.
    pub fn words(name: &str, words: &[i32]) -> Self {
        Self {
            name: name.to_owned(),
            alignment: 4,
            bytes: words.iter().flat_map(|w| w.to_le_bytes()).collect(),
        }
    }

    /// A zero-filled block.
    pub fn zeroed(name: &str, len: usize, alignment: u64) -> Self {
        Self {
            name: name.to_owned(),
            alignment,
            bytes: vec![0; len],
        }
    }
}

/// Everything the assembler hands to the core.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    /// Instructions in address order.
    pub instructions: Vec<StaticInstruction>,
    /// Code label → instruction index.
    #[serde(default)]
    pub labels: HashMap<String, usize>,
    /// Data directives.
    #[serde(default)]
    pub memory: Vec<MemoryLocation>,
    /// Instruction index execution starts at.
    #[serde(default)]
    pub entry: usize,
}

impl Program {
    /// A program with no labels or data.
    pub fn new(instructions: Vec<StaticInstruction>) -> Self {
        Self {
            instructions,
            ..Self::default()
        }
    }

    /// Binds a code label to an instruction index.
    #[must_use]
    pub fn with_label(mut self, name: &str, index: usize) -> Self {
        let _ = self.labels.insert(name.to_owned(), index);
        self
    }

    /// Adds a data directive.
    #[must_use]
    pub fn with_location(mut self, location: MemoryLocation) -> Self {
        self.memory.push(location);
        self
    }

    /// Address of the instruction at `index`.
    pub const fn address_of(index: usize) -> u64 {
        index as u64 * INSTRUCTION_SIZE
    }

    /// Index of the instruction at `pc`, if `pc` is inside the program.
    pub fn index_of(&self, pc: u64) -> Option<usize> {
        if pc % INSTRUCTION_SIZE != 0 {
            return None;
        }
        let idx = usize::try_from(pc / INSTRUCTION_SIZE).ok()?;
        (idx < self.instructions.len()).then_some(idx)
    }
}
