//! Static decoding of source instructions.
//!
//! Each [`StaticInstruction`] is decoded exactly once, when the program is
//! loaded: the opcode is bound to its shared semantics, register names are
//! resolved to [`RegId`]s, labels to addresses and immediates to typed values.
//! Every dynamic instance fetched from that line shares the result.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::common::error::SemanticsError;
use crate::common::reg::{RegId, RegisterFile};
use crate::common::value::Value;
use crate::isa::instruction::{Argument, StaticInstruction};
use crate::isa::semantics::{ArgumentKind, InstructionSemantics, InstructionSet};

/// A resolved argument.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DecodedOperand {
    /// Architectural register.
    Register(RegId),
    /// Typed immediate.
    Immediate(Value),
}

/// Decoded form of one source line.
#[derive(Clone, Debug)]
pub struct DecodedInstruction {
    /// Shared semantics of the opcode.
    pub semantics: Arc<InstructionSemantics>,
    /// One operand per declared argument.
    pub operands: Vec<DecodedOperand>,
    /// Address of the instruction.
    pub pc: u64,
    /// Source line.
    pub line: usize,
    text: String,
}

impl DecodedInstruction {
    /// Decodes `inst` located at `pc`.
    ///
    /// `symbols` maps code labels and memory location names to addresses.
    pub fn decode(
        inst: &StaticInstruction,
        pc: u64,
        isa: &InstructionSet,
        regs: &RegisterFile,
        symbols: &HashMap<String, u64>,
    ) -> Result<Self, SemanticsError> {
        let semantics = isa
            .get(&inst.opcode)
            .ok_or_else(|| SemanticsError::UnknownOpcode(inst.opcode.clone()))?;
        if inst.args.len() != semantics.arguments.len() {
            return Err(SemanticsError::ArgumentCount {
                opcode: inst.opcode.clone(),
                expected: semantics.arguments.len(),
                found: inst.args.len(),
            });
        }

        let kind_error = |name: &str, reason: &str| SemanticsError::ArgumentKind {
            opcode: inst.opcode.clone(),
            argument: name.to_owned(),
            reason: reason.to_owned(),
        };

        let mut operands = Vec::with_capacity(inst.args.len());
        for (spec, arg) in semantics.arguments.iter().zip(&inst.args) {
            let operand = match (spec.kind, arg) {
                (ArgumentKind::Immediate, Argument::Immediate(imm)) => {
                    DecodedOperand::Immediate(Value::from_immediate(*imm, spec.data_type))
                }
                (ArgumentKind::Immediate, Argument::Label(label)) => {
                    let addr = *symbols
                        .get(label)
                        .ok_or_else(|| SemanticsError::UnknownSymbol(label.clone()))?;
                    let imm = if spec.pc_relative {
                        addr as i64 - pc as i64
                    } else {
                        addr as i64
                    };
                    DecodedOperand::Immediate(Value::from_immediate(imm, spec.data_type))
                }
                (ArgumentKind::Immediate, Argument::Register(_)) => {
                    return Err(kind_error(&spec.name, "expected an immediate, found a register"));
                }
                (kind, Argument::Register(name)) => {
                    let id = regs
                        .resolve(name)
                        .ok_or_else(|| SemanticsError::UnknownRegister(name.clone()))?;
                    if kind.register_kind() != Some(regs.get(id).kind) {
                        return Err(kind_error(&spec.name, "register is from the wrong register file"));
                    }
                    DecodedOperand::Register(id)
                }
                (_, Argument::Immediate(_) | Argument::Label(_)) => {
                    return Err(kind_error(&spec.name, "expected a register"));
                }
            };
            operands.push(operand);
        }

        let args: Vec<String> = inst
            .args
            .iter()
            .map(|arg| match arg {
                Argument::Register(name) | Argument::Label(name) => name.clone(),
                Argument::Immediate(imm) => imm.to_string(),
            })
            .collect();
        let text = if args.is_empty() {
            inst.opcode.clone()
        } else {
            format!("{} {}", inst.opcode, args.join(","))
        };

        Ok(Self {
            semantics: Arc::clone(semantics),
            operands,
            pc,
            line: inst.line,
            text,
        })
    }

    /// Register bound to argument `arg`, if it is a register.
    pub fn register(&self, arg: usize) -> Option<RegId> {
        match self.operands.get(arg)? {
            DecodedOperand::Register(id) => Some(*id),
            DecodedOperand::Immediate(_) => None,
        }
    }

    /// Registers this instruction writes.
    pub fn destination_registers(&self) -> impl Iterator<Item = RegId> + '_ {
        self.semantics
            .destinations()
            .iter()
            .filter_map(|&arg| self.register(arg))
    }

    /// Opcode mnemonic.
    pub fn mnemonic(&self) -> &str {
        &self.semantics.name
    }
}

impl fmt::Display for DecodedInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
