//! Declarative instruction semantics.
//!
//! Every opcode is described by an [`InstructionSpec`]: its class, its ordered
//! argument declarations and a semantics string. Loading an instruction set
//! parses each string once into an [`Effect`], so executing an instruction is
//! only a tree evaluation over the instance's operand values.
//!
//! Semantics string forms, by class:
//! 1. **Arithmetic:** `<expr> \rd =`.
//! 2. **Branch:** `<target>:<condition>`, optionally `:<expr> \rd =` for a link write.
//! 3. **Load:** `load:<bits>:<address>`; the result is sign-extended for signed destinations.
//! 4. **Store:** `store:<bits>:<address>:<value argument>`.
//! 5. **Control:** `halt` or `nop`.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::common::error::SemanticsError;
use crate::common::reg::RegisterKind;
use crate::common::value::{DataType, Value};
use crate::isa::expr::{EvalContext, Expr, parse_assignment};

/// Coarse instruction category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum InstructionClass {
    /// Integer computation.
    IntArithmetic,
    /// Floating-point computation.
    FloatArithmetic,
    /// Branches and jumps.
    Branch,
    /// Loads and stores.
    Memory,
    /// Halt and no-op; never occupies a functional unit.
    Control,
}

impl InstructionClass {
    /// Unit class used when a spec does not name one.
    pub const fn default_unit(self) -> Option<FuClass> {
        match self {
            Self::IntArithmetic => Some(FuClass::IntAlu),
            Self::FloatArithmetic => Some(FuClass::Fpu),
            Self::Branch => Some(FuClass::Branch),
            Self::Memory => Some(FuClass::Memory),
            Self::Control => None,
        }
    }
}

/// Functional-unit classes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum FuClass {
    /// Integer ALU.
    IntAlu,
    /// Integer multiplier/divider.
    MulDiv,
    /// Floating-point unit.
    Fpu,
    /// Branch unit.
    Branch,
    /// Address generation for loads and stores.
    Memory,
}

impl FuClass {
    /// All classes, in a fixed order.
    pub const ALL: [Self; 5] = [Self::IntAlu, Self::MulDiv, Self::Fpu, Self::Branch, Self::Memory];

    /// Position in [`Self::ALL`].
    pub const fn index(self) -> usize {
        match self {
            Self::IntAlu => 0,
            Self::MulDiv => 1,
            Self::Fpu => 2,
            Self::Branch => 3,
            Self::Memory => 4,
        }
    }
}

/// How an argument is supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ArgumentKind {
    /// Register from the integer file.
    IntRegister,
    /// Register from the floating-point file.
    FloatRegister,
    /// Immediate or resolved label.
    Immediate,
}

impl ArgumentKind {
    /// Register file of a register argument.
    pub const fn register_kind(self) -> Option<RegisterKind> {
        match self {
            Self::IntRegister => Some(RegisterKind::Int),
            Self::FloatRegister => Some(RegisterKind::Float),
            Self::Immediate => None,
        }
    }
}

/// Declaration of one instruction argument.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgumentSpec {
    /// Name used by `\name` in semantics strings.
    pub name: String,
    /// Register or immediate.
    pub kind: ArgumentKind,
    /// Type the value is read as.
    pub data_type: DataType,
    /// The instruction writes this argument.
    #[serde(default)]
    pub write_back: bool,
    /// A label supplied here resolves to `label - pc`.
    #[serde(default)]
    pub pc_relative: bool,
}

impl ArgumentSpec {
    /// Declares a register argument.
    pub fn register(name: &str, kind: RegisterKind, data_type: DataType) -> Self {
        Self {
            name: name.to_owned(),
            kind: match kind {
                RegisterKind::Int => ArgumentKind::IntRegister,
                RegisterKind::Float => ArgumentKind::FloatRegister,
            },
            data_type,
            write_back: false,
            pc_relative: false,
        }
    }

    /// Declares an immediate argument.
    pub fn immediate(name: &str, data_type: DataType) -> Self {
        Self {
            name: name.to_owned(),
            kind: ArgumentKind::Immediate,
            data_type,
            write_back: false,
            pc_relative: false,
        }
    }

    /// Marks the argument as a destination.
    #[must_use]
    pub const fn write_back(mut self) -> Self {
        self.write_back = true;
        self
    }

    /// Marks the argument as a pc-relative label slot.
    #[must_use]
    pub const fn pc_relative(mut self) -> Self {
        self.pc_relative = true;
        self
    }
}

/// Raw, unparsed instruction description as supplied by the ISA loader.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionSpec {
    /// Opcode mnemonic.
    pub name: String,
    /// Instruction class.
    pub class: InstructionClass,
    /// Unit override; defaults from the class.
    #[serde(default)]
    pub unit: Option<FuClass>,
    /// Ordered argument declarations.
    pub arguments: Vec<ArgumentSpec>,
    /// Semantics string.
    pub semantics: String,
}

/// Memory access width.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum AccessWidth {
    /// 1 byte.
    Byte,
    /// 2 bytes.
    Half,
    /// 4 bytes.
    Word,
    /// 8 bytes.
    Double,
}

impl AccessWidth {
    /// Width from a bit count.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            8 => Some(Self::Byte),
            16 => Some(Self::Half),
            32 => Some(Self::Word),
            64 => Some(Self::Double),
            _ => None,
        }
    }

    /// Width in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Half => 2,
            Self::Word => 4,
            Self::Double => 8,
        }
    }

    /// Mask selecting the accessed bits.
    pub const fn mask(self) -> u64 {
        match self {
            Self::Double => u64::MAX,
            w => (1u64 << (w.bytes() * 8)) - 1,
        }
    }

    /// Sign-extends a zero-extended value of this width.
    pub const fn sign_extend(self, raw: u64) -> u64 {
        let shift = 64 - (self.bytes() as u32) * 8;
        (((raw << shift) as i64) >> shift) as u64
    }
}

/// Parsed effect of an instruction.
#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    /// Computes a value into a destination argument.
    Compute {
        /// Destination argument position.
        dest: usize,
        /// Value expression.
        expr: Expr,
    },
    /// Conditionally redirects control flow.
    Branch {
        /// Target address expression.
        target: Expr,
        /// Taken condition.
        condition: Expr,
        /// Optional link register write.
        link: Option<(usize, Expr)>,
    },
    /// Reads memory into a destination argument.
    Load {
        /// Access width.
        width: AccessWidth,
        /// Effective-address expression.
        address: Expr,
        /// Destination argument position.
        dest: usize,
    },
    /// Writes an argument's value to memory at commit.
    Store {
        /// Access width.
        width: AccessWidth,
        /// Effective-address expression.
        address: Expr,
        /// Position of the argument holding the data.
        value: usize,
    },
    /// Stops the simulation when committed.
    Halt,
    /// Does nothing.
    Nop,
}

/// Concrete result of executing an instruction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outcome {
    /// Value for the destination register.
    Value(Value),
    /// Resolved branch.
    Branch {
        /// Whether the branch is taken.
        taken: bool,
        /// Taken target.
        target: u64,
        /// Link value for the destination register.
        link: Option<Value>,
    },
    /// Effective address of a load.
    Load {
        /// Byte address.
        address: u64,
        /// Access width.
        width: AccessWidth,
    },
    /// Effective address and data of a store.
    Store {
        /// Byte address.
        address: u64,
        /// Access width.
        width: AccessWidth,
        /// Data, already masked to the width.
        data: u64,
    },
    /// Halt and no-op produce nothing.
    None,
}

/// Parsed, immutable semantics of one opcode.
#[derive(Clone, Debug, PartialEq)]
pub struct InstructionSemantics {
    /// Opcode mnemonic.
    pub name: String,
    /// Instruction class.
    pub class: InstructionClass,
    /// Functional unit that executes it, `None` for control instructions.
    pub unit: Option<FuClass>,
    /// Ordered argument declarations.
    pub arguments: Vec<ArgumentSpec>,
    /// Parsed effect.
    pub effect: Effect,
    sources: Vec<usize>,
    destinations: Vec<usize>,
}

impl InstructionSemantics {
    /// Parses a spec into semantics.
    pub fn from_spec(spec: InstructionSpec) -> Result<Self, SemanticsError> {
        let InstructionSpec {
            name,
            class,
            unit,
            arguments,
            semantics,
        } = spec;
        let text = semantics.trim();
        let malformed = |reason: &str| SemanticsError::Malformed {
            expression: text.to_owned(),
            reason: reason.to_owned(),
        };

        let effect = match class {
            InstructionClass::Control => match text {
                "halt" => Effect::Halt,
                "nop" | "" => Effect::Nop,
                _ => return Err(malformed("control instructions are `halt` or `nop`")),
            },
            InstructionClass::IntArithmetic | InstructionClass::FloatArithmetic => {
                let assignment = parse_assignment(text, &arguments)?;
                Effect::Compute {
                    dest: assignment.dest,
                    expr: assignment.expr,
                }
            }
            InstructionClass::Branch => {
                let parts: Vec<&str> = text.split(':').collect();
                let (target, condition, link) = match parts.as_slice() {
                    [target, cond] => (*target, *cond, None),
                    [target, cond, link] => (*target, *cond, Some(*link)),
                    _ => return Err(malformed("branches are `target:condition[:link]`")),
                };
                let link = link
                    .map(|l| parse_assignment(l, &arguments).map(|a| (a.dest, a.expr)))
                    .transpose()?;
                Effect::Branch {
                    target: Expr::parse(target, &arguments)?,
                    condition: Expr::parse(condition, &arguments)?,
                    link,
                }
            }
            InstructionClass::Memory => {
                let parts: Vec<&str> = text.split(':').collect();
                let width = |bits: &str| {
                    bits.trim()
                        .parse::<u32>()
                        .ok()
                        .and_then(AccessWidth::from_bits)
                        .ok_or_else(|| malformed("access width must be 8, 16, 32 or 64"))
                };
                match parts.as_slice() {
                    ["load", bits, address] => {
                        let dest = arguments
                            .iter()
                            .position(|a| a.write_back)
                            .ok_or_else(|| malformed("load without a destination argument"))?;
                        Effect::Load {
                            width: width(*bits)?,
                            address: Expr::parse(address, &arguments)?,
                            dest,
                        }
                    }
                    ["store", bits, address, value] => {
                        let value_name = value.trim().trim_start_matches('\\');
                        let value = arguments
                            .iter()
                            .position(|a| a.name == value_name)
                            .ok_or_else(|| malformed("store value is not a declared argument"))?;
                        Effect::Store {
                            width: width(*bits)?,
                            address: Expr::parse(address, &arguments)?,
                            value,
                        }
                    }
                    _ => return Err(malformed("memory semantics are `load:..` or `store:..`")),
                }
            }
        };

        let mut sources = Vec::new();
        let mut destinations = Vec::new();
        match &effect {
            Effect::Compute { dest, expr } => {
                expr.collect_args(&mut sources);
                destinations.push(*dest);
            }
            Effect::Branch {
                target,
                condition,
                link,
            } => {
                target.collect_args(&mut sources);
                condition.collect_args(&mut sources);
                if let Some((dest, expr)) = link {
                    expr.collect_args(&mut sources);
                    destinations.push(*dest);
                }
            }
            Effect::Load { address, dest, .. } => {
                address.collect_args(&mut sources);
                destinations.push(*dest);
            }
            Effect::Store { address, value, .. } => {
                address.collect_args(&mut sources);
                if !sources.contains(value) {
                    sources.push(*value);
                }
            }
            Effect::Halt | Effect::Nop => {}
        }
        sources.sort_unstable();

        for &dest in &destinations {
            let arg = &arguments[dest];
            if arg.kind == ArgumentKind::Immediate || !arg.write_back {
                return Err(SemanticsError::ArgumentKind {
                    opcode: name,
                    argument: arg.name.clone(),
                    reason: "destinations must be write-back register arguments".into(),
                });
            }
        }

        Ok(Self {
            unit: unit.or_else(|| class.default_unit()),
            name,
            class,
            arguments,
            effect,
            sources,
            destinations,
        })
    }

    /// Positions of the arguments this instruction reads, ascending.
    pub fn sources(&self) -> &[usize] {
        &self.sources
    }

    /// Positions of the arguments this instruction writes.
    pub fn destinations(&self) -> &[usize] {
        &self.destinations
    }

    /// Returns true for branches and jumps.
    pub const fn is_branch(&self) -> bool {
        matches!(self.effect, Effect::Branch { .. })
    }

    /// Returns true for loads and stores.
    pub const fn is_memory(&self) -> bool {
        matches!(self.effect, Effect::Load { .. } | Effect::Store { .. })
    }

    /// Checks operand count and the types of every read argument.
    fn check_operands(&self, operands: &[Value]) -> Result<(), SemanticsError> {
        if operands.len() != self.arguments.len() {
            return Err(SemanticsError::ArgumentCount {
                opcode: self.name.clone(),
                expected: self.arguments.len(),
                found: operands.len(),
            });
        }
        for &idx in &self.sources {
            let expected = self.arguments[idx].data_type;
            let found = operands[idx].ty();
            if expected != found {
                return Err(SemanticsError::TypeMismatch { expected, found });
            }
        }
        Ok(())
    }

    /// Executes the instruction over concrete operand values.
    ///
    /// `operands` holds one value per declared argument; values in
    /// write-only slots are ignored.
    pub fn execute(&self, operands: &[Value], pc: u64) -> Result<Outcome, SemanticsError> {
        self.check_operands(operands)?;
        let ctx = EvalContext { operands, pc };
        let dest_type = |dest: usize| self.arguments[dest].data_type;

        Ok(match &self.effect {
            Effect::Compute { dest, expr } => {
                Outcome::Value(expr.evaluate(&ctx)?.convert_to(dest_type(*dest)))
            }
            Effect::Branch {
                target,
                condition,
                link,
            } => Outcome::Branch {
                taken: condition.evaluate(&ctx)?.as_bool(),
                target: target.evaluate(&ctx)?.as_address(),
                link: link
                    .as_ref()
                    .map(|(dest, expr)| expr.evaluate(&ctx).map(|v| v.convert_to(dest_type(*dest))))
                    .transpose()?,
            },
            Effect::Load { width, address, .. } => Outcome::Load {
                address: address.evaluate(&ctx)?.as_address(),
                width: *width,
            },
            Effect::Store {
                width,
                address,
                value,
            } => Outcome::Store {
                address: address.evaluate(&ctx)?.as_address(),
                width: *width,
                data: operands[*value].raw() & width.mask(),
            },
            Effect::Halt | Effect::Nop => Outcome::None,
        })
    }

    /// Converts raw loaded bytes into the destination's value.
    ///
    /// Signed integer destinations are sign-extended from the access width.
    pub fn load_result(&self, raw: u64, width: AccessWidth) -> Value {
        let Effect::Load { dest, .. } = self.effect else {
            return Value::ulong(raw);
        };
        let ty = self.arguments[dest].data_type;
        let raw = if ty.is_signed() {
            width.sign_extend(raw)
        } else {
            raw
        };
        Value::from_raw(raw, ty)
    }
}

/// Opcode → semantics mapping shared by every run.
#[derive(Clone, Debug, Default)]
pub struct InstructionSet {
    by_name: HashMap<String, Arc<InstructionSemantics>>,
}

impl InstructionSet {
    /// Parses a collection of specs, rejecting duplicates.
    pub fn from_specs(specs: impl IntoIterator<Item = InstructionSpec>) -> Result<Self, SemanticsError> {
        let mut by_name = HashMap::new();
        for spec in specs {
            let semantics = InstructionSemantics::from_spec(spec)?;
            let name = semantics.name.clone();
            if by_name.insert(name.clone(), Arc::new(semantics)).is_some() {
                return Err(SemanticsError::Duplicate(name));
            }
        }
        Ok(Self { by_name })
    }

    /// Looks up an opcode.
    pub fn get(&self, opcode: &str) -> Option<&Arc<InstructionSemantics>> {
        self.by_name.get(opcode)
    }

    /// Number of opcodes.
    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    /// Returns true if no opcodes are defined.
    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}
