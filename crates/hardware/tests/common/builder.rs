use sssim_core::isa::{Argument, MemoryLocation, Program, StaticInstruction};

/// Builds a [`Program`] one instruction at a time.
///
/// Arguments are written as strings: integers become immediates, a leading
/// `@` marks a label reference, anything else is a register name.
#[derive(Debug, Default)]
pub struct ProgramBuilder {
    program: Program,
}

fn parse_arg(text: &str) -> Argument {
    if let Some(label) = text.strip_prefix('@') {
        Argument::label(label)
    } else if let Ok(imm) = text.parse::<i64>() {
        Argument::imm(imm)
    } else {
        Argument::reg(text)
    }
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `opcode` with its arguments in assembly order.
    pub fn inst(mut self, opcode: &str, args: &[&str]) -> Self {
        let line = self.program.instructions.len() + 1;
        let inst = StaticInstruction::new(opcode, args.iter().map(|a| parse_arg(a))).at_line(line);
        self.program.instructions.push(inst);
        self
    }

    /// Binds `name` to the next instruction.
    pub fn label(mut self, name: &str) -> Self {
        let index = self.program.instructions.len();
        self.program = self.program.with_label(name, index);
        self
    }

    /// Adds a data directive.
    pub fn data(mut self, location: MemoryLocation) -> Self {
        self.program = self.program.with_location(location);
        self
    }

    pub fn addi(self, rd: &str, rs1: &str, imm: i64) -> Self {
        self.inst("addi", &[rd, rs1, &imm.to_string()])
    }

    pub fn halt(self) -> Self {
        self.inst("halt", &[])
    }

    pub fn build(self) -> Program {
        self.program
    }
}
