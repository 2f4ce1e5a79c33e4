//! Built-in RV32IMF subset.
//!
//! The table is plain data: every entry is an [`InstructionSpec`] whose
//! semantics string is parsed by [`InstructionSet::from_specs`], exactly as
//! externally supplied ISA data would be. Argument order follows assembly
//! order, so `lw rd, imm(rs1)` is declared `rd, imm, rs1`.

use crate::common::error::SemanticsError;
use crate::common::reg::RegisterKind::{Float as F, Int as I};
use crate::common::value::DataType;
use crate::isa::semantics::{
    ArgumentSpec, FuClass, InstructionClass, InstructionSet, InstructionSpec,
};

fn spec(
    name: &str,
    class: InstructionClass,
    arguments: Vec<ArgumentSpec>,
    semantics: &str,
) -> InstructionSpec {
    InstructionSpec {
        name: name.to_owned(),
        class,
        unit: None,
        arguments,
        semantics: semantics.to_owned(),
    }
}

fn rd(ty: DataType) -> ArgumentSpec {
    let kind = if ty.is_float() { F } else { I };
    ArgumentSpec::register("rd", kind, ty).write_back()
}

fn rs(name: &str, ty: DataType) -> ArgumentSpec {
    let kind = if ty.is_float() { F } else { I };
    ArgumentSpec::register(name, kind, ty)
}

fn imm(ty: DataType) -> ArgumentSpec {
    ArgumentSpec::immediate("imm", ty)
}

/// `op rd, rs1, rs2` over `ty`, result into an `Int` destination.
fn reg_reg(name: &str, ty: DataType, op: &str) -> InstructionSpec {
    spec(
        name,
        InstructionClass::IntArithmetic,
        vec![rd(DataType::Int), rs("rs1", ty), rs("rs2", ty)],
        &format!("\\rs1 \\rs2 {op} \\rd ="),
    )
}

/// `op rd, rs1, imm` over `ty`.
fn reg_imm(name: &str, ty: DataType, op: &str) -> InstructionSpec {
    spec(
        name,
        InstructionClass::IntArithmetic,
        vec![rd(DataType::Int), rs("rs1", ty), imm(ty)],
        &format!("\\rs1 \\imm {op} \\rd ="),
    )
}

fn muldiv(name: &str, ty: DataType, op: &str) -> InstructionSpec {
    InstructionSpec {
        unit: Some(FuClass::MulDiv),
        ..reg_reg(name, ty, op)
    }
}

/// `op rd, rs1, rs2` on single-precision registers.
fn float_op(name: &str, op: &str) -> InstructionSpec {
    spec(
        name,
        InstructionClass::FloatArithmetic,
        vec![rd(DataType::Float), rs("rs1", DataType::Float), rs("rs2", DataType::Float)],
        &format!("\\rs1 \\rs2 {op} \\rd ="),
    )
}

/// Comparison of two float registers into an integer destination.
fn float_cmp(name: &str, op: &str) -> InstructionSpec {
    spec(
        name,
        InstructionClass::FloatArithmetic,
        vec![rd(DataType::Int), rs("rs1", DataType::Float), rs("rs2", DataType::Float)],
        &format!("\\rs1 \\rs2 {op} \\rd ="),
    )
}

/// Single-operand float conversion or move.
fn float_unary(name: &str, dst: DataType, src: DataType, body: &str) -> InstructionSpec {
    spec(
        name,
        InstructionClass::FloatArithmetic,
        vec![rd(dst), rs("rs1", src)],
        &format!("\\rs1 {body} \\rd ="),
    )
}

fn branch(name: &str, ty: DataType, op: &str) -> InstructionSpec {
    spec(
        name,
        InstructionClass::Branch,
        vec![rs("rs1", ty), rs("rs2", ty), imm(DataType::Int).pc_relative()],
        &format!("\\pc \\imm +:\\rs1 \\rs2 {op}"),
    )
}

fn load(name: &str, bits: u32, dst: DataType) -> InstructionSpec {
    spec(
        name,
        InstructionClass::Memory,
        vec![rd(dst), imm(DataType::Int), rs("rs1", DataType::Int)],
        &format!("load:{bits}:\\rs1 \\imm +"),
    )
}

fn store(name: &str, bits: u32, src: DataType) -> InstructionSpec {
    spec(
        name,
        InstructionClass::Memory,
        vec![rs("rs2", src), imm(DataType::Int), rs("rs1", DataType::Int)],
        &format!("store:{bits}:\\rs1 \\imm +:rs2"),
    )
}

/// Raw specs of the built-in subset.
pub fn specs() -> Vec<InstructionSpec> {
    use DataType::{Float, Int, UInt};
    let link = "\\pc 4 + \\rd =";

    vec![
        // Integer register-register.
        reg_reg("add", Int, "+"),
        reg_reg("sub", Int, "-"),
        reg_reg("and", Int, "&"),
        reg_reg("or", Int, "|"),
        reg_reg("xor", Int, "^"),
        reg_reg("sll", Int, "<<"),
        reg_reg("srl", Int, ">>>"),
        reg_reg("sra", Int, ">>"),
        reg_reg("slt", Int, "<"),
        reg_reg("sltu", UInt, "<"),
        // Integer register-immediate.
        reg_imm("addi", Int, "+"),
        reg_imm("andi", Int, "&"),
        reg_imm("ori", Int, "|"),
        reg_imm("xori", Int, "^"),
        reg_imm("slli", Int, "<<"),
        reg_imm("srli", Int, ">>>"),
        reg_imm("srai", Int, ">>"),
        reg_imm("slti", Int, "<"),
        reg_imm("sltiu", UInt, "<"),
        spec(
            "lui",
            InstructionClass::IntArithmetic,
            vec![rd(Int), imm(Int)],
            "\\imm 12 << \\rd =",
        ),
        spec(
            "auipc",
            InstructionClass::IntArithmetic,
            vec![rd(Int), imm(Int)],
            "\\pc \\imm 12 << + \\rd =",
        ),
        spec("li", InstructionClass::IntArithmetic, vec![rd(Int), imm(Int)], "\\imm \\rd ="),
        spec(
            "mv",
            InstructionClass::IntArithmetic,
            vec![rd(Int), rs("rs1", Int)],
            "\\rs1 \\rd =",
        ),
        // Multiply/divide.
        muldiv("mul", Int, "*"),
        muldiv("mulh", Int, "*h"),
        muldiv("mulhu", UInt, "*h"),
        muldiv("div", Int, "/"),
        muldiv("divu", UInt, "/"),
        muldiv("rem", Int, "%"),
        muldiv("remu", UInt, "%"),
        // Branches and jumps.
        branch("beq", Int, "=="),
        branch("bne", Int, "!="),
        branch("blt", Int, "<"),
        branch("bge", Int, ">="),
        branch("bltu", UInt, "<"),
        branch("bgeu", UInt, ">="),
        spec(
            "jal",
            InstructionClass::Branch,
            vec![rd(Int), imm(Int).pc_relative()],
            &format!("\\pc \\imm +:true:{link}"),
        ),
        spec(
            "j",
            InstructionClass::Branch,
            vec![imm(Int).pc_relative()],
            "\\pc \\imm +:true",
        ),
        spec(
            "jalr",
            InstructionClass::Branch,
            vec![rd(Int), rs("rs1", Int), imm(Int)],
            &format!("\\rs1 \\imm + -2 &:true:{link}"),
        ),
        spec("jr", InstructionClass::Branch, vec![rs("rs1", Int)], "\\rs1 -2 &:true"),
        // Loads and stores.
        load("lw", 32, Int),
        load("lh", 16, Int),
        load("lhu", 16, UInt),
        load("lb", 8, Int),
        load("lbu", 8, UInt),
        load("flw", 32, Float),
        store("sw", 32, Int),
        store("sh", 16, Int),
        store("sb", 8, Int),
        store("fsw", 32, Float),
        // Single-precision floating point.
        float_op("fadd.s", "+"),
        float_op("fsub.s", "-"),
        float_op("fmul.s", "*"),
        float_op("fdiv.s", "/"),
        float_op("fmin.s", "min"),
        float_op("fmax.s", "max"),
        float_cmp("feq.s", "=="),
        float_cmp("flt.s", "<"),
        float_cmp("fle.s", "<="),
        float_unary("fsqrt.s", Float, Float, "sqrt"),
        float_unary("fcvt.s.w", Float, Int, "float"),
        float_unary("fcvt.w.s", Int, Float, "int"),
        float_unary("fmv.x.w", Int, Float, "bits"),
        float_unary("fmv.w.x", Float, Int, ""),
        float_unary("fclass.s", Int, Float, "fclass"),
        // Control.
        spec("nop", InstructionClass::Control, vec![], "nop"),
        spec("halt", InstructionClass::Control, vec![], "halt"),
    ]
}

impl InstructionSet {
    /// The built-in RV32IMF subset.
    pub fn riscv() -> Result<Self, SemanticsError> {
        Self::from_specs(specs())
    }
}
