//! Instruction sets described as data: JSON specs, validation and execution.

use pretty_assertions::assert_eq;
use rstest::rstest;
use sssim_core::common::{ConfigError, SemanticsError};
use sssim_core::isa::rv32;
use sssim_core::isa::{Effect, FuClass, InstructionSet, InstructionSpec};
use sssim_core::{Cpu, SimError};

use crate::common::harness::reg;
use crate::common::{ProgramBuilder, TestContext};

const CUSTOM_SPECS: &str = r#"[
    {
        "name": "triple",
        "class": "IntArithmetic",
        "arguments": [
            { "name": "rd", "kind": "IntRegister", "data_type": "Int", "write_back": true },
            { "name": "rs1", "kind": "IntRegister", "data_type": "Int" }
        ],
        "semantics": "\\rs1 \\rs1 \\rs1 + + \\rd ="
    },
    {
        "name": "square",
        "class": "IntArithmetic",
        "unit": "MulDiv",
        "arguments": [
            { "name": "rd", "kind": "IntRegister", "data_type": "Int", "write_back": true },
            { "name": "rs1", "kind": "IntRegister", "data_type": "Int" }
        ],
        "semantics": "\\rs1 \\rs1 * \\rd ="
    }
]"#;

fn custom_isa() -> InstructionSet {
    let extra: Vec<InstructionSpec> = serde_json::from_str(CUSTOM_SPECS).unwrap();
    InstructionSet::from_specs(rv32::specs().into_iter().chain(extra)).unwrap()
}

#[test]
fn json_specs_parse_into_semantics() {
    let isa = custom_isa();
    assert_eq!(isa.len(), rv32::specs().len() + 2);

    let triple = isa.get("triple").unwrap();
    assert_eq!(triple.unit, Some(FuClass::IntAlu));
    assert_eq!(triple.sources(), &[1]);
    assert_eq!(triple.destinations(), &[0]);
    assert!(matches!(triple.effect, Effect::Compute { dest: 0, .. }));

    assert_eq!(isa.get("square").unwrap().unit, Some(FuClass::MulDiv));
}

#[test]
fn custom_instructions_execute_in_the_pipeline() {
    let mut ctx = TestContext::new();
    ctx.isa = custom_isa();
    let program = ProgramBuilder::new()
        .addi("x1", "x0", 7)
        .inst("triple", &["x2", "x1"])
        .inst("square", &["x3", "x2"])
        .halt()
        .build();
    let cpu = ctx.run_to_end(&program);
    assert_eq!(reg(&cpu, "x2"), 21);
    assert_eq!(reg(&cpu, "x3"), 441);
    assert_eq!(cpu.stats().inst_int, 3);
}

#[test]
fn unit_override_must_be_configured() {
    let mut ctx = TestContext::new();
    ctx.isa = custom_isa();
    ctx.config.units.retain(|u| u.class != FuClass::MulDiv);
    let program = ProgramBuilder::new().inst("square", &["x3", "x2"]).halt().build();
    let err = Cpu::new(ctx.config.clone(), &ctx.isa, ctx.registers.clone(), &program).unwrap_err();
    assert!(matches!(
        err,
        SimError::Config(ConfigError::MissingUnit { class: FuClass::MulDiv, .. })
    ));
}

fn compute(semantics: &str) -> InstructionSpec {
    serde_json::from_value(serde_json::json!({
        "name": "bad",
        "class": "IntArithmetic",
        "arguments": [
            { "name": "rd", "kind": "IntRegister", "data_type": "Int", "write_back": true },
            { "name": "imm", "kind": "Immediate", "data_type": "Int" }
        ],
        "semantics": semantics,
    }))
    .unwrap()
}

#[rstest]
#[case::no_assignment("\\imm 1 +")]
#[case::unknown_variable("\\rs9 \\rd =")]
#[case::dangling_operator("+ \\rd =")]
#[case::immediate_destination("\\rd \\imm =")]
fn malformed_semantics_are_rejected(#[case] semantics: &str) {
    assert!(InstructionSet::from_specs([compute(semantics)]).is_err());
}

#[rstest]
#[case::bad_width("Memory", "load:12:\\imm")]
#[case::unknown_memory_op("Memory", "swap:32:\\imm")]
#[case::branch_without_condition("Branch", "\\imm")]
#[case::unknown_control("Control", "trap")]
fn malformed_effects_are_rejected(#[case] class: &str, #[case] semantics: &str) {
    let mut spec = compute(semantics);
    spec.class = serde_json::from_value(serde_json::json!(class)).unwrap();
    assert!(InstructionSet::from_specs([spec]).is_err());
}

#[test]
fn opcodes_must_be_unique() {
    let mut specs = rv32::specs();
    specs.push(compute("\\imm \\rd ="));
    specs.push(compute("\\imm 1 + \\rd ="));
    let err = InstructionSet::from_specs(specs).unwrap_err();
    assert_eq!(err, SemanticsError::Duplicate("bad".into()));
}

