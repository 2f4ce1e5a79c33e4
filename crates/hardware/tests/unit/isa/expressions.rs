//! Postfix expression language: arithmetic conventions, typing and selection.

use pretty_assertions::assert_eq;
use proptest::prelude::*;
use rstest::rstest;
use sssim_core::common::{DataType, SemanticsError, Value};
use sssim_core::isa::ArgumentSpec;
use sssim_core::isa::expr::{EvalContext, Expr, parse_assignment};

fn int_args() -> Vec<ArgumentSpec> {
    vec![
        ArgumentSpec::immediate("a", DataType::Int),
        ArgumentSpec::immediate("b", DataType::Int),
    ]
}

fn eval_with(text: &str, args: &[ArgumentSpec], operands: &[Value]) -> Result<Value, SemanticsError> {
    Expr::parse(text, args)?.evaluate(&EvalContext { operands, pc: 0x40 })
}

fn eval_ints(text: &str, a: i32, b: i32) -> Result<Value, SemanticsError> {
    eval_with(text, &int_args(), &[Value::int(a), Value::int(b)])
}

proptest! {
    #[test]
    fn int_addition_wraps(a in any::<i32>(), b in any::<i32>()) {
        prop_assert_eq!(eval_ints("\\a \\b +", a, b).unwrap(), Value::int(a.wrapping_add(b)));
    }

    #[test]
    fn int_multiplication_wraps(a in any::<i32>(), b in any::<i32>()) {
        prop_assert_eq!(eval_ints("\\a \\b *", a, b).unwrap(), Value::int(a.wrapping_mul(b)));
    }

    #[test]
    fn nonzero_division_truncates(a in any::<i32>(), b in any::<i32>().prop_filter("nonzero", |b| *b != 0)) {
        prop_assert_eq!(eval_ints("\\a \\b /", a, b).unwrap(), Value::int(a.wrapping_div(b)));
        prop_assert_eq!(eval_ints("\\a \\b %", a, b).unwrap(), Value::int(a.wrapping_rem(b)));
    }
}

#[rstest]
#[case(7)]
#[case(-7)]
#[case(i32::MIN)]
fn division_by_zero_follows_riscv(#[case] dividend: i32) {
    assert_eq!(eval_ints("\\a \\b /", dividend, 0).unwrap(), Value::int(-1));
    assert_eq!(eval_ints("\\a \\b %", dividend, 0).unwrap(), Value::int(dividend));
}

#[test]
fn signed_overflow_division_wraps() {
    assert_eq!(eval_ints("\\a \\b /", i32::MIN, -1).unwrap(), Value::int(i32::MIN));
    assert_eq!(eval_ints("\\a \\b %", i32::MIN, -1).unwrap(), Value::int(0));
}

#[rstest]
#[case("<", -1, 1, true)]
#[case("<=", 3, 3, true)]
#[case(">", 3, 3, false)]
#[case(">=", -5, -6, true)]
#[case("==", 9, 9, true)]
#[case("!=", 9, 9, false)]
fn comparisons_produce_bools(#[case] op: &str, #[case] a: i32, #[case] b: i32, #[case] expected: bool) {
    let value = eval_ints(&format!("\\a \\b {op}"), a, b).unwrap();
    assert_eq!(value.ty(), DataType::Bool);
    assert_eq!(value.as_bool(), expected);
}

#[test]
fn unsigned_comparison_ignores_sign() {
    let args = vec![
        ArgumentSpec::immediate("a", DataType::UInt),
        ArgumentSpec::immediate("b", DataType::UInt),
    ];
    let ops = [Value::uint(u32::MAX), Value::uint(1)];
    assert!(!eval_with("\\a \\b <", &args, &ops).unwrap().as_bool());
    assert!(eval_ints("\\a \\b <", -1, 1).unwrap().as_bool());
}

#[test]
fn shifts_distinguish_arithmetic_and_logical() {
    assert_eq!(eval_ints("\\a \\b >>", -16, 2).unwrap(), Value::int(-4));
    assert_eq!(eval_ints("\\a \\b >>>", -16, 28).unwrap(), Value::int(0xF));
    assert_eq!(eval_ints("\\a \\b <<", 1, 31).unwrap(), Value::int(i32::MIN));
}

#[rstest]
#[case(2, 5, 5)]
#[case(5, 2, 5)]
#[case(-3, -3, -3)]
fn pick_selects_on_condition(#[case] a: i32, #[case] b: i32, #[case] expected: i32) {
    // if_false if_true cond pick
    let value = eval_ints("\\a \\b \\a \\b < pick", a, b).unwrap();
    assert_eq!(value, Value::int(expected));
}

#[test]
fn pc_reads_instruction_address() {
    assert_eq!(eval_ints("\\pc \\a +", 4, 0).unwrap(), Value::int(0x44));
}

#[test]
fn mixed_types_are_rejected() {
    let args = vec![
        ArgumentSpec::immediate("a", DataType::Int),
        ArgumentSpec::immediate("f", DataType::Float),
    ];
    let err = eval_with("\\a \\f +", &args, &[Value::int(1), Value::float(1.0)]).unwrap_err();
    assert!(matches!(err, SemanticsError::TypeMismatch { .. }));
}

#[test]
fn float_arithmetic_and_conversion() {
    let args = vec![
        ArgumentSpec::immediate("x", DataType::Float),
        ArgumentSpec::immediate("y", DataType::Float),
    ];
    let ops = [Value::float(1.5), Value::float(2.25)];
    assert_eq!(eval_with("\\x \\y +", &args, &ops).unwrap(), Value::float(3.75));
    assert_eq!(eval_with("\\x \\y * int", &args, &ops).unwrap(), Value::int(3));
    assert_eq!(eval_with("\\y sqrt", &args, &ops).unwrap(), Value::float(1.5));
}

#[rstest]
#[case("")]
#[case("\\a \\b")]
#[case("\\a +")]
#[case("\\nothere")]
#[case("\\a \\b frobnicate")]
fn malformed_expressions_fail_to_parse(#[case] text: &str) {
    assert!(Expr::parse(text, &int_args()).is_err(), "{text:?} parsed");
}

#[test]
fn assignment_targets_declared_argument() {
    let args = vec![
        ArgumentSpec::immediate("a", DataType::Int),
        ArgumentSpec::immediate("b", DataType::Int).write_back(),
    ];
    let assignment = parse_assignment("\\a 1 + \\b =", &args).unwrap();
    assert_eq!(assignment.dest, 1);
    let value = assignment
        .expr
        .evaluate(&EvalContext {
            operands: &[Value::int(41), Value::int(0)],
            pc: 0,
        })
        .unwrap();
    assert_eq!(value, Value::int(42));
}
