//! Expression trees for data-driven instruction semantics.
//!
//! Semantics are written as postfix token strings such as `\rs1 \imm +` and
//! parsed once, when the instruction set is loaded, into an [`Expr`] tree.
//! Evaluation is a pure function of the operand values and the instruction
//! address, so the same tree is shared by every dynamic instance of an opcode.
//!
//! Token grammar (whitespace separated):
//! 1. **Variables:** `\name` names a declared argument; `\pc` is the instruction address.
//! 2. **Literals:** `5` int, `5l` long, `1.5f` float, `1.5d` double, `0x1F` hex, `true`/`false`.
//! 3. **Unary:** `!` `neg` `sqrt` `bits` `float` `int` `fclass`.
//! 4. **Binary:** `+ - * *h / % & | ^ << >> >>> < <= > >= == != min max`.
//! 5. **Ternary:** `pick` pops `(if_false, if_true, cond)` and yields `cond ? if_true : if_false`.
//! 6. **Assignment:** `=` pops a target variable and a value.

use std::num::FpCategory;

use crate::common::error::SemanticsError;
use crate::common::value::{DataType, Value};
use crate::isa::semantics::ArgumentSpec;

/// One-operand operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Bitwise not for integers, logical not for booleans.
    Not,
    /// Two's-complement or IEEE negation.
    Neg,
    /// IEEE square root.
    Sqrt,
    /// Raw bits of a float as an integer of the same width.
    Bits,
    /// Numeric conversion of an integer to a float of the same width.
    ToFloat,
    /// Truncating, saturating conversion of a float to an integer.
    ToInt,
    /// RISC-V floating-point class mask.
    FClass,
}

impl UnaryOp {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "!" => Self::Not,
            "neg" => Self::Neg,
            "sqrt" => Self::Sqrt,
            "bits" => Self::Bits,
            "float" => Self::ToFloat,
            "int" => Self::ToInt,
            "fclass" => Self::FClass,
            _ => return None,
        })
    }

    /// Source token.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Not => "!",
            Self::Neg => "neg",
            Self::Sqrt => "sqrt",
            Self::Bits => "bits",
            Self::ToFloat => "float",
            Self::ToInt => "int",
            Self::FClass => "fclass",
        }
    }
}

/// Two-operand operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// Wrapping or IEEE addition.
    Add,
    /// Wrapping or IEEE subtraction.
    Sub,
    /// Wrapping or IEEE multiplication.
    Mul,
    /// Upper half of the double-width integer product.
    MulHigh,
    /// Division; integer division by zero yields all ones.
    Div,
    /// Remainder; remainder by zero yields the dividend.
    Rem,
    /// Bitwise and.
    And,
    /// Bitwise or.
    Or,
    /// Bitwise exclusive or.
    Xor,
    /// Left shift, amount masked to the operand width.
    Shl,
    /// Right shift: arithmetic for signed types, logical for unsigned.
    Shr,
    /// Logical right shift regardless of signedness.
    ShrLogical,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Minimum.
    Min,
    /// Maximum.
    Max,
}

impl BinaryOp {
    fn from_token(token: &str) -> Option<Self> {
        Some(match token {
            "+" => Self::Add,
            "-" => Self::Sub,
            "*" => Self::Mul,
            "*h" => Self::MulHigh,
            "/" => Self::Div,
            "%" => Self::Rem,
            "&" => Self::And,
            "|" => Self::Or,
            "^" => Self::Xor,
            "<<" => Self::Shl,
            ">>" => Self::Shr,
            ">>>" => Self::ShrLogical,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "min" => Self::Min,
            "max" => Self::Max,
            _ => return None,
        })
    }

    /// Source token.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::MulHigh => "*h",
            Self::Div => "/",
            Self::Rem => "%",
            Self::And => "&",
            Self::Or => "|",
            Self::Xor => "^",
            Self::Shl => "<<",
            Self::Shr => ">>",
            Self::ShrLogical => ">>>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Min => "min",
            Self::Max => "max",
        }
    }

    const fn is_shift(self) -> bool {
        matches!(self, Self::Shl | Self::Shr | Self::ShrLogical)
    }
}

/// A parsed semantics expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// Declared argument, by position.
    Arg(usize),
    /// Address of the executing instruction.
    Pc,
    /// Literal.
    Const(Value),
    /// Unary operator application.
    Unary {
        /// Operator.
        op: UnaryOp,
        /// Operand.
        operand: Box<Expr>,
    },
    /// Binary operator application.
    Binary {
        /// Operator.
        op: BinaryOp,
        /// Left operand (pushed first).
        lhs: Box<Expr>,
        /// Right operand (pushed second).
        rhs: Box<Expr>,
    },
    /// Conditional selection.
    Pick {
        /// Result when the condition is false.
        if_false: Box<Expr>,
        /// Result when the condition is true.
        if_true: Box<Expr>,
        /// Condition.
        cond: Box<Expr>,
    },
}

/// A `value \target =` statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Assignment {
    /// Position of the destination argument.
    pub dest: usize,
    /// Value expression.
    pub expr: Expr,
}

/// Inputs to an evaluation.
#[derive(Clone, Copy, Debug)]
pub struct EvalContext<'a> {
    /// One value per declared argument, in declaration order.
    pub operands: &'a [Value],
    /// Address of the executing instruction.
    pub pc: u64,
}

/// Result of parsing a token string.
#[derive(Debug, Default)]
struct Parsed {
    assignments: Vec<Assignment>,
    stack: Vec<Expr>,
}

fn malformed(text: &str, reason: impl Into<String>) -> SemanticsError {
    SemanticsError::Malformed {
        expression: text.to_owned(),
        reason: reason.into(),
    }
}

fn parse_literal(token: &str) -> Option<Value> {
    match token {
        "true" => return Some(Value::bool(true)),
        "false" => return Some(Value::bool(false)),
        _ => {}
    }

    let (negative, body) = token
        .strip_prefix('-')
        .map_or((false, token), |rest| (true, rest));
    if let Some(hex) = body.strip_prefix("0x") {
        let (digits, long) = hex.strip_suffix('l').map_or((hex, false), |d| (d, true));
        let raw = u64::from_str_radix(digits, 16).ok()?;
        let raw = if negative { raw.wrapping_neg() } else { raw };
        return Some(if long || raw > u64::from(u32::MAX) && !negative {
            Value::long(raw as i64)
        } else {
            Value::int(raw as i32)
        });
    }

    if let Some(digits) = token.strip_suffix('l') {
        return digits.parse::<i64>().ok().map(Value::long);
    }
    if let Some(digits) = token.strip_suffix('f') {
        return digits.parse::<f32>().ok().map(Value::float);
    }
    if let Some(digits) = token.strip_suffix('d') {
        return digits.parse::<f64>().ok().map(Value::double);
    }
    if token.contains('.') {
        return token.parse::<f64>().ok().map(Value::double);
    }

    let v = token.parse::<i64>().ok()?;
    if let Ok(small) = i32::try_from(v) {
        Some(Value::int(small))
    } else if let Ok(unsigned) = u32::try_from(v) {
        Some(Value::int(unsigned as i32))
    } else {
        Some(Value::long(v))
    }
}

fn parse_tokens(text: &str, args: &[ArgumentSpec]) -> Result<Parsed, SemanticsError> {
    let mut parsed = Parsed::default();
    let pop = |stack: &mut Vec<Expr>, token: &str| {
        stack
            .pop()
            .ok_or_else(|| malformed(text, format!("`{token}` is missing an operand")))
    };

    for token in text.split_whitespace() {
        if let Some(name) = token.strip_prefix('\\') {
            if name == "pc" {
                parsed.stack.push(Expr::Pc);
                continue;
            }
            let idx = args
                .iter()
                .position(|arg| arg.name == name)
                .ok_or_else(|| malformed(text, format!("unknown variable `{name}`")))?;
            parsed.stack.push(Expr::Arg(idx));
        } else if token == "=" {
            let target = pop(&mut parsed.stack, token)?;
            let expr = pop(&mut parsed.stack, token)?;
            let Expr::Arg(dest) = target else {
                return Err(malformed(text, "assignment target must be a variable"));
            };
            parsed.assignments.push(Assignment { dest, expr });
        } else if token == "pick" {
            let cond = pop(&mut parsed.stack, token)?;
            let if_true = pop(&mut parsed.stack, token)?;
            let if_false = pop(&mut parsed.stack, token)?;
            parsed.stack.push(Expr::Pick {
                if_false: Box::new(if_false),
                if_true: Box::new(if_true),
                cond: Box::new(cond),
            });
        } else if let Some(op) = UnaryOp::from_token(token) {
            let operand = pop(&mut parsed.stack, token)?;
            parsed.stack.push(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        } else if let Some(op) = BinaryOp::from_token(token) {
            let rhs = pop(&mut parsed.stack, token)?;
            let lhs = pop(&mut parsed.stack, token)?;
            parsed.stack.push(Expr::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        } else if let Some(value) = parse_literal(token) {
            parsed.stack.push(Expr::Const(value));
        } else {
            return Err(malformed(text, format!("unknown token `{token}`")));
        }
    }
    Ok(parsed)
}

/// Parses a single `value \target =` statement.
pub fn parse_assignment(text: &str, args: &[ArgumentSpec]) -> Result<Assignment, SemanticsError> {
    let mut parsed = parse_tokens(text, args)?;
    if !parsed.stack.is_empty() {
        return Err(malformed(text, "values left on the stack after assignment"));
    }
    match parsed.assignments.len() {
        1 => Ok(parsed.assignments.remove(0)),
        0 => Err(malformed(text, "expected an assignment")),
        _ => Err(malformed(text, "expected exactly one assignment")),
    }
}

impl Expr {
    /// Parses a token string that must reduce to exactly one value.
    pub fn parse(text: &str, args: &[ArgumentSpec]) -> Result<Self, SemanticsError> {
        let mut parsed = parse_tokens(text, args)?;
        if !parsed.assignments.is_empty() {
            return Err(malformed(text, "unexpected assignment"));
        }
        match parsed.stack.len() {
            1 => parsed.stack.pop().ok_or_else(|| malformed(text, "empty")),
            0 => Err(malformed(text, "empty expression")),
            n => Err(malformed(text, format!("{n} values left on the stack"))),
        }
    }

    /// Appends the positions of every argument this expression reads.
    pub fn collect_args(&self, out: &mut Vec<usize>) {
        match self {
            Self::Arg(idx) => {
                if !out.contains(idx) {
                    out.push(*idx);
                }
            }
            Self::Pc | Self::Const(_) => {}
            Self::Unary { operand, .. } => operand.collect_args(out),
            Self::Binary { lhs, rhs, .. } => {
                lhs.collect_args(out);
                rhs.collect_args(out);
            }
            Self::Pick {
                if_false,
                if_true,
                cond,
            } => {
                if_false.collect_args(out);
                if_true.collect_args(out);
                cond.collect_args(out);
            }
        }
    }

    /// Evaluates the tree against concrete operand values.
    pub fn evaluate(&self, ctx: &EvalContext<'_>) -> Result<Value, SemanticsError> {
        match self {
            Self::Arg(idx) => ctx
                .operands
                .get(*idx)
                .copied()
                .ok_or_else(|| SemanticsError::ArgumentCount {
                    opcode: String::from("<expression>"),
                    expected: idx + 1,
                    found: ctx.operands.len(),
                }),
            Self::Pc => Ok(Value::int(ctx.pc as i32)),
            Self::Const(value) => Ok(*value),
            Self::Unary { op, operand } => unary(*op, operand.evaluate(ctx)?),
            Self::Binary { op, lhs, rhs } => binary(*op, lhs.evaluate(ctx)?, rhs.evaluate(ctx)?),
            Self::Pick {
                if_false,
                if_true,
                cond,
            } => {
                if cond.evaluate(ctx)?.as_bool() {
                    if_true.evaluate(ctx)
                } else {
                    if_false.evaluate(ctx)
                }
            }
        }
    }
}

macro_rules! integer_binary {
    ($op:expr, $a:expr, $b:expr, $shamt:expr, $t:ty, $ut:ty, $wide:ty, $ctor:path) => {{
        let (a, b): ($t, $t) = ($a, $b);
        let v: $t = match $op {
            BinaryOp::Add => a.wrapping_add(b),
            BinaryOp::Sub => a.wrapping_sub(b),
            BinaryOp::Mul => a.wrapping_mul(b),
            BinaryOp::MulHigh => ((a as $wide * b as $wide) >> <$t>::BITS) as $t,
            BinaryOp::Div => {
                if b == 0 {
                    !0
                } else {
                    a.wrapping_div(b)
                }
            }
            BinaryOp::Rem => {
                if b == 0 {
                    a
                } else {
                    a.wrapping_rem(b)
                }
            }
            BinaryOp::And => a & b,
            BinaryOp::Or => a | b,
            BinaryOp::Xor => a ^ b,
            BinaryOp::Shl => a.wrapping_shl($shamt),
            BinaryOp::Shr => a.wrapping_shr($shamt),
            BinaryOp::ShrLogical => (a as $ut).wrapping_shr($shamt) as $t,
            BinaryOp::Min => a.min(b),
            BinaryOp::Max => a.max(b),
            BinaryOp::Lt => return Ok(Value::bool(a < b)),
            BinaryOp::Le => return Ok(Value::bool(a <= b)),
            BinaryOp::Gt => return Ok(Value::bool(a > b)),
            BinaryOp::Ge => return Ok(Value::bool(a >= b)),
            BinaryOp::Eq => return Ok(Value::bool(a == b)),
            BinaryOp::Ne => return Ok(Value::bool(a != b)),
        };
        Ok($ctor(v))
    }};
}

macro_rules! float_binary {
    ($op:expr, $a:expr, $b:expr, $ty:expr, $ctor:path) => {{
        let (a, b) = ($a, $b);
        match $op {
            BinaryOp::Add => Ok($ctor(a + b)),
            BinaryOp::Sub => Ok($ctor(a - b)),
            BinaryOp::Mul => Ok($ctor(a * b)),
            BinaryOp::Div => Ok($ctor(a / b)),
            BinaryOp::Min => Ok($ctor(a.min(b))),
            BinaryOp::Max => Ok($ctor(a.max(b))),
            BinaryOp::Lt => Ok(Value::bool(a < b)),
            BinaryOp::Le => Ok(Value::bool(a <= b)),
            BinaryOp::Gt => Ok(Value::bool(a > b)),
            BinaryOp::Ge => Ok(Value::bool(a >= b)),
            BinaryOp::Eq => Ok(Value::bool(a == b)),
            BinaryOp::Ne => Ok(Value::bool(a != b)),
            op => Err(SemanticsError::UnsupportedOperation {
                op: op.token(),
                ty: $ty,
            }),
        }
    }};
}

fn binary(op: BinaryOp, a: Value, b: Value) -> Result<Value, SemanticsError> {
    let ty = a.ty();
    if op.is_shift() {
        if !b.ty().is_integer() {
            return Err(SemanticsError::TypeMismatch {
                expected: DataType::Int,
                found: b.ty(),
            });
        }
    } else if ty != b.ty() {
        return Err(SemanticsError::TypeMismatch {
            expected: ty,
            found: b.ty(),
        });
    }

    let shamt = b.as_u32();
    match ty {
        DataType::Int => integer_binary!(op, a.as_i32(), b.as_i32(), shamt, i32, u32, i64, Value::int),
        DataType::UInt => integer_binary!(op, a.as_u32(), b.as_u32(), shamt, u32, u32, u64, Value::uint),
        DataType::Long => integer_binary!(op, a.as_i64(), b.as_i64(), shamt, i64, u64, i128, Value::long),
        DataType::ULong => integer_binary!(op, a.as_u64(), b.as_u64(), shamt, u64, u64, u128, Value::ulong),
        DataType::Float => float_binary!(op, a.as_f32(), b.as_f32(), ty, Value::float),
        DataType::Double => float_binary!(op, a.as_f64(), b.as_f64(), ty, Value::double),
        DataType::Bool => {
            let (x, y) = (a.as_bool(), b.as_bool());
            match op {
                BinaryOp::And => Ok(Value::bool(x & y)),
                BinaryOp::Or => Ok(Value::bool(x | y)),
                BinaryOp::Xor | BinaryOp::Ne => Ok(Value::bool(x ^ y)),
                BinaryOp::Eq => Ok(Value::bool(x == y)),
                op => Err(SemanticsError::UnsupportedOperation { op: op.token(), ty }),
            }
        }
    }
}

/// Builds a RISC-V `fclass` mask from the category of a float.
const fn class_mask(category: FpCategory, negative: bool, quiet: bool) -> i32 {
    let bit = match (category, negative) {
        (FpCategory::Infinite, true) => 0,
        (FpCategory::Normal, true) => 1,
        (FpCategory::Subnormal, true) => 2,
        (FpCategory::Zero, true) => 3,
        (FpCategory::Zero, false) => 4,
        (FpCategory::Subnormal, false) => 5,
        (FpCategory::Normal, false) => 6,
        (FpCategory::Infinite, false) => 7,
        (FpCategory::Nan, _) => {
            if quiet {
                9
            } else {
                8
            }
        }
    };
    1 << bit
}

fn unary(op: UnaryOp, a: Value) -> Result<Value, SemanticsError> {
    let ty = a.ty();
    let unsupported = || SemanticsError::UnsupportedOperation { op: op.token(), ty };
    match op {
        UnaryOp::Not => match ty {
            DataType::Bool => Ok(Value::bool(!a.as_bool())),
            t if t.is_integer() => Ok(Value::from_raw(!a.raw(), t)),
            _ => Err(unsupported()),
        },
        UnaryOp::Neg => match ty {
            DataType::Int => Ok(Value::int(a.as_i32().wrapping_neg())),
            DataType::UInt => Ok(Value::uint(a.as_u32().wrapping_neg())),
            DataType::Long => Ok(Value::long(a.as_i64().wrapping_neg())),
            DataType::ULong => Ok(Value::ulong(a.as_u64().wrapping_neg())),
            DataType::Float => Ok(Value::float(-a.as_f32())),
            DataType::Double => Ok(Value::double(-a.as_f64())),
            DataType::Bool => Err(unsupported()),
        },
        UnaryOp::Sqrt => match ty {
            DataType::Float => Ok(Value::float(a.as_f32().sqrt())),
            DataType::Double => Ok(Value::double(a.as_f64().sqrt())),
            _ => Err(unsupported()),
        },
        UnaryOp::Bits => match ty {
            DataType::Float => Ok(Value::int(a.as_f32().to_bits() as i32)),
            DataType::Double => Ok(Value::long(a.as_f64().to_bits() as i64)),
            t if t.is_integer() => Ok(a),
            _ => Err(unsupported()),
        },
        UnaryOp::ToFloat => match ty {
            DataType::Int => Ok(Value::float(a.as_i32() as f32)),
            DataType::UInt => Ok(Value::float(a.as_u32() as f32)),
            DataType::Long => Ok(Value::double(a.as_i64() as f64)),
            DataType::ULong => Ok(Value::double(a.as_u64() as f64)),
            DataType::Float | DataType::Double => Ok(a),
            DataType::Bool => Err(unsupported()),
        },
        UnaryOp::ToInt => match ty {
            DataType::Float => Ok(Value::int(a.as_f32() as i32)),
            DataType::Double => Ok(Value::long(a.as_f64() as i64)),
            t if t.is_integer() => Ok(a),
            _ => Err(unsupported()),
        },
        UnaryOp::FClass => match ty {
            DataType::Float => {
                let f = a.as_f32();
                let quiet = f.to_bits() & (1 << 22) != 0;
                Ok(Value::int(class_mask(f.classify(), f.is_sign_negative(), quiet)))
            }
            DataType::Double => {
                let f = a.as_f64();
                let quiet = f.to_bits() & (1 << 51) != 0;
                Ok(Value::int(class_mask(f.classify(), f.is_sign_negative(), quiet)))
            }
            _ => Err(unsupported()),
        },
    }
}
