//! Typed values flowing through the pipeline.
//!
//! Registers and memory hold raw 64-bit patterns. A [`Value`] pairs such a
//! pattern with the [`DataType`] it is interpreted as, so the same register
//! contents can be read as an integer by one instruction and as a float by
//! another without any arithmetic conversion.
//!
//! Storage conventions for the raw pattern:
//! 1. **32-bit signed (`Int`):** sign-extended to 64 bits.
//! 2. **32-bit unsigned (`UInt`):** zero-extended to 64 bits.
//! 3. **`Float`:** IEEE-754 single bits in the low half, upper half zero.
//! 4. **`Bool`:** `0` or `1`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Data types understood by the instruction semantics language.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DataType {
    /// 32-bit two's-complement integer.
    #[default]
    Int,
    /// 32-bit unsigned integer.
    UInt,
    /// 64-bit two's-complement integer.
    Long,
    /// 64-bit unsigned integer.
    ULong,
    /// IEEE-754 binary32.
    Float,
    /// IEEE-754 binary64.
    Double,
    /// Boolean produced by comparisons.
    Bool,
}

impl DataType {
    /// Returns true for the two floating-point types.
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float | Self::Double)
    }

    /// Returns true for the four integer types.
    pub const fn is_integer(self) -> bool {
        matches!(self, Self::Int | Self::UInt | Self::Long | Self::ULong)
    }

    /// Returns true for types whose narrow loads are sign-extended.
    pub const fn is_signed(self) -> bool {
        matches!(self, Self::Int | Self::Long)
    }

    /// Width of the type in bits (`Bool` counts as 1).
    pub const fn bits(self) -> u32 {
        match self {
            Self::Int | Self::UInt | Self::Float => 32,
            Self::Long | Self::ULong | Self::Double => 64,
            Self::Bool => 1,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Int => "int",
            Self::UInt => "uint",
            Self::Long => "long",
            Self::ULong => "ulong",
            Self::Float => "float",
            Self::Double => "double",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A raw bit pattern tagged with the type it is read as.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Value {
    bits: u64,
    ty: DataType,
}

impl Value {
    /// Creates a 32-bit signed integer value.
    pub const fn int(v: i32) -> Self {
        Self {
            bits: v as i64 as u64,
            ty: DataType::Int,
        }
    }

    /// Creates a 32-bit unsigned integer value.
    pub const fn uint(v: u32) -> Self {
        Self {
            bits: v as u64,
            ty: DataType::UInt,
        }
    }

    /// Creates a 64-bit signed integer value.
    pub const fn long(v: i64) -> Self {
        Self {
            bits: v as u64,
            ty: DataType::Long,
        }
    }

    /// Creates a 64-bit unsigned integer value.
    pub const fn ulong(v: u64) -> Self {
        Self {
            bits: v,
            ty: DataType::ULong,
        }
    }

    /// Creates a single-precision float value.
    pub const fn float(v: f32) -> Self {
        Self {
            bits: v.to_bits() as u64,
            ty: DataType::Float,
        }
    }

    /// Creates a double-precision float value.
    pub const fn double(v: f64) -> Self {
        Self {
            bits: v.to_bits(),
            ty: DataType::Double,
        }
    }

    /// Creates a boolean value.
    pub const fn bool(v: bool) -> Self {
        Self {
            bits: v as u64,
            ty: DataType::Bool,
        }
    }

    /// The all-zero value of a type.
    pub const fn zero(ty: DataType) -> Self {
        Self { bits: 0, ty }
    }

    /// Reinterprets a raw register or memory pattern as `ty`.
    ///
    /// The bit pattern is preserved; only the width normalisation of the
    /// storage convention is applied.
    pub const fn from_raw(bits: u64, ty: DataType) -> Self {
        let bits = match ty {
            DataType::Int => bits as u32 as i32 as i64 as u64,
            DataType::UInt | DataType::Float => bits & 0xFFFF_FFFF,
            DataType::Long | DataType::ULong | DataType::Double => bits,
            DataType::Bool => (bits != 0) as u64,
        };
        Self { bits, ty }
    }

    /// Builds a value of `ty` from an assembler immediate.
    ///
    /// Integer types wrap to their width, float types convert numerically.
    pub const fn from_immediate(imm: i64, ty: DataType) -> Self {
        match ty {
            DataType::Int => Self::int(imm as i32),
            DataType::UInt => Self::uint(imm as u32),
            DataType::Long => Self::long(imm),
            DataType::ULong => Self::ulong(imm as u64),
            DataType::Float => Self::float(imm as f32),
            DataType::Double => Self::double(imm as f64),
            DataType::Bool => Self::bool(imm != 0),
        }
    }

    /// Raw storage pattern.
    pub const fn raw(self) -> u64 {
        self.bits
    }

    /// Type the pattern is read as.
    pub const fn ty(self) -> DataType {
        self.ty
    }

    /// Low 32 bits as a signed integer.
    pub const fn as_i32(self) -> i32 {
        self.bits as u32 as i32
    }

    /// Low 32 bits as an unsigned integer.
    pub const fn as_u32(self) -> u32 {
        self.bits as u32
    }

    /// Full pattern as a signed integer.
    pub const fn as_i64(self) -> i64 {
        self.bits as i64
    }

    /// Full pattern as an unsigned integer.
    pub const fn as_u64(self) -> u64 {
        self.bits
    }

    /// Low 32 bits as an IEEE-754 single.
    pub const fn as_f32(self) -> f32 {
        f32::from_bits(self.bits as u32)
    }

    /// Full pattern as an IEEE-754 double.
    pub const fn as_f64(self) -> f64 {
        f64::from_bits(self.bits)
    }

    /// Truthiness: any non-zero pattern is true.
    pub const fn as_bool(self) -> bool {
        self.bits != 0
    }

    /// Interprets the value as a byte address.
    ///
    /// 32-bit types are zero-extended so negative `Int` addresses land far
    /// outside any realistic memory image and fault instead of wrapping.
    pub const fn as_address(self) -> u64 {
        match self.ty.bits() {
            32 => self.bits & 0xFFFF_FFFF,
            _ => self.bits,
        }
    }

    /// Converts the value for assignment to a destination of type `ty`.
    ///
    /// Between integer-like types the (sign- or zero-extended) pattern is
    /// re-normalised, so narrowing truncates and `Bool` becomes 0/1. Between
    /// `Float` and `Double` the conversion is numeric. Anything else keeps the
    /// bit pattern.
    pub fn convert_to(self, ty: DataType) -> Self {
        match (self.ty, ty) {
            (from, to) if from == to => self,
            (DataType::Float, DataType::Double) => Self::double(self.as_f32() as f64),
            (DataType::Double, DataType::Float) => Self::float(self.as_f64() as f32),
            _ => Self::from_raw(self.bits, ty),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self, self.ty)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ty {
            DataType::Int => write!(f, "{}", self.as_i32()),
            DataType::UInt => write!(f, "{}", self.as_u32()),
            DataType::Long => write!(f, "{}", self.as_i64()),
            DataType::ULong => write!(f, "{}", self.as_u64()),
            DataType::Float => write!(f, "{}", self.as_f32()),
            DataType::Double => write!(f, "{}", self.as_f64()),
            DataType::Bool => write!(f, "{}", self.as_bool()),
        }
    }
}
