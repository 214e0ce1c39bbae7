//! Value types, literals and operators of the IR.

use std::fmt;

use strum::Display;

/// The value type of a local slot or expression result.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum ValType {
    /// 32-bit integer.
    I32,
    /// 64-bit integer.
    I64,
    /// 32-bit IEEE 754 float.
    F32,
    /// 64-bit IEEE 754 float.
    F64,
}

/// A constant value.
///
/// Float payloads are stored as raw bits so that literals stay `Eq + Hash` and can
/// key analysis maps; use the typed constructors and accessors for the natural
/// representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Literal {
    /// 32-bit integer constant.
    I32(i32),
    /// 64-bit integer constant.
    I64(i64),
    /// 32-bit float constant, as raw bits.
    F32(u32),
    /// 64-bit float constant, as raw bits.
    F64(u64),
}

impl Literal {
    /// Creates a 32-bit float literal from its natural representation.
    #[must_use]
    pub fn f32(value: f32) -> Self {
        Literal::F32(value.to_bits())
    }

    /// Creates a 64-bit float literal from its natural representation.
    #[must_use]
    pub fn f64(value: f64) -> Self {
        Literal::F64(value.to_bits())
    }

    /// Returns the value type this literal carries.
    #[must_use]
    pub const fn ty(&self) -> ValType {
        match self {
            Literal::I32(_) => ValType::I32,
            Literal::I64(_) => ValType::I64,
            Literal::F32(_) => ValType::F32,
            Literal::F64(_) => ValType::F64,
        }
    }

    /// Returns the contained 32-bit integer, if this is an [`Literal::I32`].
    #[must_use]
    pub const fn as_i32(&self) -> Option<i32> {
        match self {
            Literal::I32(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the contained 64-bit integer, if this is an [`Literal::I64`].
    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Literal::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the contained 32-bit float, if this is an [`Literal::F32`].
    #[must_use]
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Literal::F32(bits) => Some(f32::from_bits(*bits)),
            _ => None,
        }
    }

    /// Returns the contained 64-bit float, if this is an [`Literal::F64`].
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Literal::F64(bits) => Some(f64::from_bits(*bits)),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::I32(v) => write!(f, "{}.const {v}", ValType::I32),
            Literal::I64(v) => write!(f, "{}.const {v}", ValType::I64),
            Literal::F32(bits) => write!(f, "{}.const {}", ValType::F32, f32::from_bits(*bits)),
            Literal::F64(bits) => write!(f, "{}.const {}", ValType::F64, f64::from_bits(*bits)),
        }
    }
}

/// A two-operand arithmetic, bitwise or comparison operator.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Signed division.
    DivS,
    /// Bitwise AND.
    And,
    /// Bitwise OR.
    Or,
    /// Bitwise XOR.
    Xor,
    /// Left shift.
    Shl,
    /// Equality comparison.
    Eq,
    /// Inequality comparison.
    Ne,
    /// Signed less-than comparison.
    LtS,
    /// Signed greater-than comparison.
    GtS,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valtype_display() {
        assert_eq!(ValType::I32.to_string(), "i32");
        assert_eq!(ValType::F64.to_string(), "f64");
    }

    #[test]
    fn test_literal_types() {
        assert_eq!(Literal::I32(5).ty(), ValType::I32);
        assert_eq!(Literal::f64(0.5).ty(), ValType::F64);
    }

    #[test]
    fn test_literal_accessors() {
        assert_eq!(Literal::I32(-3).as_i32(), Some(-3));
        assert_eq!(Literal::I32(-3).as_i64(), None);
        assert_eq!(Literal::f32(1.5).as_f32(), Some(1.5));
        assert_eq!(Literal::f64(2.25).as_f64(), Some(2.25));
    }

    #[test]
    fn test_literal_float_bits_are_hashable_identity() {
        // Same bit pattern compares equal even through the bits constructor.
        assert_eq!(Literal::f32(1.5), Literal::F32(1.5_f32.to_bits()));
        assert_ne!(Literal::f32(1.5), Literal::f32(-1.5));
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::I32(42).to_string(), "i32.const 42");
        assert_eq!(Literal::f64(0.5).to_string(), "f64.const 0.5");
    }

    #[test]
    fn test_binary_op_display() {
        assert_eq!(BinaryOp::Add.to_string(), "add");
        assert_eq!(BinaryOp::DivS.to_string(), "divs");
    }
}
