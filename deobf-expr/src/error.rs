use deobf_bitvec::{BitCount, Operator};

/// `InvalidArgument`-class failures raised by the smart constructors at the
/// API boundary (§7). None of these can arise from internal simplifier or
/// matcher logic operating on already-valid expressions; they only fire
/// when a caller (the lifter, or a hand-written test) builds something
/// malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExprError {
    /// A width of 0, or wider than the algebra supports, was requested.
    InvalidWidth(BitCount),
    /// `op`'s declared arity didn't match the number of operands supplied.
    ArityMismatch { op: Operator, expected: u8, got: u8 },
    /// A binary operator whose size rule requires equal operand widths was
    /// given operands of different widths.
    WidthMismatch {
        op: Operator,
        lhs: BitCount,
        rhs: BitCount,
    },
}

impl core::fmt::Display for ExprError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            ExprError::InvalidWidth(w) => write!(f, "invalid bit width {w}"),
            ExprError::ArityMismatch { op, expected, got } => write!(
                f,
                "operator {op:?} expects {expected} operand(s), got {got}"
            ),
            ExprError::WidthMismatch { op, lhs, rhs } => write!(
                f,
                "operator {op:?} requires equal operand widths, got {lhs} and {rhs}"
            ),
        }
    }
}

impl std::error::Error for ExprError {}

impl From<deobf_bitvec::BitvecError> for ExprError {
    fn from(e: deobf_bitvec::BitvecError) -> Self {
        match e {
            deobf_bitvec::BitvecError::InvalidWidth(w) => ExprError::InvalidWidth(w),
            deobf_bitvec::BitvecError::ArityMismatch { op, expected, got } => {
                ExprError::ArityMismatch { op, expected, got }
            }
        }
    }
}
