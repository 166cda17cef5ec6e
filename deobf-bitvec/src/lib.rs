//! Fixed-width bitvector arithmetic and the operator table.
//!
//! This is the bottom of the stack: every other crate in the workspace
//! (expressions, directives, the IR) reads operator semantics from
//! [`Operator::info`] rather than re-deriving them.

mod bvint;
mod operator;

pub use bvint::BvInt;
pub use operator::{Operator, OperatorInfo};

/// Bit width of an expression, operand, or bitvector value.
///
/// Zero is never a valid width for a constructed value; `BitCount` does not
/// enforce that itself (it is just a `u16`) so that width arithmetic doesn't
/// need to thread `Result`s everywhere, but every public constructor in this
/// crate and in `deobf-expr` rejects zero at the boundary.
pub type BitCount = u16;

/// The largest width this crate's `i128`-backed `BvInt` can represent
/// exactly. Instruction access sizes are capped at 512 bits by the IR
/// (`deobf-ir`), but symbolic values arising from folding and simplification
/// in practice never exceed a machine word times a small constant, so a
/// 128-bit backing store is sufficient for the expression algebra itself.
pub const MAX_BITCOUNT: BitCount = 128;

/// Errors raised at the boundary of this crate: malformed widths or
/// mismatched operator arity. Per the core's error taxonomy, operator
/// evaluation that is merely *undefined* (e.g. division by zero) is not an
/// error — `Operator::info(op).eval` returns `None` and the caller keeps the
/// expression symbolic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitvecError {
    /// A width of 0, or a width exceeding [`MAX_BITCOUNT`], was requested.
    InvalidWidth(BitCount),
    /// The number of arguments didn't match the operator's declared arity.
    ArityMismatch { op: Operator, expected: u8, got: u8 },
}

impl core::fmt::Display for BitvecError {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        match self {
            BitvecError::InvalidWidth(w) => write!(f, "invalid bit width {w}"),
            BitvecError::ArityMismatch { op, expected, got } => write!(
                f,
                "operator {op:?} expects {expected} operand(s), got {got}"
            ),
        }
    }
}

impl std::error::Error for BitvecError {}

/// Validate a requested bit width, rejecting 0 and anything past
/// [`MAX_BITCOUNT`].
pub fn check_width(width: BitCount) -> Result<(), BitvecError> {
    if width == 0 || width > MAX_BITCOUNT {
        Err(BitvecError::InvalidWidth(width))
    } else {
        Ok(())
    }
}
