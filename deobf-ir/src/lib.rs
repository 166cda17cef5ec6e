//! Instruction-level IR (§3): registers, operands, instructions, basic
//! blocks and the routine that owns them, plus the CFG construction API
//! (§6.1) a lifter drives to build one.
//!
//! `deobf-ir` depends on `deobf-bitvec` and `deobf-expr` but not the other
//! way around: expressions describe *values*, this crate describes
//! *instructions that produce and consume them*. `deobf-passes` sits above
//! both and is the first crate where the two meet (lowering an
//! `Instruction` to the `Expr` it computes).

mod arch;
mod block;
pub mod catalogue;
mod descriptor;
mod error;
mod instruction;
mod operand;
mod register;
mod routine;
mod vip;

pub use arch::{ArchitectureIdentifier, CallConvention};
pub use block::{BasicBlock, BlockId};
pub use descriptor::{InstructionDescriptor, OperandKind};
pub use error::IrError;
pub use instruction::Instruction;
pub use operand::{Access, Operand};
pub use register::{RegId, RegisterDescriptor, RegisterKind};
pub use routine::Routine;
pub use vip::Vip;
