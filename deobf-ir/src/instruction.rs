use crate::descriptor::InstructionDescriptor;
use crate::error::IrError;
use crate::operand::Operand;
use deobf_bitvec::BitCount;
use smallvec::SmallVec;

const MAX_ACCESS_SIZE: BitCount = 512;

/// A concrete instruction: a reference to its static descriptor plus the
/// operands for this particular occurrence (§3).
///
/// `operands` is a `SmallVec` rather than a `Vec`: almost every real
/// instruction has 0-3 operands, so inlining avoids an allocation per
/// instruction in routines with thousands of them.
#[derive(Debug, Clone)]
pub struct Instruction {
    descriptor: &'static InstructionDescriptor,
    operands: SmallVec<[Operand; 3]>,
    access_size: BitCount,
}

impl Instruction {
    /// Build an instruction, validating it against its descriptor per §3's
    /// invariants: operand count/kind match, the memory operand (if any) is
    /// `(register, immediate)`, and the access size is in `(0, 512]`.
    pub fn new(
        descriptor: &'static InstructionDescriptor,
        operands: impl Into<SmallVec<[Operand; 3]>>,
        access_size: BitCount,
    ) -> Result<Self, IrError> {
        let operands = operands.into();
        if operands.len() != descriptor.operand_count() {
            return Err(IrError::OperandCountMismatch {
                descriptor: descriptor.name,
                expected: descriptor.operand_count(),
                got: operands.len(),
            });
        }
        for (index, (kind, operand)) in descriptor.operand_kinds.iter().zip(operands.iter()).enumerate() {
            if !kind.accepts(operand.is_register()) {
                return Err(IrError::OperandKindMismatch {
                    descriptor: descriptor.name,
                    index,
                });
            }
        }
        if let Some(mem_index) = descriptor.memory_operand_index {
            let base_ok = operands.get(mem_index).is_some_and(Operand::is_register);
            let offset_ok = operands.get(mem_index + 1).is_some_and(Operand::is_immediate);
            if !base_ok || !offset_ok {
                return Err(IrError::MalformedMemoryOperand {
                    descriptor: descriptor.name,
                });
            }
        }
        if access_size == 0 || access_size > MAX_ACCESS_SIZE {
            return Err(IrError::InvalidAccessSize(access_size));
        }
        Ok(Instruction {
            descriptor,
            operands,
            access_size,
        })
    }

    pub fn descriptor(&self) -> &'static InstructionDescriptor {
        self.descriptor
    }

    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    pub fn operand(&self, index: usize) -> Option<&Operand> {
        self.operands.get(index)
    }

    pub fn access_size(&self) -> BitCount {
        self.access_size
    }

    pub fn is_volatile(&self) -> bool {
        self.descriptor.volatile
    }

    pub fn is_branch(&self) -> bool {
        self.descriptor.is_branch()
    }

    pub fn writes_memory(&self) -> bool {
        self.descriptor.has_memory_operand() && self.descriptor.memory_access == Some(crate::operand::Access::Write)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalogue;
    use crate::operand::Access;
    use crate::register::{RegisterDescriptor, RegisterKind};
    use deobf_bitvec::BvInt;

    fn gpr(id: u32) -> RegisterDescriptor {
        RegisterDescriptor::new(RegisterKind::GeneralPurpose, id, 64)
    }

    #[test]
    fn mov_reg_imm_round_trips() {
        let instr = Instruction::new(
            &catalogue::MOV_REG_IMM,
            [
                Operand::register(gpr(0), Access::Write, 64),
                Operand::immediate(BvInt::new(42, 64)),
            ],
            64,
        )
        .unwrap();
        assert_eq!(instr.operands().len(), 2);
        assert_eq!(instr.access_size(), 64);
    }

    #[test]
    fn wrong_operand_count_is_rejected() {
        let err = Instruction::new(&catalogue::MOV_REG_IMM, [Operand::register(gpr(0), Access::Write, 64)], 64)
            .unwrap_err();
        assert!(matches!(err, IrError::OperandCountMismatch { .. }));
    }

    #[test]
    fn wrong_operand_kind_is_rejected() {
        let err = Instruction::new(
            &catalogue::MOV_REG_IMM,
            [
                Operand::register(gpr(0), Access::Write, 64),
                Operand::register(gpr(1), Access::Read, 64),
            ],
            64,
        )
        .unwrap_err();
        assert!(matches!(err, IrError::OperandKindMismatch { .. }));
    }

    #[test]
    fn access_size_bounds_are_enforced() {
        let err = Instruction::new(
            &catalogue::MOV_REG_IMM,
            [
                Operand::register(gpr(0), Access::Write, 64),
                Operand::immediate(BvInt::new(1, 64)),
            ],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, IrError::InvalidAccessSize(0)));

        let err = Instruction::new(
            &catalogue::MOV_REG_IMM,
            [
                Operand::register(gpr(0), Access::Write, 64),
                Operand::immediate(BvInt::new(1, 64)),
            ],
            1024,
        )
        .unwrap_err();
        assert!(matches!(err, IrError::InvalidAccessSize(1024)));
    }

    #[test]
    fn load_requires_register_then_immediate_at_memory_index() {
        let err = Instruction::new(
            &catalogue::LOAD,
            [
                Operand::register(gpr(0), Access::Write, 64),
                Operand::immediate(BvInt::new(0, 64)),
                Operand::immediate(BvInt::new(8, 64)),
            ],
            64,
        )
        .unwrap_err();
        assert!(matches!(err, IrError::MalformedMemoryOperand { .. }));
    }
}
