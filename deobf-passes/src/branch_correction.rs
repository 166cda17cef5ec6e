use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{catalogue, BlockId, Instruction, Operand, Routine};

/// Collapses a conditional jump whose condition has simplified down to a
/// constant into an unconditional jump or a no-op (§4.7).
///
/// This deliberately leaves the CFG's successor edges untouched even when
/// the collapse makes one of them unreachable: validation treats an
/// unreachable block as a warning, not an error, and `DeadCodeElimination`/
/// `BasicBlockThunkRemoval` are what actually prune dead structure, not
/// this pass.
pub struct BranchCorrection;

impl Pass for BranchCorrection {
    fn name(&self) -> &'static str {
        "branch-correction"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Serial
    }

    fn run(&self, routine: &mut Routine, block: BlockId, _cross_block: bool) -> u32 {
        let vip = match routine.block_by_id(block) {
            Some(b) => b.vip(),
            None => return 0,
        };
        let len = routine.block(vip).map(|b| b.instructions().len()).unwrap_or(0);
        let mut applied = 0u32;

        for index in 0..len {
            let instr = match routine.block(vip).and_then(|b| b.instructions().get(index)) {
                Some(i) => i.clone(),
                None => continue,
            };
            if instr.descriptor() != &catalogue::JCC {
                continue;
            }
            let condition = match instr.operand(0).and_then(Operand::as_immediate) {
                Some(c) => c,
                None => continue,
            };
            let target = *instr.operand(1).unwrap();

            let replacement = if condition.is_zero() {
                Instruction::new(&catalogue::NOP, [], instr.access_size())
            } else {
                Instruction::new(&catalogue::JMP, [target], instr.access_size())
            };
            if let Ok(replacement) = replacement {
                routine.replace_instruction(vip, index, replacement).unwrap();
                applied += 1;
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_bitvec::BvInt;
    use deobf_ir::{ArchitectureIdentifier, Vip};

    #[test]
    fn a_false_condition_becomes_a_nop() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(&catalogue::JCC, [Operand::immediate(BvInt::zero(8)), Operand::immediate(BvInt::new(0x10, 64))], 64).unwrap(),
        )
        .unwrap();

        let applied = BranchCorrection.run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 1);
        assert_eq!(r.block(vip).unwrap().instructions()[0].descriptor(), &catalogue::NOP);
    }

    #[test]
    fn a_true_condition_becomes_an_unconditional_jump() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(&catalogue::JCC, [Operand::immediate(BvInt::new(1, 8)), Operand::immediate(BvInt::new(0x10, 64))], 64).unwrap(),
        )
        .unwrap();

        let applied = BranchCorrection.run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 1);
        let instr = r.block(vip).unwrap().instructions()[0].clone();
        assert_eq!(instr.descriptor(), &catalogue::JMP);
        assert_eq!(instr.operand(0).and_then(Operand::as_immediate), Some(BvInt::new(0x10, 64)));
    }

    #[test]
    fn a_register_condition_is_left_alone() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::JCC,
                [
                    Operand::register(deobf_ir::RegisterDescriptor::new(deobf_ir::RegisterKind::GeneralPurpose, 0, 8), deobf_ir::Access::Read, 8),
                    Operand::immediate(BvInt::new(0x10, 64)),
                ],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        let applied = BranchCorrection.run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 0);
    }
}
