use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{catalogue, BlockId, Instruction, Operand, RegisterDescriptor, Routine};
use smallvec::SmallVec;
use std::collections::HashMap;

/// Replaces reads of a register with the value last assigned into it,
/// within a single block (§4.7). A register's binding is invalidated the
/// moment anything writes to it, or writes to a register some other
/// binding's recorded value still refers to.
///
/// Grounded on `cranelift-codegen`'s `simple_preopt`/alias-resolution
/// pattern of a forward scan carrying a small substitution map — adapted
/// here to registers rather than SSA value aliases.
pub struct MovPropagation;

impl Pass for MovPropagation {
    fn name(&self) -> &'static str {
        "mov-propagation"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Serial
    }

    fn run(&self, routine: &mut Routine, block: BlockId, _cross_block: bool) -> u32 {
        let vip = match routine.block_by_id(block) {
            Some(b) => b.vip(),
            None => return 0,
        };

        let mut bindings: HashMap<RegisterDescriptor, Operand> = HashMap::new();
        let mut applied = 0u32;
        let len = routine.block(vip).map(|b| b.instructions().len()).unwrap_or(0);

        for index in 0..len {
            let instr = match routine.block(vip).and_then(|b| b.instructions().get(index)) {
                Some(i) => i.clone(),
                None => continue,
            };

            let mut operands: SmallVec<[Operand; 3]> = SmallVec::new();
            let mut changed = false;
            for operand in instr.operands() {
                if let Operand::Register { descriptor, access, .. } = operand {
                    if access.reads() && !access.writes() {
                        if let Some(bound) = bindings.get(descriptor) {
                            operands.push(*bound);
                            changed = true;
                            continue;
                        }
                    }
                }
                operands.push(*operand);
            }

            // `mov reg, reg` whose source got propagated down to an
            // immediate needs the sibling descriptor: the slot is declared
            // strictly `Register`.
            let mut descriptor = instr.descriptor();
            if descriptor == &catalogue::MOV_REG_REG {
                if let Some(Operand::Immediate(_)) = operands.get(1) {
                    descriptor = &catalogue::MOV_REG_IMM;
                }
            }

            let final_operands: SmallVec<[Operand; 3]> = if changed {
                match Instruction::new(descriptor, operands.clone(), instr.access_size()) {
                    Ok(replacement) => {
                        routine.replace_instruction(vip, index, replacement).unwrap();
                        applied += 1;
                        operands
                    }
                    Err(_) => SmallVec::from_slice(instr.operands()),
                }
            } else {
                SmallVec::from_slice(instr.operands())
            };

            // Anything this instruction writes invalidates its own binding
            // and any binding whose recorded value is that same register.
            for operand in instr.operands() {
                if let Operand::Register { descriptor: written, access, .. } = operand {
                    if access.writes() {
                        bindings.remove(written);
                        bindings.retain(|_, v| !matches!(v, Operand::Register { descriptor: d, .. } if d == written));
                    }
                }
            }

            if instr.descriptor() == &catalogue::MOV_REG_REG || instr.descriptor() == &catalogue::MOV_REG_IMM {
                if let Some((dst, access)) = final_operands.first().and_then(Operand::as_register) {
                    if access.writes() {
                        if let Some(src) = final_operands.get(1) {
                            bindings.insert(dst, *src);
                        }
                    }
                }
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_bitvec::BvInt;
    use deobf_ir::{ArchitectureIdentifier, Access, RegisterKind, Vip};

    fn gpr(id: u32) -> RegisterDescriptor {
        RegisterDescriptor::new(RegisterKind::GeneralPurpose, id, 64)
    }

    #[test]
    fn chained_reg_reg_movs_collapse_to_the_original_immediate() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::MOV_REG_IMM,
                [Operand::register(gpr(1), Access::Write, 64), Operand::immediate(BvInt::new(42, 64))],
                64,
            )
            .unwrap(),
        )
        .unwrap();
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::MOV_REG_REG,
                [Operand::register(gpr(2), Access::Write, 64), Operand::register(gpr(1), Access::Read, 64)],
                64,
            )
            .unwrap(),
        )
        .unwrap();
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::MOV_REG_REG,
                [Operand::register(gpr(3), Access::Write, 64), Operand::register(gpr(2), Access::Read, 64)],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        let applied = MovPropagation.run(&mut r, r.block_id(vip).unwrap(), false);
        assert!(applied >= 2);

        let block = r.block(vip).unwrap();
        let last = block.instructions().last().unwrap();
        assert_eq!(last.descriptor(), &catalogue::MOV_REG_IMM);
        assert_eq!(last.operand(1).and_then(Operand::as_immediate), Some(BvInt::new(42, 64)));
    }

    #[test]
    fn intervening_write_breaks_the_binding() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::MOV_REG_IMM,
                [Operand::register(gpr(1), Access::Write, 64), Operand::immediate(BvInt::new(7, 64))],
                64,
            )
            .unwrap(),
        )
        .unwrap();
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::MOV_REG_IMM,
                [Operand::register(gpr(1), Access::Write, 64), Operand::immediate(BvInt::new(9, 64))],
                64,
            )
            .unwrap(),
        )
        .unwrap();
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::MOV_REG_REG,
                [Operand::register(gpr(2), Access::Write, 64), Operand::register(gpr(1), Access::Read, 64)],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        MovPropagation.run(&mut r, r.block_id(vip).unwrap(), false);
        let block = r.block(vip).unwrap();
        let last = block.instructions().last().unwrap();
        assert_eq!(last.operand(1).and_then(Operand::as_immediate), Some(BvInt::new(9, 64)));
    }
}
