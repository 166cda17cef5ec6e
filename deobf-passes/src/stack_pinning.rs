use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_bitvec::BvInt;
use deobf_ir::{catalogue, BlockId, Instruction, Operand, Routine};

/// Tracks the running displacement a block's `push`/`pop` sequence has
/// imposed on the stack pointer and folds it into later `load`/`store`
/// offsets that use the stack pointer as their base, rebasing them back
/// onto the pointer's value at block entry (§4.7). Any branch, volatile
/// instruction, or direct write to the stack pointer invalidates tracking
/// for the rest of the block — there is nothing left to safely fold past
/// that point.
///
/// Grounded on `cranelift-codegen`'s frame-layout `StackSlot` offset
/// bookkeeping, simplified to a single running delta since this IR has no
/// frame-layout pass of its own.
pub struct StackPinning;

impl Pass for StackPinning {
    fn name(&self) -> &'static str {
        "stack-pinning"
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

        let mut delta: i128 = 0;
        let mut tracked = true;
        let mut applied = 0u32;

        for index in 0..len {
            let instr = match routine.block(vip).and_then(|b| b.instructions().get(index)) {
                Some(i) => i.clone(),
                None => continue,
            };

            if instr.is_volatile() || instr.is_branch() {
                tracked = false;
                delta = 0;
                continue;
            }

            let writes_sp_directly = instr.operands().iter().any(|op| match op {
                Operand::Register { descriptor, access, .. } => access.writes() && routine.is_stack_pointer(*descriptor),
                _ => false,
            });
            if writes_sp_directly && instr.descriptor() != &catalogue::PUSH && instr.descriptor() != &catalogue::POP {
                tracked = false;
                delta = 0;
                continue;
            }

            if instr.descriptor() == &catalogue::PUSH {
                let bytes = instr.operand(0).map(Operand::size).unwrap_or(instr.access_size()) as i128 / 8;
                delta -= bytes;
                continue;
            }
            if instr.descriptor() == &catalogue::POP {
                let bytes = instr.operand(0).map(Operand::size).unwrap_or(instr.access_size()) as i128 / 8;
                delta += bytes;
                continue;
            }

            if !tracked || delta == 0 {
                continue;
            }

            let (base_index, offset_index) = if instr.descriptor() == &catalogue::LOAD {
                (1, 2)
            } else if instr.descriptor() == &catalogue::STORE {
                (0, 1)
            } else {
                continue;
            };

            let base_is_sp = instr
                .operand(base_index)
                .and_then(Operand::as_register)
                .map(|(descriptor, _)| routine.is_stack_pointer(descriptor))
                .unwrap_or(false);
            if !base_is_sp {
                continue;
            }
            let offset = match instr.operand(offset_index).and_then(Operand::as_immediate) {
                Some(o) => o,
                None => continue,
            };

            let mut operands = instr.operands().to_vec();
            operands[offset_index] = Operand::immediate(BvInt::new(offset.as_signed() + delta, offset.width()));
            if let Ok(replacement) = Instruction::new(instr.descriptor(), operands, instr.access_size()) {
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
    use deobf_ir::{ArchitectureIdentifier, Access, RegisterDescriptor, RegisterKind, Vip};

    fn sp() -> RegisterDescriptor {
        RegisterDescriptor::new(RegisterKind::StackPointer, 0, 64)
    }

    fn gpr(id: u32) -> RegisterDescriptor {
        RegisterDescriptor::new(RegisterKind::GeneralPurpose, id, 64)
    }

    #[test]
    fn a_store_after_a_push_is_rebased_by_the_push_width() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(vip, Instruction::new(&catalogue::PUSH, [Operand::register(gpr(0), Access::Read, 64)], 64).unwrap())
            .unwrap();
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::STORE,
                [
                    Operand::register(sp(), Access::Read, 64),
                    Operand::immediate(BvInt::new(8, 64)),
                    Operand::immediate(BvInt::new(1, 64)),
                ],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        let applied = StackPinning.run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 1);
        let store = r.block(vip).unwrap().instructions()[1].clone();
        assert_eq!(store.operand(1).and_then(Operand::as_immediate), Some(BvInt::new(0, 64)));
    }

    #[test]
    fn a_call_stops_tracking_for_the_rest_of_the_block() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(vip, Instruction::new(&catalogue::PUSH, [Operand::register(gpr(0), Access::Read, 64)], 64).unwrap())
            .unwrap();
        r.add_instruction(vip, Instruction::new(&catalogue::CALL, [Operand::immediate(BvInt::new(0, 64))], 64).unwrap())
            .unwrap();
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::STORE,
                [
                    Operand::register(sp(), Access::Read, 64),
                    Operand::immediate(BvInt::new(8, 64)),
                    Operand::immediate(BvInt::new(1, 64)),
                ],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        let applied = StackPinning.run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 0);
    }
}
