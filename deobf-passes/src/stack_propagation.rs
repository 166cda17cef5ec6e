use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{catalogue, BlockId, Instruction, Operand, RegisterDescriptor, Routine};
use std::collections::HashMap;

/// Propagates the value last stored at a `(base register, offset)` stack
/// slot into a later load from the same slot, within a single block
/// (§4.7). Any volatile instruction (a call, by this IR's only volatile
/// descriptors) invalidates every tracked slot outright: nothing is known
/// about what it might have written through an alias this pass can't see.
///
/// Grounded on `cranelift-codegen`'s `alias_analysis.rs`, which keys
/// redundant-load elimination on an abstract memory location rather than
/// SSA identity; here the location is simply `(base register, offset)`
/// since this IR has no separate memory-SSA layer.
pub struct StackPropagation;

impl Pass for StackPropagation {
    fn name(&self) -> &'static str {
        "stack-propagation"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Serial
    }

    fn run(&self, routine: &mut Routine, block: BlockId, _cross_block: bool) -> u32 {
        let vip = match routine.block_by_id(block) {
            Some(b) => b.vip(),
            None => return 0,
        };

        let mut slots: HashMap<(RegisterDescriptor, i128), Operand> = HashMap::new();
        let mut applied = 0u32;
        let len = routine.block(vip).map(|b| b.instructions().len()).unwrap_or(0);

        for index in 0..len {
            let instr = match routine.block(vip).and_then(|b| b.instructions().get(index)) {
                Some(i) => i.clone(),
                None => continue,
            };

            if instr.is_volatile() {
                slots.clear();
                continue;
            }

            if instr.descriptor() == &catalogue::STORE {
                if let (Some((base, _)), Some(offset), Some(value)) = (
                    instr.operand(0).and_then(Operand::as_register),
                    instr.operand(1).and_then(Operand::as_immediate),
                    instr.operand(2),
                ) {
                    slots.insert((base, offset.as_signed()), *value);
                }
                continue;
            }

            if instr.descriptor() == &catalogue::LOAD {
                let dest = instr.operand(0).and_then(Operand::as_register);
                let base = instr.operand(1).and_then(Operand::as_register);
                let offset = instr.operand(2).and_then(Operand::as_immediate);
                if let (Some((dest, dest_access)), Some((base, _)), Some(offset)) = (dest, base, offset) {
                    if let Some(value) = slots.get(&(base, offset.as_signed())).copied() {
                        let descriptor = if value.is_immediate() { &catalogue::MOV_REG_IMM } else { &catalogue::MOV_REG_REG };
                        let replacement = Instruction::new(
                            descriptor,
                            [Operand::register(dest, dest_access, dest.bitcount), value],
                            instr.access_size(),
                        );
                        if let Ok(replacement) = replacement {
                            routine.replace_instruction(vip, index, replacement).unwrap();
                            applied += 1;
                        }
                    }
                }
            }
        }
        applied
    }
}
