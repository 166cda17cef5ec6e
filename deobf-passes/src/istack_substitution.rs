use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{BlockId, Instruction, Operand, RegisterDescriptor, RegisterKind, Routine};

/// The single canonical register every architectural stack pointer operand
/// gets rewritten onto (§4.7). Downstream passes (`StackPropagation`,
/// `StackPinning`) key their bookkeeping on register identity; folding
/// every architecture's own stack pointer encoding onto one descriptor
/// lets those passes work the same way regardless of which
/// `ArchitectureIdentifier` the routine was lifted under.
pub const CANONICAL_STACK_REGISTER: RegisterDescriptor = RegisterDescriptor { kind: RegisterKind::Stack, id: 0, bitcount: 64 };

/// Replaces every `RegisterKind::StackPointer` operand with
/// [`CANONICAL_STACK_REGISTER`], preserving each operand's own access and
/// bit width (§4.7). Always a 1:1 instruction replacement, so this never
/// changes instruction count — only ever descriptor-identity-preserving
/// operand substitution.
pub struct IStackRefSubstitution;

impl Pass for IStackRefSubstitution {
    fn name(&self) -> &'static str {
        "istack-ref-substitution"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Parallel
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

            let mut changed = false;
            let operands: Vec<Operand> = instr
                .operands()
                .iter()
                .map(|op| match op {
                    Operand::Register { descriptor, access, size } if descriptor.kind == RegisterKind::StackPointer => {
                        changed = true;
                        Operand::register(RegisterDescriptor { kind: RegisterKind::Stack, id: 0, bitcount: descriptor.bitcount }, *access, *size)
                    }
                    other => *other,
                })
                .collect();

            if changed {
                if let Ok(replacement) = Instruction::new(instr.descriptor(), operands, instr.access_size()) {
                    routine.replace_instruction(vip, index, replacement).unwrap();
                    applied += 1;
                }
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_ir::{catalogue, ArchitectureIdentifier, Access, Vip};

    fn stack_pointer() -> RegisterDescriptor {
        RegisterDescriptor::new(RegisterKind::StackPointer, 4, 64)
    }

    #[test]
    fn a_stack_pointer_operand_is_rewritten_to_the_canonical_register() {
        let mut r = Routine::new(ArchitectureIdentifier::Amd64);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(vip, Instruction::new(&catalogue::PUSH, [Operand::register(stack_pointer(), Access::Read, 64)], 64).unwrap())
            .unwrap();

        let applied = IStackRefSubstitution.run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 1);
        let instr = r.block(vip).unwrap().instructions()[0].clone();
        let (descriptor, _) = instr.operand(0).and_then(Operand::as_register).unwrap();
        assert_eq!(descriptor.kind, RegisterKind::Stack);
        assert_eq!(descriptor.bitcount, 64);
    }

    #[test]
    fn a_general_purpose_register_is_untouched() {
        let mut r = Routine::new(ArchitectureIdentifier::Amd64);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(&catalogue::PUSH, [Operand::register(RegisterDescriptor::new(RegisterKind::GeneralPurpose, 0, 64), Access::Read, 64)], 64).unwrap(),
        )
        .unwrap();

        let applied = IStackRefSubstitution.run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 0);
    }
}
