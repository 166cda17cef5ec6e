use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{BlockId, Operand, RegisterDescriptor, Routine};
use std::collections::HashSet;

/// Removes instructions whose writes are provably unused and which have no
/// observable side effect (§4.7). Grounded on
/// `cranelift-codegen::dce::do_dce`'s shape: a backward walk over a block
/// maintaining a `live` set, killing writes and reviving reads as it goes.
/// Cranelift's `live` set is keyed by SSA value; this IR has no SSA form, so
/// it is keyed by register instead.
pub struct DeadCodeElimination;

impl DeadCodeElimination {
    /// The set of registers read before being (re)written anywhere in
    /// `block` — the liveness a predecessor sees looking into this block
    /// from its own exit.
    fn upward_exposed_reads(routine: &Routine, block: BlockId) -> HashSet<RegisterDescriptor> {
        let mut live = HashSet::new();
        let mut killed = HashSet::new();
        if let Some(b) = routine.block_by_id(block) {
            for instr in b.instructions() {
                for operand in instr.operands() {
                    if let Operand::Register { descriptor, access, .. } = operand {
                        if access.reads() && !killed.contains(descriptor) {
                            live.insert(*descriptor);
                        }
                    }
                }
                for operand in instr.operands() {
                    if let Operand::Register { descriptor, access, .. } = operand {
                        if access.writes() {
                            killed.insert(*descriptor);
                        }
                    }
                }
            }
        }
        live
    }
}

impl Pass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "dead-code-elimination"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Parallel
    }

    fn run(&self, routine: &mut Routine, block: BlockId, cross_block: bool) -> u32 {
        let (vip, successors) = match routine.block_by_id(block) {
            Some(b) => (b.vip(), b.successors().to_vec()),
            None => return 0,
        };

        // Live-out seed: nothing escapes a block with no successors; with a
        // successor but no cross-block view, assume every register this
        // block itself writes might still be wanted downstream (the safe
        // default); with `cross_block`, use the successors' own
        // upward-exposed reads instead of that blanket assumption.
        let mut live: HashSet<RegisterDescriptor> = if successors.is_empty() {
            HashSet::new()
        } else if cross_block {
            successors
                .iter()
                .flat_map(|&s| Self::upward_exposed_reads(routine, s))
                .collect()
        } else {
            routine
                .block(vip)
                .unwrap()
                .instructions()
                .iter()
                .flat_map(|i| i.operands().iter())
                .filter_map(|op| match op {
                    Operand::Register { descriptor, access, .. } if access.writes() => Some(*descriptor),
                    _ => None,
                })
                .collect()
        };

        let mut removed = 0u32;
        let mut index = routine.block(vip).map(|b| b.instructions().len()).unwrap_or(0);
        while index > 0 {
            index -= 1;
            let b = routine.block(vip).unwrap();
            let instr = &b.instructions()[index];

            let has_write = instr
                .operands()
                .iter()
                .any(|op| matches!(op, Operand::Register { access, .. } if access.writes()));
            let write_is_live = instr.operands().iter().any(|op| {
                matches!(op, Operand::Register { descriptor, access, .. } if access.writes() && live.contains(descriptor))
            });

            let dead = has_write && !write_is_live && !instr.is_volatile() && !instr.writes_memory() && !instr.is_branch();

            if dead {
                routine.remove_instruction(vip, index).unwrap();
                removed += 1;
                continue;
            }

            let b = routine.block(vip).unwrap();
            let instr = &b.instructions()[index];
            for op in instr.operands() {
                if let Operand::Register { descriptor, access, .. } = op {
                    if access.writes() && !access.reads() {
                        live.remove(descriptor);
                    }
                }
            }
            for op in instr.operands() {
                if let Operand::Register { descriptor, access, .. } = op {
                    if access.reads() {
                        live.insert(*descriptor);
                    }
                }
            }
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_bitvec::BvInt;
    use deobf_ir::{catalogue, ArchitectureIdentifier, Access, Instruction, RegisterKind, Vip};

    fn gpr(id: u32) -> RegisterDescriptor {
        RegisterDescriptor::new(RegisterKind::GeneralPurpose, id, 64)
    }

    #[test]
    fn unused_write_in_an_exit_block_is_removed() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        r.add_instruction(
            Vip::new(0),
            Instruction::new(
                &catalogue::MOV_REG_IMM,
                [Operand::register(gpr(0), Access::Write, 64), Operand::immediate(BvInt::new(1, 64))],
                64,
            )
            .unwrap(),
        )
        .unwrap();
        r.add_instruction(Vip::new(0), Instruction::new(&catalogue::RET, [], 1).unwrap())
            .unwrap();

        let removed = DeadCodeElimination.run(&mut r, r.block_id(Vip::new(0)).unwrap(), false);
        assert_eq!(removed, 1);
        assert_eq!(r.block(Vip::new(0)).unwrap().instructions().len(), 1);
    }

    #[test]
    fn read_write_keeps_it_alive() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        r.add_instruction(
            Vip::new(0),
            Instruction::new(
                &catalogue::MOV_REG_IMM,
                [Operand::register(gpr(0), Access::Write, 64), Operand::immediate(BvInt::new(1, 64))],
                64,
            )
            .unwrap(),
        )
        .unwrap();
        r.add_instruction(
            Vip::new(0),
            Instruction::new(
                &catalogue::MOV_REG_REG,
                [Operand::register(gpr(1), Access::Write, 64), Operand::register(gpr(0), Access::Read, 64)],
                64,
            )
            .unwrap(),
        )
        .unwrap();
        r.add_instruction(Vip::new(0), Instruction::new(&catalogue::RET, [], 1).unwrap())
            .unwrap();

        let removed = DeadCodeElimination.run(&mut r, r.block_id(Vip::new(0)).unwrap(), false);
        assert_eq!(removed, 0);
    }

    #[test]
    fn ret_is_never_removed() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        r.add_instruction(Vip::new(0), Instruction::new(&catalogue::RET, [], 1).unwrap())
            .unwrap();
        let removed = DeadCodeElimination.run(&mut r, r.block_id(Vip::new(0)).unwrap(), false);
        assert_eq!(removed, 0);
        assert_eq!(r.block(Vip::new(0)).unwrap().instructions().len(), 1);
    }
}
