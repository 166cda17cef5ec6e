use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{catalogue, BlockId, Routine};

/// Merges a block into its unique successor when that successor has no
/// other predecessor (§4.7) — the straight-line CFG edges a JMP-only thunk
/// or a trivially-taken branch leaves behind. This is the one pass in this
/// crate that changes block count, so it only makes sense whole-routine;
/// there is no meaningful single-block `run`.
///
/// A successor with no outgoing edges of its own (a `ret`-terminated exit
/// block) is never absorbed: folding it in would keep collapsing the chain
/// one hop further than the CFG shape calls for, swallowing the routine's
/// actual exit point into whatever predecessor happens to reach it last.
/// Only redirecting, non-terminal hops get folded away here; a genuine exit
/// block stays put as its own block.
///
/// Grounded on `cranelift-codegen`'s block-merging shape in its branch
/// relaxation pass: fold a fallthrough-only edge into straight-line code.
pub struct BasicBlockExtension;

impl BasicBlockExtension {
    fn merge(&self, routine: &mut Routine, into: BlockId, from: BlockId) {
        let into_vip = routine.block_by_id(into).unwrap().vip();
        let from_vip = routine.block_by_id(from).unwrap().vip();

        if let Some(last) = routine.block(into_vip).unwrap().instructions().last() {
            if last.descriptor() == &catalogue::JMP {
                let last_index = routine.block(into_vip).unwrap().instructions().len() - 1;
                routine.remove_instruction(into_vip, last_index).unwrap();
            }
        }

        let moved: Vec<_> = routine.block(from_vip).unwrap().instructions().to_vec();
        for instr in moved {
            routine.add_instruction(into_vip, instr).unwrap();
        }

        let successors: Vec<BlockId> = routine.block_by_id(from).unwrap().successors().to_vec();
        routine.remove_successor(into_vip, from_vip).unwrap();
        for successor in successors {
            let successor_vip = routine.block_by_id(successor).unwrap().vip();
            routine.remove_successor(from_vip, successor_vip).unwrap();
            routine.add_successor(into_vip, successor_vip).unwrap();
        }
        routine.remove_block(from_vip).unwrap();
    }
}

impl Pass for BasicBlockExtension {
    fn name(&self) -> &'static str {
        "basic-block-extension"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Custom
    }

    fn run(&self, _routine: &mut Routine, _block: BlockId, _cross_block: bool) -> u32 {
        0
    }

    fn run_cross(&self, routine: &mut Routine) -> u32 {
        let mut applied = 0u32;
        loop {
            let entry = routine.entry_id();
            let candidate = routine.blocks().find_map(|(id, b)| {
                if b.successors().len() != 1 {
                    return None;
                }
                let succ = b.successors()[0];
                if succ == id || Some(succ) == entry {
                    return None;
                }
                let succ_block = routine.block_by_id(succ)?;
                if succ_block.successors().is_empty() {
                    return None;
                }
                if succ_block.predecessors().len() == 1 && succ_block.predecessors()[0] == id {
                    Some((id, succ))
                } else {
                    None
                }
            });
            match candidate {
                Some((a, b)) => {
                    self.merge(routine, a, b);
                    applied += 1;
                }
                None => break,
            }
        }
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_ir::{ArchitectureIdentifier, Instruction, Vip};

    #[test]
    fn a_jmp_only_successor_gets_folded_into_its_predecessor() {
        // entry --JMP--> thunk --JMP--> exit(ret). The thunk is a
        // redirecting hop with nowhere terminal about it, so it folds into
        // entry; the ret-terminated exit block has no successors of its
        // own and must stay a separate block.
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        r.create_block(Vip::new(1));
        r.create_block(Vip::new(2));
        r.set_entry(Vip::new(0)).unwrap();
        r.add_instruction(Vip::new(0), Instruction::new(&catalogue::JMP, [deobf_ir::Operand::immediate(deobf_bitvec::BvInt::new(1, 64))], 64).unwrap())
            .unwrap();
        r.add_instruction(Vip::new(1), Instruction::new(&catalogue::JMP, [deobf_ir::Operand::immediate(deobf_bitvec::BvInt::new(2, 64))], 64).unwrap())
            .unwrap();
        r.add_instruction(Vip::new(2), Instruction::new(&catalogue::RET, [], 1).unwrap()).unwrap();
        r.add_successor(Vip::new(0), Vip::new(1)).unwrap();
        r.add_successor(Vip::new(1), Vip::new(2)).unwrap();

        let applied = BasicBlockExtension.run_cross(&mut r);
        assert_eq!(applied, 1);
        assert_eq!(r.block_count(), 2);
        let block = r.block(Vip::new(0)).unwrap();
        assert_eq!(block.instructions().len(), 1);
        assert_eq!(block.instructions()[0].descriptor(), &catalogue::JMP);
        assert_eq!(block.successors().to_vec(), vec![r.block_id(Vip::new(2)).unwrap()]);
    }

    #[test]
    fn a_shared_successor_with_two_predecessors_is_untouched() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        r.create_block(Vip::new(1));
        r.create_block(Vip::new(2));
        r.set_entry(Vip::new(0)).unwrap();
        r.add_successor(Vip::new(0), Vip::new(2)).unwrap();
        r.add_successor(Vip::new(1), Vip::new(2)).unwrap();

        let applied = BasicBlockExtension.run_cross(&mut r);
        assert_eq!(applied, 0);
        assert_eq!(r.block_count(), 3);
    }
}
