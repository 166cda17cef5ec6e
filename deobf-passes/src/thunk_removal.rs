use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{catalogue, BlockId, Routine};

/// Removes a block that does nothing but jump to another block, retargeting
/// every predecessor straight at the real destination (§4.7). The entry
/// block is never removed this way even if it happens to be thunk-shaped —
/// a routine always needs somewhere to start from.
///
/// Grounded on `cranelift-codegen`'s jump-threading pass, which performs
/// the same "replace edge into an empty forwarding block with an edge to
/// its target" rewrite.
pub struct BasicBlockThunkRemoval;

impl BasicBlockThunkRemoval {
    fn remove(&self, routine: &mut Routine, thunk: BlockId, target: BlockId) {
        let thunk_vip = routine.block_by_id(thunk).unwrap().vip();
        let target_vip = routine.block_by_id(target).unwrap().vip();
        let predecessors: Vec<BlockId> = routine.block_by_id(thunk).unwrap().predecessors().to_vec();
        for pred in predecessors {
            if pred == thunk {
                continue;
            }
            let pred_vip = routine.block_by_id(pred).unwrap().vip();
            routine.remove_successor(pred_vip, thunk_vip).unwrap();
            routine.add_successor(pred_vip, target_vip).unwrap();
        }
        routine.remove_successor(thunk_vip, target_vip).unwrap();
        routine.remove_block(thunk_vip).unwrap();
    }
}

impl Pass for BasicBlockThunkRemoval {
    fn name(&self) -> &'static str {
        "basic-block-thunk-removal"
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
                if Some(id) == entry || b.instructions().len() != 1 || b.successors().len() != 1 {
                    return None;
                }
                if b.instructions()[0].descriptor() != &catalogue::JMP {
                    return None;
                }
                let target = b.successors()[0];
                if target == id {
                    return None;
                }
                Some((id, target))
            });
            match candidate {
                Some((thunk, target)) => {
                    self.remove(routine, thunk, target);
                    applied += 1;
                }
                None => break,
            }
        }
        applied
    }
}
