use crate::dce::DeadCodeElimination;
use crate::mov_propagation::MovPropagation;
use crate::order::ExecutionOrder;
use crate::pass::Pass;
use crate::stack_propagation::StackPropagation;
use deobf_ir::{BlockId, Routine};

/// Repeatedly re-runs `MovPropagation`, `StackPropagation`, and
/// `DeadCodeElimination` over the same block until a round makes no
/// further change or `max_rounds` is reached (§4.7) — each pass on its own
/// only sees what the others already exposed in the same pass; running
/// them to a per-block fixed point untangles the kind of chained
/// substitution a single sweep of each would miss.
///
/// Convergence here is per-block, not whole-routine: a change this round
/// in one block that would unlock further folding in another block only
/// gets picked up the next time the whole pipeline (not just this pass) is
/// re-run over the routine.
pub struct CollectivePropagation {
    pub max_rounds: u32,
}

impl Default for CollectivePropagation {
    fn default() -> Self {
        CollectivePropagation { max_rounds: 16 }
    }
}

impl Pass for CollectivePropagation {
    fn name(&self) -> &'static str {
        "collective-propagation"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Serial
    }

    fn run(&self, routine: &mut Routine, block: BlockId, cross_block: bool) -> u32 {
        let mut total = 0u32;
        for _ in 0..self.max_rounds {
            let round = MovPropagation.run(routine, block, cross_block)
                + StackPropagation.run(routine, block, cross_block)
                + DeadCodeElimination.run(routine, block, cross_block);
            total += round;
            if round == 0 {
                break;
            }
        }
        total
    }
}
