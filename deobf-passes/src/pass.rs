use crate::order::ExecutionOrder;
use deobf_ir::{BlockId, Routine};

/// The shared contract every rewrite pass implements (§4.7).
///
/// `run` transforms one block in isolation; `run_cross` is for passes whose
/// transformation inherently spans more than one block (merging, thunk
/// removal) and need to see the whole routine at once. The default
/// `run_cross` just sums `run` over every block currently in the routine,
/// which is the right behavior for every block-local pass in this crate —
/// only the CFG-mutating passes override it.
pub trait Pass {
    /// A short, stable identifier used in pipeline summaries and log lines.
    fn name(&self) -> &'static str;

    /// Transform a single block. `cross_block` tells a block-local pass that
    /// it may additionally reason about the block's immediate neighbors
    /// (e.g. computing liveness from a successor's upward-exposed reads)
    /// without itself mutating anything outside `block`.
    fn run(&self, routine: &mut Routine, block: BlockId, cross_block: bool) -> u32;

    /// Transform the whole routine. Returns the total count of applied
    /// transformations, summed across however many blocks this pass
    /// touched.
    fn run_cross(&self, routine: &mut Routine) -> u32 {
        let ids: Vec<BlockId> = routine.blocks().map(|(id, _)| id).collect();
        ids.into_iter().map(|id| self.run(routine, id, true)).sum()
    }

    fn execution_order(&self) -> ExecutionOrder;
}
