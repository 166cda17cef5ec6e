mod block_extension;
mod branch_correction;
mod collective_propagation;
mod dce;
mod istack_substitution;
mod mov_propagation;
mod order;
mod pass;
mod register_renaming;
mod regvar;
mod stack_pinning;
mod stack_propagation;
mod symbolic_rewrite;
mod thunk_removal;

pub use block_extension::BasicBlockExtension;
pub use branch_correction::BranchCorrection;
pub use collective_propagation::CollectivePropagation;
pub use dce::DeadCodeElimination;
pub use istack_substitution::{IStackRefSubstitution, CANONICAL_STACK_REGISTER};
pub use mov_propagation::MovPropagation;
pub use order::ExecutionOrder;
pub use pass::Pass;
pub use register_renaming::RegisterRenaming;
pub use regvar::register_uid;
pub use stack_pinning::StackPinning;
pub use stack_propagation::StackPropagation;
pub use symbolic_rewrite::SymbolicRewrite;
pub use thunk_removal::BasicBlockThunkRemoval;
