use crate::config::PipelineConfig;
use crate::error::PipelineError;
use deobf_ir::Routine;
use deobf_passes::{
    BasicBlockExtension, BasicBlockThunkRemoval, BranchCorrection, CollectivePropagation, DeadCodeElimination,
    IStackRefSubstitution, MovPropagation, Pass, RegisterRenaming, StackPinning, StackPropagation, SymbolicRewrite,
};
use std::time::{Duration, Instant};

/// Per-pass entry in a [`RunSummary`] (§6.3).
#[derive(Debug, Clone)]
pub struct PassCount {
    pub name: &'static str,
    pub count: u32,
    pub duration: Duration,
}

/// `run_all`'s report: `{ per_pass_counts, total, duration }` (§6.3).
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub per_pass_counts: Vec<PassCount>,
    pub total: u32,
    pub duration: Duration,
}

fn resolve(name: &str) -> Option<Box<dyn Pass>> {
    match name {
        "stack-pinning" => Some(Box::new(StackPinning)),
        "istack-ref-substitution" => Some(Box::new(IStackRefSubstitution)),
        "basic-block-extension" => Some(Box::new(BasicBlockExtension)),
        "stack-propagation" => Some(Box::new(StackPropagation)),
        "dead-code-elimination" => Some(Box::new(DeadCodeElimination)),
        "mov-propagation" => Some(Box::new(MovPropagation)),
        "register-renaming" => Some(Box::new(RegisterRenaming)),
        "symbolic-rewrite" => Some(Box::new(SymbolicRewrite::default())),
        "branch-correction" => Some(Box::new(BranchCorrection)),
        "collective-propagation" => Some(Box::new(CollectivePropagation::default())),
        "basic-block-thunk-removal" => Some(Box::new(BasicBlockThunkRemoval)),
        _ => None,
    }
}

/// Runs `config.pass_order` over `routine` in sequence, summing each pass's
/// `run_cross` count (§4.7, §6.3).
///
/// The cancellation token and pass timeout are checked between passes, not
/// within one: `Pass::run_cross` is a synchronous call with no cancellation
/// parameter of its own, so a pass already in flight always finishes its
/// current block before this scheduler can observe a cancellation or a
/// blown budget. This satisfies §5's "no partial block state is ever
/// exposed" requirement — a whole block's transformation always commits or
/// none of it does — without threading a token through every pass.
pub fn run_all(routine: &mut Routine, config: &PipelineConfig) -> Result<RunSummary, PipelineError> {
    let start = Instant::now();
    let mut per_pass_counts = Vec::with_capacity(config.pass_order.len());
    let mut total = 0u32;

    for &name in &config.pass_order {
        if config.cancellation.is_cancelled() {
            return Err(PipelineError::CancelledOrTimedOut { pass: name });
        }
        let pass = match resolve(name) {
            Some(p) => p,
            None => continue,
        };
        let pass_start = Instant::now();
        let count = pass.run_cross(routine);
        let elapsed = pass_start.elapsed();
        if elapsed > config.pass_timeout {
            log::warn!("pass `{name}` exceeded its {:?} budget ({:?})", config.pass_timeout, elapsed);
            return Err(PipelineError::CancelledOrTimedOut { pass: name });
        }
        total += count;
        per_pass_counts.push(PassCount { name, count, duration: elapsed });
    }

    Ok(RunSummary { per_pass_counts, total, duration: start.elapsed() })
}
