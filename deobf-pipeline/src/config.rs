use crate::cancellation::CancellationToken;
use std::time::Duration;

/// Tunables for [`crate::run_all`] (§5, §6.3). Mirrors
/// `deobf-simplify::SimplifierConfig`'s "small config struct threaded
/// through rather than free constants" shape.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// The pass sequence to run, in order. Defaults to the ordering
    /// documented below as effective over this instruction set.
    pub pass_order: Vec<&'static str>,
    /// Wall-clock budget for a single pass before it must return early at
    /// the next block boundary.
    pub pass_timeout: Duration,
    pub cancellation: CancellationToken,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            pass_order: default_pass_order(),
            pass_timeout: Duration::from_secs(5),
            cancellation: CancellationToken::new(),
        }
    }
}

/// `StackPinning -> IStackRefSubstitution -> BasicBlockExtension ->
/// StackPropagation -> DeadCodeElimination -> MovPropagation ->
/// RegisterRenaming -> DeadCodeElimination -> SymbolicRewrite ->
/// BranchCorrection -> CollectivePropagation -> SymbolicRewrite ->
/// BasicBlockThunkRemoval` (§4.7).
pub fn default_pass_order() -> Vec<&'static str> {
    vec![
        "stack-pinning",
        "istack-ref-substitution",
        "basic-block-extension",
        "stack-propagation",
        "dead-code-elimination",
        "mov-propagation",
        "register-renaming",
        "dead-code-elimination",
        "symbolic-rewrite",
        "branch-correction",
        "collective-propagation",
        "symbolic-rewrite",
        "basic-block-thunk-removal",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_default_order_matches_every_named_pass_exactly_once_except_the_repeated_ones() {
        let order = default_pass_order();
        assert_eq!(order.iter().filter(|&&n| n == "dead-code-elimination").count(), 2);
        assert_eq!(order.iter().filter(|&&n| n == "symbolic-rewrite").count(), 2);
        assert_eq!(order.first(), Some(&"stack-pinning"));
        assert_eq!(order.last(), Some(&"basic-block-thunk-removal"));
    }
}
