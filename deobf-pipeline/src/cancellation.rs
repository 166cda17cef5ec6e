use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cooperative, cloneable cancel flag checked at pass and block
/// boundaries (§5). Grounded on `cranelift-control`'s `Arc`-shared
/// control-plane handle — the shape of a cheaply cloned signal one thread
/// can flip and every worker polls, without the fuzzing-specific payload
/// `cranelift-control`'s `chaos` feature adds.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken { cancelled: Arc::new(AtomicBool::new(false)) }
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_cloned_token_observes_cancellation_from_its_source() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
