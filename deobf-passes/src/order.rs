/// How a pass expects to be scheduled across a routine's blocks (§4.7).
///
/// This crate's own passes always run their `Parallel`/`Serial` variants the
/// same way (block-local transformations are applied one block at a time,
/// never actually threaded): the distinction exists so `deobf-pipeline`'s
/// scheduler knows which passes it is *allowed* to fan out across a worker
/// pool versus which ones must see the whole routine atomically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOrder {
    Serial,
    SerialBfs,
    SerialDfs,
    Parallel,
    ParallelBfs,
    ParallelDfs,
    Custom,
}

impl ExecutionOrder {
    /// True for the three `Parallel*` variants: a scheduler may run this
    /// pass's per-block work across a worker pool, provided the pass itself
    /// never touches a block other than the one it was handed.
    pub fn is_parallel(self) -> bool {
        matches!(
            self,
            ExecutionOrder::Parallel | ExecutionOrder::ParallelBfs | ExecutionOrder::ParallelDfs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_parallel_variants_report_parallel() {
        assert!(ExecutionOrder::Parallel.is_parallel());
        assert!(ExecutionOrder::ParallelBfs.is_parallel());
        assert!(!ExecutionOrder::Serial.is_parallel());
        assert!(!ExecutionOrder::Custom.is_parallel());
    }
}
