use deobf_ir::{BlockId, Routine};

/// One defect a [`validate`] pass surfaces, tagged with the block it was
/// found in when the check is block-local.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    MissingEntry,
    UnreachableBlock { block: BlockId },
    AsymmetricEdge { from: BlockId, to: BlockId },
    BadTerminatorSuccessorCount { block: BlockId, expected_at_most: usize, actual: usize },
    UnbalancedStack { from: BlockId, delta: i128 },
    ReadBeforeWrite { block: BlockId, register: deobf_ir::RegisterDescriptor },
}

/// `validate`'s report (§6.3): errors are invariant violations a
/// well-formed routine must never exhibit; warnings flag shapes that are
/// legal but worth a deobfuscator's attention (an unreached block, a
/// register read before any write in its block).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub errors: Vec<Finding>,
    pub warnings: Vec<Finding>,
}

impl ValidationReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs every structural well-formedness check over `routine`.
/// Grounded on `cranelift-codegen::context.rs`'s `compile()` calling
/// `verify_if` before running any pass — validation is a read-only,
/// pre-pipeline gate here too, not a pass of its own.
pub fn validate(routine: &Routine) -> ValidationReport {
    let mut report = ValidationReport::default();

    let Some(entry_vip) = routine.entry() else {
        if routine.block_count() > 0 {
            report.errors.push(Finding::MissingEntry);
        }
        return report;
    };
    let entry_id = routine.entry_id().expect("entry() implies entry_id()");

    check_symmetric_edges(routine, &mut report);
    check_terminators(routine, &mut report);
    check_reachability(routine, entry_id, &mut report);
    check_stack_balance(routine, entry_vip, &mut report);
    check_read_before_write(routine, &mut report);

    report
}

fn check_symmetric_edges(routine: &Routine, report: &mut ValidationReport) {
    for (id, block) in routine.blocks() {
        for &succ in block.successors() {
            let Some(succ_block) = routine.block_by_id(succ) else { continue };
            if !succ_block.predecessors().contains(&id) {
                report.errors.push(Finding::AsymmetricEdge { from: id, to: succ });
            }
        }
    }
}

fn check_terminators(routine: &Routine, report: &mut ValidationReport) {
    use deobf_ir::catalogue;

    for (id, block) in routine.blocks() {
        let successor_count = block.successors().len();
        let expected_at_most = match block.instructions().last() {
            None => 1,
            Some(last) if last.descriptor() == &catalogue::RET => 0,
            Some(last) if last.descriptor() == &catalogue::JMP => 1,
            Some(last) if last.descriptor() == &catalogue::JCC => 2,
            Some(_) => 1,
        };
        if successor_count > expected_at_most {
            report.errors.push(Finding::BadTerminatorSuccessorCount { block: id, expected_at_most, actual: successor_count });
        }
    }
}

fn check_reachability(routine: &Routine, entry: BlockId, report: &mut ValidationReport) {
    let mut seen = std::collections::HashSet::new();
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(block) = routine.block_by_id(id) {
            stack.extend(block.successors().iter().copied());
        }
    }
    for (id, _) in routine.blocks() {
        if !seen.contains(&id) {
            report.warnings.push(Finding::UnreachableBlock { block: id });
        }
    }
}

/// Walks every reachable entry-to-`ret` path with a bounded DFS, summing
/// each block's net stack delta (pushes minus pops, by operand width in
/// bytes). A path whose total isn't zero at a `ret` is a caller/callee
/// convention violation worth flagging; paths are capped at
/// `routine.block_count()` hops to bound cycles through loops.
fn check_stack_balance(routine: &Routine, entry: deobf_ir::Vip, report: &mut ValidationReport) {
    use deobf_bitvec::Operator;
    use deobf_ir::catalogue;

    let Some(entry_id) = routine.block_id(entry) else { return };
    let max_hops = routine.block_count().max(1);
    let mut stack = vec![(entry_id, 0i128, 0usize)];
    let mut visited_with_delta = std::collections::HashSet::new();

    while let Some((id, delta, hops)) = stack.pop() {
        if hops > max_hops || !visited_with_delta.insert((id, delta)) {
            continue;
        }
        let Some(block) = routine.block_by_id(id) else { continue };
        let mut running = delta;
        for instr in block.instructions() {
            match instr.descriptor().symbolic_operator {
                Some(Operator::Push) => running += instr.operand(0).map(|o| o.size() as i128 / 8).unwrap_or(0),
                Some(Operator::Pop) => running -= instr.operand(0).map(|o| o.size() as i128 / 8).unwrap_or(0),
                _ => {}
            }
            if instr.descriptor() == &catalogue::RET && running != 0 {
                report.errors.push(Finding::UnbalancedStack { from: entry_id, delta: running });
            }
        }
        for &succ in block.successors() {
            stack.push((succ, running, hops + 1));
        }
    }
}

fn check_read_before_write(routine: &Routine, report: &mut ValidationReport) {
    for (id, block) in routine.blocks() {
        let mut written = std::collections::HashSet::new();
        for instr in block.instructions() {
            for operand in instr.operands() {
                if let Some((descriptor, access)) = operand.as_register() {
                    if access.reads() && !written.contains(&descriptor) {
                        report.warnings.push(Finding::ReadBeforeWrite { block: id, register: descriptor });
                    }
                    if access.writes() {
                        written.insert(descriptor);
                    }
                }
            }
        }
    }
}
