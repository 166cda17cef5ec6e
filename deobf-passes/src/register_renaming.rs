use crate::order::ExecutionOrder;
use crate::pass::Pass;
use deobf_ir::{BlockId, Instruction, Operand, RegisterDescriptor, RegisterKind, Routine};
use std::collections::HashMap;

/// Reuses an already-existing internal register whose live range has ended
/// in place of a later internal register, within a single block (§4.7).
/// This never mints a new register — it only ever maps one
/// already-allocated `RegisterKind::Internal` descriptor onto another whose
/// range is provably over, the same "interval graph coloring" shape as a
/// linear-scan allocator, just without the allocation step.
///
/// Grounded on `cranelift-codegen/src/regalloc`'s linear-scan live-interval
/// bookkeeping (first def, last use, a "free at" frontier).
pub struct RegisterRenaming;

struct Interval {
    register: RegisterDescriptor,
    start: usize,
    end: usize,
}

impl Pass for RegisterRenaming {
    fn name(&self) -> &'static str {
        "register-renaming"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Serial
    }

    fn run(&self, routine: &mut Routine, block: BlockId, _cross_block: bool) -> u32 {
        let vip = match routine.block_by_id(block) {
            Some(b) => b.vip(),
            None => return 0,
        };
        let instructions: Vec<Instruction> = match routine.block(vip) {
            Some(b) => b.instructions().to_vec(),
            None => return 0,
        };

        let mut first_seen: HashMap<RegisterDescriptor, usize> = HashMap::new();
        let mut last_seen: HashMap<RegisterDescriptor, usize> = HashMap::new();
        for (i, instr) in instructions.iter().enumerate() {
            for operand in instr.operands() {
                if let Operand::Register { descriptor, .. } = operand {
                    if descriptor.kind == RegisterKind::Internal {
                        first_seen.entry(*descriptor).or_insert(i);
                        last_seen.insert(*descriptor, i);
                    }
                }
            }
        }

        let mut intervals: Vec<Interval> = first_seen
            .iter()
            .map(|(reg, &start)| Interval { register: *reg, start, end: last_seen[reg] })
            .collect();
        intervals.sort_by_key(|iv| iv.start);

        let mut free: Vec<(deobf_bitvec::BitCount, RegisterDescriptor, usize)> = Vec::new();
        let mut mapping: HashMap<RegisterDescriptor, RegisterDescriptor> = HashMap::new();
        let mut renamed_any = false;

        for iv in &intervals {
            let slot = free.iter().position(|&(bc, _, end)| bc == iv.register.bitcount && end < iv.start);
            let target = if let Some(pos) = slot {
                let (_, descriptor, _) = free.remove(pos);
                descriptor
            } else {
                iv.register
            };
            if target != iv.register {
                renamed_any = true;
            }
            mapping.insert(iv.register, target);
            free.push((iv.register.bitcount, target, iv.end));
        }

        if !renamed_any {
            return 0;
        }

        let mut applied = 0u32;
        for (index, instr) in instructions.iter().enumerate() {
            let mut changed = false;
            let mut operands: smallvec::SmallVec<[Operand; 3]> = smallvec::SmallVec::new();
            for operand in instr.operands() {
                match operand {
                    Operand::Register { descriptor, access, size } => {
                        let target = mapping.get(descriptor).copied().unwrap_or(*descriptor);
                        if target != *descriptor {
                            changed = true;
                        }
                        operands.push(Operand::register(target, *access, *size));
                    }
                    other => operands.push(*other),
                }
            }
            if changed {
                if let Ok(replacement) = Instruction::new(instr.descriptor(), operands, instr.access_size()) {
                    routine.replace_instruction(vip, index, replacement).unwrap();
                    applied += 1;
                }
            }
        }
        applied
    }
}
