use crate::order::ExecutionOrder;
use crate::pass::Pass;
use crate::regvar::register_uid;
use deobf_ir::{catalogue, BlockId, Instruction, Operand, RegisterDescriptor, Routine};
use deobf_simplify::SimplifierConfig;

/// Lowers a single arithmetic/bitwise instruction to a symbolic expression,
/// simplifies it, and folds the instruction back down to a `mov` whenever
/// the result is provably a constant or provably just one of the
/// instruction's own source registers (§4.6, §4.7).
///
/// This is deliberately conservative: this IR has no general
/// expression-valued instruction, so a simplification that lands anywhere
/// short of "constant" or "bare register" has nowhere to go and is left
/// alone. `BranchCorrection` handles the one other place a simplified
/// expression feeds back into control flow.
pub struct SymbolicRewrite {
    config: SimplifierConfig,
}

impl Default for SymbolicRewrite {
    fn default() -> Self {
        SymbolicRewrite { config: SimplifierConfig::default() }
    }
}

impl SymbolicRewrite {
    pub fn new(config: SimplifierConfig) -> Self {
        SymbolicRewrite { config }
    }

    fn operand_to_expr(operand: &Operand) -> Option<deobf_expr::Expr> {
        match operand {
            Operand::Immediate(value) => Some(deobf_expr::Expr::constant(*value)),
            Operand::Register { descriptor, size, .. } => deobf_expr::Expr::variable(register_uid(*descriptor), *size).ok(),
        }
    }
}

impl Pass for SymbolicRewrite {
    fn name(&self) -> &'static str {
        "symbolic-rewrite"
    }

    fn execution_order(&self) -> ExecutionOrder {
        ExecutionOrder::Parallel
    }

    fn run(&self, routine: &mut Routine, block: BlockId, _cross_block: bool) -> u32 {
        let vip = match routine.block_by_id(block) {
            Some(b) => b.vip(),
            None => return 0,
        };
        let len = routine.block(vip).map(|b| b.instructions().len()).unwrap_or(0);
        let mut applied = 0u32;

        for index in 0..len {
            let instr = match routine.block(vip).and_then(|b| b.instructions().get(index)) {
                Some(i) => i.clone(),
                None => continue,
            };

            if instr.is_branch() || instr.is_volatile() || instr.writes_memory() {
                continue;
            }
            let op = match instr.descriptor().symbolic_operator {
                Some(op) => op,
                None => continue,
            };
            let (dst, dst_access) = match instr.operand(0).and_then(Operand::as_register) {
                Some(pair) if dst_writes(pair.1) => pair,
                _ => continue,
            };
            let sources: Vec<&Operand> = instr.operands().iter().skip(1).collect();
            if sources.is_empty() || sources.len() != op.info().arity as usize {
                continue;
            }

            let exprs: Option<Vec<deobf_expr::Expr>> = sources.iter().copied().map(Self::operand_to_expr).collect();
            let exprs = match exprs {
                Some(e) => e,
                None => continue,
            };

            let built = if exprs.len() == 1 {
                deobf_expr::Expr::unary(op, exprs[0].clone())
            } else {
                deobf_expr::Expr::binary(op, exprs[0].clone(), exprs[1].clone())
            };
            let built = match built {
                Ok(e) => e,
                Err(_) => continue,
            };

            let simplified = deobf_simplify::simplify(&built, &self.config);

            let replacement = if let Some(constant) = simplified.as_constant() {
                Instruction::new(
                    &catalogue::MOV_REG_IMM,
                    [Operand::register(dst, dst_access, dst.bitcount), Operand::immediate(constant)],
                    instr.access_size(),
                )
                .ok()
            } else if let Some((uid, _)) = simplified.as_variable() {
                sources.iter().find_map(|o| match o {
                    Operand::Register { descriptor, .. } if &register_uid(*descriptor) == uid => Instruction::new(
                        &catalogue::MOV_REG_REG,
                        [Operand::register(dst, dst_access, dst.bitcount), Operand::register(*descriptor, deobf_ir::Access::Read, descriptor.bitcount)],
                        instr.access_size(),
                    )
                    .ok(),
                    _ => None,
                })
            } else {
                None
            };

            if let Some(replacement) = replacement {
                routine.replace_instruction(vip, index, replacement).unwrap();
                applied += 1;
            }
        }
        applied
    }
}

fn dst_writes(access: deobf_ir::Access) -> bool {
    access.writes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_bitvec::{BvInt, Operator};
    use deobf_ir::{ArchitectureIdentifier, Access, RegisterKind, Vip};

    fn gpr(id: u32) -> RegisterDescriptor {
        RegisterDescriptor::new(RegisterKind::GeneralPurpose, id, 64)
    }

    #[test]
    fn xor_of_a_register_with_itself_folds_to_zero() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::XOR,
                [
                    Operand::register(gpr(0), Access::Write, 64),
                    Operand::register(gpr(1), Access::Read, 64),
                    Operand::register(gpr(1), Access::Read, 64),
                ],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        let applied = SymbolicRewrite::default().run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 1);
        let instr = r.block(vip).unwrap().instructions()[0].clone();
        assert_eq!(instr.descriptor(), &catalogue::MOV_REG_IMM);
        assert_eq!(instr.operand(1).and_then(Operand::as_immediate), Some(BvInt::zero(64)));
    }

    #[test]
    fn adding_zero_folds_to_a_bare_mov() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::ADD,
                [
                    Operand::register(gpr(0), Access::Write, 64),
                    Operand::register(gpr(1), Access::Read, 64),
                    Operand::immediate(BvInt::zero(64)),
                ],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        let applied = SymbolicRewrite::default().run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 1);
        let instr = r.block(vip).unwrap().instructions()[0].clone();
        assert_eq!(instr.descriptor(), &catalogue::MOV_REG_REG);
        let (src, _) = instr.operand(1).and_then(Operand::as_register).unwrap();
        assert_eq!(src, gpr(1));
    }

    #[test]
    fn an_unresolvable_addition_is_left_alone() {
        let mut r = Routine::new(ArchitectureIdentifier::Virtual);
        r.create_block(Vip::new(0));
        let vip = Vip::new(0);
        r.add_instruction(
            vip,
            Instruction::new(
                &catalogue::ADD,
                [
                    Operand::register(gpr(0), Access::Write, 64),
                    Operand::register(gpr(1), Access::Read, 64),
                    Operand::register(gpr(2), Access::Read, 64),
                ],
                64,
            )
            .unwrap(),
        )
        .unwrap();

        let applied = SymbolicRewrite::default().run(&mut r, r.block_id(vip).unwrap(), false);
        assert_eq!(applied, 0);
        assert_eq!(r.block(vip).unwrap().instructions()[0].descriptor(), &catalogue::ADD);
        let _ = Operator::Add;
    }
}
