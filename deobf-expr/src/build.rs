//! Smart constructors: the only way to build an [`Expr`].
//!
//! Every constructor here performs, in order: width validation, constant
//! folding, a small set of peephole identities (the "strict
//! simplifications" subset of the universal rule table that is cheap
//! enough to run unconditionally), and memoization of the node's derived
//! attributes. Constructing the same logical expression twice yields
//! structurally equal values with equal hash, and construction never
//! mutates an existing node.

use crate::error::ExprError;
use crate::node::{Expr, ExprKind, Signature};
use crate::uid::UniqueId;
use deobf_bitvec::{check_width, BitCount, BvInt, Operator};
use std::collections::HashSet;
use std::rc::Rc;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn mix(h: u64, x: u64) -> u64 {
    (h ^ x).wrapping_mul(FNV_PRIME)
}

fn hash_uid(uid: &UniqueId) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    uid.hash(&mut hasher);
    hasher.finish()
}

impl Expr {
    /// Build a constant node. `value`'s width is the node's width.
    pub fn constant(value: BvInt) -> Expr {
        let kind = ExprKind::Constant(value);
        let hash = mix(mix(FNV_OFFSET, 0), mix(value.as_signed() as u64, value.width() as u64));
        let signature: Signature = 1 << 0;
        Expr::from_parts(kind, hash, signature, 0.0, 0, false, Rc::new(HashSet::new()))
    }

    /// Build a variable node bound to `uid`, of width `size`.
    pub fn variable(uid: UniqueId, size: BitCount) -> Result<Expr, ExprError> {
        check_width(size)?;
        let hash = mix(mix(FNV_OFFSET, 1), mix(hash_uid(&uid), size as u64));
        let signature: Signature = 1 << 1;
        let mut vars = HashSet::new();
        vars.insert(uid.clone());
        let kind = ExprKind::Variable(uid, size);
        Ok(Expr::from_parts(
            kind,
            hash,
            signature,
            1.0,
            0,
            true,
            Rc::new(vars),
        ))
    }

    /// Build a unary, size-preserving operation (`Neg`, `Not`).
    ///
    /// For resizing unary operators, use [`Expr::cast`] / [`Expr::ucast`].
    pub fn unary(op: Operator, operand: Expr) -> Result<Expr, ExprError> {
        let info = op.info();
        if info.arity != 1 || matches!(op, Operator::Cast | Operator::Ucast) {
            return Err(ExprError::ArityMismatch {
                op,
                expected: info.arity,
                got: 1,
            });
        }
        // Double-negation / double-complement: op(op(x)) -> x.
        if info.self_inverse {
            if let Some((inner_op, None, inner_rhs, _)) = operand.as_operation() {
                if inner_op == op {
                    return Ok(inner_rhs.clone());
                }
            }
        }
        let size = operand.size();
        if let Some(v) = operand.as_constant() {
            if let Some(folded) = op.eval(&[v], size) {
                return Ok(Expr::constant(folded));
            }
        }
        Ok(build_operation(op, None, operand, size))
    }

    /// Sign-extend or truncate `operand` to `target_size`.
    pub fn cast(operand: Expr, target_size: BitCount) -> Result<Expr, ExprError> {
        check_width(target_size)?;
        if operand.size() == target_size {
            return Ok(operand);
        }
        if let Some(v) = operand.as_constant() {
            return Ok(Expr::constant(v.cast(target_size)));
        }
        Ok(build_operation(Operator::Cast, None, operand, target_size))
    }

    /// Zero-extend or truncate `operand` to `target_size`.
    pub fn ucast(operand: Expr, target_size: BitCount) -> Result<Expr, ExprError> {
        check_width(target_size)?;
        if operand.size() == target_size {
            return Ok(operand);
        }
        if let Some(v) = operand.as_constant() {
            return Ok(Expr::constant(v.ucast(target_size)));
        }
        Ok(build_operation(Operator::Ucast, None, operand, target_size))
    }

    /// Build a binary operation.
    pub fn binary(op: Operator, lhs: Expr, rhs: Expr) -> Result<Expr, ExprError> {
        let info = op.info();
        if info.arity != 2 {
            return Err(ExprError::ArityMismatch {
                op,
                expected: info.arity,
                got: 2,
            });
        }
        validate_binary_sizes(op, &lhs, &rhs)?;
        let result_size = op
            .result_size(&[lhs.size(), rhs.size()])
            .unwrap_or_else(|| lhs.size());

        if let Some(simplified) = strict_binary_identity(op, &lhs, &rhs, result_size) {
            return Ok(simplified);
        }

        if let (Some(l), Some(r)) = (lhs.as_constant(), rhs.as_constant()) {
            if let Some(folded) = op.eval(&[l, r], result_size) {
                return Ok(Expr::constant(folded));
            }
        }

        Ok(build_operation(op, Some(lhs), rhs, result_size))
    }
}

fn validate_binary_sizes(op: Operator, lhs: &Expr, rhs: &Expr) -> Result<(), ExprError> {
    use Operator::*;
    let info = op.info();
    if info.symbolic {
        return Ok(());
    }
    match op {
        // The shift amount is independent in width; it is reduced modulo
        // the shifted value's width at evaluation time (§4.1).
        Shl | Shr | Sar | Rol | Ror => Ok(()),
        _ => {
            if lhs.size() != rhs.size() {
                Err(ExprError::WidthMismatch {
                    op,
                    lhs: lhs.size(),
                    rhs: rhs.size(),
                })
            } else {
                Ok(())
            }
        }
    }
}

/// The "strict simplifications" subset of the universal rule table that the
/// smart constructors apply unconditionally, to keep the DAG small even
/// before the simplifier runs (§4.2). This deliberately duplicates a small
/// slice of `deobf-directive`'s universal rule table in plain Rust: the
/// constructors live below that crate in the dependency graph and cannot
/// call into it.
fn strict_binary_identity(op: Operator, lhs: &Expr, rhs: &Expr, result_size: BitCount) -> Option<Expr> {
    use Operator::*;
    let zero = || Expr::constant(BvInt::zero(result_size));
    let same = lhs == rhs;
    match op {
        Add => {
            if is_zero(rhs) {
                return Some(lhs.clone());
            }
            if is_zero(lhs) {
                return Some(rhs.clone());
            }
        }
        Sub => {
            if is_zero(rhs) {
                return Some(lhs.clone());
            }
            if same {
                return Some(zero());
            }
        }
        Mul => {
            if is_one(rhs) {
                return Some(lhs.clone());
            }
            if is_one(lhs) {
                return Some(rhs.clone());
            }
            if is_zero(rhs) || is_zero(lhs) {
                return Some(zero());
            }
        }
        And => {
            if same {
                return Some(lhs.clone());
            }
            if is_zero(rhs) || is_zero(lhs) {
                return Some(zero());
            }
            if is_all_ones(rhs) {
                return Some(lhs.clone());
            }
            if is_all_ones(lhs) {
                return Some(rhs.clone());
            }
        }
        Or => {
            if same {
                return Some(lhs.clone());
            }
            if is_zero(rhs) {
                return Some(lhs.clone());
            }
            if is_zero(lhs) {
                return Some(rhs.clone());
            }
            if is_all_ones(rhs) || is_all_ones(lhs) {
                return Some(Expr::constant(BvInt::all_ones(result_size)));
            }
        }
        Xor => {
            if same {
                return Some(zero());
            }
            if is_zero(rhs) {
                return Some(lhs.clone());
            }
            if is_zero(lhs) {
                return Some(rhs.clone());
            }
        }
        Eq => {
            if same {
                return Some(Expr::constant(BvInt::new(1, 1)));
            }
        }
        Ne => {
            if same {
                return Some(Expr::constant(BvInt::zero(1)));
            }
        }
        _ => {}
    }
    None
}

fn is_zero(e: &Expr) -> bool {
    e.as_constant().map(BvInt::is_zero).unwrap_or(false)
}

fn is_one(e: &Expr) -> bool {
    e.as_constant().map(|c| c.as_signed() == 1).unwrap_or(false)
}

fn is_all_ones(e: &Expr) -> bool {
    e.as_constant()
        .map(|c| c == BvInt::all_ones(c.width()))
        .unwrap_or(false)
}

fn build_operation(op: Operator, lhs: Option<Expr>, rhs: Expr, size: BitCount) -> Expr {
    let lhs_hash = lhs.as_ref().map(Expr::hash_value);
    let mut h = mix(FNV_OFFSET, 2);
    h = mix(h, op as u64);
    if let Some(lh) = lhs_hash {
        h = mix(h, lh);
    }
    h = mix(h, rhs.hash_value());
    h = mix(h, size as u64);

    let op_bit = 2 + (op as u64 % 60);
    let mut signature: Signature = 1 << op_bit;
    if let Some(l) = &lhs {
        signature |= l.signature();
    }
    signature |= rhs.signature();

    let mut complexity = rhs.complexity() + 1.0;
    if let Some(l) = &lhs {
        complexity += l.complexity();
    }
    let info = op.info();
    if info.comparison {
        complexity += 0.5;
    }
    if matches!(op, Operator::Cast | Operator::Ucast) {
        complexity += 0.5;
    }

    let rhs_depth = rhs.depth();
    let lhs_depth = lhs.as_ref().map(Expr::depth).unwrap_or(0);
    let depth = 1 + rhs_depth.max(lhs_depth);

    let contains_variable =
        rhs.contains_variable() || lhs.as_ref().map(Expr::contains_variable).unwrap_or(false);

    let variables = match &lhs {
        None => rhs.variables_rc(),
        Some(l) => {
            if l.variables().is_empty() {
                rhs.variables_rc()
            } else if rhs.variables().is_empty() {
                l.variables_rc()
            } else {
                let mut set = (*rhs.variables_rc()).clone();
                set.extend(l.variables().iter().cloned());
                Rc::new(set)
            }
        }
    };

    Expr::from_parts(
        ExprKind::Operation { op, lhs, rhs, size },
        h,
        signature,
        complexity,
        depth,
        contains_variable,
        variables,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str, size: BitCount) -> Expr {
        Expr::variable(UniqueId::named(name), size).unwrap()
    }

    #[test]
    fn identity_folding_add_zero_mul_one() {
        let x = var("x", 64);
        let zero = Expr::constant(BvInt::zero(64));
        let one = Expr::constant(BvInt::new(1, 64));
        let sum = Expr::binary(Operator::Add, x.clone(), zero).unwrap();
        assert_eq!(sum, x);
        let prod = Expr::binary(Operator::Mul, sum, one).unwrap();
        assert_eq!(prod, x);
        assert!(prod.complexity() <= x.complexity());
    }

    #[test]
    fn constant_folding() {
        let a = Expr::constant(BvInt::new(10, 64));
        let b = Expr::constant(BvInt::new(20, 64));
        let sum = Expr::binary(Operator::Add, a, b).unwrap();
        let c = Expr::constant(BvInt::new(5, 64));
        let d = Expr::constant(BvInt::new(3, 64));
        let sum2 = Expr::binary(Operator::Add, c, d).unwrap();
        let total = Expr::binary(Operator::Mul, sum, sum2).unwrap();
        assert_eq!(total.as_constant(), Some(BvInt::new(240, 64)));
    }

    #[test]
    fn involution_not_and_neg() {
        let x = var("x", 32);
        let nn = Expr::unary(Operator::Not, Expr::unary(Operator::Not, x.clone()).unwrap()).unwrap();
        assert_eq!(nn, x);
        let neg2 = Expr::unary(Operator::Neg, Expr::unary(Operator::Neg, x.clone()).unwrap()).unwrap();
        assert_eq!(neg2, x);
    }

    #[test]
    fn xor_self_is_zero() {
        let x = var("x", 16);
        let z = Expr::binary(Operator::Xor, x.clone(), x).unwrap();
        assert_eq!(z.as_constant(), Some(BvInt::zero(16)));
    }

    #[test]
    fn width_mismatch_is_rejected() {
        let a = var("a", 32);
        let b = var("b", 64);
        let err = Expr::binary(Operator::Add, a, b).unwrap_err();
        assert!(matches!(err, ExprError::WidthMismatch { .. }));
    }

    #[test]
    fn hash_agrees_with_equality() {
        let a = Expr::binary(Operator::Add, var("x", 32), Expr::constant(BvInt::new(1, 32))).unwrap();
        let b = Expr::binary(Operator::Add, var("x", 32), Expr::constant(BvInt::new(1, 32))).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.hash_value(), b.hash_value());
    }

    #[test]
    fn shift_amount_width_need_not_match() {
        let x = var("x", 64);
        let amt = Expr::constant(BvInt::new(3, 8));
        let shifted = Expr::binary(Operator::Shl, x, amt);
        assert!(shifted.is_ok());
    }

    #[test]
    fn variables_set_is_union_of_children() {
        let x = var("x", 32);
        let y = var("y", 32);
        let sum = Expr::binary(Operator::Add, x, y).unwrap();
        assert_eq!(sum.variables().len(), 2);
    }
}
