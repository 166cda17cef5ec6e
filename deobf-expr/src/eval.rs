use crate::node::Expr;
use crate::uid::UniqueId;
use deobf_bitvec::BvInt;
use std::collections::HashMap;

impl Expr {
    /// Evaluate this expression under a concrete assignment of its free
    /// variables, independent of any caching or rewriting. Returns `None`
    /// if a variable is unassigned or an operator is undefined on its
    /// inputs (e.g. division by zero) — never panics.
    ///
    /// This is the reference semantics the simplifier's rewrites must
    /// preserve (§8, "semantic preservation"); it intentionally does not
    /// share code with `deobf-simplify` so that property tests comparing
    /// the two are meaningful.
    pub fn evaluate(&self, env: &HashMap<UniqueId, BvInt>) -> Option<BvInt> {
        match self.kind() {
            crate::node::ExprKind::Constant(c) => Some(*c),
            crate::node::ExprKind::Variable(uid, _) => env.get(uid).copied(),
            crate::node::ExprKind::Operation { op, lhs, rhs, size } => {
                let rhs_v = rhs.evaluate(env)?;
                let mut args = Vec::with_capacity(2);
                if let Some(l) = lhs {
                    args.push(l.evaluate(env)?);
                    args.push(rhs_v);
                } else {
                    args.push(rhs_v);
                }
                op.eval(&args, *size)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_bitvec::Operator;

    #[test]
    fn evaluates_constant_folded_shape() {
        let x = Expr::variable(UniqueId::named("x"), 64).unwrap();
        let plus_one = Expr::binary(Operator::Add, x.clone(), Expr::constant(BvInt::new(1, 64))).unwrap();
        let mut env = HashMap::new();
        env.insert(UniqueId::named("x"), BvInt::new(41, 64));
        assert_eq!(plus_one.evaluate(&env), Some(BvInt::new(42, 64)));
    }

    #[test]
    fn unassigned_variable_yields_none() {
        let x = Expr::variable(UniqueId::named("x"), 64).unwrap();
        assert_eq!(x.evaluate(&HashMap::new()), None);
    }
}
