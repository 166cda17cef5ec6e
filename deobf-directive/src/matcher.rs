use crate::directive::{Directive, MetaKind};
use crate::hook::SimplifyHook;
use crate::symtab::SymbolTable;
use crate::transformer::instantiate;
use deobf_expr::Expr;

/// Match `pattern` against `subject`, filling `table` with captures on
/// success. The matcher is deterministic and side-effect free on failure —
/// `table` is only mutated when the whole match succeeds.
pub fn try_match(
    pattern: &Directive,
    subject: &Expr,
    table: &mut SymbolTable,
    hook: &dyn SimplifyHook,
) -> bool {
    if pattern.signature() & subject.signature() != pattern.signature() {
        return false;
    }
    let mut trial = table.clone();
    if match_inner(pattern, subject, &mut trial, hook) {
        log::trace!("pattern matched subject {subject:?}, {} binding(s)", trial.len());
        *table = trial;
        true
    } else {
        false
    }
}

fn match_inner(
    pattern: &Directive,
    subject: &Expr,
    table: &mut SymbolTable,
    hook: &dyn SimplifyHook,
) -> bool {
    match pattern {
        Directive::Constant(v) => subject.as_constant() == Some(*v),

        Directive::Meta(label, MetaKind::Any) => table.try_bind(label, subject.clone()),

        Directive::Meta(label, MetaKind::ConstOnly) => {
            subject.is_constant() && table.try_bind(label, subject.clone())
        }

        Directive::Meta(label, MetaKind::NonConst) => {
            !subject.is_constant() && table.try_bind(label, subject.clone())
        }

        Directive::Operation { op, lhs, rhs } => match subject.as_operation() {
            Some((subject_op, subject_lhs, subject_rhs, _)) if subject_op == *op => {
                match (lhs, subject_lhs) {
                    (Some(pat_lhs), Some(sub_lhs)) => {
                        let mut direct = table.clone();
                        if match_inner(pat_lhs, sub_lhs, &mut direct, hook)
                            && match_inner(rhs, subject_rhs, &mut direct, hook)
                        {
                            *table = direct;
                            return true;
                        }
                        if op.info().commutative {
                            let mut swapped = table.clone();
                            if match_inner(pat_lhs, subject_rhs, &mut swapped, hook)
                                && match_inner(rhs, sub_lhs, &mut swapped, hook)
                            {
                                *table = swapped;
                                return true;
                            }
                        }
                        false
                    }
                    (None, None) => match_inner(rhs, subject_rhs, table, hook),
                    _ => false,
                }
            }
            _ => false,
        },

        Directive::Iff { cond, body } => {
            match_inner(body, subject, table, hook) && cond_holds(cond, table, hook, true)
        }

        Directive::IfTrue { cond, body } => {
            match_inner(body, subject, table, hook) && cond_holds(cond, table, hook, true)
        }

        Directive::IfFalse { cond, body } => {
            match_inner(body, subject, table, hook) && cond_holds(cond, table, hook, false)
        }

        // Template-only constructs never appear in a pattern.
        Directive::Helper(_) | Directive::Resize { .. } => false,
    }
}

fn cond_holds(
    cond: &Directive,
    table: &SymbolTable,
    hook: &dyn SimplifyHook,
    want_nonzero: bool,
) -> bool {
    let Some(instantiated) = instantiate(cond, table, hook) else {
        return false;
    };
    let reduced = hook.simplify(&instantiated);
    match reduced.as_constant() {
        Some(v) => v.is_zero() != want_nonzero,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::NoopHook;
    use deobf_bitvec::{BvInt, Operator};
    use deobf_expr::UniqueId;

    fn var(name: &str, size: deobf_bitvec::BitCount) -> Expr {
        Expr::variable(UniqueId::named(name), size).unwrap()
    }

    #[test]
    fn any_meta_var_binds_and_rebinding_requires_equality() {
        let pattern = Directive::bin(Operator::Add, Directive::any("A"), Directive::any("A"));
        let x = var("x", 32);
        let subject = Expr::binary(Operator::Add, x.clone(), x.clone()).unwrap();
        let mut table = SymbolTable::new();
        assert!(try_match(&pattern, &subject, &mut table, &NoopHook));
        assert_eq!(table.get("A"), Some(&x));
    }

    #[test]
    fn rejects_when_same_label_sees_different_subexpressions() {
        let pattern = Directive::bin(Operator::Add, Directive::any("A"), Directive::any("A"));
        let x = var("x", 32);
        let y = var("y", 32);
        let subject = Expr::binary(Operator::Sub, x, y).unwrap(); // not even Add
        let mut table = SymbolTable::new();
        assert!(!try_match(&pattern, &subject, &mut table, &NoopHook));
    }

    #[test]
    fn commutative_operator_tries_both_orderings() {
        let pattern = Directive::bin(Operator::Add, Directive::constant_var("U"), Directive::non_const("X"));
        let x = var("x", 32);
        let c = Expr::constant(BvInt::new(5, 32));
        // subject has the constant on the right; pattern expects it on the left.
        let subject = Expr::binary(Operator::Add, x.clone(), c.clone()).unwrap();
        let mut table = SymbolTable::new();
        assert!(try_match(&pattern, &subject, &mut table, &NoopHook));
        assert_eq!(table.get("U"), Some(&c));
        assert_eq!(table.get("X"), Some(&x));
    }

    #[test]
    fn const_only_meta_rejects_non_constants() {
        let pattern = Directive::constant_var("U");
        let x = var("x", 32);
        let mut table = SymbolTable::new();
        assert!(!try_match(&pattern, &x, &mut table, &NoopHook));
    }
}
