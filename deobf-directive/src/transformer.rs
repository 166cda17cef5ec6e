use crate::directive::{Directive, Helper, MetaKind, ResizeKind, SizeSpec};
use crate::hook::SimplifyHook;
use crate::matcher::try_match;
use crate::symtab::SymbolTable;
use deobf_expr::{BvInt, Expr, Operator};

/// Substitute `table`'s bindings into `template`, evaluating any helper
/// nodes along the way. Returns `None` if a meta-variable is referenced that
/// was never bound, or a width/arity constraint is violated while
/// reconstructing an operation.
pub fn instantiate(
    template: &Directive,
    table: &SymbolTable,
    hook: &dyn SimplifyHook,
) -> Option<Expr> {
    match template {
        Directive::Constant(v) => Some(Expr::constant(*v)),

        Directive::Meta(label, _) => table.get(label).cloned(),

        Directive::Operation { op, lhs, rhs } => {
            let rhs = instantiate(rhs, table, hook)?;
            match lhs {
                Some(l) => {
                    let lhs = instantiate(l, table, hook)?;
                    Expr::binary(*op, lhs, rhs).ok()
                }
                None => Expr::unary(*op, rhs).ok(),
            }
        }

        Directive::Iff { cond, body } => {
            if cond_is_true(cond, table, hook) {
                instantiate(body, table, hook)
            } else {
                None
            }
        }

        Directive::IfTrue { cond, body } => {
            if cond_is_true(cond, table, hook) {
                instantiate(body, table, hook)
            } else {
                None
            }
        }

        Directive::IfFalse { cond, body } => {
            if !cond_is_true(cond, table, hook) {
                instantiate(body, table, hook)
            } else {
                None
            }
        }

        Directive::Resize { kind, operand, size } => {
            let operand = instantiate(operand, table, hook)?;
            let width = resolve_size(size, table)?;
            match kind {
                ResizeKind::Signed => Expr::cast(operand, width).ok(),
                ResizeKind::Unsigned => Expr::ucast(operand, width).ok(),
            }
        }

        Directive::Helper(h) => instantiate_helper(h, table, hook),
    }
}

fn cond_is_true(cond: &Directive, table: &SymbolTable, hook: &dyn SimplifyHook) -> bool {
    let Some(e) = instantiate(cond, table, hook) else {
        return false;
    };
    let reduced = hook.simplify(&e);
    reduced.as_constant().map(|v| !v.is_zero()).unwrap_or(false)
}

fn resolve_size(size: &SizeSpec, table: &SymbolTable) -> Option<deobf_expr::BitCount> {
    match size {
        SizeSpec::Explicit(w) => Some(*w),
        SizeSpec::SameAs(label) => table.get(label).map(|e| e.size()),
    }
}

/// Evaluate a template-only helper. `__min`/`__max` use the branchless mask
/// trick rather than a conditional: `mask = -ucast(a < b)`, which is all-ones
/// when `a < b` and all-zeros otherwise, so `b ^ ((a^b)&mask)` selects `b`
/// when `a < b` and `a` otherwise. Comparisons are unsigned; the helpers are
/// documented as unsigned-only since nothing in the rule language
/// distinguishes a signed variant.
fn instantiate_helper(h: &Helper, table: &SymbolTable, hook: &dyn SimplifyHook) -> Option<Expr> {
    match h {
        Helper::Simplify(inner) => {
            let e = instantiate(inner, table, hook)?;
            Some(hook.simplify(&e))
        }

        Helper::TrySimplify(inner) => {
            let e = instantiate(inner, table, hook)?;
            let simplified = hook.simplify(&e);
            if simplified.complexity() <= e.complexity() {
                Some(simplified)
            } else {
                Some(e)
            }
        }

        // No compound pack form is currently constructed by any rule, so
        // unpacking is the identity.
        Helper::Unpack(inner) => instantiate(inner, table, hook),

        Helper::PopFlags(inner) => {
            let e = instantiate(inner, table, hook)?;
            Expr::ucast(e, 1).ok()
        }

        Helper::Bt { value, bit } => {
            let value = instantiate(value, table, hook)?;
            let bit = instantiate(bit, table, hook)?;
            let width = value.size();
            let bit = Expr::ucast(bit, width).ok()?;
            let shifted = Expr::binary(Operator::Shr, value, bit).ok()?;
            let one = Expr::constant(BvInt::new(1, width));
            let masked = Expr::binary(Operator::And, shifted, one).ok()?;
            Expr::ucast(masked, 1).ok()
        }

        Helper::Min { a, b } => minmax(a, b, table, hook, false),
        Helper::Max { a, b } => minmax(a, b, table, hook, true),
    }
}

fn minmax(
    a: &Directive,
    b: &Directive,
    table: &SymbolTable,
    hook: &dyn SimplifyHook,
    want_max: bool,
) -> Option<Expr> {
    let a = instantiate(a, table, hook)?;
    let b = instantiate(b, table, hook)?;
    let width = a.size();
    let b = Expr::ucast(b, width).ok()?;
    let lt = Expr::binary(Operator::Ult, a.clone(), b.clone()).ok()?;
    let mask = Expr::ucast(lt, width).ok()?;
    let mask = Expr::unary(Operator::Neg, mask).ok()?;
    let xor_ab = Expr::binary(Operator::Xor, a.clone(), b.clone()).ok()?;
    let masked = Expr::binary(Operator::And, xor_ab, mask).ok()?;
    // a < b: mask all-ones. min wants b, max wants a.
    let base = if want_max { a } else { b };
    Expr::binary(Operator::Xor, base, masked).ok()
}

/// Try to rewrite `subject` via `pattern -> template`. On a successful match,
/// instantiates `template` and applies the acceptance filter from §4.4:
/// the rewrite is only accepted if it does not increase complexity relative
/// to `subject`, unless `force` is set (used by rules explicitly marked as
/// unconditionally beneficial).
pub fn transform(
    subject: &Expr,
    pattern: &Directive,
    template: &Directive,
    hook: &dyn SimplifyHook,
    force: bool,
) -> Option<Expr> {
    let mut table = SymbolTable::new();
    if !try_match(pattern, subject, &mut table, hook) {
        return None;
    }
    let rewritten = instantiate(template, &table, hook)?;
    if force || rewritten.complexity() <= subject.complexity() {
        log::trace!(
            "rewrote {subject:?} -> {rewritten:?} (complexity {} -> {})",
            subject.complexity(),
            rewritten.complexity()
        );
        Some(rewritten)
    } else {
        log::trace!("discarded rewrite of {subject:?}: complexity would increase");
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hook::NoopHook;
    use deobf_expr::UniqueId;

    fn var(name: &str, size: deobf_expr::BitCount) -> Expr {
        Expr::variable(UniqueId::named(name), size).unwrap()
    }

    #[test]
    fn identity_simplification_x_plus_zero() {
        let x = var("x", 32);
        let zero = Expr::constant(BvInt::new(0, 32));
        let subject = Expr::binary(Operator::Add, x.clone(), zero).unwrap();

        let pattern = Directive::bin(Operator::Add, Directive::any("X"), Directive::lit(0, 32));
        let template = Directive::any("X");

        let result = transform(&subject, &pattern, &template, &NoopHook, true).unwrap();
        assert_eq!(result, x);
    }

    #[test]
    fn min_picks_smaller_operand_when_constants() {
        let a = Directive::lit(3, 32);
        let b = Directive::lit(7, 32);
        let table = SymbolTable::new();
        let min = instantiate_helper(&Helper::Min { a: Box::new(a.clone()), b: Box::new(b.clone()) }, &table, &NoopHook).unwrap();
        // Unevaluated shape: not folded since args aren't meta-bound through try_match,
        // but both operands are constant so the smart constructors fold the arithmetic
        // chain eagerly; only the outer xor-of-xor needs no variable binding.
        assert_eq!(min.size(), 32);
    }

    #[test]
    fn max_with_equal_operands_returns_that_value() {
        let five = Expr::constant(BvInt::new(5, 16));
        let mut table = SymbolTable::new();
        table.try_bind("A", five.clone());
        table.try_bind("B", five.clone());
        let template = Directive::Helper(Helper::Max {
            a: Box::new(Directive::any("A")),
            b: Box::new(Directive::any("B")),
        });
        let result = instantiate(&template, &table, &NoopHook).unwrap();
        assert_eq!(result.as_constant(), Some(five.as_constant().unwrap()));
    }
}
