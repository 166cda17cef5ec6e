use crate::config::SimplifierConfig;
use crate::state;
use deobf_directive::{
    boolean_rules, join_rules, pack_rules, transform, unpack_rules, universal_rules, SimplifyHook,
};
use deobf_expr::{BitCount, Expr, ExprKind, Operator};

/// Reduce `e` to a fixed point under the universal, boolean, join, and (when
/// requested) pack/unpack rule tables, using `config`'s default `pretty`/
/// `unpack` settings (§4.6).
pub fn simplify(e: &Expr, config: &SimplifierConfig) -> Expr {
    simplify_with(e, config, config.pretty, config.unpack)
}

/// As [`simplify`], with `pretty`/`unpack` given explicitly rather than
/// taken from `config`.
///
/// The memoization cache is keyed on the input expression alone, not on
/// `(expression, pretty, unpack)` — the cache shape is
/// `Expression -> (SimplifiedExpression, is_final)`. Mixing
/// `pretty`/`unpack` settings for the same subexpression across calls on one
/// thread will therefore observe whichever variant was computed first; call
/// [`crate::purge_state`] between runs that need a different setting.
pub fn simplify_with(e: &Expr, config: &SimplifierConfig, pretty: bool, unpack: bool) -> Expr {
    if let Some((cached, _)) = state::cache_get(e) {
        return cached;
    }
    if !state::enter(e) {
        // Reentrant: some rule's template ended up asking to simplify the
        // very node currently being reduced. Bail out without caching.
        return e.clone();
    }
    let result = simplify_uncached(e, config, pretty, unpack);
    state::exit();
    state::cache_insert(config, e.clone(), result.clone(), true);
    result.mark_simplified();
    result
}

fn simplify_uncached(e: &Expr, config: &SimplifierConfig, pretty: bool, unpack: bool) -> Expr {
    let (op, lhs, rhs, size) = match e.kind() {
        // Fast path: constants and variables are already in normal form.
        ExprKind::Constant(_) | ExprKind::Variable(_, _) => return e.clone(),
        ExprKind::Operation { op, lhs, rhs, size } => (*op, lhs.clone(), rhs.clone(), *size),
    };

    // Bottom-up: simplify children before touching this node.
    let new_rhs = simplify_with(&rhs, config, pretty, unpack);
    let new_lhs = lhs.map(|l| simplify_with(&l, config, pretty, unpack));
    let reconstructed = reconstruct(op, new_lhs, new_rhs, size);

    // Partial evaluation: if bottom-up reconstruction already folded this
    // node to a constant (the smart constructors fold eagerly whenever both
    // operands are now constant), there is nothing further to rewrite.
    // Symbolic marker operators are never matched or rewritten either.
    if reconstructed.is_constant() || op.info().symbolic {
        return reconstructed;
    }

    let hook = Hook { config };

    for rule in universal_rules() {
        if let Some(rewritten) = transform(&reconstructed, &rule.pattern, &rule.template, &hook, rule.force) {
            log::trace!("universal rule `{}` fired on {reconstructed:?}", rule.name);
            return simplify_with(&rewritten, config, pretty, unpack);
        }
    }

    // `And`/`Or` feed the rules that fold a pair of comparisons sharing an
    // operand (boolean.rs) — those rules match on the `And`/`Or` node
    // directly, not on a comparison at the top, so the gate has to admit
    // both on top of plain comparisons.
    if op.info().comparison || matches!(op, Operator::And | Operator::Or) {
        for rule in boolean_rules() {
            if let Some(rewritten) = transform(&reconstructed, &rule.pattern, &rule.template, &hook, rule.force) {
                log::trace!("boolean rule `{}` fired on {reconstructed:?}", rule.name);
                return simplify_with(&rewritten, config, pretty, unpack);
            }
        }
    }

    if state::join_depth() < config.join_depth_limit {
        state::join_enter();
        for rule in join_rules() {
            if let Some(rewritten) = transform(&reconstructed, &rule.pattern, &rule.template, &hook, rule.force) {
                log::trace!("join rule `{}` fired on {reconstructed:?}", rule.name);
                state::join_exit();
                return simplify_with(&rewritten, config, pretty, unpack);
            }
        }
        state::join_exit();
    }

    if pretty {
        for rule in pack_rules() {
            if let Some(rewritten) = transform(&reconstructed, &rule.pattern, &rule.template, &hook, rule.force) {
                log::trace!("pack rule `{}` fired on {reconstructed:?}", rule.name);
                return simplify_with(&rewritten, config, pretty, unpack);
            }
        }
    }

    if unpack {
        for rule in unpack_rules() {
            if let Some(rewritten) = transform(&reconstructed, &rule.pattern, &rule.template, &hook, rule.force) {
                log::trace!("unpack rule `{}` fired on {reconstructed:?}", rule.name);
                return simplify_with(&rewritten, config, pretty, unpack);
            }
        }
    }

    reconstructed
}

fn reconstruct(op: Operator, lhs: Option<Expr>, rhs: Expr, size: BitCount) -> Expr {
    match op {
        Operator::Cast => Expr::cast(rhs, size).expect("simplification preserves width"),
        Operator::Ucast => Expr::ucast(rhs, size).expect("simplification preserves width"),
        _ => match lhs {
            Some(lhs) => Expr::binary(op, lhs, rhs).expect("simplification preserves arity/width"),
            None => Expr::unary(op, rhs).expect("simplification preserves arity/width"),
        },
    }
}

/// Feeds the fixed-point simplifier back into `deobf-directive` as its
/// `iff`/`simplify`/`try_simplify` evaluator, breaking the otherwise-circular
/// dependency between the two crates.
struct Hook<'a> {
    config: &'a SimplifierConfig,
}

impl SimplifyHook for Hook<'_> {
    fn simplify(&self, e: &Expr) -> Expr {
        simplify_with(e, self.config, false, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deobf_bitvec::BvInt;
    use deobf_expr::UniqueId;

    fn var(name: &str, size: BitCount) -> Expr {
        Expr::variable(UniqueId::named(name), size).unwrap()
    }

    #[test]
    fn sub_self_is_zero() {
        state::purge_state();
        let x = var("x", 32);
        let e = Expr::binary(Operator::Sub, x.clone(), x).unwrap();
        let config = SimplifierConfig::default();
        let simplified = simplify(&e, &config);
        assert_eq!(simplified.as_constant(), Some(BvInt::zero(32)));
    }

    #[test]
    fn double_not_cancels() {
        state::purge_state();
        let x = var("x", 16);
        let e = Expr::unary(Operator::Not, Expr::unary(Operator::Not, x.clone()).unwrap()).unwrap();
        let config = SimplifierConfig::default();
        assert_eq!(simplify(&e, &config), x);
    }

    #[test]
    fn not_eq_becomes_ne() {
        state::purge_state();
        let x = var("x", 32);
        let y = var("y", 32);
        let eq = Expr::binary(Operator::Eq, x.clone(), y.clone()).unwrap();
        let e = Expr::unary(Operator::Not, eq).unwrap();
        let config = SimplifierConfig::default();
        let simplified = simplify(&e, &config);
        let expected = Expr::binary(Operator::Ne, x, y).unwrap();
        assert_eq!(simplified, expected);
    }

    #[test]
    fn is_idempotent() {
        state::purge_state();
        let x = var("x", 8);
        let zero = Expr::constant(BvInt::zero(8));
        let e = Expr::binary(Operator::Add, x, zero).unwrap();
        let config = SimplifierConfig::default();
        let once = simplify(&e, &config);
        let twice = simplify(&once, &config);
        assert_eq!(once, twice);
    }

    #[test]
    fn conjunction_of_shared_sgt_picks_the_tighter_bound() {
        state::purge_state();
        let a = var("a", 32);
        let lhs = Expr::binary(Operator::Sgt, a.clone(), Expr::constant(BvInt::new(10, 32))).unwrap();
        let rhs = Expr::binary(Operator::Sgt, a.clone(), Expr::constant(BvInt::new(5, 32))).unwrap();
        let e = Expr::binary(Operator::And, lhs.clone(), rhs).unwrap();
        let config = SimplifierConfig::default();
        // 10 >= 5, so `a > 10` alone already implies `a > 5`.
        assert_eq!(simplify(&e, &config), lhs);
    }

    #[test]
    fn ult_or_eq_collapses_to_ule() {
        state::purge_state();
        let x = var("x", 32);
        let y = var("y", 32);
        let lt = Expr::binary(Operator::Ult, x.clone(), y.clone()).unwrap();
        let eq = Expr::binary(Operator::Eq, x.clone(), y.clone()).unwrap();
        let e = Expr::binary(Operator::Or, lt, eq).unwrap();
        let config = SimplifierConfig::default();
        let expected = Expr::binary(Operator::Ule, x, y).unwrap();
        assert_eq!(simplify(&e, &config), expected);
    }

    #[test]
    fn pretty_packs_bit_test() {
        state::purge_state();
        let v = var("v", 32);
        let b = var("b", 32);
        let shifted = Expr::binary(Operator::Shr, v, b).unwrap();
        let masked = Expr::binary(Operator::And, shifted, Expr::constant(BvInt::new(1, 32))).unwrap();
        let e = Expr::ucast(masked, 1).unwrap();
        let config = SimplifierConfig::default();
        let plain = simplify_with(&e, &config, false, false);
        // Without `pretty`, the primitive shape survives unchanged.
        assert_eq!(plain.size(), 1);
        state::purge_state();
        let pretty = simplify_with(&e, &config, true, false);
        assert_eq!(pretty.size(), 1);
    }
}
