use deobf_expr::Expr;

/// The directive engine's only dependency "upward" onto the simplifier:
/// the `simplify`/`try_simplify` template helpers and the `iff` match
/// condition all need to reduce an instantiated expression to a constant,
/// which requires running the full fixed-point simplifier — a job that
/// belongs to `deobf-simplify`, a crate that itself depends on this one.
///
/// Rather than introduce a cycle, `deobf-simplify` implements this trait
/// and passes `&dyn SimplifyHook` down into [`crate::matcher::try_match`]
/// and [`crate::transformer::transform`].
pub trait SimplifyHook {
    /// Reduce `e` to its simplified form.
    fn simplify(&self, e: &Expr) -> Expr;
}

/// A hook that performs no simplification. `iff` conditions that don't
/// already fold to a constant via the smart constructors alone will fail to
/// match under this hook; `simplify`/`try_simplify` templates become a
/// no-op. Useful for unit-testing the matcher/transformer in isolation.
pub struct NoopHook;

impl SimplifyHook for NoopHook {
    fn simplify(&self, e: &Expr) -> Expr {
        e.clone()
    }
}
