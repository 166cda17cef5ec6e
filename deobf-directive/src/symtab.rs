use deobf_expr::Expr;

/// The bindings captured while matching a pattern against a subject.
///
/// Kept small and flat — real rules bind a handful of meta-variables at
/// most — rather than a hash map, since linear scan over a handful of
/// entries beats hashing for tables this size.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    bindings: Vec<(&'static str, Expr)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `label` to `expr`. If `label` is already bound, succeeds only
    /// if the existing binding is structurally equal to `expr` — this is
    /// what makes `A + A` only match subjects where both occurrences of `A`
    /// are the same subexpression.
    pub fn try_bind(&mut self, label: &'static str, expr: Expr) -> bool {
        if let Some((_, bound)) = self.bindings.iter().find(|(l, _)| *l == label) {
            return *bound == expr;
        }
        self.bindings.push((label, expr));
        true
    }

    /// Look up a previously bound meta-variable.
    pub fn get(&self, label: &str) -> Option<&Expr> {
        self.bindings.iter().find(|(l, _)| *l == label).map(|(_, e)| e)
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}
