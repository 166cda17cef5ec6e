use crate::UniqueId;
use deobf_bitvec::{BitCount, BvInt, Operator};
use std::cell::Cell;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// A compact, O(1)-comparable fingerprint used by the matcher (in
/// `deobf-directive`) to reject impossible pattern/subject pairs before
/// attempting a recursive structural match. Built bottom-up: each node's
/// signature is its own tag bit OR'd with its children's, so a pattern's
/// signature can only be a *subset* of any subject it could possibly match.
pub type Signature = u64;

/// The shape of one DAG node. `Operation`'s `lhs` is `None` exactly when
/// `op` is unary.
#[derive(Clone)]
pub enum ExprKind {
    Constant(BvInt),
    Variable(UniqueId, BitCount),
    Operation {
        op: Operator,
        lhs: Option<Expr>,
        rhs: Expr,
        size: BitCount,
    },
}

struct ExprNode {
    kind: ExprKind,
    hash: u64,
    signature: Signature,
    complexity: f64,
    depth: u32,
    contains_variable: bool,
    variables: Rc<HashSet<UniqueId>>,
    /// Set by the simplifier once it has established a fixed point for
    /// this node; a pure hint, not part of identity.
    is_simplified: Cell<bool>,
}

/// A node in the immutable, shared expression DAG.
///
/// `Expr` is a cheap `Rc` handle: cloning is O(1) and shares the underlying
/// allocation. Expressions are never mutated after construction; every
/// transformation (folding, rewriting) produces a new `Expr`.
#[derive(Clone)]
pub struct Expr(Rc<ExprNode>);

impl Expr {
    pub(crate) fn from_parts(
        kind: ExprKind,
        hash: u64,
        signature: Signature,
        complexity: f64,
        depth: u32,
        contains_variable: bool,
        variables: Rc<HashSet<UniqueId>>,
    ) -> Self {
        Expr(Rc::new(ExprNode {
            kind,
            hash,
            signature,
            complexity,
            depth,
            contains_variable,
            variables,
            is_simplified: Cell::new(false),
        }))
    }

    /// The node's shape: constant, variable, or operation.
    pub fn kind(&self) -> &ExprKind {
        &self.0.kind
    }

    /// The bit width this expression evaluates to.
    pub fn size(&self) -> BitCount {
        match &self.0.kind {
            ExprKind::Constant(c) => c.width(),
            ExprKind::Variable(_, size) => *size,
            ExprKind::Operation { size, .. } => *size,
        }
    }

    /// The cached structural hash. `a == b` implies `a.hash() == b.hash()`.
    pub fn hash_value(&self) -> u64 {
        self.0.hash
    }

    /// The O(1) match-prefilter fingerprint.
    pub fn signature(&self) -> Signature {
        self.0.signature
    }

    /// Structural complexity: 0 for constants, 1 for variables, and for
    /// operations the sum of the children's complexity plus 1, with a small
    /// bonus for comparisons and casts. Strictly positive for non-constants,
    /// monotone over structural growth — this is the metric the transformer
    /// uses as its acceptance filter (§4.4).
    pub fn complexity(&self) -> f64 {
        self.0.complexity
    }

    /// Length of the longest root-to-leaf path.
    pub fn depth(&self) -> u32 {
        self.0.depth
    }

    /// True iff any variable occurs anywhere in this expression.
    pub fn contains_variable(&self) -> bool {
        self.0.contains_variable
    }

    /// True iff this expression has no variables (i.e. is fully constant).
    pub fn is_constant(&self) -> bool {
        matches!(self.0.kind, ExprKind::Constant(_))
    }

    /// The set of distinct variables occurring in this expression.
    pub fn variables(&self) -> &HashSet<UniqueId> {
        &self.0.variables
    }

    /// Whether the simplifier has already established this node is at a
    /// fixed point. A pure hint: false negatives only cost redundant work,
    /// never correctness.
    pub fn is_simplified_hint(&self) -> bool {
        self.0.is_simplified.get()
    }

    /// Mark this node as simplifier-final. Called only by `deobf-simplify`.
    pub fn mark_simplified(&self) {
        self.0.is_simplified.set(true);
    }

    /// Get the constant value, if this is a `Constant` node.
    pub fn as_constant(&self) -> Option<BvInt> {
        match self.0.kind {
            ExprKind::Constant(c) => Some(c),
            _ => None,
        }
    }

    /// Get the `(uid, size)` pair, if this is a `Variable` node.
    pub fn as_variable(&self) -> Option<(&UniqueId, BitCount)> {
        match &self.0.kind {
            ExprKind::Variable(uid, size) => Some((uid, *size)),
            _ => None,
        }
    }

    /// Get `(op, lhs, rhs, size)`, if this is an `Operation` node.
    pub fn as_operation(&self) -> Option<(Operator, Option<&Expr>, &Expr, BitCount)> {
        match &self.0.kind {
            ExprKind::Operation { op, lhs, rhs, size } => Some((*op, lhs.as_ref(), rhs, *size)),
            _ => None,
        }
    }

    /// Pointer identity, for fast-path equality checks (two clones of the
    /// same `Rc` are trivially equal without inspecting structure).
    pub fn ptr_eq(&self, other: &Expr) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn variables_rc(&self) -> Rc<HashSet<UniqueId>> {
        Rc::clone(&self.0.variables)
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.0.hash != other.0.hash {
            return false;
        }
        match (&self.0.kind, &other.0.kind) {
            (ExprKind::Constant(a), ExprKind::Constant(b)) => a == b,
            (ExprKind::Variable(a, sa), ExprKind::Variable(b, sb)) => a == b && sa == sb,
            (
                ExprKind::Operation {
                    op: oa,
                    lhs: la,
                    rhs: ra,
                    size: sa,
                },
                ExprKind::Operation {
                    op: ob,
                    lhs: lb,
                    rhs: rb,
                    size: sb,
                },
            ) => oa == ob && sa == sb && la == lb && ra == rb,
            _ => false,
        }
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match &self.0.kind {
            ExprKind::Constant(c) => write!(f, "{c}"),
            ExprKind::Variable(uid, size) => write!(f, "{uid}:i{size}"),
            ExprKind::Operation {
                op, lhs, rhs, size, ..
            } => match lhs {
                Some(l) => write!(f, "({:?} {} {:?}):i{}", l, op.info().symbol, rhs, size),
                None => write!(f, "({}{:?}):i{}", op.info().symbol, rhs, size),
            },
        }
    }
}
