use deobf_expr::{BitCount, BvInt, Operator, Signature};

/// Which subjects a meta-variable is allowed to bind to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaKind {
    /// `A, B, C, …` — matches any expression.
    Any,
    /// `U, V, Σ, …` — matches constants only.
    ConstOnly,
    /// `X, Y, …` — matches variables or operations, never constants.
    NonConst,
}

/// A pattern/template node. Shares the shape of [`deobf_expr::Expr`] plus
/// typed meta-variables and the handful of directive-only operators that
/// only ever appear in templates (§3).
#[derive(Debug, Clone)]
pub enum Directive {
    Constant(BvInt),
    Meta(&'static str, MetaKind),
    Operation {
        op: Operator,
        lhs: Option<Box<Directive>>,
        rhs: Box<Directive>,
    },
    /// Apply `body` only if `cond` reduces to a nonzero constant once
    /// bindings are substituted in (checked by the matcher when `iff`
    /// appears in a pattern; evaluated unconditionally when it appears in a
    /// template, since a template-side `iff` is just conditional sugar).
    Iff {
        cond: Box<Directive>,
        body: Box<Directive>,
    },
    IfTrue {
        cond: Box<Directive>,
        body: Box<Directive>,
    },
    IfFalse {
        cond: Box<Directive>,
        body: Box<Directive>,
    },
    Helper(Helper),
    /// Resize `operand` to `size`, template-only (the generic `Operation`
    /// variant is what matches an existing `cast`/`ucast` node *in a
    /// subject*; this variant is how a template *constructs* a resize to a
    /// width that isn't simply "whatever the matched subexpression's width
    /// already is").
    Resize {
        kind: ResizeKind,
        operand: Box<Directive>,
        size: SizeSpec,
    },
}

/// Sign-extending vs. zero-extending resize, mirroring `cast`/`ucast`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeKind {
    Signed,
    Unsigned,
}

/// How a template computes the width to resize to.
#[derive(Debug, Clone, Copy)]
pub enum SizeSpec {
    /// A literal width.
    Explicit(BitCount),
    /// The width of whatever expression a meta-variable is bound to.
    SameAs(&'static str),
}

/// Template-only helpers (§3). None of these may appear in a pattern; the
/// matcher never visits them.
#[derive(Debug, Clone)]
pub enum Helper {
    /// Fully simplify the instantiated argument before substituting it in.
    Simplify(Box<Directive>),
    /// Like `Simplify`, but only substitutes the simplified form if doing
    /// so does not increase complexity; otherwise keeps the original.
    TrySimplify(Box<Directive>),
    /// Expand any compound pack form nested in the argument back to
    /// primitive operators.
    Unpack(Box<Directive>),
    /// Extract a single flag bit (bit 0) from the argument.
    PopFlags(Box<Directive>),
    /// Extract bit `bit` of `value` as a 1-bit value.
    Bt {
        value: Box<Directive>,
        bit: Box<Directive>,
    },
    /// Unsigned minimum of `a` and `b`.
    Min {
        a: Box<Directive>,
        b: Box<Directive>,
    },
    /// Unsigned maximum of `a` and `b`.
    Max {
        a: Box<Directive>,
        b: Box<Directive>,
    },
}

impl Directive {
    /// A meta-variable that matches any expression.
    pub fn any(label: &'static str) -> Directive {
        Directive::Meta(label, MetaKind::Any)
    }

    /// A meta-variable that matches constants only.
    pub fn constant_var(label: &'static str) -> Directive {
        Directive::Meta(label, MetaKind::ConstOnly)
    }

    /// A meta-variable that matches variables or operations, never a bare
    /// constant.
    pub fn non_const(label: &'static str) -> Directive {
        Directive::Meta(label, MetaKind::NonConst)
    }

    /// A literal constant the subject must structurally equal.
    pub fn lit(value: i128, width: BitCount) -> Directive {
        Directive::Constant(BvInt::new(value, width))
    }

    /// A binary operation pattern/template.
    pub fn bin(op: Operator, lhs: Directive, rhs: Directive) -> Directive {
        Directive::Operation {
            op,
            lhs: Some(Box::new(lhs)),
            rhs: Box::new(rhs),
        }
    }

    /// A unary operation pattern/template.
    pub fn un(op: Operator, operand: Directive) -> Directive {
        Directive::Operation {
            op,
            lhs: None,
            rhs: Box::new(operand),
        }
    }

    pub fn iff(cond: Directive, body: Directive) -> Directive {
        Directive::Iff {
            cond: Box::new(cond),
            body: Box::new(body),
        }
    }

    pub fn if_true(cond: Directive, body: Directive) -> Directive {
        Directive::IfTrue {
            cond: Box::new(cond),
            body: Box::new(body),
        }
    }

    pub fn if_false(cond: Directive, body: Directive) -> Directive {
        Directive::IfFalse {
            cond: Box::new(cond),
            body: Box::new(body),
        }
    }

    /// Template-only: sign-extend/truncate `operand` to `size`.
    pub fn cast_to(operand: Directive, size: SizeSpec) -> Directive {
        Directive::Resize {
            kind: ResizeKind::Signed,
            operand: Box::new(operand),
            size,
        }
    }

    /// Template-only: zero-extend/truncate `operand` to `size`.
    pub fn ucast_to(operand: Directive, size: SizeSpec) -> Directive {
        Directive::Resize {
            kind: ResizeKind::Unsigned,
            operand: Box::new(operand),
            size,
        }
    }

    /// The O(1) prefilter signature for this directive, computed the same
    /// way [`deobf_expr::Expr::signature`] is: a feature bit for this
    /// node's own shape, OR'd with its children's. Meta-variables of kind
    /// `Any`/`NonConst` contribute no bits (they cannot be used to reject
    /// anything), which keeps the filter sound — it may fail to reject an
    /// impossible match, but it never rejects a possible one.
    pub fn signature(&self) -> Signature {
        match self {
            Directive::Constant(_) => 1 << 0,
            Directive::Meta(_, MetaKind::ConstOnly) => 1 << 0,
            Directive::Meta(_, MetaKind::Any | MetaKind::NonConst) => 0,
            Directive::Operation { op, lhs, rhs } => {
                let op_bit = 2 + (*op as u64 % 60);
                let mut sig = 1 << op_bit;
                if let Some(l) = lhs {
                    sig |= l.signature();
                }
                sig |= rhs.signature();
                sig
            }
            Directive::Iff { body, .. }
            | Directive::IfTrue { body, .. }
            | Directive::IfFalse { body, .. } => body.signature(),
            Directive::Helper(_) => 0,
            Directive::Resize { operand, .. } => operand.signature(),
        }
    }
}
