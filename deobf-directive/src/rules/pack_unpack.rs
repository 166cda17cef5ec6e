use super::Rule;
use crate::directive::{Directive, Helper};
use deobf_expr::Operator;

/// Fold primitive operator chains back into the compound `__bt`/`__min`/
/// `__max` forms used for pretty-printing, mirroring exactly the shapes
/// [`crate::transformer::instantiate_helper`] produces when expanding them.
pub fn pack_rules() -> Vec<Rule> {
    vec![
        Rule {
            name: "pack_bt",
            pattern: bt_mask_guard(
                "M",
                Directive::un(
                    Operator::Ucast,
                    Directive::bin(
                        Operator::And,
                        Directive::bin(Operator::Shr, Directive::any("V"), Directive::any("B")),
                        Directive::constant_var("M"),
                    ),
                ),
            ),
            template: Directive::Helper(Helper::Bt {
                value: Box::new(Directive::any("V")),
                bit: Box::new(Directive::any("B")),
            }),
            force: false,
        },
        Rule {
            name: "pack_min",
            pattern: Directive::bin(Operator::Xor, Directive::any("B"), ult_mask_term()),
            template: Directive::Helper(Helper::Min {
                a: Box::new(Directive::any("A")),
                b: Box::new(Directive::any("B")),
            }),
            force: false,
        },
        Rule {
            name: "pack_max",
            pattern: Directive::bin(Operator::Xor, Directive::any("A"), ult_mask_term()),
            template: Directive::Helper(Helper::Max {
                a: Box::new(Directive::any("A")),
                b: Box::new(Directive::any("B")),
            }),
            force: false,
        },
    ]
}

/// No compound form ever reaches the expression DAG itself — `__bt`/`__min`/
/// `__max` exist only inside directive templates, expanded to primitive
/// operators the moment a rewrite fires. There is therefore nothing in a
/// real subject for an unpack rule to match against; the empty table is the
/// correct reflection of that, not an oversight.
pub fn unpack_rules() -> Vec<Rule> {
    Vec::new()
}

/// `and(shr(v, b), M)` only denotes a single-bit extraction when `M` is
/// exactly 1 at its own width.
fn bt_mask_guard(label: &'static str, body: Directive) -> Directive {
    Directive::iff(
        Directive::bin(
            Operator::Eq,
            Directive::any(label),
            Directive::ucast_to(Directive::lit(1, 1), crate::directive::SizeSpec::SameAs(label)),
        ),
        body,
    )
}

/// `and(xor(a, b), neg(ucast(ult(a, b))))`, shared by the min/max pack rules.
fn ult_mask_term() -> Directive {
    Directive::bin(
        Operator::And,
        Directive::bin(Operator::Xor, Directive::any("A"), Directive::any("B")),
        Directive::un(
            Operator::Neg,
            Directive::un(
                Operator::Ucast,
                Directive::bin(Operator::Ult, Directive::any("A"), Directive::any("B")),
            ),
        ),
    )
}
