use super::Rule;
use crate::directive::{Directive, SizeSpec};
use deobf_expr::Operator;

/// Unconditional, complexity-non-increasing rewrites. Most of the
/// single-node identities (double negation, `x+0`, `x*1`, `x^x`, `x&x`…)
/// already fire inside the smart constructors (`deobf_expr::build`) and so
/// are never reached by this table — this table only covers the rewrites
/// that need a second, sibling node to recognize (comparison inversions,
/// `sub`/`mul` canonicalizations).
pub fn universal_rules() -> Vec<Rule> {
    vec![
        not_of_comparison("not_eq_is_ne", Operator::Eq, Operator::Ne),
        not_of_comparison("not_ne_is_eq", Operator::Ne, Operator::Eq),
        not_of_comparison("not_ult_is_uge", Operator::Ult, Operator::Uge),
        not_of_comparison("not_uge_is_ult", Operator::Uge, Operator::Ult),
        not_of_comparison("not_ule_is_ugt", Operator::Ule, Operator::Ugt),
        not_of_comparison("not_ugt_is_ule", Operator::Ugt, Operator::Ule),
        not_of_comparison("not_slt_is_sge", Operator::Slt, Operator::Sge),
        not_of_comparison("not_sge_is_slt", Operator::Sge, Operator::Slt),
        not_of_comparison("not_sle_is_sgt", Operator::Sle, Operator::Sgt),
        not_of_comparison("not_sgt_is_sle", Operator::Sgt, Operator::Sle),
        Rule {
            name: "sub_to_add_neg",
            pattern: Directive::bin(Operator::Sub, Directive::any("A"), Directive::any("B")),
            template: Directive::bin(
                Operator::Add,
                Directive::any("A"),
                Directive::un(Operator::Neg, Directive::any("B")),
            ),
            force: true,
        },
        Rule {
            name: "mul_by_minus_one_is_neg",
            pattern: minus_one_operand_guard("M", Directive::bin(Operator::Mul, Directive::any("A"), Directive::constant_var("M"))),
            template: Directive::un(Operator::Neg, Directive::any("A")),
            force: false,
        },
        Rule {
            name: "xor_all_ones_is_not",
            pattern: minus_one_operand_guard("M", Directive::bin(Operator::Xor, Directive::any("A"), Directive::constant_var("M"))),
            template: Directive::un(Operator::Not, Directive::any("A")),
            force: false,
        },
    ]
}

/// Wrap `body` (which must bind a constant meta-variable named `label`) in a
/// condition requiring that constant to equal -1 at its own width. `Resize`
/// directives only evaluate during instantiation, never during matching, so
/// this width-independent check has to live in the `iff` condition rather
/// than directly in the pattern.
fn minus_one_operand_guard(label: &'static str, body: Directive) -> Directive {
    Directive::iff(
        Directive::bin(Operator::Eq, Directive::any(label), minus_one_like(label)),
        body,
    )
}

fn not_of_comparison(name: &'static str, from: Operator, to: Operator) -> Rule {
    Rule {
        name,
        pattern: Directive::un(
            Operator::Not,
            Directive::bin(from, Directive::any("A"), Directive::any("B")),
        ),
        template: Directive::bin(to, Directive::any("A"), Directive::any("B")),
        force: false,
    }
}

/// A template fragment denoting "-1, at the width `label` is bound to":
/// sign-extending the single nonzero 1-bit value produces all-ones at any
/// target width.
fn minus_one_like(label: &'static str) -> Directive {
    Directive::cast_to(Directive::lit(1, 1), SizeSpec::SameAs(label))
}
