use super::Rule;
use crate::directive::Directive;
use deobf_expr::Operator;

/// Comparison-centric rewrites, applied only when the subject's top operator
/// is itself a comparison or a boolean combination of comparisons (§4.5).
pub fn boolean_rules() -> Vec<Rule> {
    vec![
        // (A > B) & (A > C)  ->  if B >= C then (A > B) else (A > C).
        Rule {
            name: "conjunction_of_sgt_shares_operand_true_branch",
            pattern: Directive::if_true(
                Directive::bin(Operator::Sge, Directive::any("B"), Directive::any("C")),
                Directive::bin(
                    Operator::And,
                    Directive::bin(Operator::Sgt, Directive::any("A"), Directive::any("B")),
                    Directive::bin(Operator::Sgt, Directive::any("A"), Directive::any("C")),
                ),
            ),
            template: Directive::bin(Operator::Sgt, Directive::any("A"), Directive::any("B")),
            force: false,
        },
        Rule {
            name: "conjunction_of_sgt_shares_operand_false_branch",
            pattern: Directive::if_false(
                Directive::bin(Operator::Sge, Directive::any("B"), Directive::any("C")),
                Directive::bin(
                    Operator::And,
                    Directive::bin(Operator::Sgt, Directive::any("A"), Directive::any("B")),
                    Directive::bin(Operator::Sgt, Directive::any("A"), Directive::any("C")),
                ),
            ),
            template: Directive::bin(Operator::Sgt, Directive::any("A"), Directive::any("C")),
            force: false,
        },
        // (A u< B) | (A == B)  ->  A u<= B
        Rule {
            name: "ult_or_eq_is_ule",
            pattern: Directive::bin(
                Operator::Or,
                Directive::bin(Operator::Ult, Directive::any("A"), Directive::any("B")),
                Directive::bin(Operator::Eq, Directive::any("A"), Directive::any("B")),
            ),
            template: Directive::bin(Operator::Ule, Directive::any("A"), Directive::any("B")),
            force: false,
        },
    ]
}
