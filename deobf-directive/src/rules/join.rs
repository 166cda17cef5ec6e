use super::Rule;
use crate::directive::Directive;
use deobf_expr::Operator;

/// Non-commuting algebraic rearrangements: associativity and distribution.
/// These are tried only while `join_depth < JOIN_DEPTH_LIMIT` (enforced by
/// the simplifier driver, not here) since a rearrangement may momentarily
/// increase complexity before a later pass collapses it back down — hence
/// every rule here is `force: true`.
pub fn join_rules() -> Vec<Rule> {
    vec![
        right_associate("reassociate_add", Operator::Add),
        right_associate("reassociate_mul", Operator::Mul),
        right_associate("reassociate_and", Operator::And),
        right_associate("reassociate_or", Operator::Or),
        right_associate("reassociate_xor", Operator::Xor),
        Rule {
            name: "distribute_mul_over_add",
            pattern: Directive::bin(
                Operator::Mul,
                Directive::any("A"),
                Directive::bin(Operator::Add, Directive::any("B"), Directive::any("C")),
            ),
            template: Directive::bin(
                Operator::Add,
                Directive::bin(Operator::Mul, Directive::any("A"), Directive::any("B")),
                Directive::bin(Operator::Mul, Directive::any("A"), Directive::any("C")),
            ),
            force: true,
        },
        Rule {
            name: "distribute_and_over_or",
            pattern: Directive::bin(
                Operator::And,
                Directive::any("A"),
                Directive::bin(Operator::Or, Directive::any("B"), Directive::any("C")),
            ),
            template: Directive::bin(
                Operator::Or,
                Directive::bin(Operator::And, Directive::any("A"), Directive::any("B")),
                Directive::bin(Operator::And, Directive::any("A"), Directive::any("C")),
            ),
            force: true,
        },
    ]
}

/// `(A op B) op C  ->  A op (B op C)`, for an associative operator.
fn right_associate(name: &'static str, op: Operator) -> Rule {
    Rule {
        name,
        pattern: Directive::bin(
            op,
            Directive::bin(op, Directive::any("A"), Directive::any("B")),
            Directive::any("C"),
        ),
        template: Directive::bin(
            op,
            Directive::any("A"),
            Directive::bin(op, Directive::any("B"), Directive::any("C")),
        ),
        force: true,
    }
}
