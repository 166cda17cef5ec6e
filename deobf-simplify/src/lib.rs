//! The fixed-point expression simplifier: bottom-up rewriting over the four
//! directive rule classes, with a bounded
//! per-thread cache and a join-rewrite depth limit to guarantee termination.

mod config;
mod driver;
mod state;

pub use config::SimplifierConfig;
pub use driver::{simplify, simplify_with};
pub use state::purge_state;

#[cfg(test)]
mod proptests {
    use super::*;
    use deobf_bitvec::{BvInt, Operator};
    use deobf_expr::{BitCount, Expr, UniqueId};
    use proptest::prelude::*;

    fn small_width() -> impl Strategy<Value = BitCount> {
        prop_oneof![Just(8u16), Just(16), Just(32), Just(64)]
    }

    fn leaf(width: BitCount) -> impl Strategy<Value = Expr> {
        prop_oneof![
            any::<i64>().prop_map(move |v| Expr::constant(BvInt::new(v as i128, width))),
            Just(Expr::variable(UniqueId::named("x"), width).unwrap()),
            Just(Expr::variable(UniqueId::named("y"), width).unwrap()),
        ]
    }

    fn small_expr(width: BitCount) -> impl Strategy<Value = Expr> {
        let op = prop_oneof![
            Just(Operator::Add),
            Just(Operator::Sub),
            Just(Operator::And),
            Just(Operator::Or),
            Just(Operator::Xor),
        ];
        (leaf(width), leaf(width), op)
            .prop_map(|(a, b, op)| Expr::binary(op, a, b).unwrap())
    }

    proptest! {
        #[test]
        fn simplify_is_idempotent(w in small_width(), e in small_width().prop_flat_map(small_expr)) {
            let _ = w;
            purge_state();
            let config = SimplifierConfig::default();
            let once = simplify(&e, &config);
            let twice = simplify(&once, &config);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn simplify_never_increases_complexity(e in small_width().prop_flat_map(small_expr)) {
            purge_state();
            let config = SimplifierConfig::default();
            let simplified = simplify(&e, &config);
            prop_assert!(simplified.complexity() <= e.complexity());
        }

        #[test]
        fn simplify_preserves_evaluation(e in small_width().prop_flat_map(small_expr)) {
            use std::collections::HashMap;
            purge_state();
            let config = SimplifierConfig::default();
            let simplified = simplify(&e, &config);
            let mut env = HashMap::new();
            env.insert(UniqueId::named("x"), BvInt::new(3, e.size()));
            env.insert(UniqueId::named("y"), BvInt::new(5, e.size()));
            prop_assert_eq!(e.evaluate(&env), simplified.evaluate(&env));
        }
    }
}
