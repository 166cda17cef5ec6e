//! The immutable, hash-consable bitvector expression DAG: constant/variable/
//! operation nodes plus their memoized derived attributes (hash, signature,
//! complexity, depth, variable set).
//!
//! Expressions are built exclusively through the smart constructors in
//! [`build`]; there is no public way to construct an [`Expr`] that skips
//! constant folding or the strict peephole identities.

mod build;
mod error;
mod eval;
mod node;
mod uid;

pub use deobf_bitvec::{BitCount, BvInt, Operator, OperatorInfo};
pub use error::ExprError;
pub use node::{Expr, ExprKind, Signature};
pub use uid::UniqueId;

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;

    fn small_width() -> impl Strategy<Value = BitCount> {
        prop_oneof![Just(8u16), Just(16), Just(32), Just(64)]
    }

    proptest! {
        #[test]
        fn complexity_never_negative(w in small_width(), v in any::<i64>()) {
            let e = Expr::constant(BvInt::new(v as i128, w));
            prop_assert!(e.complexity() >= 0.0);
        }

        #[test]
        fn constant_folding_matches_evaluation(w in small_width(), a in any::<i32>(), b in any::<i32>()) {
            let ca = Expr::constant(BvInt::new(a as i128, w));
            let cb = Expr::constant(BvInt::new(b as i128, w));
            let sum = Expr::binary(Operator::Add, ca, cb).unwrap();
            prop_assert_eq!(sum.evaluate(&HashMap::new()), sum.as_constant());
        }

        #[test]
        fn hash_agrees_with_equality(w in small_width(), v in any::<i64>()) {
            let a = Expr::constant(BvInt::new(v as i128, w));
            let b = Expr::constant(BvInt::new(v as i128, w));
            prop_assert_eq!(a == b, true);
            prop_assert_eq!(a.hash_value(), b.hash_value());
        }
    }
}
