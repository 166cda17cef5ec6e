//! Densely numbered entity references and the collections keyed by them.
//!
//! Routines own their blocks, instructions and registers in flat arenas and
//! refer to them by small `Copy` keys instead of pointers. This mirrors the
//! owning-map-plus-non-owning-reference pattern recommended for cyclic
//! predecessor/successor links (see `deobf-ir`'s `BasicBlock`).

mod iter;
mod keys;
mod map;
mod primary;

pub use iter::{Iter, IterMut};
pub use keys::Keys;
pub use map::SecondaryMap;
pub use primary::PrimaryMap;

/// A type that can be used as a small, dense key into an entity map.
///
/// `index()` must return values starting at 0 and packed without gaps for
/// each entity actually allocated through a `PrimaryMap`; `new()` is the
/// inverse used by iteration and by map internals, not meant to be called
/// with arbitrary indices by ordinary callers.
pub trait EntityRef: Copy + Eq {
    /// Create a new entity reference from a linear index.
    fn new(index: usize) -> Self;

    /// Get the index of this reference.
    fn index(self) -> usize;
}

/// Define an entity reference type wrapping a `u32`.
///
/// ```ignore
/// entity_impl!(Block);
/// entity_impl!(Inst, "inst");
/// ```
#[macro_export]
macro_rules! entity_impl {
    ($entity:ident) => {
        impl $crate::EntityRef for $entity {
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $entity(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::core::fmt::Display for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                write!(f, "{}{}", stringify!($entity), self.0)
            }
        }
    };

    ($entity:ident, $display_prefix:expr) => {
        impl $crate::EntityRef for $entity {
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $entity(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::core::fmt::Display for $entity {
            fn fmt(&self, f: &mut ::core::fmt::Formatter) -> ::core::fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }
    };
}
