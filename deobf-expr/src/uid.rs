use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// A name/value-equivalence token carried by `Expression::Variable` nodes.
///
/// Two `UniqueId`s are equal iff they denote the same variable: either the
/// same interned name, or the same freshly minted ordinal. Unlike the
/// expression nodes that carry it, a `UniqueId` is compared by value, not by
/// allocation identity — `UniqueId::named("rax") == UniqueId::named("rax")`
/// holds even though the two calls allocate distinct `Rc<str>`s.
#[derive(Clone, Debug)]
pub enum UniqueId {
    /// A caller-chosen, human-readable name (e.g. an architectural register
    /// name lifted from a disassembler).
    Named(Rc<str>),
    /// An opaque, allocator-assigned ordinal (internal registers minted by
    /// `Routine::alloc_register`).
    Numbered(u64),
}

static NEXT_ORDINAL: AtomicU64 = AtomicU64::new(0);

impl UniqueId {
    /// Build a named unique id.
    pub fn named(name: impl Into<Rc<str>>) -> Self {
        UniqueId::Named(name.into())
    }

    /// Mint a fresh, globally unique numbered id.
    ///
    /// Used by `deobf-ir`'s internal register allocator; ordinals are never
    /// reused for the lifetime of the process, so two `Routine`s never
    /// collide even though routines do not share an allocator.
    pub fn fresh() -> Self {
        UniqueId::Numbered(NEXT_ORDINAL.fetch_add(1, Ordering::Relaxed))
    }

    /// Build a numbered unique id with an explicit ordinal, for callers
    /// (such as `deobf-ir`) that keep their own per-routine counters instead
    /// of using the global one.
    pub fn numbered(ordinal: u64) -> Self {
        UniqueId::Numbered(ordinal)
    }
}

impl PartialEq for UniqueId {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (UniqueId::Named(a), UniqueId::Named(b)) => a == b,
            (UniqueId::Numbered(a), UniqueId::Numbered(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for UniqueId {}

impl std::hash::Hash for UniqueId {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        match self {
            UniqueId::Named(n) => {
                0u8.hash(state);
                n.hash(state);
            }
            UniqueId::Numbered(n) => {
                1u8.hash(state);
                n.hash(state);
            }
        }
    }
}

impl std::fmt::Display for UniqueId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            UniqueId::Named(n) => write!(f, "{n}"),
            UniqueId::Numbered(n) => write!(f, "v{n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_ids_compare_by_value() {
        assert_eq!(UniqueId::named("rax"), UniqueId::named("rax"));
        assert_ne!(UniqueId::named("rax"), UniqueId::named("rbx"));
    }

    #[test]
    fn fresh_ids_are_distinct() {
        assert_ne!(UniqueId::fresh(), UniqueId::fresh());
    }

    #[test]
    fn named_and_numbered_never_equal() {
        assert_ne!(UniqueId::named("v0"), UniqueId::numbered(0));
    }
}
