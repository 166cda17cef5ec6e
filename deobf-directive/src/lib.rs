//! The pattern/template rewrite language: directives describe a subject
//! shape to match and a replacement to build, independent of any particular
//! rule table. The rule tables themselves live in [`rules`]; the
//! fixed-point driver that walks them lives in `deobf-simplify`.

mod directive;
mod hook;
mod matcher;
mod rules;
mod symtab;
mod transformer;

pub use directive::{Directive, Helper, MetaKind, ResizeKind, SizeSpec};
pub use hook::{NoopHook, SimplifyHook};
pub use matcher::try_match;
pub use rules::{boolean_rules, join_rules, pack_rules, unpack_rules, universal_rules, Rule};
pub use symtab::SymbolTable;
pub use transformer::{instantiate, transform};
