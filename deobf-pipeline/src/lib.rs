//! Drives the catalogue in `deobf-passes` over a `deobf-ir::Routine`: a
//! fixed pass order, a cancellation/timeout budget, and a pre-flight
//! validator, following `cranelift-codegen::Context`'s "own the routine,
//! validate, then run a fixed sequence of named passes" shape.

mod cancellation;
mod config;
mod error;
mod scheduler;
mod validator;

pub use cancellation::CancellationToken;
pub use config::{default_pass_order, PipelineConfig};
pub use error::PipelineError;
pub use scheduler::{run_all, PassCount, RunSummary};
pub use validator::{validate, Finding, ValidationReport};
