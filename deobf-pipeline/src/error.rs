/// Pipeline-boundary failures. Everything below the pipeline
/// (constructor/API-boundary misuse) surfaces as `deobf_ir::IrError`
/// instead; this crate only needs the two outcomes a full `run_all` can
/// itself produce — this is the one crate in the workspace where
/// `thiserror` earns its keep, since the pipeline is the point error
/// propagation from every pass converges on.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pass `{pass}` left the routine in an invariant-violating state: {detail}")]
    InvariantViolation { pass: &'static str, detail: String },

    #[error("pipeline run was cancelled or exceeded its budget during pass `{pass}`")]
    CancelledOrTimedOut { pass: &'static str },
}
