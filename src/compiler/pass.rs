//! The normalization pass trait.
//!
//! Every pass is a function from one procedure to a rebuilt procedure. Passes never mutate
//! their input: they read the previous CFG through `&Procedure` and assemble a new one.
//! Per-procedure mutable state (the fresh-name counter) lives in the [`PassContext`] the
//! caller threads through.

use crate::{
    compiler::{EventKind, EventLog, PassContext, PipelineConfig},
    ir::{Module, Procedure},
    Result,
};

/// A CFG-rewriting normalization pass.
///
/// Implementations must be `Send + Sync` so the scheduler can run them on distinct
/// procedures concurrently.
///
/// # Example
///
/// ```rust
/// use cfgnorm::compiler::{IrPass, PassContext};
/// use cfgnorm::ir::Procedure;
///
/// struct Identity;
///
/// impl IrPass for Identity {
///     fn name(&self) -> &'static str {
///         "identity"
///     }
///
///     fn run_on_procedure(
///         &self,
///         procedure: &Procedure,
///         _ctx: &mut PassContext<'_>,
///     ) -> cfgnorm::Result<Procedure> {
///         Ok(procedure.clone())
///     }
/// }
/// ```
pub trait IrPass: Send + Sync {
    /// Unique name for logging and error reporting.
    fn name(&self) -> &'static str;

    /// Human-readable description of what the pass does.
    fn description(&self) -> &'static str {
        ""
    }

    /// Rewrites one procedure.
    ///
    /// # Arguments
    ///
    /// * `procedure` - The procedure to rewrite, read immutably.
    /// * `ctx` - Per-procedure state; fresh names must be drawn from here.
    ///
    /// # Errors
    ///
    /// Returns an error if the procedure violates a shape this pass depends on. The
    /// rewrite of that procedure is aborted.
    fn run_on_procedure(&self, procedure: &Procedure, ctx: &mut PassContext<'_>)
        -> Result<Procedure>;

    /// Runs the pass alone over every procedure of `module`.
    ///
    /// Each procedure gets its own [`PassContext`] with the default configuration.
    /// Declarations are copied through unchanged.
    ///
    /// # Errors
    ///
    /// Returns the first failure, tagged with the procedure and this pass's name.
    fn transform(&self, module: &Module) -> Result<Module> {
        let signatures = module.signatures();
        let events = EventLog::new();
        let config = PipelineConfig::default();

        module.try_map_procedures(|procedure| {
            let mut ctx = PassContext::new(procedure, &signatures, &events, &config);
            ctx.enter_pass(self.name());
            self.run_on_procedure(procedure, &mut ctx)
                .map_err(|e| e.in_pass(procedure.name(), self.name()))
        })
    }
}

/// Runs `pass` on `procedure` inside `ctx`, recording start and completion events and
/// tagging any error with the procedure and pass.
pub(crate) fn run_traced(
    pass: &dyn IrPass,
    procedure: &Procedure,
    ctx: &mut PassContext<'_>,
) -> Result<Procedure> {
    ctx.enter_pass(pass.name());
    ctx.record(EventKind::PassStarted, procedure.entry())
        .message(pass.name());

    let result = pass
        .run_on_procedure(procedure, ctx)
        .map_err(|e| e.in_pass(procedure.name(), pass.name()))?;

    ctx.names.observe(&result);
    ctx.record(EventKind::PassCompleted, result.entry())
        .message(format!(
            "{}: {} blocks, {} instructions",
            pass.name(),
            result.block_count(),
            result.instruction_count()
        ));
    Ok(result)
}
