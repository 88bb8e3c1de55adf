//! Pass scheduler for orchestrating the normalization pipeline.
//!
//! The `PassScheduler` threads each procedure of a module through an ordered list of
//! passes. Procedures are independent: each one gets its own [`PassContext`] (and with it
//! its own fresh-name counter), and distinct procedures are processed in parallel on the
//! rayon thread pool.

use rayon::prelude::*;

use crate::{
    compiler::{
        pass::run_traced, check_backend_shape, CallFlatteningPass, EventLog, IrPass,
        PassContext, PipelineConfig, PipelineContext, PropagationPass,
        ShortCircuitEliminationPass, SsaDestructionPass,
    },
    ir::{Module, Procedure, Signatures},
    Result,
};

/// Name reported when the backend shape check rejects a pipeline result.
const SHAPE_CHECK: &str = "backend-shape";

/// Orchestrates pass execution over whole modules.
///
/// # Example
///
/// ```rust
/// use cfgnorm::compiler::{PassScheduler, PipelineConfig, PipelineContext};
/// use cfgnorm::ir::{Expr, Module, ProcedureBuilder, Type};
///
/// let main = ProcedureBuilder::new("main")
///     .returns(Type::Int)
///     .build_with(|p| p.block("b0", |b| b.ret(Expr::call("f", vec![Expr::call("f", vec![])]))));
/// let module = Module::default()
///     .with_extern("f", vec![], Type::Int)
///     .with_procedure(main);
///
/// let ctx = PipelineContext::new();
/// let normalized = PassScheduler::canonical(PipelineConfig::default()).run_isolated(&module, &ctx);
/// assert_eq!(ctx.failure_count(), 0);
/// assert_eq!(normalized.procedures().count(), 1);
/// ```
pub struct PassScheduler {
    passes: Vec<Box<dyn IrPass>>,
    config: PipelineConfig,
}

impl Default for PassScheduler {
    fn default() -> Self {
        Self::canonical(PipelineConfig::default())
    }
}

impl PassScheduler {
    /// Creates a scheduler with no passes.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            passes: Vec::new(),
            config,
        }
    }

    /// Creates a scheduler running the canonical pipeline: call flattening,
    /// short-circuit elimination, propagation (if enabled) and SSA destruction.
    #[must_use]
    pub fn canonical(config: PipelineConfig) -> Self {
        let enable_propagation = config.enable_propagation;
        let mut scheduler = Self::new(config);
        scheduler.add(CallFlatteningPass::new());
        scheduler.add(ShortCircuitEliminationPass::new());
        if enable_propagation {
            scheduler.add(PropagationPass::new());
        }
        scheduler.add(SsaDestructionPass::new());
        scheduler
    }

    /// Appends a pass to the pipeline.
    pub fn add<P: IrPass + 'static>(&mut self, pass: P) -> &mut Self {
        self.passes.push(Box::new(pass));
        self
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns the pass names in execution order.
    #[must_use]
    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    /// Threads one procedure through every pass with a single shared [`PassContext`].
    ///
    /// # Arguments
    ///
    /// * `procedure` - The procedure to normalize.
    /// * `signatures` - Return types of every callable name in the enclosing module.
    /// * `events` - Receives the transformation events.
    ///
    /// # Errors
    ///
    /// Returns the first pass failure as [`crate::Error::Pass`].
    pub fn run_procedure(
        &self,
        procedure: &Procedure,
        signatures: &Signatures,
        events: &EventLog,
    ) -> Result<Procedure> {
        let mut ctx = PassContext::new(procedure, signatures, events, &self.config);

        let mut current = procedure.clone();
        for pass in &self.passes {
            current = run_traced(pass.as_ref(), &current, &mut ctx)?;
        }

        if self.config.verify_shape {
            check_backend_shape(&current).map_err(|e| e.in_pass(procedure.name(), SHAPE_CHECK))?;
        }
        Ok(current)
    }

    /// Normalizes every procedure of `module`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing procedure, in module order. No partial
    /// module is produced.
    pub fn run(&self, module: &Module) -> Result<Module> {
        let ctx = PipelineContext::new();
        self.run_with(module, &ctx)
    }

    /// Like [`PassScheduler::run`], recording events and progress into `ctx`.
    ///
    /// # Errors
    ///
    /// Returns the error of the first failing procedure, in module order.
    pub fn run_with(&self, module: &Module, ctx: &PipelineContext) -> Result<Module> {
        let results = self.process_all(module, ctx);
        let procedures = results.into_iter().collect::<Result<Vec<_>>>()?;
        for procedure in &procedures {
            ctx.mark_processed(procedure.name());
        }
        module.with_procedures_replaced(procedures)
    }

    /// Normalizes every procedure of `module`, isolating failures.
    ///
    /// A procedure whose rewrite fails is kept in its original form and its error is
    /// recorded in `ctx.failures`; sibling procedures are unaffected.
    #[must_use]
    pub fn run_isolated(&self, module: &Module, ctx: &PipelineContext) -> Module {
        let mut results = self.process_all(module, ctx).into_iter();

        let isolated = module.try_map_procedures(|original| match results.next() {
            Some(Ok(procedure)) => {
                ctx.mark_processed(original.name());
                Ok(procedure)
            }
            Some(Err(error)) => {
                ctx.record_failure(original.name(), error);
                Ok(original.clone())
            }
            None => Ok(original.clone()),
        });
        isolated.unwrap_or_else(|_| module.clone())
    }

    /// Runs the pipeline on every procedure, in parallel if configured.
    ///
    /// Results are in module order.
    fn process_all(&self, module: &Module, ctx: &PipelineContext) -> Vec<Result<Procedure>> {
        let signatures = module.signatures();
        let procedures: Vec<&Procedure> = module.procedures().collect();
        ctx.events.info(format!(
            "normalizing {} procedures with [{}]",
            procedures.len(),
            self.pass_names().join(", ")
        ));

        let run = |procedure: &&Procedure| self.run_procedure(procedure, &signatures, &ctx.events);
        if self.config.parallel {
            procedures.par_iter().map(run).collect()
        } else {
            procedures.iter().map(run).collect()
        }
    }
}
