//! Per-procedure and per-module state shared by the normalization passes.
//!
//! Two levels of state exist:
//!
//! - [`PassContext`] is created for one procedure's rewrite and threaded through every pass
//!   that runs on it. It owns the [`FreshNames`] generator, so every temporary, slot and
//!   label introduced by any pass is drawn from the same counter and checked against the
//!   same used-name sets. It is dropped when the procedure is done.
//! - [`PipelineContext`] is shared by reference across all rayon workers processing a
//!   module. All its collections are thread-safe (`DashMap`, `DashSet`, `boxcar`).

use std::{
    collections::HashSet,
    time::{Duration, Instant},
};

use dashmap::{DashMap, DashSet};

use crate::{
    compiler::{DerivedStats, EventBuilder, EventKind, EventLog, PipelineConfig},
    ir::{Ident, Label, Procedure, Signatures},
    Error, Result,
};

/// Generator of identifiers and labels that do not occur in a procedure.
///
/// The identifier counter is seeded one above the largest numeric suffix of any identifier
/// present, so generated names never renumber or shadow existing ones. Each candidate is
/// still probed against the used set before it is handed out. Labels use their own counter
/// and the same probe-before-use rule.
#[derive(Debug, Clone)]
pub struct FreshNames {
    /// Next identifier number; `None` once the counter has run past `u64::MAX`.
    next_ident: Option<u64>,
    /// Next label number.
    next_label: Option<u64>,
    idents: HashSet<Ident>,
    labels: HashSet<Label>,
    probe_limit: usize,
}

impl FreshNames {
    /// Seeds a generator from every identifier and label in `procedure`.
    #[must_use]
    pub fn for_procedure(procedure: &Procedure, probe_limit: usize) -> Self {
        let mut names = Self {
            next_ident: Some(1),
            next_label: Some(1),
            idents: HashSet::new(),
            labels: HashSet::new(),
            probe_limit,
        };
        names.observe(procedure);
        names
    }

    /// Folds the names of `procedure` into the used sets, raising the counter if needed.
    pub fn observe(&mut self, procedure: &Procedure) {
        for ident in procedure.identifiers() {
            if let Some(suffix) = ident.numeric_suffix() {
                let floor = suffix.checked_add(1);
                self.next_ident = match (self.next_ident, floor) {
                    (Some(current), Some(floor)) => Some(current.max(floor)),
                    _ => None,
                };
            }
            self.idents.insert(ident);
        }
        self.labels.extend(procedure.labels());
    }

    /// Returns a fresh identifier `prefix` + counter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentExhausted`] if the counter overflows or no unused name is
    /// found within the probe budget.
    pub fn ident(&mut self, prefix: &str) -> Result<Ident> {
        for _ in 0..self.probe_limit.max(1) {
            let n = self
                .next_ident
                .ok_or_else(|| Error::IdentExhausted(prefix.to_string()))?;
            self.next_ident = n.checked_add(1);

            let candidate = Ident::new(format!("{prefix}{n}"));
            if self.idents.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
        Err(Error::IdentExhausted(prefix.to_string()))
    }

    /// Returns a fresh label `base_N`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LabelExhausted`] if no unused label is found within the probe budget.
    pub fn label(&mut self, base: &str) -> Result<Label> {
        for _ in 0..self.probe_limit.max(1) {
            let n = self
                .next_label
                .ok_or_else(|| Error::LabelExhausted(format!("{base}_N")))?;
            self.next_label = n.checked_add(1);

            let candidate = Label::new(format!("{base}_{n}"));
            if self.labels.insert(candidate.clone()) {
                return Ok(candidate);
            }
        }
        Err(Error::LabelExhausted(format!("{base}_N")))
    }

    /// Returns `true` if `ident` is known to be in use.
    #[must_use]
    pub fn is_used(&self, ident: &str) -> bool {
        self.idents.contains(ident)
    }

    /// Returns `true` if `label` is known to be in use.
    #[must_use]
    pub fn is_label_used(&self, label: &str) -> bool {
        self.labels.contains(label)
    }
}

/// State for rewriting one procedure.
///
/// Created by the scheduler (or [`crate::compiler::IrPass::transform`]) per procedure and
/// passed by `&mut` into each pass in turn.
pub struct PassContext<'a> {
    /// Fresh identifier and label generator shared by all passes on this procedure.
    pub names: FreshNames,
    /// Return types of every callable name in the module.
    pub signatures: &'a Signatures,
    /// Event log receiving transformation events.
    pub events: &'a EventLog,
    /// Pipeline configuration.
    pub config: &'a PipelineConfig,
    procedure: String,
    pass: &'static str,
}

impl<'a> PassContext<'a> {
    /// Creates the context for rewriting `procedure`.
    #[must_use]
    pub fn new(
        procedure: &Procedure,
        signatures: &'a Signatures,
        events: &'a EventLog,
        config: &'a PipelineConfig,
    ) -> Self {
        Self {
            names: FreshNames::for_procedure(procedure, config.label_probe_limit),
            signatures,
            events,
            config,
            procedure: procedure.name().to_string(),
            pass: "",
        }
    }

    /// Name of the procedure being rewritten.
    #[must_use]
    pub fn procedure(&self) -> &str {
        &self.procedure
    }

    /// Name of the pass currently running.
    #[must_use]
    pub fn pass(&self) -> &'static str {
        self.pass
    }

    /// Marks `pass` as the one currently running; subsequent events are tagged with it.
    pub fn enter_pass(&mut self, pass: &'static str) {
        self.pass = pass;
    }

    /// Draws a fresh temporary for a hoisted value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentExhausted`] when no name is available.
    pub fn fresh_temp(&mut self) -> Result<Ident> {
        self.names.ident(&self.config.temp_prefix)
    }

    /// Draws a fresh slot name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IdentExhausted`] when no name is available.
    pub fn fresh_slot(&mut self) -> Result<Ident> {
        self.names.ident(&self.config.slot_prefix)
    }

    /// Draws a fresh block label derived from `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LabelExhausted`] when no label is available.
    pub fn fresh_label(&mut self, base: &str) -> Result<Label> {
        self.names.label(base)
    }

    /// Starts an event located in `block` of the current procedure, tagged with the
    /// current pass.
    pub fn record(&self, kind: EventKind, block: &Label) -> EventBuilder<'a> {
        self.events
            .record(kind)
            .at(self.procedure.clone(), block.clone())
            .pass(self.pass)
    }
}

/// Module-level state shared across all workers of one pipeline run.
#[derive(Debug)]
pub struct PipelineContext {
    /// Accumulated events from all passes and procedures.
    pub events: EventLog,

    /// Procedures whose rewrite was aborted, with the reason.
    pub failures: DashMap<String, Error>,

    /// Procedures that went through every pass successfully.
    pub processed: DashSet<String>,

    start_time: Instant,
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineContext {
    /// Creates an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: EventLog::new(),
            failures: DashMap::new(),
            processed: DashSet::new(),
            start_time: Instant::now(),
        }
    }

    /// Returns the elapsed time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Records that `procedure` failed and was left untouched.
    pub fn record_failure(&self, procedure: &str, error: Error) {
        self.events
            .record(EventKind::ProcedureFailed)
            .procedure(procedure)
            .message(error.to_string());
        self.failures.insert(procedure.to_string(), error);
    }

    /// Marks `procedure` as successfully normalized.
    pub fn mark_processed(&self, procedure: &str) {
        self.processed.insert(procedure.to_string());
    }

    /// Checks if `procedure` failed.
    #[must_use]
    pub fn is_failed(&self, procedure: &str) -> bool {
        self.failures.contains_key(procedure)
    }

    /// Checks if `procedure` was normalized.
    #[must_use]
    pub fn is_processed(&self, procedure: &str) -> bool {
        self.processed.contains(procedure)
    }

    /// Returns the number of failed procedures.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// Derives run statistics from the event log.
    #[must_use]
    pub fn stats(&self) -> DerivedStats {
        DerivedStats::from_log(&self.events).with_time(self.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, ProcedureBuilder, Type};

    fn sample() -> Procedure {
        ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    b.assign("t3", Type::Int, Expr::var("x"));
                    b.assign("t5", Type::Int, Expr::var("t3"));
                    b.jump("b0_then_1");
                });
                p.block("b0_then_1", |b| b.ret(Expr::var("t5")));
            })
    }

    #[test]
    fn test_ident_counter_seeded_above_max_suffix() {
        let mut names = FreshNames::for_procedure(&sample(), 16);
        assert_eq!(names.ident("t").unwrap().as_str(), "t6");
        assert_eq!(names.ident("slot").unwrap().as_str(), "slot7");
        assert!(names.is_used("t6"));
    }

    #[test]
    fn test_label_probes_past_existing() {
        let mut names = FreshNames::for_procedure(&sample(), 16);
        // b0_then_1 already exists
        assert_eq!(names.label("b0_then").unwrap().as_str(), "b0_then_2");
        assert_eq!(names.label("b0_then").unwrap().as_str(), "b0_then_3");
    }

    #[test]
    fn test_label_exhaustion_fails_fast() {
        let proc = ProcedureBuilder::new("p").build_with(|p| {
            p.block("a", |b| b.jump("x_1"));
            p.block("x_1", |b| b.jump("x_2"));
            p.block("x_2", |_| {});
        });
        let mut names = FreshNames::for_procedure(&proc, 2);
        assert!(matches!(names.label("x"), Err(Error::LabelExhausted(_))));
    }

    #[test]
    fn test_ident_counter_overflow_fails() {
        let proc = ProcedureBuilder::new("p")
            .param("v99999999999999999999999", Type::Int)
            .build_with(|p| p.block("a", |_| {}));
        let mut names = FreshNames::for_procedure(&proc, 16);
        assert!(matches!(names.ident("t"), Err(Error::IdentExhausted(_))));
    }

    #[test]
    fn test_pipeline_context_failures() {
        let ctx = PipelineContext::new();
        ctx.record_failure("bad", Error::UnknownLabel("x".into()));
        ctx.mark_processed("good");
        assert!(ctx.is_failed("bad"));
        assert!(ctx.is_processed("good"));
        assert_eq!(ctx.failure_count(), 1);
        assert_eq!(ctx.stats().procedures_failed, 1);
    }
}
