//! Unified event logging for the normalization pipeline.
//!
//! This module provides the event logging system that captures all activity during
//! normalization, from individual rewrites (a hoisted call, an inlined binding) to
//! engine-level events (a pass starting, a procedure failing). Events can be inspected
//! for debugging or safely ignored when not needed.
//!
//! # Architecture
//!
//! - [`Event`] - A single recorded event
//! - [`EventLog`] - Append-only, thread-safe collection with query and summary helpers
//! - [`EventBuilder`] - Fluent API for creating events
//!
//! # Example
//!
//! ```rust
//! use cfgnorm::compiler::{EventKind, EventLog};
//! use cfgnorm::ir::Label;
//!
//! let log = EventLog::new();
//! log.record(EventKind::CallHoisted)
//!     .at("main", Label::new("b0"))
//!     .message("t3 = g(x)");
//! log.info("starting pipeline");
//!
//! assert_eq!(log.count_kind(EventKind::CallHoisted), 1);
//! println!("{}", log.summary());
//! ```

use std::{
    collections::{HashMap, HashSet},
    fmt,
    time::Duration,
};

use crate::ir::Label;

/// Categories of events that can be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A nested call was bound to a fresh temporary.
    CallHoisted,
    /// A branch arm containing calls was moved into its own block.
    ArmOutlined,
    /// A conditional terminator was expanded into a decision-block fan-out.
    BranchExpanded,
    /// A decision (leaf) block was created.
    LeafBlockCreated,
    /// A pure binding was substituted at its use sites.
    BindingInlined,
    /// An instruction was removed.
    InstructionRemoved,
    /// A block parameter was replaced by a slot.
    ParameterSlotted,
    /// A store into a slot was inserted before a jump.
    StoreInserted,
    /// A control-flow edge was split to hold its own stores.
    EdgeSplit,

    /// A pass started on a procedure.
    PassStarted,
    /// A pass completed on a procedure.
    PassCompleted,
    /// A procedure's rewrite was aborted.
    ProcedureFailed,

    /// Informational message.
    Info,
    /// Warning (something unexpected but recoverable).
    Warning,
    /// Error (something failed).
    Error,
}

impl EventKind {
    /// Returns a human-readable description of this event kind.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            // Transformations
            Self::CallHoisted => "call hoisted",
            Self::ArmOutlined => "arm outlined",
            Self::BranchExpanded => "branch expanded",
            Self::LeafBlockCreated => "leaf block created",
            Self::BindingInlined => "binding inlined",
            Self::InstructionRemoved => "instruction removed",
            Self::ParameterSlotted => "parameter slotted",
            Self::StoreInserted => "store inserted",
            Self::EdgeSplit => "edge split",
            // Engine
            Self::PassStarted => "pass started",
            Self::PassCompleted => "pass completed",
            Self::ProcedureFailed => "procedure failed",
            // Diagnostic
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }

    /// Returns true if this event represents a code transformation.
    #[must_use]
    pub fn is_transformation(&self) -> bool {
        matches!(
            self,
            Self::CallHoisted
                | Self::ArmOutlined
                | Self::BranchExpanded
                | Self::LeafBlockCreated
                | Self::BindingInlined
                | Self::InstructionRemoved
                | Self::ParameterSlotted
                | Self::StoreInserted
                | Self::EdgeSplit
        )
    }

    /// Returns true if this is a diagnostic event (info/warning/error).
    #[must_use]
    pub fn is_diagnostic(&self) -> bool {
        matches!(self, Self::Info | Self::Warning | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// The type of event.
    pub kind: EventKind,
    /// The procedure where the event occurred (if applicable).
    pub procedure: Option<String>,
    /// The block where the event occurred (if applicable).
    pub block: Option<Label>,
    /// Human-readable description.
    pub message: String,
    /// Associated pass name (if from a pass).
    pub pass: Option<String>,
}

impl Event {
    fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            procedure: None,
            block: None,
            message: message.into(),
            pass: None,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(procedure) = &self.procedure {
            write!(f, " {procedure}")?;
            if let Some(block) = &self.block {
                write!(f, "/{block}")?;
            }
        }
        write!(f, " {}", self.message)
    }
}

/// Builder for creating events with a fluent API.
///
/// Created by [`EventLog::record`]. The event is automatically added
/// to the log when the builder is dropped.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    kind: EventKind,
    procedure: Option<String>,
    block: Option<Label>,
    message: Option<String>,
    pass: Option<String>,
}

impl<'a> EventBuilder<'a> {
    fn new(log: &'a EventLog, kind: EventKind) -> Self {
        Self {
            log,
            kind,
            procedure: None,
            block: None,
            message: None,
            pass: None,
        }
    }

    /// Sets the procedure and block where the event occurred.
    pub fn at(mut self, procedure: impl Into<String>, block: Label) -> Self {
        self.procedure = Some(procedure.into());
        self.block = Some(block);
        self
    }

    /// Sets only the procedure (for procedure-level events).
    pub fn procedure(mut self, procedure: impl Into<String>) -> Self {
        self.procedure = Some(procedure.into());
        self
    }

    /// Sets the block.
    pub fn block(mut self, block: Label) -> Self {
        self.block = Some(block);
        self
    }

    /// Sets a custom message describing the event.
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Associates this event with a specific pass.
    pub fn pass(mut self, pass_name: impl Into<String>) -> Self {
        self.pass = Some(pass_name.into());
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let message = self
            .message
            .take()
            .unwrap_or_else(|| self.kind.description().to_string());

        let event = Event {
            kind: self.kind,
            procedure: self.procedure.take(),
            block: self.block.take(),
            message,
            pass: self.pass.take(),
        };

        self.log.events.push(event);
    }
}

/// Collection of events from a normalization run.
///
/// Statistics are derived from the events rather than tracked separately.
///
/// This type is thread-safe: events can be appended concurrently from
/// multiple threads using shared references (`&self`).
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for EventLog {
    fn clone(&self) -> Self {
        let new_log = Self::new();
        for (_, event) in &self.events {
            new_log.events.push(event.clone());
        }
        new_log
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Returns true if no events have been logged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.count() == 0
    }

    /// Returns the total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Starts building a new event of the given kind.
    ///
    /// The event is automatically added when the builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        EventBuilder::new(self, kind)
    }

    /// Records an informational message.
    pub fn info(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Info, message));
    }

    /// Records a warning message.
    pub fn warn(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Warning, message));
    }

    /// Records an error message.
    pub fn error(&self, message: impl Into<String>) {
        self.events.push(Event::new(EventKind::Error, message));
    }

    /// Merges another event log into this one.
    pub fn merge(&self, other: &EventLog) {
        for (_, event) in &other.events {
            self.events.push(event.clone());
        }
    }

    /// Returns true if any event of the given kind exists.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.events.iter().any(|(_, e)| e.kind == kind)
    }

    /// Counts events of the given kind.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|(_, e)| e.kind == kind).count()
    }

    /// Returns an iterator over all events.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, e)| e)
    }

    /// Returns an iterator over events of a specific kind.
    pub fn filter_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.events
            .iter()
            .filter_map(move |(_, e)| if e.kind == kind { Some(e) } else { None })
    }

    /// Returns an iterator over events for a specific procedure.
    pub fn filter_procedure<'a>(
        &'a self,
        procedure: &'a str,
    ) -> impl Iterator<Item = &'a Event> + 'a {
        self.events.iter().filter_map(move |(_, e)| {
            if e.procedure.as_deref() == Some(procedure) {
                Some(e)
            } else {
                None
            }
        })
    }

    /// Returns an iterator over transformation events only.
    pub fn transformations(&self) -> impl Iterator<Item = &Event> + '_ {
        self.events.iter().filter_map(|(_, e)| {
            if e.kind.is_transformation() {
                Some(e)
            } else {
                None
            }
        })
    }

    /// Returns an iterator over error events.
    pub fn errors(&self) -> impl Iterator<Item = &Event> + '_ {
        self.filter_kind(EventKind::Error)
    }

    /// Counts events grouped by kind.
    #[must_use]
    pub fn count_by_kind(&self) -> HashMap<EventKind, usize> {
        let mut counts = HashMap::new();
        for (_, event) in &self.events {
            *counts.entry(event.kind).or_insert(0) += 1;
        }
        counts
    }

    /// Returns the number of unique procedures with transformation events.
    #[must_use]
    pub fn procedures_affected(&self) -> usize {
        self.events
            .iter()
            .filter(|(_, e)| e.kind.is_transformation())
            .filter_map(|(_, e)| e.procedure.as_deref())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Generates a human-readable summary of all events.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.is_empty() {
            return "no events".to_string();
        }

        let counts = self.count_by_kind();

        // Only show transformation counts in summary
        let mut parts: Vec<String> = counts
            .iter()
            .filter(|(k, _)| k.is_transformation())
            .map(|(kind, count)| format!("{} {}", count, kind.description()))
            .collect();

        if parts.is_empty() {
            return format!("{} events", self.len());
        }

        parts.sort();
        parts.join(", ")
    }
}

/// Statistics derived from an [`EventLog`].
#[derive(Debug, Clone, Default)]
pub struct DerivedStats {
    /// Number of procedures that had any transformations.
    pub procedures_transformed: usize,
    /// Number of calls hoisted into their own assignment.
    pub calls_hoisted: usize,
    /// Number of branch arms outlined into fresh blocks.
    pub arms_outlined: usize,
    /// Number of conditional terminators expanded.
    pub branches_expanded: usize,
    /// Number of decision blocks created.
    pub leaf_blocks: usize,
    /// Number of bindings inlined.
    pub bindings_inlined: usize,
    /// Number of instructions removed.
    pub instructions_removed: usize,
    /// Number of block parameters replaced by slots.
    pub parameters_slotted: usize,
    /// Number of slot stores inserted.
    pub stores_inserted: usize,
    /// Number of edges split.
    pub edges_split: usize,
    /// Number of procedures whose rewrite failed.
    pub procedures_failed: usize,
    /// Number of warnings.
    pub warnings: usize,
    /// Number of errors.
    pub errors: usize,
    /// Processing time.
    pub total_time: Duration,
}

impl DerivedStats {
    /// Computes statistics from an event log.
    #[must_use]
    pub fn from_log(log: &EventLog) -> Self {
        let counts = log.count_by_kind();
        let get = |kind: EventKind| counts.get(&kind).copied().unwrap_or(0);

        Self {
            procedures_transformed: log.procedures_affected(),
            calls_hoisted: get(EventKind::CallHoisted),
            arms_outlined: get(EventKind::ArmOutlined),
            branches_expanded: get(EventKind::BranchExpanded),
            leaf_blocks: get(EventKind::LeafBlockCreated),
            bindings_inlined: get(EventKind::BindingInlined),
            instructions_removed: get(EventKind::InstructionRemoved),
            parameters_slotted: get(EventKind::ParameterSlotted),
            stores_inserted: get(EventKind::StoreInserted),
            edges_split: get(EventKind::EdgeSplit),
            procedures_failed: get(EventKind::ProcedureFailed),
            warnings: get(EventKind::Warning),
            errors: get(EventKind::Error),
            total_time: Duration::ZERO,
        }
    }

    /// Sets the total processing time.
    #[must_use]
    pub fn with_time(mut self, time: Duration) -> Self {
        self.total_time = time;
        self
    }

    /// Generates a human-readable summary.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if self.procedures_transformed > 0 {
            parts.push(format!("{} procedures", self.procedures_transformed));
        }
        if self.calls_hoisted > 0 {
            parts.push(format!("{} calls hoisted", self.calls_hoisted));
        }
        if self.branches_expanded > 0 {
            parts.push(format!(
                "{} branches expanded into {} blocks",
                self.branches_expanded, self.leaf_blocks
            ));
        }
        if self.bindings_inlined > 0 {
            parts.push(format!("{} bindings inlined", self.bindings_inlined));
        }
        if self.instructions_removed > 0 {
            parts.push(format!("{} instructions removed", self.instructions_removed));
        }
        if self.parameters_slotted > 0 {
            parts.push(format!("{} parameters slotted", self.parameters_slotted));
        }
        if self.procedures_failed > 0 {
            parts.push(format!("{} procedures failed", self.procedures_failed));
        }

        if parts.is_empty() {
            return "no changes".to_string();
        }

        let mut summary = parts.join(", ");
        if !self.total_time.is_zero() {
            summary.push_str(&format!(" in {:.2?}", self.total_time));
        }
        summary
    }
}
