//! # cfgnorm Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the cfgnorm library. Import it to build IR and run the pipeline without naming
//! every module.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all cfgnorm operations
pub use crate::Error;

/// The result type used throughout cfgnorm
pub use crate::Result;

// ================================================================================================
// IR Model
// ================================================================================================

/// Modules, procedures and blocks
pub use crate::ir::{Block, Item, Module, Param, Procedure, Signature, Signatures};

/// Instructions, expressions and terminators
pub use crate::ir::{
    Cond, Effects, Expr, Ident, Instruction, JumpTarget, Label, Literal, PrimOp, Terminator,
    Type,
};

/// Programmatic IR construction
pub use crate::ir::ProcedureBuilder;

// ================================================================================================
// Pipeline
// ================================================================================================

/// Scheduler, configuration and shared state
pub use crate::compiler::{PassScheduler, PipelineConfig, PipelineContext};

/// Pass interface and per-procedure state
pub use crate::compiler::{FreshNames, IrPass, PassContext};

/// The normalization passes
pub use crate::compiler::{
    CallFlatteningPass, PropagationPass, ShortCircuitEliminationPass, SsaDestructionPass,
};

/// Event logging
pub use crate::compiler::{DerivedStats, EventKind, EventLog};
