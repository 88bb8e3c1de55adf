//! Pass infrastructure and the normalization passes.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     Normalization Pipeline                       │
//! ├──────────────────────────────────────────────────────────────────┤
//! │                                                                  │
//! │  PipelineContext             Shared across rayon workers         │
//! │    ├─ EventLog                (transformation + engine events)   │
//! │    ├─ failures                (procedure -> error)               │
//! │    └─ processed               (procedures fully normalized)      │
//! │                                                                  │
//! │  PassScheduler               Per-procedure pass threading        │
//! │    ├─ run()                   first failure aborts               │
//! │    └─ run_isolated()          failures keep the original         │
//! │                                                                  │
//! │  PassContext                 One per procedure rewrite           │
//! │    └─ FreshNames              single counter + used-name sets    │
//! │                                                                  │
//! │  IrPass trait                Interface for all passes            │
//! │    ├─ run_on_procedure()      &Procedure -> Procedure            │
//! │    └─ transform()             &Module -> Module                  │
//! │                                                                  │
//! │  Passes                                                          │
//! │    ├─ CallFlatteningPass                                         │
//! │    ├─ ShortCircuitEliminationPass                                │
//! │    ├─ PropagationPass                                            │
//! │    └─ SsaDestructionPass                                         │
//! │                                                                  │
//! │  check_backend_shape()       Output contract verification        │
//! │                                                                  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod context;
mod events;
mod pass;
mod passes;
mod scheduler;
mod shape;

pub use config::PipelineConfig;
pub use context::{FreshNames, PassContext, PipelineContext};
pub use events::{DerivedStats, Event, EventBuilder, EventKind, EventLog};
pub use pass::IrPass;
pub use passes::{
    CallFlatteningPass, LeafPath, Leaves, PropagationPass, ShortCircuitEliminationPass,
    SsaDestructionPass,
};
pub use scheduler::PassScheduler;
pub use shape::check_backend_shape;
