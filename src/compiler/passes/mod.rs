//! The normalization passes.
//!
//! In canonical order:
//!
//! 1. [`CallFlatteningPass`] - binds every nested call to its own temporary
//! 2. [`ShortCircuitEliminationPass`] - expands conditional terminators into decision blocks
//! 3. [`PropagationPass`] - inlines pure bindings and removes the dead ones (optional)
//! 4. [`SsaDestructionPass`] - replaces block parameters with slots
//!
//! SSA destruction runs last: it needs the final block structure so every edge that
//! carries arguments is known when the stores are placed.

mod flatten;
mod propagate;
mod shortcircuit;
mod ssadestruct;

pub use flatten::CallFlatteningPass;
pub use propagate::PropagationPass;
pub use shortcircuit::{LeafPath, Leaves, ShortCircuitEliminationPass};
pub use ssadestruct::SsaDestructionPass;
