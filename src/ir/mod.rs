//! The intermediate representation shared by all normalization passes.
//!
//! A [`Module`] holds external declarations and [`Procedure`]s. Each procedure is a
//! control-flow graph of labeled [`Block`]s in SSA form: blocks declare formal
//! parameters that predecessors bind through jump arguments, instructions bind fresh
//! identifiers, and terminators transfer control.
//!
//! # Architecture
//!
//! - [`ident`] - Identifiers and labels
//! - [`types`] - Type annotations
//! - [`expr`] - Expression trees, effect classification and branch conditions
//! - [`instruction`] - Assignments, stores and prunes
//! - [`terminator`] - Jumps (possibly multi-target), conditionals, returns and throws
//! - [`block`] - Blocks and typed parameters
//! - [`procedure`] - Procedures and the CFG queries passes rely on
//! - [`module`] - Modules, declarations and the callee signature table
//! - [`builder`] - Closure-based construction API
//!
//! # Ownership
//!
//! A procedure exclusively owns its blocks, a block its instructions and terminator.
//! Expressions are value trees without back-references, so no cycles exist and every
//! pass can rebuild a procedure by cloning what it keeps.
//!
//! # Example
//!
//! ```text
//! proc main(x: int) -> int entry b0 {
//! b0:
//!   n1: int = f(g(x))
//!   if (n1 && ok) then jmp done(n1) else ret 0
//! done(r: int):
//!   ret r
//! }
//! ```

pub mod block;
pub mod builder;
pub mod expr;
pub mod ident;
pub mod instruction;
pub mod module;
pub mod procedure;
pub mod terminator;
pub mod types;

pub use block::{Block, Param};
pub use builder::{BlockBuilder, ProcedureBuilder, ProcedureContext};
pub use expr::{Cond, Effects, Expr, Literal, PrimOp};
pub use ident::{Ident, Label};
pub use instruction::Instruction;
pub use module::{Global, Item, Module, Signature, Signatures};
pub use procedure::Procedure;
pub use terminator::{JumpTarget, Terminator};
pub use types::Type;
