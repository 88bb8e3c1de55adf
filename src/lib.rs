// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![deny(unsafe_code)]

//! # cfgnorm
//!
//! Normalization passes for a block-parameterized SSA intermediate representation.
//!
//! Parsed programs arrive as a control-flow graph of labeled blocks whose expressions may
//! contain nested calls and whose conditional terminators may use short-circuit `&&` and
//! `||`. The analysis backend consuming this IR accepts a restricted shape: no nested
//! calls, no short-circuit conditionals, no block parameters and no administrative
//! bindings. `cfgnorm` provides the four CFG-rewriting passes producing that shape.
//!
//! ## Quick Start
//!
//! ```rust
//! use cfgnorm::prelude::*;
//!
//! let main = ProcedureBuilder::new("main")
//!     .param("x", Type::Int)
//!     .returns(Type::Int)
//!     .build_with(|p| {
//!         p.block("b0", |b| {
//!             let n1 = b.assign("n1", Type::Int, Expr::call("f", vec![Expr::call("g", vec![Expr::var("x")])]));
//!             b.ret(n1);
//!         });
//!     });
//! let module = Module::default()
//!     .with_extern("f", vec![Type::Int], Type::Int)
//!     .with_extern("g", vec![Type::Int], Type::Int)
//!     .with_procedure(main);
//!
//! let normalized = PassScheduler::default().run(&module)?;
//! println!("{normalized}");
//! # Ok::<(), cfgnorm::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`ir`] - The IR model: modules, procedures, blocks, instructions, expressions
//! - [`compiler`] - Pass trait, per-procedure context, event log, scheduler and the passes
//! - [`prelude`] - Convenient re-exports of commonly used types
//! - [`Error`] and [`Result`] - Error handling
//!
//! ### Pipeline
//!
//! | Order | Pass | Removes |
//! |-------|------|---------|
//! | 1 | [`compiler::CallFlatteningPass`] | nested calls |
//! | 2 | [`compiler::ShortCircuitEliminationPass`] | conditional terminators |
//! | 3 | [`compiler::PropagationPass`] | administrative pure bindings |
//! | 4 | [`compiler::SsaDestructionPass`] | block parameters and jump arguments |
//!
//! Each pass reads a procedure immutably and produces a new one. Every identifier, slot
//! and label introduced while rewriting one procedure comes from a single
//! [`compiler::FreshNames`] generator owned by that procedure's [`compiler::PassContext`].
//!
//! ## Error Handling
//!
//! All errors are IR contract violations; none is a recoverable runtime condition. The
//! scheduler tags every error with the procedure and pass that rejected it, and
//! [`compiler::PassScheduler::run_isolated`] keeps a failing procedure in its original
//! form without affecting its siblings.

#[macro_use]
pub(crate) mod error;

#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types.
pub mod prelude;

/// The intermediate representation shared by all passes.
pub mod ir;

/// Pass infrastructure and the normalization passes.
pub mod compiler;

/// `cfgnorm` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `cfgnorm` Error type
///
/// The main error type for all operations in this crate.
pub use error::Error;
