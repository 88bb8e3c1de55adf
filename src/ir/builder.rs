//! Builder pattern for programmatic procedure construction.
//!
//! This module provides a fluent API for building procedures without assembling blocks,
//! instructions and terminators by hand. It's useful for:
//!
//! - Writing unit tests for the normalization passes
//! - Benchmarks and fixtures
//! - Callers that produce IR programmatically instead of through the textual parser
//!
//! # Design
//!
//! The builder uses a closure-based API where all blocks are defined within a single
//! expression, making the CFG structure visually clear. The first block defined is the
//! entry block.
//!
//! ```rust
//! use cfgnorm::ir::{Cond, Expr, ProcedureBuilder, Terminator, Type};
//!
//! let proc = ProcedureBuilder::new("abs")
//!     .param("x", Type::Int)
//!     .returns(Type::Int)
//!     .build_with(|p| {
//!         p.block("entry", |b| {
//!             let neg = b.assign("neg", Type::Bool, Expr::binary(
//!                 cfgnorm::ir::PrimOp::Lt, Expr::var("x"), Expr::int(0)));
//!             b.branch(Cond::atom(neg), Terminator::goto("flip"), Terminator::Return(Expr::var("x")));
//!         });
//!         p.block("flip", |b| b.ret(Expr::unary(cfgnorm::ir::PrimOp::Neg, Expr::var("x"))));
//!     });
//! assert_eq!(proc.block_count(), 2);
//! ```

use crate::ir::{
    Block, Cond, Expr, Ident, Instruction, JumpTarget, Label, Param, Procedure, Terminator, Type,
};

/// Builder for constructing procedures programmatically.
#[derive(Debug)]
pub struct ProcedureBuilder {
    name: String,
    params: Vec<Param>,
    ret: Type,
    slots: Vec<Param>,
    blocks: Vec<Block>,
}

impl ProcedureBuilder {
    /// Creates a builder for a procedure returning `unit` with no parameters.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            ret: Type::Unit,
            slots: Vec::new(),
            blocks: Vec::new(),
        }
    }

    /// Appends a formal parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<Ident>, ty: Type) -> Self {
        self.params.push(Param::new(name, ty));
        self
    }

    /// Sets the return type.
    #[must_use]
    pub fn returns(mut self, ty: Type) -> Self {
        self.ret = ty;
        self
    }

    /// Declares an addressable slot.
    #[must_use]
    pub fn slot(mut self, name: impl Into<Ident>, ty: Type) -> Self {
        self.slots.push(Param::new(name, ty));
        self
    }

    /// Builds the procedure using a closure that defines all blocks.
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that receives a [`ProcedureContext`] for defining blocks
    pub fn build_with<F>(mut self, f: F) -> Procedure
    where
        F: FnOnce(&mut ProcedureContext<'_>),
    {
        let mut ctx = ProcedureContext { builder: &mut self };
        f(&mut ctx);
        self.build()
    }

    fn build(self) -> Procedure {
        let entry = self
            .blocks
            .first()
            .map_or_else(|| Label::new("entry"), |b| b.label().clone());
        Procedure::new(self.name, self.params, self.ret, entry, self.blocks).with_slots(self.slots)
    }
}

/// Context passed to the build closure for defining blocks.
pub struct ProcedureContext<'a> {
    builder: &'a mut ProcedureBuilder,
}

impl ProcedureContext<'_> {
    /// Defines a block without parameters.
    pub fn block<F>(&mut self, label: impl Into<Label>, f: F)
    where
        F: FnOnce(&mut BlockBuilder),
    {
        self.block_with_params(label, &[], f);
    }

    /// Defines a block with formal parameters.
    ///
    /// # Arguments
    ///
    /// * `label` - The block label
    /// * `params` - `(name, type)` pairs in declared order
    /// * `f` - A closure that defines the block's contents
    pub fn block_with_params<F>(&mut self, label: impl Into<Label>, params: &[(&str, Type)], f: F)
    where
        F: FnOnce(&mut BlockBuilder),
    {
        let mut builder = BlockBuilder {
            instructions: Vec::new(),
            terminator: None,
        };
        f(&mut builder);

        let params = params
            .iter()
            .map(|(name, ty)| Param::new(*name, ty.clone()))
            .collect();
        let terminator = builder
            .terminator
            .unwrap_or_else(|| Terminator::Return(Expr::unit()));
        self.builder.blocks.push(Block::with_params(
            label,
            params,
            builder.instructions,
            terminator,
        ));
    }
}

/// Builder for the contents of one block.
///
/// A block left without a terminator returns `()`.
pub struct BlockBuilder {
    instructions: Vec<Instruction>,
    terminator: Option<Terminator>,
}

impl BlockBuilder {
    /// Adds `dest: ty = value` and returns a reference to `dest`.
    pub fn assign(&mut self, dest: impl Into<Ident>, ty: Type, value: Expr) -> Expr {
        let dest = dest.into();
        self.instructions
            .push(Instruction::assign(dest.clone(), ty, value));
        Expr::Var(dest)
    }

    /// Adds `store &target, value`.
    pub fn store(&mut self, target: impl Into<Ident>, value: Expr) {
        self.instructions.push(Instruction::store(target, value));
    }

    /// Adds `prune cond`.
    pub fn prune(&mut self, cond: Expr) {
        self.instructions.push(Instruction::prune(cond));
    }

    /// Adds an arbitrary instruction.
    pub fn instruction(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Terminates with `jmp label`.
    pub fn jump(&mut self, label: impl Into<Label>) {
        self.terminator = Some(Terminator::goto(label));
    }

    /// Terminates with `jmp label(args...)`.
    pub fn jump_with(&mut self, label: impl Into<Label>, args: Vec<Expr>) {
        self.terminator = Some(Terminator::goto_with(label, args));
    }

    /// Terminates with a multi-target jump.
    pub fn fan_out(&mut self, targets: Vec<JumpTarget>) {
        self.terminator = Some(Terminator::Jump(targets));
    }

    /// Terminates with `if cond then then_arm else else_arm`.
    pub fn branch(&mut self, cond: Cond, then_arm: Terminator, else_arm: Terminator) {
        self.terminator = Some(Terminator::branch(cond, then_arm, else_arm));
    }

    /// Terminates with `ret value`.
    pub fn ret(&mut self, value: Expr) {
        self.terminator = Some(Terminator::Return(value));
    }

    /// Terminates with `throw value`.
    pub fn throw(&mut self, value: Expr) {
        self.terminator = Some(Terminator::Throw(value));
    }

    /// Terminates with an arbitrary terminator.
    pub fn terminate(&mut self, terminator: Terminator) {
        self.terminator = Some(terminator);
    }
}
