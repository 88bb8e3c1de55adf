//! Basic blocks with block parameters.
//!
//! A block is the unit of control flow: a label, an ordered list of formal parameters
//! (the SSA merge values it receives from whichever predecessor jumped to it), a list of
//! straight-line instructions and exactly one terminator.
//!
//! ```text
//! loop(i: int, acc: int):
//!   c: bool = (i < n)
//!   if c then jmp body else jmp done(acc)
//! ```
//!
//! Predecessors are not stored; they are derived from terminators when a pass needs them
//! (see [`crate::ir::Procedure::predecessors`]).

use std::fmt;

use crate::ir::{Ident, Instruction, Label, Terminator, Type};

/// A typed name: procedure parameter, block parameter or slot declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Param {
    /// The bound identifier.
    pub name: Ident,
    /// Its type.
    pub ty: Type,
}

impl Param {
    /// Creates a typed name.
    #[must_use]
    pub fn new(name: impl Into<Ident>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// A labeled basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    /// Block label, unique within the procedure.
    label: Label,

    /// Formal parameters bound on entry, in declared order.
    params: Vec<Param>,

    /// Instructions in execution order.
    instructions: Vec<Instruction>,

    /// The control transfer ending the block.
    terminator: Terminator,
}

impl Block {
    /// Creates a block without parameters.
    #[must_use]
    pub fn new(label: impl Into<Label>, instructions: Vec<Instruction>, terminator: Terminator) -> Self {
        Self {
            label: label.into(),
            params: Vec::new(),
            instructions,
            terminator,
        }
    }

    /// Creates a block with formal parameters.
    #[must_use]
    pub fn with_params(
        label: impl Into<Label>,
        params: Vec<Param>,
        instructions: Vec<Instruction>,
        terminator: Terminator,
    ) -> Self {
        Self {
            label: label.into(),
            params,
            instructions,
            terminator,
        }
    }

    /// Returns the block label.
    #[must_use]
    pub fn label(&self) -> &Label {
        &self.label
    }

    /// Returns the formal parameters.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the instructions.
    #[must_use]
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns the terminator.
    #[must_use]
    pub fn terminator(&self) -> &Terminator {
        &self.terminator
    }

    /// Returns the number of instructions.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.instructions.len()
    }

    /// Returns `true` if the block declares parameters.
    #[must_use]
    pub fn has_params(&self) -> bool {
        !self.params.is_empty()
    }

    /// Decomposes the block into label, parameters, instructions and terminator.
    #[must_use]
    pub fn into_parts(self) -> (Label, Vec<Param>, Vec<Instruction>, Terminator) {
        (self.label, self.params, self.instructions, self.terminator)
    }

    /// Visits every identifier read by the block's instructions and terminator.
    pub fn for_each_use<F: FnMut(&Ident)>(&self, f: &mut F) {
        for instr in &self.instructions {
            instr.for_each_use(f);
        }
        self.terminator.for_each_use(f);
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        if !self.params.is_empty() {
            f.write_str("(")?;
            for (i, param) in self.params.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{param}")?;
            }
            f.write_str(")")?;
        }
        writeln!(f, ":")?;
        for instr in &self.instructions {
            writeln!(f, "  {instr}")?;
        }
        write!(f, "  {}", self.terminator)
    }
}
