//! Procedures: the unit every pass rewrites.
//!
//! A procedure owns its blocks exclusively; blocks own their instructions and terminator.
//! Passes never mutate a procedure in place. They read the previous CFG immutably and
//! assemble a new one with [`Procedure::rebuild`], which keeps the signature and entry
//! label and swaps in the new block list and slot declarations.

use std::{
    collections::{HashMap, HashSet},
    fmt,
};

use crate::ir::{Block, Expr, Ident, Instruction, Label, Param, Type};

/// A defined procedure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Procedure {
    /// Global name of the procedure.
    name: String,

    /// Formal parameters in declared order.
    params: Vec<Param>,

    /// Return type.
    ret: Type,

    /// Label of the entry block.
    entry: Label,

    /// Blocks in layout order.
    blocks: Vec<Block>,

    /// Addressable storage declared by the procedure.
    slots: Vec<Param>,
}

impl Procedure {
    /// Creates a procedure.
    ///
    /// # Arguments
    ///
    /// * `name` - Global name of the procedure
    /// * `params` - Formal parameters
    /// * `ret` - Return type
    /// * `entry` - Label of the entry block
    /// * `blocks` - The blocks, in layout order
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        params: Vec<Param>,
        ret: Type,
        entry: impl Into<Label>,
        blocks: Vec<Block>,
    ) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
            entry: entry.into(),
            blocks,
            slots: Vec::new(),
        }
    }

    /// Replaces the slot declarations.
    #[must_use]
    pub fn with_slots(mut self, slots: Vec<Param>) -> Self {
        self.slots = slots;
        self
    }

    /// Creates a new procedure with this one's signature and entry label and the given
    /// blocks and slots.
    #[must_use]
    pub fn rebuild(&self, blocks: Vec<Block>, slots: Vec<Param>) -> Self {
        Self {
            name: self.name.clone(),
            params: self.params.clone(),
            ret: self.ret.clone(),
            entry: self.entry.clone(),
            blocks,
            slots,
        }
    }

    /// Returns the procedure name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the formal parameters.
    #[must_use]
    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Returns the return type.
    #[must_use]
    pub fn ret(&self) -> &Type {
        &self.ret
    }

    /// Returns the entry label.
    #[must_use]
    pub fn entry(&self) -> &Label {
        &self.entry
    }

    /// Returns the blocks in layout order.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the slot declarations.
    #[must_use]
    pub fn slots(&self) -> &[Param] {
        &self.slots
    }

    /// Returns the number of blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Looks up a block by label.
    #[must_use]
    pub fn block(&self, label: &str) -> Option<&Block> {
        self.blocks.iter().find(|b| b.label().as_str() == label)
    }

    /// Returns the entry block, if it exists.
    #[must_use]
    pub fn entry_block(&self) -> Option<&Block> {
        self.block(self.entry.as_str())
    }

    /// Builds a label to block map.
    #[must_use]
    pub fn block_index(&self) -> HashMap<&Label, &Block> {
        self.blocks.iter().map(|b| (b.label(), b)).collect()
    }

    /// Returns every label in use.
    #[must_use]
    pub fn labels(&self) -> HashSet<Label> {
        let mut labels: HashSet<Label> = self.blocks.iter().map(|b| b.label().clone()).collect();
        labels.insert(self.entry.clone());
        for block in &self.blocks {
            for succ in block.terminator().successors() {
                labels.insert(succ.clone());
            }
        }
        labels
    }

    /// Returns every identifier that occurs in the procedure, bound or referenced.
    ///
    /// This covers procedure and block parameters, assignment targets, slots, store and
    /// load addresses, and every identifier reference.
    #[must_use]
    pub fn identifiers(&self) -> HashSet<Ident> {
        let mut idents: HashSet<Ident> = HashSet::new();
        idents.extend(self.params.iter().map(|p| p.name.clone()));
        idents.extend(self.slots.iter().map(|p| p.name.clone()));

        for block in &self.blocks {
            idents.extend(block.params().iter().map(|p| p.name.clone()));
            for instr in block.instructions() {
                match instr {
                    Instruction::Assign { dest, .. } => {
                        idents.insert(dest.clone());
                    }
                    Instruction::Store { target, .. } => {
                        idents.insert(target.clone());
                    }
                    Instruction::Prune(_) => {}
                }
                collect_loads(instr.expr(), &mut idents);
            }
            block.terminator().for_each_expr(&mut |e| collect_loads(e, &mut idents));
            block.for_each_use(&mut |id| {
                idents.insert(id.clone());
            });
        }
        idents
    }

    /// Computes the predecessor index: for every block label, the labels of the blocks
    /// whose terminators can transfer control to it.
    ///
    /// A block jumping to the same target twice is listed once per edge.
    #[must_use]
    pub fn predecessors(&self) -> HashMap<Label, Vec<Label>> {
        let mut preds: HashMap<Label, Vec<Label>> = self
            .blocks
            .iter()
            .map(|b| (b.label().clone(), Vec::new()))
            .collect();
        for block in &self.blocks {
            for succ in block.terminator().successors() {
                preds
                    .entry(succ.clone())
                    .or_default()
                    .push(block.label().clone());
            }
        }
        preds
    }

    /// Counts the references to each identifier across all blocks.
    #[must_use]
    pub fn reference_counts(&self) -> HashMap<Ident, usize> {
        let mut counts: HashMap<Ident, usize> = HashMap::new();
        for block in &self.blocks {
            block.for_each_use(&mut |id| *counts.entry(id.clone()).or_insert(0) += 1);
        }
        counts
    }

    /// Returns the number of instructions across all blocks.
    #[must_use]
    pub fn instruction_count(&self) -> usize {
        self.blocks.iter().map(Block::instruction_count).sum()
    }
}

fn collect_loads(expr: &Expr, out: &mut HashSet<Ident>) {
    match expr {
        Expr::Load(slot) => {
            out.insert(slot.clone());
        }
        other => {
            for arg in other.operands() {
                collect_loads(arg, out);
            }
        }
    }
}

impl fmt::Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "proc {}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        writeln!(f, ") -> {} entry {} {{", self.ret, self.entry)?;
        for slot in &self.slots {
            writeln!(f, "  slot {slot}")?;
        }
        for block in &self.blocks {
            writeln!(f, "{block}")?;
        }
        f.write_str("}")
    }
}
