//! SSA destruction pass.
//!
//! This pass removes every block parameter and every jump argument list, replacing them
//! with one addressable slot per (block, parameter position) and explicit store/load
//! sequences.
//!
//! # Example
//!
//! Before:
//! ```text
//! b0:
//!   jmp join(1, 2)
//! b1:
//!   jmp join(b, a)
//! join(x: int, y: int):
//!   ret (x - y)
//! ```
//!
//! After:
//! ```text
//! slot1: int
//! slot2: int
//! b0:
//!   store &slot1, 1
//!   store &slot2, 2
//!   jmp join
//! b1:
//!   store &slot1, b
//!   store &slot2, a
//!   jmp join
//! join:
//!   x: int = load &slot1
//!   y: int = load &slot2
//!   ret (x - y)
//! ```
//!
//! # Merge Semantics
//!
//! All stores of one edge execute in the predecessor before the target's loads execute,
//! and the stored expressions read SSA names, never the slots, so a predecessor passing
//! `join(b, a)` while another passes `join(a, b)` cannot clobber a value still needed.
//!
//! Stores for a single-target jump are placed at the end of the jumping block. A
//! multi-target jump or a conditional arm cannot host them there without every edge
//! overwriting every other edge's slots, so each such argument-carrying edge is split
//! through a fresh block holding only that edge's stores.

use std::collections::HashMap;

use crate::{
    compiler::{EventKind, IrPass, PassContext},
    ir::{Block, Expr, Ident, Instruction, JumpTarget, Label, Param, Procedure, Terminator},
    Error, Result,
};

/// SSA destruction pass.
pub struct SsaDestructionPass;

impl Default for SsaDestructionPass {
    fn default() -> Self {
        Self::new()
    }
}

impl SsaDestructionPass {
    /// Creates a new SSA destruction pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

/// Slot assignment for every block that declares parameters.
struct SlotMap {
    /// Parameter count of every block, used for arity checks.
    arity: HashMap<Label, usize>,
    /// Slots of each parameterized block, in parameter order.
    slots: HashMap<Label, Vec<Ident>>,
}

impl SlotMap {
    fn allocate(procedure: &Procedure, ctx: &mut PassContext<'_>) -> Result<(Self, Vec<Param>)> {
        if let Some(entry) = procedure.entry_block() {
            if entry.has_params() {
                return Err(malformed_error!(
                    "entry block `{}` declares parameters",
                    entry.label()
                ));
            }
        }

        let mut arity = HashMap::new();
        let mut slots = HashMap::new();
        let mut declared = Vec::new();
        for block in procedure.blocks() {
            arity.insert(block.label().clone(), block.params().len());
            if !block.has_params() {
                continue;
            }

            let mut block_slots = Vec::with_capacity(block.params().len());
            for param in block.params() {
                let slot = ctx.fresh_slot()?;
                ctx.record(EventKind::ParameterSlotted, block.label())
                    .message(format!("{} -> {slot}", param.name));
                declared.push(Param::new(slot.clone(), param.ty.clone()));
                block_slots.push(slot);
            }
            slots.insert(block.label().clone(), block_slots);
        }
        Ok((Self { arity, slots }, declared))
    }

    /// Returns the stores binding `target`'s arguments to its slots.
    fn stores(&self, target: &JumpTarget) -> Result<Vec<Instruction>> {
        let expected = *self
            .arity
            .get(&target.label)
            .ok_or_else(|| Error::UnknownLabel(target.label.to_string()))?;
        if expected != target.args.len() {
            return Err(Error::ArityMismatch {
                label: target.label.to_string(),
                expected,
                found: target.args.len(),
            });
        }

        Ok(match self.slots.get(&target.label) {
            Some(slots) => slots
                .iter()
                .zip(&target.args)
                .map(|(slot, arg)| Instruction::store(slot.clone(), arg.clone()))
                .collect(),
            None => Vec::new(),
        })
    }
}

/// Rewrite state for one block's terminator.
struct EdgeLowering<'m, 'c, 'a> {
    slots: &'m SlotMap,
    ctx: &'c mut PassContext<'a>,
    home: &'m Label,
    /// Edge blocks created for this terminator.
    edges: Vec<Block>,
}

impl EdgeLowering<'_, '_, '_> {
    /// Lowers the terminator ending a block; stores for a lone jump go into `tail`.
    fn terminator(&mut self, term: &Terminator, tail: &mut Vec<Instruction>) -> Result<Terminator> {
        match term {
            Terminator::Jump(targets) if targets.len() == 1 => {
                let target = &targets[0];
                let stores = self.stores(target)?;
                tail.extend(stores);
                Ok(Terminator::goto(target.label.clone()))
            }
            _ => self.nested(term),
        }
    }

    /// Lowers a terminator whose argument-carrying edges need blocks of their own.
    fn nested(&mut self, term: &Terminator) -> Result<Terminator> {
        match term {
            Terminator::Jump(targets) => Ok(Terminator::Jump(
                targets
                    .iter()
                    .map(|target| self.split(target))
                    .collect::<Result<_>>()?,
            )),
            Terminator::Branch {
                cond,
                then_arm,
                else_arm,
            } => {
                let then_arm = self.nested(then_arm)?;
                let else_arm = self.nested(else_arm)?;
                Ok(Terminator::branch(cond.clone(), then_arm, else_arm))
            }
            Terminator::Return(_) | Terminator::Throw(_) => Ok(term.clone()),
        }
    }

    /// Routes `target` through a fresh block holding its stores, if it has any.
    fn split(&mut self, target: &JumpTarget) -> Result<JumpTarget> {
        let stores = self.stores(target)?;
        if stores.is_empty() {
            return Ok(JumpTarget::new(target.label.clone()));
        }

        let edge = self.ctx.fresh_label(&format!("{}_edge", self.home))?;
        self.ctx
            .record(EventKind::EdgeSplit, self.home)
            .message(format!("{} -> {edge} -> {}", self.home, target.label));
        self.edges.push(Block::new(
            edge.clone(),
            stores,
            Terminator::goto(target.label.clone()),
        ));
        Ok(JumpTarget::new(edge))
    }

    fn stores(&mut self, target: &JumpTarget) -> Result<Vec<Instruction>> {
        let stores = self.slots.stores(target)?;
        for store in &stores {
            self.ctx
                .record(EventKind::StoreInserted, self.home)
                .message(store.to_string());
        }
        Ok(stores)
    }
}

impl IrPass for SsaDestructionPass {
    fn name(&self) -> &'static str {
        "ssa-destruction"
    }

    fn description(&self) -> &'static str {
        "Replaces block parameters with slots written before each jump"
    }

    fn run_on_procedure(
        &self,
        procedure: &Procedure,
        ctx: &mut PassContext<'_>,
    ) -> Result<Procedure> {
        let (slot_map, declared) = SlotMap::allocate(procedure, ctx)?;

        let mut blocks = Vec::with_capacity(procedure.block_count());
        for block in procedure.blocks() {
            let mut instructions = Vec::with_capacity(block.instruction_count());
            if let Some(slots) = slot_map.slots.get(block.label()) {
                for (param, slot) in block.params().iter().zip(slots) {
                    instructions.push(Instruction::assign(
                        param.name.clone(),
                        param.ty.clone(),
                        Expr::load(slot.clone()),
                    ));
                }
            }
            instructions.extend(block.instructions().iter().cloned());

            let mut lowering = EdgeLowering {
                slots: &slot_map,
                ctx: &mut *ctx,
                home: block.label(),
                edges: Vec::new(),
            };
            let terminator = lowering.terminator(block.terminator(), &mut instructions)?;
            let mut edges = lowering.edges;

            blocks.push(Block::new(block.label().clone(), instructions, terminator));
            blocks.append(&mut edges);
        }

        let mut slots = procedure.slots().to_vec();
        slots.extend(declared);
        Ok(procedure.rebuild(blocks, slots))
    }
}
