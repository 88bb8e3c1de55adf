//! Short-circuit elimination pass.
//!
//! This pass replaces every conditional terminator by an unconditional fan-out jump into
//! freshly generated decision blocks. Each decision block records, as `prune`
//! instructions, one way the guard can evaluate, and then continues to the arm that
//! outcome selects.
//!
//! # Example
//!
//! Before:
//! ```text
//! b0:
//!   if (n1 && n2) then jmp T else jmp F
//! ```
//!
//! After:
//! ```text
//! b0:
//!   jmp b0_then_1, b0_else_2, b0_else_3
//! b0_then_1:
//!   prune n1
//!   prune n2
//!   jmp T
//! b0_else_2:
//!   prune !n1
//!   jmp F
//! b0_else_3:
//!   prune !n2
//!   jmp F
//! ```
//!
//! # Leaf Sets
//!
//! For a guard `E` the true-leaves and false-leaves are lists of paths, each path a list
//! of `(atom, polarity)` pairs in evaluation order:
//!
//! | Guard | true-leaves | false-leaves |
//! |-------|-------------|--------------|
//! | `a` | `[(a, T)]` | `[(a, F)]` |
//! | `a && b` | `pa ++ pb` for every pair | `false(a)`, then `false(b)` |
//! | `a \|\| b` | `true(a)`, then `true(b)` | `pa ++ pb` for every pair |
//!
//! A path through the right operand of a connective that was reached because the left
//! operand did not decide the result records only the right operand's atoms. The omitted
//! atoms are unconstrained, never contradicted, so the expansion over-approximates the
//! feasible paths without losing any.
//!
//! Else-if chains are expanded recursively: a nested conditional arm is expanded once and
//! its fan-out jump is shared by every leaf of the enclosing guard that selects it.

use crate::{
    compiler::{EventKind, IrPass, PassContext},
    ir::{Block, Cond, Expr, Instruction, JumpTarget, Label, Procedure, Terminator},
    Result,
};

/// One way a guard can evaluate: atoms in evaluation order with the value each took.
pub type LeafPath = Vec<(Expr, bool)>;

/// The decision leaves of a guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Leaves {
    /// Paths on which the guard holds.
    pub on_true: Vec<LeafPath>,
    /// Paths on which the guard does not hold.
    pub on_false: Vec<LeafPath>,
}

impl Leaves {
    /// Computes the leaf sets of `cond`.
    #[must_use]
    pub fn of(cond: &Cond) -> Self {
        match cond {
            Cond::Atom(atom) => Self {
                on_true: vec![vec![(atom.clone(), true)]],
                on_false: vec![vec![(atom.clone(), false)]],
            },
            Cond::And(lhs, rhs) => {
                let lhs = Self::of(lhs);
                let rhs = Self::of(rhs);
                Self {
                    on_true: concat_pairs(&lhs.on_true, &rhs.on_true),
                    on_false: lhs.on_false.into_iter().chain(rhs.on_false).collect(),
                }
            }
            Cond::Or(lhs, rhs) => {
                let lhs = Self::of(lhs);
                let rhs = Self::of(rhs);
                Self {
                    on_true: lhs.on_true.into_iter().chain(rhs.on_true).collect(),
                    on_false: concat_pairs(&lhs.on_false, &rhs.on_false),
                }
            }
        }
    }
}

/// `{ pa ++ pb : pa in lhs, pb in rhs }`
fn concat_pairs(lhs: &[LeafPath], rhs: &[LeafPath]) -> Vec<LeafPath> {
    let mut out = Vec::with_capacity(lhs.len() * rhs.len());
    for pa in lhs {
        for pb in rhs {
            out.push(pa.iter().chain(pb).cloned().collect());
        }
    }
    out
}

/// Turns a leaf path into its `prune` sequence.
fn prunes(path: &LeafPath) -> Vec<Instruction> {
    path.iter()
        .map(|(atom, holds)| {
            if *holds {
                Instruction::prune(atom.clone())
            } else {
                Instruction::prune(Expr::not(atom.clone()))
            }
        })
        .collect()
}

/// Short-circuit elimination pass.
///
/// Expands every conditional terminator, including single-atom guards, so no `Branch`
/// survives.
pub struct ShortCircuitEliminationPass;

impl Default for ShortCircuitEliminationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl ShortCircuitEliminationPass {
    /// Creates a new short-circuit elimination pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Expands `term` (if conditional) into decision blocks pushed onto `out`, returning
    /// the terminator that replaces it.
    fn expand(
        home: &Label,
        term: &Terminator,
        ctx: &mut PassContext<'_>,
        out: &mut Vec<Block>,
    ) -> Result<Terminator> {
        let Terminator::Branch {
            cond,
            then_arm,
            else_arm,
        } = term
        else {
            return Ok(term.clone());
        };

        let leaves = Leaves::of(cond);
        let true_labels = leaves
            .on_true
            .iter()
            .map(|_| ctx.fresh_label(&format!("{home}_then")))
            .collect::<Result<Vec<_>>>()?;
        let false_labels = leaves
            .on_false
            .iter()
            .map(|_| ctx.fresh_label(&format!("{home}_else")))
            .collect::<Result<Vec<_>>>()?;

        let mut nested = Vec::new();
        let then_term = Self::expand(home, then_arm, ctx, &mut nested)?;
        let else_term = Self::expand(home, else_arm, ctx, &mut nested)?;

        let mut targets = Vec::with_capacity(true_labels.len() + false_labels.len());
        let arms = [
            (true_labels, &leaves.on_true, &then_term),
            (false_labels, &leaves.on_false, &else_term),
        ];
        for (labels, paths, arm) in arms {
            for (label, path) in labels.into_iter().zip(paths) {
                ctx.record(EventKind::LeafBlockCreated, home)
                    .message(format!("{label} -> {arm}"));
                out.push(Block::new(label.clone(), prunes(path), arm.clone()));
                targets.push(JumpTarget::new(label));
            }
        }
        out.append(&mut nested);

        ctx.record(EventKind::BranchExpanded, home)
            .message(format!("if {cond} into {} leaves", targets.len()));
        Ok(Terminator::Jump(targets))
    }
}

impl IrPass for ShortCircuitEliminationPass {
    fn name(&self) -> &'static str {
        "short-circuit-elimination"
    }

    fn description(&self) -> &'static str {
        "Expands conditional terminators into prune-guarded decision blocks"
    }

    fn run_on_procedure(
        &self,
        procedure: &Procedure,
        ctx: &mut PassContext<'_>,
    ) -> Result<Procedure> {
        let mut blocks = Vec::with_capacity(procedure.block_count());
        for block in procedure.blocks() {
            let mut leaves = Vec::new();
            let terminator = Self::expand(block.label(), block.terminator(), ctx, &mut leaves)?;
            blocks.push(Block::with_params(
                block.label().clone(),
                block.params().to_vec(),
                block.instructions().to_vec(),
                terminator,
            ));
            blocks.append(&mut leaves);
        }
        Ok(procedure.rebuild(blocks, procedure.slots().to_vec()))
    }
}
