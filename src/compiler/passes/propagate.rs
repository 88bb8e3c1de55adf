//! Pure-expression propagation pass.
//!
//! This pass inlines every administrative binding (an assignment whose value has no
//! effects) at its use sites and deletes bindings left without references.
//!
//! # Example
//!
//! Before:
//! ```text
//! a: int = (1 + 2)
//! b: int = (a * 3)
//! ret b
//! ```
//!
//! After:
//! ```text
//! ret ((1 + 2) * 3)
//! ```
//!
//! # Rules
//!
//! - A binding is a candidate iff its value is built only from literals, identifier
//!   references and primitive operations. Loads and calls are never inlined.
//! - Substitution is transitive: a use site receives the fully expanded tree.
//! - Substitution crosses block boundaries; the identifier namespace is procedure-wide.
//! - Afterwards every instruction that binds an identifier without references is removed
//!   if its value is pure. Loads, calls, stores and prunes are always kept.
//!
//! Computation may be duplicated at several use sites. This is accepted: the backend
//! prefers administrative-binding-free code over minimal code.

use std::collections::{HashMap, HashSet};

use crate::{
    compiler::{EventKind, IrPass, PassContext},
    ir::{Block, Expr, Ident, Instruction, Procedure},
    Error, Result,
};

/// Pure-expression propagation pass.
pub struct PropagationPass;

impl Default for PropagationPass {
    fn default() -> Self {
        Self::new()
    }
}

impl PropagationPass {
    /// Creates a new propagation pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Checks that every identifier is bound once and collects the pure bindings.
    fn candidates(procedure: &Procedure) -> Result<HashMap<Ident, Expr>> {
        let block_params = procedure.blocks().iter().flat_map(|b| b.params());
        let dests = procedure
            .blocks()
            .iter()
            .flat_map(|b| b.instructions())
            .filter_map(Instruction::dest);

        let mut bound: HashSet<&Ident> = HashSet::new();
        for ident in procedure
            .params()
            .iter()
            .chain(block_params)
            .map(|p| &p.name)
            .chain(dests)
        {
            if !bound.insert(ident) {
                return Err(Error::Rebound(ident.to_string()));
            }
        }

        let mut candidates = HashMap::new();
        for instr in procedure.blocks().iter().flat_map(|b| b.instructions()) {
            if let Instruction::Assign { dest, value, .. } = instr {
                if value.is_pure() {
                    candidates.insert(dest.clone(), value.clone());
                }
            }
        }
        Ok(candidates)
    }
}

/// Memoized transitive expansion of the candidate bindings.
struct Expander<'p> {
    definitions: &'p HashMap<Ident, Expr>,
    expanded: HashMap<Ident, Expr>,
    in_progress: HashSet<Ident>,
    /// Number of substituted references per candidate.
    uses: HashMap<Ident, usize>,
}

impl<'p> Expander<'p> {
    fn new(definitions: &'p HashMap<Ident, Expr>) -> Self {
        Self {
            definitions,
            expanded: HashMap::new(),
            in_progress: HashSet::new(),
            uses: HashMap::new(),
        }
    }

    /// Returns the fully expanded definition of candidate `ident`.
    fn resolve(&mut self, ident: &Ident) -> Result<Expr> {
        if let Some(done) = self.expanded.get(ident) {
            return Ok(done.clone());
        }
        let definitions = self.definitions;
        let Some(definition) = definitions.get(ident) else {
            return Ok(Expr::Var(ident.clone()));
        };
        if !self.in_progress.insert(ident.clone()) {
            return Err(malformed_error!(
                "pure binding `{}` is defined in terms of itself",
                ident
            ));
        }

        let expanded = self.expand(definition)?;
        if !expanded.is_pure() {
            return Err(malformed_error!(
                "expansion of `{}` is not pure: {}",
                ident,
                expanded
            ));
        }

        self.in_progress.remove(ident);
        self.expanded.insert(ident.clone(), expanded.clone());
        Ok(expanded)
    }

    /// Substitutes every candidate reference in `expr`.
    fn expand(&mut self, expr: &Expr) -> Result<Expr> {
        Ok(match expr {
            Expr::Var(ident) if self.definitions.contains_key(ident) => {
                *self.uses.entry(ident.clone()).or_insert(0) += 1;
                self.resolve(ident)?
            }
            Expr::Var(_) | Expr::Lit(_) | Expr::Load(_) => expr.clone(),
            Expr::Prim { op, args } => Expr::prim(*op, self.expand_all(args)?),
            Expr::Call { callee, args } => Expr::call(callee.clone(), self.expand_all(args)?),
        })
    }

    fn expand_all(&mut self, args: &[Expr]) -> Result<Vec<Expr>> {
        args.iter().map(|arg| self.expand(arg)).collect()
    }
}

impl IrPass for PropagationPass {
    fn name(&self) -> &'static str {
        "propagation"
    }

    fn description(&self) -> &'static str {
        "Inlines pure bindings at their uses and removes unused pure bindings"
    }

    fn run_on_procedure(
        &self,
        procedure: &Procedure,
        ctx: &mut PassContext<'_>,
    ) -> Result<Procedure> {
        let definitions = Self::candidates(procedure)?;
        let mut expander = Expander::new(&definitions);

        let mut substituted = Vec::with_capacity(procedure.block_count());
        for block in procedure.blocks() {
            let instructions = block
                .instructions()
                .iter()
                .map(|instr| match instr {
                    // A candidate's own definition is replaced by its expansion so it can
                    // be dropped below without leaving dangling references.
                    Instruction::Assign { dest, ty, .. } if definitions.contains_key(dest) => {
                        Ok(Instruction::assign(dest.clone(), ty.clone(), expander.resolve(dest)?))
                    }
                    _ => instr.try_map_expr(|e| expander.expand(e)),
                })
                .collect::<Result<Vec<_>>>()?;
            let terminator = block
                .terminator()
                .try_map_exprs(&mut |e| expander.expand(e))?;

            substituted.push(Block::with_params(
                block.label().clone(),
                block.params().to_vec(),
                instructions,
                terminator,
            ));
        }

        for (ident, count) in &expander.uses {
            ctx.record(EventKind::BindingInlined, procedure.entry())
                .message(format!("{ident} at {count} use(s)"));
        }

        let staged = procedure.rebuild(substituted, procedure.slots().to_vec());
        let references = staged.reference_counts();

        let mut blocks = Vec::with_capacity(staged.block_count());
        for block in staged.blocks() {
            let mut kept = Vec::with_capacity(block.instruction_count());
            for instr in block.instructions() {
                let unused = instr
                    .dest()
                    .is_some_and(|dest| !references.contains_key(dest));
                if unused && instr.is_removable() {
                    ctx.record(EventKind::InstructionRemoved, block.label())
                        .message(instr.to_string());
                } else {
                    kept.push(instr.clone());
                }
            }
            blocks.push(Block::with_params(
                block.label().clone(),
                block.params().to_vec(),
                kept,
                block.terminator().clone(),
            ));
        }

        Ok(procedure.rebuild(blocks, procedure.slots().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{EventLog, PipelineConfig},
        ir::{Cond, PrimOp, ProcedureBuilder, Signatures, Terminator, Type},
    };

    fn propagate(procedure: &Procedure) -> Result<Procedure> {
        let sigs = Signatures::new();
        let events = EventLog::new();
        let config = PipelineConfig::default();
        let mut ctx = PassContext::new(procedure, &sigs, &events, &config);
        PropagationPass::new().run_on_procedure(procedure, &mut ctx)
    }

    #[test]
    fn test_transitive_inlining_and_removal() {
        // a = 1+2; b = a*3; ret b
        let proc = ProcedureBuilder::new("p")
            .returns(Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    let a = b.assign("a", Type::Int, Expr::binary(PrimOp::Add, Expr::int(1), Expr::int(2)));
                    let v = b.assign("b", Type::Int, Expr::binary(PrimOp::Mul, a, Expr::int(3)));
                    b.ret(v);
                });
            });

        let out = propagate(&proc).unwrap();
        let b0 = out.block("b0").unwrap();
        assert!(b0.instructions().is_empty());
        assert_eq!(b0.terminator().to_string(), "ret ((1 + 2) * 3)");
    }

    #[test]
    fn test_effects_are_kept() {
        let proc = ProcedureBuilder::new("p").build_with(|p| {
            p.block("b0", |b| {
                let l = b.assign("l", Type::Int, Expr::load("g"));
                b.assign("c", Type::Int, Expr::call("f", vec![]));
                let s = b.assign("s", Type::Int, Expr::binary(PrimOp::Add, l, Expr::int(1)));
                b.store("g", s);
                b.assign("dead", Type::Int, Expr::int(7));
                b.ret(Expr::unit());
            });
        });

        let out = propagate(&proc).unwrap();
        let lines: Vec<_> = out.blocks()[0]
            .instructions()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            vec!["l: int = load &g", "c: int = f()", "store &g, (l + 1)"]
        );
    }

    #[test]
    fn test_substitution_crosses_blocks() {
        let proc = ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    let c = b.assign("c", Type::Bool, Expr::binary(PrimOp::Lt, Expr::var("x"), Expr::int(0)));
                    b.assign("y", Type::Int, Expr::unary(PrimOp::Neg, Expr::var("x")));
                    b.branch(Cond::atom(c), Terminator::goto("b1"), Terminator::goto_with("b2", vec![Expr::var("x")]));
                });
                p.block("b1", |b| b.jump_with("b2", vec![Expr::var("y")]));
                p.block_with_params("b2", &[("r", Type::Int)], |b| b.ret(Expr::var("r")));
            });

        let out = propagate(&proc).unwrap();
        assert!(out.block("b0").unwrap().instructions().is_empty());
        assert_eq!(
            out.block("b0").unwrap().terminator().to_string(),
            "if (x < 0) then jmp b1 else jmp b2(x)"
        );
        assert_eq!(out.block("b1").unwrap().terminator().to_string(), "jmp b2(-x)");
    }

    #[test]
    fn test_no_pure_binding_left_unreferenced() {
        let proc = ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    let a = b.assign("a", Type::Int, Expr::binary(PrimOp::Add, Expr::var("x"), Expr::int(1)));
                    let l = b.assign("l", Type::Int, Expr::load("g"));
                    b.assign("unused", Type::Int, Expr::binary(PrimOp::Mul, a.clone(), l.clone()));
                    b.store("g", a);
                    b.ret(l);
                });
            });

        let out = propagate(&proc).unwrap();
        let refs = out.reference_counts();
        for block in out.blocks() {
            for instr in block.instructions() {
                if let Some(dest) = instr.dest() {
                    assert!(!instr.is_removable() || refs.contains_key(dest), "{instr}");
                }
            }
        }
        assert_eq!(out.instruction_count(), 2);
    }

    #[test]
    fn test_rebinding_rejected() {
        let proc = ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    b.assign("x", Type::Int, Expr::int(1));
                });
            });
        assert!(matches!(propagate(&proc), Err(Error::Rebound(name)) if name == "x"));
    }

    #[test]
    fn test_cyclic_definition_rejected() {
        let proc = ProcedureBuilder::new("p").build_with(|p| {
            p.block("b0", |b| {
                b.assign("a", Type::Int, Expr::binary(PrimOp::Add, Expr::var("b"), Expr::int(1)));
                b.assign("b", Type::Int, Expr::binary(PrimOp::Add, Expr::var("a"), Expr::int(1)));
                b.ret(Expr::var("a"));
            });
        });
        assert!(matches!(propagate(&proc), Err(Error::Malformed { .. })));
    }
}
