//! Call flattening pass.
//!
//! This pass rewrites nested calls into a flat sequence of single-call assignments, so
//! every call result is bound by its own instruction and referenced afterwards only by
//! identifier.
//!
//! # Example
//!
//! Before:
//! ```text
//! n1: int = f(g(x))
//! ret h(n1)
//! ```
//!
//! After:
//! ```text
//! t2: int = g(x)
//! n1: int = f(t2)
//! t3: int = h(n1)
//! ret t3
//! ```
//!
//! # Algorithm
//!
//! Each block's instructions and terminator are processed in order. Sub-expressions are
//! flattened depth-first, left to right, innermost first; every call met on the way is
//! bound to a fresh temporary by a new assignment emitted immediately before the
//! instruction or terminator being processed. A call that is the direct right-hand side
//! of an assignment stays where it is (only its arguments are flattened).
//!
//! Conditional terminators need care because their arms and the right operands of `&&`
//! and `||` are evaluated conditionally:
//!
//! - an arm whose expressions contain calls is outlined into a fresh block and replaced
//!   by a jump to it, so its calls only run when the arm is taken;
//! - a guard atom containing calls that is not evaluated first is moved into a fresh
//!   block reached only when the preceding atoms did not already decide the guard.
//!
//! Call side-effect order and argument evaluation order are preserved exactly.

use crate::{
    compiler::{EventKind, IrPass, PassContext},
    ir::{Block, Cond, Expr, Instruction, Label, Procedure, Terminator},
    Result,
};

/// Call flattening pass.
///
/// Hoists every call that is not the whole right-hand side of an assignment into an
/// assignment of its own, typed from the callee's declared return type.
pub struct CallFlatteningPass;

impl Default for CallFlatteningPass {
    fn default() -> Self {
        Self::new()
    }
}

impl CallFlatteningPass {
    /// Creates a new call flattening pass.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl IrPass for CallFlatteningPass {
    fn name(&self) -> &'static str {
        "call-flattening"
    }

    fn description(&self) -> &'static str {
        "Binds every nested call to its own temporary in evaluation order"
    }

    fn run_on_procedure(
        &self,
        procedure: &Procedure,
        ctx: &mut PassContext<'_>,
    ) -> Result<Procedure> {
        let mut flattener = Flattener {
            ctx,
            outlined: Vec::new(),
        };

        let mut blocks = Vec::with_capacity(procedure.block_count());
        for block in procedure.blocks() {
            let home = block.label();
            let mut instructions = Vec::with_capacity(block.instruction_count());
            for instr in block.instructions() {
                let flat = flattener.instruction(home, instr, &mut instructions)?;
                instructions.push(flat);
            }
            let terminator = flattener.terminator(home, block.terminator(), &mut instructions)?;

            blocks.push(Block::with_params(
                home.clone(),
                block.params().to_vec(),
                instructions,
                terminator,
            ));
            blocks.append(&mut flattener.outlined);
        }

        Ok(procedure.rebuild(blocks, procedure.slots().to_vec()))
    }
}

/// Rewrite state for one procedure.
struct Flattener<'c, 'a> {
    ctx: &'c mut PassContext<'a>,
    /// Blocks created for outlined arms and guard atoms, flushed after each source block.
    outlined: Vec<Block>,
}

impl Flattener<'_, '_> {
    /// Replaces every call in `expr` by a fresh temporary, emitting the calls into `out`.
    fn hoist(&mut self, home: &Label, expr: &Expr, out: &mut Vec<Instruction>) -> Result<Expr> {
        match expr {
            Expr::Var(_) | Expr::Lit(_) | Expr::Load(_) => Ok(expr.clone()),
            Expr::Prim { op, args } => Ok(Expr::prim(*op, self.hoist_all(home, args, out)?)),
            Expr::Call { callee, args } => {
                let call = Expr::call(callee.clone(), self.hoist_all(home, args, out)?);
                let ty = self.ctx.signatures.return_type(callee)?.clone();
                let temp = self.ctx.fresh_temp()?;

                let instr = Instruction::assign(temp.clone(), ty, call);
                self.ctx
                    .record(EventKind::CallHoisted, home)
                    .message(instr.to_string());
                out.push(instr);
                Ok(Expr::Var(temp))
            }
        }
    }

    fn hoist_all(
        &mut self,
        home: &Label,
        args: &[Expr],
        out: &mut Vec<Instruction>,
    ) -> Result<Vec<Expr>> {
        args.iter().map(|arg| self.hoist(home, arg, out)).collect()
    }

    fn instruction(
        &mut self,
        home: &Label,
        instr: &Instruction,
        out: &mut Vec<Instruction>,
    ) -> Result<Instruction> {
        if !instr.expr().contains_call() {
            return Ok(instr.clone());
        }
        instr.try_map_expr(|value| match (instr, value) {
            (Instruction::Assign { .. }, Expr::Call { callee, args }) => {
                Ok(Expr::call(callee.clone(), self.hoist_all(home, args, out)?))
            }
            _ => self.hoist(home, value, out),
        })
    }

    fn terminator(
        &mut self,
        home: &Label,
        term: &Terminator,
        out: &mut Vec<Instruction>,
    ) -> Result<Terminator> {
        if !term.contains_call() {
            return Ok(term.clone());
        }
        match term {
            Terminator::Branch {
                cond,
                then_arm,
                else_arm,
            } => {
                let then_arm = self.arm(home, then_arm)?;
                let else_arm = self.arm(home, else_arm)?;
                self.guard(home, cond, then_arm, else_arm, out)
            }
            _ => term.try_map_exprs(&mut |expr| self.hoist(home, expr, out)),
        }
    }

    /// Outlines a branch arm containing calls into its own block.
    fn arm(&mut self, home: &Label, arm: &Terminator) -> Result<Terminator> {
        if !arm.contains_call() {
            return Ok(arm.clone());
        }
        let label = self.ctx.fresh_label(&format!("{home}_arm"))?;
        let mut instructions = Vec::new();
        let terminator = self.terminator(&label, arm, &mut instructions)?;

        self.ctx
            .record(EventKind::ArmOutlined, home)
            .message(format!("{arm} -> {label}"));
        self.outlined
            .push(Block::new(label.clone(), instructions, terminator));
        Ok(Terminator::goto(label))
    }

    /// Lowers `if cond then t else e` so that calls in `cond` run exactly when the
    /// short-circuit evaluation of `cond` would run them.
    fn guard(
        &mut self,
        home: &Label,
        cond: &Cond,
        t: Terminator,
        e: Terminator,
        out: &mut Vec<Instruction>,
    ) -> Result<Terminator> {
        if !cond.contains_call() {
            return Ok(Terminator::branch(cond.clone(), t, e));
        }
        match cond {
            Cond::Atom(atom) => {
                let atom = self.hoist(home, atom, out)?;
                Ok(Terminator::branch(Cond::Atom(atom), t, e))
            }
            Cond::And(lhs, rhs) => {
                let rest = self.deferred_guard(home, rhs, t, e.clone())?;
                self.guard(home, lhs, rest, e, out)
            }
            Cond::Or(lhs, rhs) => {
                let rest = self.deferred_guard(home, rhs, t.clone(), e)?;
                self.guard(home, lhs, t, rest, out)
            }
        }
    }

    /// Builds the arm evaluating the right operand of a short-circuit connective.
    fn deferred_guard(
        &mut self,
        home: &Label,
        cond: &Cond,
        t: Terminator,
        e: Terminator,
    ) -> Result<Terminator> {
        if !cond.contains_call() {
            return Ok(Terminator::branch(cond.clone(), t, e));
        }
        let label = self.ctx.fresh_label(&format!("{home}_cond"))?;
        let mut instructions = Vec::new();
        let terminator = self.guard(&label, cond, t, e, &mut instructions)?;
        self.outlined
            .push(Block::new(label.clone(), instructions, terminator));
        Ok(Terminator::goto(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        compiler::{EventLog, PipelineConfig},
        ir::{Module, PrimOp, ProcedureBuilder, Signatures, Type},
        test::interp::{run_procedure, Value},
        Error,
    };

    fn signatures() -> Signatures {
        let mut sigs = Signatures::new();
        for name in ["f", "g", "h", "k"] {
            sigs.insert(name, Type::Int);
        }
        sigs.insert("ok", Type::Bool);
        sigs
    }

    fn flatten(procedure: &Procedure) -> Result<Procedure> {
        let sigs = signatures();
        let events = EventLog::new();
        let config = PipelineConfig::default();
        let mut ctx = PassContext::new(procedure, &sigs, &events, &config);
        CallFlatteningPass::new().run_on_procedure(procedure, &mut ctx)
    }

    fn no_nested_calls(procedure: &Procedure) -> bool {
        procedure.blocks().iter().all(|block| {
            let instrs_ok = block.instructions().iter().all(|instr| match instr {
                Instruction::Assign {
                    value: Expr::Call { args, .. },
                    ..
                } => args.iter().all(|a| !a.contains_call()),
                other => !other.expr().contains_call(),
            });
            instrs_ok && !block.terminator().contains_call()
        })
    }

    #[test]
    fn test_inner_call_hoisted_outer_kept() {
        // n1 = f(g(x))
        let proc = ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .returns(Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    let n1 = b.assign(
                        "n1",
                        Type::Int,
                        Expr::call("f", vec![Expr::call("g", vec![Expr::var("x")])]),
                    );
                    b.ret(n1);
                });
            });

        let flat = flatten(&proc).unwrap();
        let b0 = flat.block("b0").unwrap();
        let lines: Vec<_> = b0.instructions().iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["t2: int = g(x)", "n1: int = f(t2)"]);
        assert_eq!(b0.terminator().to_string(), "ret n1");
    }

    #[test]
    fn test_hoisting_order_is_inside_out_left_to_right() {
        // store &s, (f(g(x)) + h(k(y)))
        let proc = ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .param("y", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    b.store(
                        "s",
                        Expr::binary(
                            PrimOp::Add,
                            Expr::call("f", vec![Expr::call("g", vec![Expr::var("x")])]),
                            Expr::call("h", vec![Expr::call("k", vec![Expr::var("y")])]),
                        ),
                    );
                });
            });

        let flat = flatten(&proc).unwrap();
        let lines: Vec<_> = flat.blocks()[0]
            .instructions()
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            lines,
            vec![
                "t1: int = g(x)",
                "t2: int = f(t1)",
                "t3: int = k(y)",
                "t4: int = h(t3)",
                "store &s, (t2 + t4)",
            ]
        );
    }

    #[test]
    fn test_terminator_calls_hoisted() {
        let proc = ProcedureBuilder::new("p").build_with(|p| {
            p.block("b0", |b| {
                b.jump_with("b1", vec![Expr::call("f", vec![]), Expr::int(1)]);
            });
            p.block_with_params("b1", &[("a", Type::Int), ("c", Type::Int)], |b| {
                b.throw(Expr::call("g", vec![Expr::var("a")]));
            });
        });

        let flat = flatten(&proc).unwrap();
        assert_eq!(flat.blocks()[0].terminator().to_string(), "jmp b1(t1, 1)");
        assert_eq!(flat.blocks()[1].terminator().to_string(), "throw t2");
        assert!(no_nested_calls(&flat));
    }

    #[test]
    fn test_arm_with_call_is_outlined() {
        let proc = ProcedureBuilder::new("p")
            .param("c", Type::Bool)
            .build_with(|p| {
                p.block("b0", |b| {
                    b.branch(
                        Cond::atom(Expr::var("c")),
                        Terminator::Return(Expr::call("f", vec![])),
                        Terminator::Return(Expr::int(0)),
                    );
                });
            });

        let flat = flatten(&proc).unwrap();
        assert_eq!(flat.block_count(), 2);
        assert_eq!(
            flat.blocks()[0].terminator().to_string(),
            "if c then jmp b0_arm_1 else ret 0"
        );
        let arm = flat.block("b0_arm_1").unwrap();
        assert_eq!(arm.instructions()[0].to_string(), "t1: int = f()");
        assert_eq!(arm.terminator().to_string(), "ret t1");
    }

    #[test]
    fn test_deferred_guard_atom_not_hoisted_above_branch() {
        // if (c && ok(x)) then jmp T else jmp F
        let proc = ProcedureBuilder::new("p")
            .param("c", Type::Bool)
            .param("x", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    b.branch(
                        Cond::and(
                            Cond::atom(Expr::var("c")),
                            Cond::atom(Expr::call("ok", vec![Expr::var("x")])),
                        ),
                        Terminator::goto("T"),
                        Terminator::goto("F"),
                    );
                });
                p.block("T", |b| b.ret(Expr::int(1)));
                p.block("F", |b| b.ret(Expr::int(0)));
            });

        let flat = flatten(&proc).unwrap();
        let b0 = flat.block("b0").unwrap();
        assert!(b0.instructions().is_empty());
        assert_eq!(
            b0.terminator().to_string(),
            "if c then jmp b0_cond_1 else jmp F"
        );
        let cond = flat.block("b0_cond_1").unwrap();
        assert_eq!(cond.instructions()[0].to_string(), "t1: bool = ok(x)");
        assert_eq!(cond.terminator().to_string(), "if t1 then jmp T else jmp F");

        // ok() must not run when c is false
        let run = run_procedure(&flat, &[Value::Bool(false), Value::Int(3)]).unwrap();
        assert!(run.calls.is_empty());
        assert_eq!(run.result, Ok(Value::Int(0)));
    }

    #[test]
    fn test_call_trace_preserved() {
        let proc = ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .returns(Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    let a = b.assign(
                        "a",
                        Type::Int,
                        Expr::binary(
                            PrimOp::Mul,
                            Expr::call("f", vec![Expr::var("x")]),
                            Expr::call("g", vec![Expr::call("h", vec![Expr::int(2)])]),
                        ),
                    );
                    b.branch(
                        Cond::or(
                            Cond::atom(Expr::call("ok", vec![a.clone()])),
                            Cond::atom(Expr::binary(
                                PrimOp::Lt,
                                Expr::call("k", vec![a.clone()]),
                                Expr::int(0),
                            )),
                        ),
                        Terminator::Return(Expr::call("f", vec![a.clone()])),
                        Terminator::Return(a),
                    );
                });
            });

        let flat = flatten(&proc).unwrap();
        assert!(no_nested_calls(&flat));
        for x in [-3, 0, 1, 7] {
            let before = run_procedure(&proc, &[Value::Int(x)]).unwrap();
            let after = run_procedure(&flat, &[Value::Int(x)]).unwrap();
            assert_eq!(before.calls, after.calls, "x = {x}");
            assert_eq!(before.result, after.result, "x = {x}");
        }
    }

    #[test]
    fn test_idempotent() {
        let proc = ProcedureBuilder::new("p")
            .param("x", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    b.prune(Expr::call("ok", vec![Expr::call("f", vec![Expr::var("x")])]));
                    b.ret(Expr::call("g", vec![Expr::var("x")]));
                });
            });

        let once = flatten(&proc).unwrap();
        let twice = flatten(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_unknown_callee_rejected() {
        let proc = ProcedureBuilder::new("p").build_with(|p| {
            p.block("b0", |b| b.ret(Expr::call("missing", vec![])));
        });
        assert!(matches!(flatten(&proc), Err(Error::UnknownCallee(name)) if name == "missing"));
    }

    #[test]
    fn test_transform_tags_errors() {
        let proc = ProcedureBuilder::new("broken").build_with(|p| {
            p.block("b0", |b| b.ret(Expr::call("missing", vec![])));
        });
        let module = Module::default().with_procedure(proc);
        match CallFlatteningPass::new().transform(&module) {
            Err(Error::Pass {
                procedure, pass, ..
            }) => {
                assert_eq!(procedure, "broken");
                assert_eq!(pass, "call-flattening");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
