//! Normalization pipeline integration tests.
//!
//! These tests drive the passes through the public API only:
//! 1. Build a module with `ProcedureBuilder`
//! 2. Run a single pass via `IrPass::transform`, or the whole pipeline via `PassScheduler`
//! 3. Verify the rewritten blocks and the backend shape contract

use cfgnorm::prelude::*;
use cfgnorm::compiler::check_backend_shape;

/// Rendered instructions of `label` in `procedure`.
fn instructions(procedure: &Procedure, label: &str) -> Vec<String> {
    procedure
        .block(label)
        .expect("block exists")
        .instructions()
        .iter()
        .map(ToString::to_string)
        .collect()
}

/// Rendered terminator of `label` in `procedure`.
fn terminator(procedure: &Procedure, label: &str) -> String {
    procedure
        .block(label)
        .expect("block exists")
        .terminator()
        .to_string()
}

/// `classify(x)`: nested calls, a short-circuit guard with a call in its right operand
/// and a join block receiving a value through a block parameter.
fn classify() -> Procedure {
    ProcedureBuilder::new("classify")
        .param("x", Type::Int)
        .returns(Type::Int)
        .build_with(|p| {
            p.block("b0", |b| {
                let n1 = b.assign(
                    "n1",
                    Type::Int,
                    Expr::call("f", vec![Expr::call("g", vec![Expr::var("x")])]),
                );
                b.branch(
                    Cond::and(
                        Cond::atom(Expr::binary(PrimOp::Gt, n1.clone(), Expr::int(0))),
                        Cond::atom(Expr::call("ok", vec![n1.clone()])),
                    ),
                    Terminator::goto_with("done", vec![n1]),
                    Terminator::goto_with("done", vec![Expr::int(0)]),
                );
            });
            p.block_with_params("done", &[("r", Type::Int)], |b| b.ret(Expr::var("r")));
        })
}

/// `swap(a, b, c)`: both predecessors of `join` pass the same values in opposite order.
fn swap() -> Procedure {
    ProcedureBuilder::new("swap")
        .param("a", Type::Int)
        .param("b", Type::Int)
        .param("c", Type::Bool)
        .returns(Type::Int)
        .build_with(|p| {
            p.block("b0", |b| {
                b.branch(Cond::atom(Expr::var("c")), Terminator::goto("b1"), Terminator::goto("b2"));
            });
            p.block("b1", |b| b.jump_with("join", vec![Expr::var("a"), Expr::var("b")]));
            p.block("b2", |b| b.jump_with("join", vec![Expr::var("b"), Expr::var("a")]));
            p.block_with_params("join", &[("x", Type::Int), ("y", Type::Int)], |b| {
                b.ret(Expr::binary(PrimOp::Sub, Expr::var("x"), Expr::var("y")));
            });
        })
}

fn module() -> Module {
    Module::default()
        .with_extern("f", vec![Type::Int], Type::Int)
        .with_extern("g", vec![Type::Int], Type::Int)
        .with_extern("ok", vec![Type::Int], Type::Bool)
        .with_global("counter", Type::Int)
        .with_procedure(classify())
        .with_procedure(swap())
}

#[test]
fn test_call_flattening_hoists_inner_call() -> Result<()> {
    let main = ProcedureBuilder::new("main")
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
    let module = Module::default()
        .with_extern("f", vec![Type::Int], Type::Int)
        .with_extern("g", vec![Type::Int], Type::Int)
        .with_procedure(main);

    let out = CallFlatteningPass::new().transform(&module)?;
    let main = out.procedure("main").expect("main survives");

    // The counter starts above the largest numeric suffix in use (`n1`).
    assert_eq!(instructions(main, "b0"), vec!["t2: int = g(x)", "n1: int = f(t2)"]);
    assert_eq!(terminator(main, "b0"), "ret n1");
    Ok(())
}

#[test]
fn test_short_circuit_and_expands_into_leaves() -> Result<()> {
    let main = ProcedureBuilder::new("main")
        .param("n1", Type::Bool)
        .param("n2", Type::Bool)
        .returns(Type::Int)
        .build_with(|p| {
            p.block("b0", |b| {
                b.branch(
                    Cond::and(Cond::atom(Expr::var("n1")), Cond::atom(Expr::var("n2"))),
                    Terminator::goto("T"),
                    Terminator::goto("F"),
                );
            });
            p.block("T", |b| b.ret(Expr::int(1)));
            p.block("F", |b| b.ret(Expr::int(0)));
        });
    let module = Module::default().with_procedure(main);

    let out = ShortCircuitEliminationPass::new().transform(&module)?;
    let main = out.procedure("main").expect("main survives");

    assert_eq!(terminator(main, "b0"), "jmp b0_then_1, b0_else_2, b0_else_3");
    assert_eq!(instructions(main, "b0_then_1"), vec!["prune n1", "prune n2"]);
    assert_eq!(terminator(main, "b0_then_1"), "jmp T");
    assert_eq!(instructions(main, "b0_else_2"), vec!["prune !n1"]);
    assert_eq!(instructions(main, "b0_else_3"), vec!["prune !n2"]);
    assert_eq!(terminator(main, "b0_else_3"), "jmp F");
    assert!(main.blocks().iter().all(|b| !b.terminator().is_branch()));
    Ok(())
}

#[test]
fn test_propagation_inlines_pure_chain() -> Result<()> {
    let main = ProcedureBuilder::new("main")
        .returns(Type::Int)
        .build_with(|p| {
            p.block("b0", |b| {
                let a = b.assign("a", Type::Int, Expr::binary(PrimOp::Add, Expr::int(1), Expr::int(2)));
                let r = b.assign("b", Type::Int, Expr::binary(PrimOp::Mul, a, Expr::int(3)));
                b.ret(r);
            });
        });
    let module = Module::default().with_procedure(main);

    let out = PropagationPass::new().transform(&module)?;
    let main = out.procedure("main").expect("main survives");

    assert!(instructions(main, "b0").is_empty());
    assert_eq!(terminator(main, "b0"), "ret ((1 + 2) * 3)");
    Ok(())
}

#[test]
fn test_ssa_destruction_swap_uses_one_slot_per_parameter() -> Result<()> {
    let module = Module::default().with_procedure(swap());

    let out = SsaDestructionPass::new().transform(&module)?;
    let swap = out.procedure("swap").expect("swap survives");

    let slots: Vec<String> = swap.slots().iter().map(ToString::to_string).collect();
    assert_eq!(slots, vec!["slot1: int", "slot2: int"]);
    assert_eq!(instructions(swap, "b1"), vec!["store &slot1, a", "store &slot2, b"]);
    assert_eq!(instructions(swap, "b2"), vec!["store &slot1, b", "store &slot2, a"]);
    assert_eq!(
        instructions(swap, "join"),
        vec!["x: int = load &slot1", "y: int = load &slot2"]
    );
    assert!(swap.blocks().iter().all(|b| !b.has_params()));
    Ok(())
}

#[test]
fn test_pipeline_output_has_backend_shape() -> Result<()> {
    let config = PipelineConfig {
        verify_shape: true,
        ..PipelineConfig::default()
    };
    let ctx = PipelineContext::new();
    let out = PassScheduler::canonical(config).run_with(&module(), &ctx)?;

    for procedure in out.procedures() {
        check_backend_shape(procedure)?;
        assert!(ctx.is_processed(procedure.name()));
    }

    let classify = out.procedure("classify").expect("classify survives");
    assert_eq!(classify.slots().len(), 1);
    assert!(classify.block("done").is_some_and(|b| !b.has_params()));

    let stats = ctx.stats();
    assert_eq!(stats.procedures_failed, 0);
    assert!(stats.calls_hoisted >= 2);
    assert_eq!(stats.branches_expanded, 3);
    assert_eq!(stats.parameters_slotted, 3);
    Ok(())
}

#[test]
fn test_declarations_survive_pipeline() -> Result<()> {
    let input = module();
    let out = PassScheduler::default().run(&input)?;

    assert_eq!(out.items().len(), input.items().len());
    assert!(matches!(out.items()[0], Item::Extern(_)));
    assert!(matches!(out.items()[3], Item::Global(_)));
    let names: Vec<&str> = out.procedures().map(Procedure::name).collect();
    assert_eq!(names, vec!["classify", "swap"]);
    Ok(())
}

#[test]
fn test_pipeline_is_idempotent() -> Result<()> {
    let scheduler = PassScheduler::default();
    let once = scheduler.run(&module())?;
    let twice = scheduler.run(&once)?;
    assert_eq!(once, twice);
    Ok(())
}

#[test]
fn test_parallel_and_sequential_agree() -> Result<()> {
    let parallel = PassScheduler::canonical(PipelineConfig::default()).run(&module())?;
    let sequential = PassScheduler::canonical(PipelineConfig::sequential()).run(&module())?;
    assert_eq!(parallel, sequential);
    Ok(())
}

#[test]
fn test_propagation_can_be_disabled() -> Result<()> {
    let config = PipelineConfig {
        enable_propagation: false,
        verify_shape: true,
        ..PipelineConfig::default()
    };
    let scheduler = PassScheduler::canonical(config);
    assert!(!scheduler.pass_names().contains(&"propagation"));

    let out = scheduler.run(&module())?;
    for procedure in out.procedures() {
        check_backend_shape(procedure)?;
    }
    Ok(())
}

fn broken() -> Procedure {
    ProcedureBuilder::new("broken")
        .returns(Type::Int)
        .build_with(|p| p.block("b0", |b| b.jump_with("nowhere", vec![Expr::int(1)])))
}

#[test]
fn test_run_reports_failing_procedure_and_pass() {
    let input = module().with_procedure(broken());
    match PassScheduler::default().run(&input) {
        Err(Error::Pass {
            procedure,
            pass,
            source,
        }) => {
            assert_eq!(procedure, "broken");
            assert_eq!(pass, "ssa-destruction");
            assert!(matches!(*source, Error::UnknownLabel(ref label) if label == "nowhere"));
        }
        other => panic!("expected a pass failure, got {other:?}"),
    }
}

#[test]
fn test_unknown_callee_rejected_by_call_flattening() {
    let main = ProcedureBuilder::new("main")
        .returns(Type::Int)
        .build_with(|p| p.block("b0", |b| b.ret(Expr::call("h", vec![Expr::call("h", vec![])]))));
    let input = Module::default().with_procedure(main);

    match PassScheduler::default().run(&input) {
        Err(Error::Pass { pass, source, .. }) => {
            assert_eq!(pass, "call-flattening");
            assert!(matches!(*source, Error::UnknownCallee(ref callee) if callee == "h"));
        }
        other => panic!("expected a pass failure, got {other:?}"),
    }
}

#[test]
fn test_run_isolated_keeps_siblings() {
    let input = module().with_procedure(broken());
    let ctx = PipelineContext::new();
    let out = PassScheduler::default().run_isolated(&input, &ctx);

    assert_eq!(ctx.failure_count(), 1);
    assert!(ctx.is_failed("broken"));
    assert_eq!(out.procedure("broken"), input.procedure("broken"));

    for name in ["classify", "swap"] {
        assert!(ctx.is_processed(name));
        let procedure = out.procedure(name).expect("procedure survives");
        assert!(check_backend_shape(procedure).is_ok(), "{name} not normalized");
    }
    assert!(ctx.events.has(EventKind::ProcedureFailed));
}

#[test]
fn test_calls_between_defined_procedures() -> Result<()> {
    let helper = ProcedureBuilder::new("helper")
        .param("v", Type::Int)
        .returns(Type::Bool)
        .build_with(|p| {
            p.block("b0", |b| b.ret(Expr::binary(PrimOp::Ne, Expr::var("v"), Expr::int(0))));
        });
    let main = ProcedureBuilder::new("main")
        .param("x", Type::Int)
        .returns(Type::Bool)
        .build_with(|p| {
            p.block("b0", |b| {
                b.ret(Expr::call("helper", vec![Expr::call("helper", vec![Expr::var("x")])]));
            });
        });
    let module = Module::default().with_procedure(helper).with_procedure(main);

    let out = CallFlatteningPass::new().transform(&module)?;
    let main = out.procedure("main").expect("main survives");

    assert_eq!(
        instructions(main, "b0"),
        vec!["t1: bool = helper(x)", "t2: bool = helper(t1)"]
    );
    assert_eq!(terminator(main, "b0"), "ret t2");
    Ok(())
}
