//! Backend shape contract.
//!
//! After the canonical pipeline every procedure must satisfy:
//!
//! - a call appears only as the whole right-hand side of an assignment, with call-free
//!   arguments;
//! - no conditional terminator remains;
//! - no block declares parameters and no jump passes arguments.

use crate::{
    ir::{Expr, Instruction, Procedure, Terminator},
    Error, Result,
};

/// Verifies that `procedure` has the shape the analysis backend accepts.
///
/// # Errors
///
/// Returns [`Error::ShapeViolation`] naming the first offending block and construct.
pub fn check_backend_shape(procedure: &Procedure) -> Result<()> {
    let violation = |message: String| Error::ShapeViolation {
        procedure: procedure.name().to_string(),
        message,
    };

    for block in procedure.blocks() {
        let label = block.label();
        if block.has_params() {
            return Err(violation(format!("block `{label}` declares parameters")));
        }

        for instr in block.instructions() {
            let nested = match instr {
                Instruction::Assign {
                    value: Expr::Call { args, .. },
                    ..
                } => args.iter().any(Expr::contains_call),
                other => other.expr().contains_call(),
            };
            if nested {
                return Err(violation(format!("nested call in `{label}`: {instr}")));
            }
        }

        let term = block.terminator();
        match term {
            Terminator::Branch { .. } => {
                return Err(violation(format!("conditional terminator in `{label}`: {term}")));
            }
            Terminator::Jump(targets) => {
                if let Some(target) = targets.iter().find(|t| !t.args.is_empty()) {
                    return Err(violation(format!(
                        "jump from `{label}` passes arguments to `{}`",
                        target.label
                    )));
                }
            }
            Terminator::Return(value) | Terminator::Throw(value) => {
                if value.contains_call() {
                    return Err(violation(format!("call in terminator of `{label}`: {term}")));
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Cond, ProcedureBuilder, Type};

    #[test]
    fn test_conforming_procedure_passes() {
        let proc = ProcedureBuilder::new("ok")
            .slot("slot1", Type::Int)
            .build_with(|p| {
                p.block("b0", |b| {
                    let t = b.assign("t1", Type::Int, Expr::call("f", vec![Expr::int(1)]));
                    b.store("slot1", t);
                    b.jump("b1");
                });
                p.block("b1", |b| {
                    b.prune(Expr::load("slot1"));
                    b.ret(Expr::load("slot1"));
                });
            });
        assert!(check_backend_shape(&proc).is_ok());
    }

    #[test]
    fn test_each_violation_detected() {
        let nested = ProcedureBuilder::new("nested").build_with(|p| {
            p.block("b0", |b| b.ret(Expr::call("f", vec![])));
        });
        let branch = ProcedureBuilder::new("branch").build_with(|p| {
            p.block("b0", |b| {
                b.branch(Cond::atom(Expr::bool(true)), Terminator::goto("b0"), Terminator::Return(Expr::unit()));
            });
        });
        let params = ProcedureBuilder::new("params").build_with(|p| {
            p.block("b0", |b| b.jump_with("b1", vec![Expr::int(1)]));
            p.block_with_params("b1", &[("x", Type::Int)], |_| {});
        });

        for proc in [nested, branch, params] {
            match check_backend_shape(&proc) {
                Err(Error::ShapeViolation { procedure, .. }) => assert_eq!(procedure, proc.name()),
                other => panic!("{} not rejected: {other:?}", proc.name()),
            }
        }
    }
}
