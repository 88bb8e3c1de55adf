//! Block terminators.
//!
//! A terminator transfers control out of its block. Unconditional jumps may name more
//! than one target; such a jump is a nondeterministic fan-out, and the `prune`
//! instructions at the head of each target decide which one is feasible. Conditional
//! terminators carry a (possibly short-circuit) guard and one terminator per arm, so
//! else-if chains nest directly without intermediate blocks:
//!
//! ```text
//! if (a && b) then jmp T else if c then ret 1 else throw 2
//! ```

use std::fmt;

use crate::{
    ir::{expr::write_list, Cond, Expr, Label},
    Result,
};

/// One destination of a jump together with its block arguments.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JumpTarget {
    /// The destination block.
    pub label: Label,
    /// Values bound to the destination's block parameters, in declared order.
    pub args: Vec<Expr>,
}

impl JumpTarget {
    /// A target without arguments.
    #[must_use]
    pub fn new(label: impl Into<Label>) -> Self {
        Self {
            label: label.into(),
            args: Vec::new(),
        }
    }

    /// A target passing `args` to the destination's parameters.
    #[must_use]
    pub fn with_args(label: impl Into<Label>, args: Vec<Expr>) -> Self {
        Self {
            label: label.into(),
            args,
        }
    }
}

impl fmt::Display for JumpTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label)?;
        if !self.args.is_empty() {
            f.write_str("(")?;
            write_list(f, &self.args)?;
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// The control transfer at the end of a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Terminator {
    /// Unconditional jump to one or more targets.
    Jump(Vec<JumpTarget>),
    /// Conditional transfer. Each arm is itself a terminator.
    Branch {
        /// The guard.
        cond: Cond,
        /// Taken when the guard holds.
        then_arm: Box<Terminator>,
        /// Taken when the guard does not hold.
        else_arm: Box<Terminator>,
    },
    /// Returns a value from the procedure.
    Return(Expr),
    /// Throws a value out of the procedure.
    Throw(Expr),
}

impl Terminator {
    /// `jmp label`
    #[must_use]
    pub fn goto(label: impl Into<Label>) -> Self {
        Terminator::Jump(vec![JumpTarget::new(label)])
    }

    /// `jmp label(args...)`
    #[must_use]
    pub fn goto_with(label: impl Into<Label>, args: Vec<Expr>) -> Self {
        Terminator::Jump(vec![JumpTarget::with_args(label, args)])
    }

    /// `if cond then then_arm else else_arm`
    #[must_use]
    pub fn branch(cond: Cond, then_arm: Terminator, else_arm: Terminator) -> Self {
        Terminator::Branch {
            cond,
            then_arm: Box::new(then_arm),
            else_arm: Box::new(else_arm),
        }
    }

    /// Returns `true` for conditional terminators.
    #[must_use]
    pub fn is_branch(&self) -> bool {
        matches!(self, Terminator::Branch { .. })
    }

    /// Returns every jump target reachable through this terminator, nested arms included.
    #[must_use]
    pub fn targets(&self) -> Vec<&JumpTarget> {
        let mut out = Vec::new();
        self.collect_targets(&mut out);
        out
    }

    fn collect_targets<'a>(&'a self, out: &mut Vec<&'a JumpTarget>) {
        match self {
            Terminator::Jump(targets) => out.extend(targets),
            Terminator::Branch {
                then_arm, else_arm, ..
            } => {
                then_arm.collect_targets(out);
                else_arm.collect_targets(out);
            }
            Terminator::Return(_) | Terminator::Throw(_) => {}
        }
    }

    /// Returns the labels of all successor blocks, nested arms included.
    #[must_use]
    pub fn successors(&self) -> Vec<&Label> {
        self.targets().into_iter().map(|t| &t.label).collect()
    }

    /// Visits every expression in evaluation order: guard atoms, then the then-arm, then
    /// the else-arm, and jump arguments target by target.
    pub fn for_each_expr<F: FnMut(&Expr)>(&self, f: &mut F) {
        match self {
            Terminator::Jump(targets) => {
                for target in targets {
                    for arg in &target.args {
                        f(arg);
                    }
                }
            }
            Terminator::Branch {
                cond,
                then_arm,
                else_arm,
            } => {
                cond.for_each_atom(f);
                then_arm.for_each_expr(f);
                else_arm.for_each_expr(f);
            }
            Terminator::Return(value) | Terminator::Throw(value) => f(value),
        }
    }

    /// Returns `true` if any expression in the terminator contains a call.
    #[must_use]
    pub fn contains_call(&self) -> bool {
        let mut found = false;
        self.for_each_expr(&mut |expr| found |= expr.contains_call());
        found
    }

    /// Visits every identifier the terminator reads.
    pub fn for_each_use<F: FnMut(&crate::ir::Ident)>(&self, f: &mut F) {
        self.for_each_expr(&mut |expr| expr.for_each_var(f));
    }

    /// Rebuilds the terminator with every expression replaced by `f(expr)`, visiting
    /// expressions in the order of [`Terminator::for_each_expr`].
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map_exprs<F>(&self, f: &mut F) -> Result<Terminator>
    where
        F: FnMut(&Expr) -> Result<Expr>,
    {
        Ok(match self {
            Terminator::Jump(targets) => Terminator::Jump(
                targets
                    .iter()
                    .map(|target| {
                        let args = target.args.iter().map(|arg| f(arg)).collect::<Result<_>>()?;
                        Ok(JumpTarget::with_args(target.label.clone(), args))
                    })
                    .collect::<Result<_>>()?,
            ),
            Terminator::Branch {
                cond,
                then_arm,
                else_arm,
            } => {
                let cond = cond.try_map_atoms(f)?;
                let then_arm = then_arm.try_map_exprs(f)?;
                let else_arm = else_arm.try_map_exprs(f)?;
                Terminator::branch(cond, then_arm, else_arm)
            }
            Terminator::Return(value) => Terminator::Return(f(value)?),
            Terminator::Throw(value) => Terminator::Throw(f(value)?),
        })
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Terminator::Jump(targets) => {
                f.write_str("jmp ")?;
                for (i, target) in targets.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{target}")?;
                }
                Ok(())
            }
            Terminator::Branch {
                cond,
                then_arm,
                else_arm,
            } => write!(f, "if {cond} then {then_arm} else {else_arm}"),
            Terminator::Return(value) => write!(f, "ret {value}"),
            Terminator::Throw(value) => write!(f, "throw {value}"),
        }
    }
}
