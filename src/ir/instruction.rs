//! Straight-line instructions.

use std::fmt;

use crate::{
    ir::{Effects, Expr, Ident, Type},
    Result,
};

/// A non-terminating instruction inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Instruction {
    /// `dest: ty = value`: binds a fresh identifier.
    Assign {
        /// The identifier being bound.
        dest: Ident,
        /// Type of the bound identifier.
        ty: Type,
        /// The defining expression.
        value: Expr,
    },
    /// `store &target, value`: writes an addressable location.
    Store {
        /// The slot or global written.
        target: Ident,
        /// The value written.
        value: Expr,
    },
    /// `prune cond`: asserts that a boolean expression holds on this path.
    ///
    /// Side-effect free; produced by short-circuit elimination to record which way each
    /// atom of a guard went.
    Prune(Expr),
}

impl Instruction {
    /// Creates an assignment.
    #[must_use]
    pub fn assign(dest: impl Into<Ident>, ty: Type, value: Expr) -> Self {
        Instruction::Assign {
            dest: dest.into(),
            ty,
            value,
        }
    }

    /// Creates a store.
    #[must_use]
    pub fn store(target: impl Into<Ident>, value: Expr) -> Self {
        Instruction::Store {
            target: target.into(),
            value,
        }
    }

    /// Creates a prune.
    #[must_use]
    pub fn prune(cond: Expr) -> Self {
        Instruction::Prune(cond)
    }

    /// Returns the identifier bound by this instruction, if any.
    #[must_use]
    pub fn dest(&self) -> Option<&Ident> {
        match self {
            Instruction::Assign { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// Returns the expression evaluated by this instruction.
    #[must_use]
    pub fn expr(&self) -> &Expr {
        match self {
            Instruction::Assign { value, .. } | Instruction::Store { value, .. } => value,
            Instruction::Prune(cond) => cond,
        }
    }

    /// Collects the effects of executing this instruction.
    #[must_use]
    pub fn effects(&self) -> Effects {
        match self {
            Instruction::Store { value, .. } => Effects::WRITE | value.effects(),
            _ => self.expr().effects(),
        }
    }

    /// Returns `true` if the instruction can be deleted when its result is unused.
    ///
    /// Only pure assignments qualify; stores and prunes are kept even without readers.
    #[must_use]
    pub fn is_removable(&self) -> bool {
        matches!(self, Instruction::Assign { value, .. } if value.is_pure())
    }

    /// Visits every identifier the instruction reads.
    pub fn for_each_use<F: FnMut(&Ident)>(&self, f: &mut F) {
        self.expr().for_each_var(f);
    }

    /// Rebuilds the instruction with its expression replaced by `f(expr)`.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `f`.
    pub fn try_map_expr<F>(&self, f: F) -> Result<Instruction>
    where
        F: FnOnce(&Expr) -> Result<Expr>,
    {
        Ok(match self {
            Instruction::Assign { dest, ty, value } => Instruction::Assign {
                dest: dest.clone(),
                ty: ty.clone(),
                value: f(value)?,
            },
            Instruction::Store { target, value } => Instruction::Store {
                target: target.clone(),
                value: f(value)?,
            },
            Instruction::Prune(cond) => Instruction::Prune(f(cond)?),
        })
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Assign { dest, ty, value } => write!(f, "{dest}: {ty} = {value}"),
            Instruction::Store { target, value } => write!(f, "store &{target}, {value}"),
            Instruction::Prune(cond) => write!(f, "prune {cond}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::PrimOp;

    #[test]
    fn test_removability() {
        let pure = Instruction::assign(
            "a",
            Type::Int,
            Expr::binary(PrimOp::Add, Expr::int(1), Expr::int(2)),
        );
        assert!(pure.is_removable());
        assert_eq!(pure.dest(), Some(&Ident::new("a")));

        let load = Instruction::assign("b", Type::Int, Expr::load("g"));
        assert!(!load.is_removable());

        let store = Instruction::store("g", Expr::int(1));
        assert!(!store.is_removable());
        assert!(store.effects().contains(Effects::WRITE));

        let prune = Instruction::prune(Expr::var("c"));
        assert!(!prune.is_removable());
        assert!(prune.effects().is_empty());
    }

    #[test]
    fn test_display() {
        let call = Instruction::assign("n1", Type::Int, Expr::call("f", vec![Expr::var("t1")]));
        assert_eq!(call.to_string(), "n1: int = f(t1)");
        assert_eq!(
            Instruction::store("slot3", Expr::var("x")).to_string(),
            "store &slot3, x"
        );
        assert_eq!(
            Instruction::prune(Expr::not(Expr::var("c"))).to_string(),
            "prune !c"
        );
    }
}
