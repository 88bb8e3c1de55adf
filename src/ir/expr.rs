//! Expression trees and branch conditions.
//!
//! Expressions are pure value trees with no back-references. Five shapes exist:
//!
//! | Shape | Effect | May be duplicated or reordered |
//! |-------|--------|--------------------------------|
//! | `Var` | none | yes |
//! | `Lit` | none | yes |
//! | `Prim` | none (if its operands have none) | yes |
//! | `Load` | reads memory | no |
//! | `Call` | arbitrary | no, executes exactly once in source order |
//!
//! Conditions ([`Cond`]) are the guards of conditional terminators and add the
//! short-circuit connectives `&&` and `||` on top of boolean expression atoms.

use std::fmt;

use bitflags::bitflags;
use strum::{EnumIter, EnumString, IntoStaticStr};

use crate::{ir::Ident, Result};

bitflags! {
    /// Observable effects an expression or instruction may have.
    ///
    /// An empty set means the expression is pure: it may be duplicated, substituted or
    /// deleted freely.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Effects: u8 {
        /// Reads addressable memory (`load &x`).
        const READ = 0b0001;
        /// Calls a function with unknown side effects.
        const CALL = 0b0010;
        /// Writes addressable memory (`store`).
        const WRITE = 0b0100;
    }
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// Integer literal.
    Int(i64),
    /// Boolean literal.
    Bool(bool),
    /// The unit value.
    Unit,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(value) => write!(f, "{value}"),
            Literal::Bool(value) => write!(f, "{value}"),
            Literal::Unit => f.write_str("()"),
        }
    }
}

/// Builtin primitive operations.
///
/// Primitives are total and side-effect free; the textual form doubles as the
/// parse/display representation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, EnumString, EnumIter, IntoStaticStr,
)]
pub enum PrimOp {
    /// Integer addition.
    #[strum(to_string = "+")]
    Add,
    /// Integer subtraction.
    #[strum(to_string = "-")]
    Sub,
    /// Integer multiplication.
    #[strum(to_string = "*")]
    Mul,
    /// Integer division.
    #[strum(to_string = "/")]
    Div,
    /// Integer remainder.
    #[strum(to_string = "%")]
    Rem,
    /// Arithmetic negation.
    #[strum(to_string = "neg")]
    Neg,
    /// Logical not.
    #[strum(to_string = "!")]
    Not,
    /// Equality.
    #[strum(to_string = "==")]
    Eq,
    /// Inequality.
    #[strum(to_string = "!=")]
    Ne,
    /// Signed less-than.
    #[strum(to_string = "<")]
    Lt,
    /// Signed less-or-equal.
    #[strum(to_string = "<=")]
    Le,
    /// Signed greater-than.
    #[strum(to_string = ">")]
    Gt,
    /// Signed greater-or-equal.
    #[strum(to_string = ">=")]
    Ge,
}

impl PrimOp {
    /// Number of operands the operation takes.
    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            PrimOp::Neg | PrimOp::Not => 1,
            _ => 2,
        }
    }

    /// Returns `true` for unary operations.
    #[must_use]
    pub const fn is_unary(self) -> bool {
        self.arity() == 1
    }
}

/// An expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Reference to a local identifier.
    Var(Ident),
    /// A literal constant.
    Lit(Literal),
    /// `load &slot`: reads an addressable slot or global.
    Load(Ident),
    /// A primitive operation applied to operands.
    Prim {
        /// The operation.
        op: PrimOp,
        /// Operands, evaluated left to right.
        args: Vec<Expr>,
    },
    /// A call to a global function.
    Call {
        /// Name of the called function.
        callee: String,
        /// Arguments, evaluated left to right.
        args: Vec<Expr>,
    },
}

impl Expr {
    /// `name`
    #[must_use]
    pub fn var(name: impl Into<Ident>) -> Self {
        Expr::Var(name.into())
    }

    /// An integer literal.
    #[must_use]
    pub fn int(value: i64) -> Self {
        Expr::Lit(Literal::Int(value))
    }

    /// A boolean literal.
    #[must_use]
    pub fn bool(value: bool) -> Self {
        Expr::Lit(Literal::Bool(value))
    }

    /// The unit literal.
    #[must_use]
    pub fn unit() -> Self {
        Expr::Lit(Literal::Unit)
    }

    /// `load &slot`
    #[must_use]
    pub fn load(slot: impl Into<Ident>) -> Self {
        Expr::Load(slot.into())
    }

    /// `callee(args...)`
    #[must_use]
    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: callee.into(),
            args,
        }
    }

    /// A primitive operation over an arbitrary operand list.
    #[must_use]
    pub fn prim(op: PrimOp, args: Vec<Expr>) -> Self {
        Expr::Prim { op, args }
    }

    /// `lhs op rhs`
    #[must_use]
    pub fn binary(op: PrimOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Prim {
            op,
            args: vec![lhs, rhs],
        }
    }

    /// `op operand`
    #[must_use]
    pub fn unary(op: PrimOp, operand: Expr) -> Self {
        Expr::Prim {
            op,
            args: vec![operand],
        }
    }

    /// `!operand`
    #[must_use]
    pub fn not(operand: Expr) -> Self {
        Expr::unary(PrimOp::Not, operand)
    }

    /// Collects the effects of evaluating this expression.
    #[must_use]
    pub fn effects(&self) -> Effects {
        match self {
            Expr::Var(_) | Expr::Lit(_) => Effects::empty(),
            Expr::Load(_) => Effects::READ,
            Expr::Prim { args, .. } => args
                .iter()
                .fold(Effects::empty(), |acc, arg| acc | arg.effects()),
            Expr::Call { args, .. } => args
                .iter()
                .fold(Effects::CALL, |acc, arg| acc | arg.effects()),
        }
    }

    /// Returns `true` if the expression is built only from literals, identifier
    /// references and primitive operations.
    #[must_use]
    pub fn is_pure(&self) -> bool {
        self.effects().is_empty()
    }

    /// Returns `true` if a call occurs anywhere in the tree.
    #[must_use]
    pub fn contains_call(&self) -> bool {
        self.effects().contains(Effects::CALL)
    }

    /// Returns `true` if the root of the tree is a call.
    #[must_use]
    pub fn is_call(&self) -> bool {
        matches!(self, Expr::Call { .. })
    }

    /// Returns the operands of a primitive or call, or an empty slice for leaves.
    #[must_use]
    pub fn operands(&self) -> &[Expr] {
        match self {
            Expr::Prim { args, .. } | Expr::Call { args, .. } => args,
            _ => &[],
        }
    }

    /// Visits every identifier reference in evaluation order.
    ///
    /// The slot named by a `load` is an address, not a value use, and is not visited.
    pub fn for_each_var<F: FnMut(&Ident)>(&self, f: &mut F) {
        match self {
            Expr::Var(ident) => f(ident),
            Expr::Lit(_) | Expr::Load(_) => {}
            Expr::Prim { args, .. } | Expr::Call { args, .. } => {
                for arg in args {
                    arg.for_each_var(f);
                }
            }
        }
    }

    /// Visits every call in evaluation order (arguments before the call itself).
    pub fn for_each_call<F: FnMut(&str, &[Expr])>(&self, f: &mut F) {
        match self {
            Expr::Var(_) | Expr::Lit(_) | Expr::Load(_) => {}
            Expr::Prim { args, .. } => {
                for arg in args {
                    arg.for_each_call(f);
                }
            }
            Expr::Call { callee, args } => {
                for arg in args {
                    arg.for_each_call(f);
                }
                f(callee, args);
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Var(ident) => write!(f, "{ident}"),
            Expr::Lit(lit) => write!(f, "{lit}"),
            Expr::Load(slot) => write!(f, "load &{slot}"),
            Expr::Prim { op, args } => match args.as_slice() {
                [operand] if op.is_unary() => match op {
                    PrimOp::Neg => write!(f, "-{operand}"),
                    _ => write!(f, "{op}{operand}"),
                },
                [lhs, rhs] => write!(f, "({lhs} {op} {rhs})"),
                _ => {
                    write!(f, "{op}(")?;
                    write_list(f, args)?;
                    f.write_str(")")
                }
            },
            Expr::Call { callee, args } => {
                write!(f, "{callee}(")?;
                write_list(f, args)?;
                f.write_str(")")
            }
        }
    }
}

/// Writes a comma separated expression list.
pub(crate) fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// The guard of a conditional terminator.
///
/// Atoms are boolean expressions. `And`/`Or` use short-circuit evaluation: the right
/// operand is evaluated only if the left one did not already decide the result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Cond {
    /// A boolean expression.
    Atom(Expr),
    /// `lhs && rhs`
    And(Box<Cond>, Box<Cond>),
    /// `lhs || rhs`
    Or(Box<Cond>, Box<Cond>),
}

impl Cond {
    /// Wraps an expression as an atom.
    #[must_use]
    pub fn atom(expr: Expr) -> Self {
        Cond::Atom(expr)
    }

    /// `lhs && rhs`
    #[must_use]
    pub fn and(lhs: Cond, rhs: Cond) -> Self {
        Cond::And(Box::new(lhs), Box::new(rhs))
    }

    /// `lhs || rhs`
    #[must_use]
    pub fn or(lhs: Cond, rhs: Cond) -> Self {
        Cond::Or(Box::new(lhs), Box::new(rhs))
    }

    /// Returns `true` if the guard uses `&&` or `||`.
    #[must_use]
    pub fn is_short_circuit(&self) -> bool {
        !matches!(self, Cond::Atom(_))
    }

    /// Visits every atom in evaluation order.
    pub fn for_each_atom<F: FnMut(&Expr)>(&self, f: &mut F) {
        match self {
            Cond::Atom(expr) => f(expr),
            Cond::And(lhs, rhs) | Cond::Or(lhs, rhs) => {
                lhs.for_each_atom(f);
                rhs.for_each_atom(f);
            }
        }
    }

    /// Returns the atoms in evaluation order.
    #[must_use]
    pub fn atoms(&self) -> Vec<&Expr> {
        let mut atoms = Vec::new();
        self.collect_atoms(&mut atoms);
        atoms
    }

    fn collect_atoms<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        match self {
            Cond::Atom(expr) => out.push(expr),
            Cond::And(lhs, rhs) | Cond::Or(lhs, rhs) => {
                lhs.collect_atoms(out);
                rhs.collect_atoms(out);
            }
        }
    }

    /// Returns `true` if any atom contains a call.
    #[must_use]
    pub fn contains_call(&self) -> bool {
        self.atoms().iter().any(|atom| atom.contains_call())
    }

    /// Rebuilds the guard with every atom replaced by `f(atom)`, in evaluation order.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map_atoms<F>(&self, f: &mut F) -> Result<Cond>
    where
        F: FnMut(&Expr) -> Result<Expr>,
    {
        Ok(match self {
            Cond::Atom(expr) => Cond::Atom(f(expr)?),
            Cond::And(lhs, rhs) => {
                let lhs = lhs.try_map_atoms(f)?;
                Cond::and(lhs, rhs.try_map_atoms(f)?)
            }
            Cond::Or(lhs, rhs) => {
                let lhs = lhs.try_map_atoms(f)?;
                Cond::or(lhs, rhs.try_map_atoms(f)?)
            }
        })
    }
}

impl fmt::Display for Cond {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cond::Atom(expr) => write!(f, "{expr}"),
            Cond::And(lhs, rhs) => write!(f, "({lhs} && {rhs})"),
            Cond::Or(lhs, rhs) => write!(f, "({lhs} || {rhs})"),
        }
    }
}
