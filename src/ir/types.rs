//! Value types carried by bindings, parameters and slots.

use std::fmt;

/// The type annotation on a binding, parameter or slot.
///
/// The passes never inspect types beyond copying them onto the bindings they create:
/// a hoisted call result takes the callee's return type, a slot takes the type of the
/// block parameter it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// Machine integer.
    Int,
    /// Boolean.
    Bool,
    /// The unit type.
    Unit,
    /// Pointer to a value of the inner type.
    Ptr(Box<Type>),
    /// A type declared outside this IR (structs, type parameters, ...).
    Named(String),
}

impl Type {
    /// Creates a pointer type to `inner`.
    #[must_use]
    pub fn ptr(inner: Type) -> Self {
        Type::Ptr(Box::new(inner))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => f.write_str("int"),
            Type::Bool => f.write_str("bool"),
            Type::Unit => f.write_str("unit"),
            Type::Ptr(inner) => write!(f, "*{inner}"),
            Type::Named(name) => f.write_str(name),
        }
    }
}
