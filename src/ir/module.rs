//! Modules: declarations plus defined procedures.

use std::{collections::HashMap, fmt};

use crate::{
    ir::{Ident, Procedure, Type},
    Error, Result,
};

/// Signature of an externally defined function.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    /// Global function name.
    pub name: String,
    /// Parameter types in order.
    pub params: Vec<Type>,
    /// Return type.
    pub ret: Type,
}

impl Signature {
    /// Creates a signature.
    #[must_use]
    pub fn new(name: impl Into<String>, params: Vec<Type>, ret: Type) -> Self {
        Self {
            name: name.into(),
            params,
            ret,
        }
    }
}

/// A module-level addressable global.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Global {
    /// Name of the global, usable as a `load`/`store` address.
    pub name: Ident,
    /// Type of the stored value.
    pub ty: Type,
}

/// A top-level module item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    /// A declared external function.
    Extern(Signature),
    /// A declared global.
    Global(Global),
    /// A defined procedure.
    Procedure(Procedure),
}

/// An ordered sequence of declarations and procedures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Module {
    items: Vec<Item>,
}

impl Module {
    /// Creates a module from its items.
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        Self { items }
    }

    /// Appends an external function declaration.
    #[must_use]
    pub fn with_extern(mut self, name: impl Into<String>, params: Vec<Type>, ret: Type) -> Self {
        self.items.push(Item::Extern(Signature::new(name, params, ret)));
        self
    }

    /// Appends a global declaration.
    #[must_use]
    pub fn with_global(mut self, name: impl Into<Ident>, ty: Type) -> Self {
        self.items.push(Item::Global(Global {
            name: name.into(),
            ty,
        }));
        self
    }

    /// Appends a procedure.
    #[must_use]
    pub fn with_procedure(mut self, procedure: Procedure) -> Self {
        self.items.push(Item::Procedure(procedure));
        self
    }

    /// Returns the items in order.
    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Iterates over the defined procedures.
    pub fn procedures(&self) -> impl Iterator<Item = &Procedure> {
        self.items.iter().filter_map(|item| match item {
            Item::Procedure(p) => Some(p),
            _ => None,
        })
    }

    /// Looks up a procedure by name.
    #[must_use]
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures().find(|p| p.name() == name)
    }

    /// Builds the return-type table of every callable name in the module.
    #[must_use]
    pub fn signatures(&self) -> Signatures {
        let mut returns = HashMap::new();
        for item in &self.items {
            match item {
                Item::Extern(sig) => {
                    returns.insert(sig.name.clone(), sig.ret.clone());
                }
                Item::Procedure(p) => {
                    returns.insert(p.name().to_string(), p.ret().clone());
                }
                Item::Global(_) => {}
            }
        }
        Signatures { returns }
    }

    /// Rebuilds the module, replacing each procedure with the result of `f`.
    ///
    /// Declarations are copied through unchanged and item order is preserved.
    ///
    /// # Errors
    ///
    /// Returns the first error produced by `f`.
    pub fn try_map_procedures<F>(&self, mut f: F) -> Result<Module>
    where
        F: FnMut(&Procedure) -> Result<Procedure>,
    {
        let items = self
            .items
            .iter()
            .map(|item| match item {
                Item::Procedure(p) => f(p).map(Item::Procedure),
                other => Ok(other.clone()),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Module { items })
    }

    /// Rebuilds the module from a list of procedures given in the order of
    /// [`Module::procedures`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Error`] if the number of procedures does not match.
    pub fn with_procedures_replaced(&self, procedures: Vec<Procedure>) -> Result<Module> {
        let expected = self.procedures().count();
        if procedures.len() != expected {
            return Err(Error::Error(format!(
                "expected {expected} procedures, got {}",
                procedures.len()
            )));
        }

        let mut replacements = procedures.into_iter();
        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            match item {
                Item::Procedure(_) => {
                    if let Some(p) = replacements.next() {
                        items.push(Item::Procedure(p));
                    }
                }
                other => items.push(other.clone()),
            }
        }
        Ok(Module { items })
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, item) in self.items.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            match item {
                Item::Extern(sig) => {
                    write!(f, "extern {}(", sig.name)?;
                    for (j, ty) in sig.params.iter().enumerate() {
                        if j > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{ty}")?;
                    }
                    write!(f, ") -> {}", sig.ret)?;
                }
                Item::Global(global) => write!(f, "global {}: {}", global.name, global.ty)?,
                Item::Procedure(p) => write!(f, "{p}")?,
            }
        }
        Ok(())
    }
}

/// Return types of every callable name in a module.
#[derive(Debug, Clone, Default)]
pub struct Signatures {
    returns: HashMap<String, Type>,
}

impl Signatures {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callable name.
    pub fn insert(&mut self, name: impl Into<String>, ret: Type) {
        self.returns.insert(name.into(), ret);
    }

    /// Returns the return type of `callee`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownCallee`] if the name is not declared.
    pub fn return_type(&self, callee: &str) -> Result<&Type> {
        self.returns
            .get(callee)
            .ok_or_else(|| Error::UnknownCallee(callee.to_string()))
    }

    /// Returns `true` if `callee` is declared.
    #[must_use]
    pub fn contains(&self, callee: &str) -> bool {
        self.returns.contains_key(callee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, ProcedureBuilder};

    fn sample() -> Module {
        let main = ProcedureBuilder::new("main")
            .returns(Type::Int)
            .build_with(|p| p.block("entry", |b| b.ret(Expr::int(0))));
        Module::default()
            .with_extern("print", vec![Type::Int], Type::Unit)
            .with_global("counter", Type::Int)
            .with_procedure(main)
    }

    #[test]
    fn test_signatures_cover_externs_and_procedures() {
        let sigs = sample().signatures();
        assert_eq!(sigs.return_type("print").ok(), Some(&Type::Unit));
        assert_eq!(sigs.return_type("main").ok(), Some(&Type::Int));
        assert!(matches!(
            sigs.return_type("missing"),
            Err(Error::UnknownCallee(name)) if name == "missing"
        ));
    }

    #[test]
    fn test_try_map_preserves_declarations() {
        let module = sample();
        let mapped = module.try_map_procedures(|p| Ok(p.clone())).unwrap();
        assert_eq!(mapped, module);

        let failed = module.try_map_procedures(|_| Err(Error::Error("boom".into())));
        assert!(failed.is_err());
    }

    #[test]
    fn test_with_procedures_replaced_checks_count() {
        let module = sample();
        assert!(module.with_procedures_replaced(Vec::new()).is_err());
        let procs: Vec<_> = module.procedures().cloned().collect();
        assert_eq!(module.with_procedures_replaced(procs).unwrap(), module);
    }
}
