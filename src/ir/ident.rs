//! Identifiers and block labels.
//!
//! Both are plain strings. Identifiers share one namespace across all blocks of a
//! procedure; labels are unique within a procedure. Neither is renumbered by any pass:
//! fresh names are generated above the highest numeric suffix already in use (see
//! [`crate::compiler::FreshNames`]).

use std::{borrow::Borrow, fmt};

/// A procedure-local identifier.
///
/// Identifiers name procedure parameters, block parameters, assignment targets and
/// addressable slots. The namespace is procedure-wide, not block-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ident(String);

impl Ident {
    /// Creates an identifier from its textual name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the textual name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the value of the trailing decimal digits of the name, if any.
    ///
    /// `t12` yields `Some(12)`, `x` yields `None`. Digit runs too long for a `u64`
    /// saturate to `u64::MAX` so the fresh counter never lands below them.
    #[must_use]
    pub fn numeric_suffix(&self) -> Option<u64> {
        numeric_suffix(&self.0)
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Ident {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Ident {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for Ident {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A block label, unique within its procedure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(String);

impl Label {
    /// Creates a label from its textual name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the textual name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the value of the trailing decimal digits of the label, if any.
    #[must_use]
    pub fn numeric_suffix(&self) -> Option<u64> {
        numeric_suffix(&self.0)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for Label {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for Label {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn numeric_suffix(name: &str) -> Option<u64> {
    let digits = name.len() - name.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return None;
    }
    let tail = &name[name.len() - digits..];
    Some(tail.parse().unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_suffix() {
        assert_eq!(Ident::new("t12").numeric_suffix(), Some(12));
        assert_eq!(Ident::new("x").numeric_suffix(), None);
        assert_eq!(Ident::new("42").numeric_suffix(), Some(42));
        assert_eq!(Ident::new("a1b").numeric_suffix(), None);
        assert_eq!(Label::new("bb_7").numeric_suffix(), Some(7));
    }

    #[test]
    fn test_numeric_suffix_saturates() {
        let huge = Ident::new("v99999999999999999999999");
        assert_eq!(huge.numeric_suffix(), Some(u64::MAX));
    }
}
