//! Stable identity for a user-declared element (a type, method, field, or constructor) that
//! survives across processing rounds without holding onto host-owned references.
//!
//! Grounded on the teacher's `TypeData`/local-path identity scheme (`type_data.rs`), generalized
//! per the redesign note in the core spec: the host hands us opaque elements, so we intern them
//! by a tuple of (qualified path, kind, member signature) rather than by reference or by pointer.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ElementKind {
    Type,
    Constructor,
    Method,
    Field,
    Parameter,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ElementKind::Type => "type",
            ElementKind::Constructor => "constructor",
            ElementKind::Method => "method",
            ElementKind::Field => "field",
            ElementKind::Parameter => "parameter",
        };
        f.write_str(s)
    }
}

/// Interning key for a user element. Two `ElementId`s are equal iff they name the same
/// declaration; nothing here is a live reference into host-owned syntax trees, so `ElementId`s
/// may be freely held across processing rounds and inside diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId {
    /// Fully qualified path of the enclosing type, e.g. `my_crate::module::Foo`.
    pub qualified_path: String,
    pub kind: ElementKind,
    /// `None` for a bare type; the method/field/parameter name (and, for overloaded hosts, a
    /// disambiguating signature suffix) otherwise.
    pub member_signature: Option<String>,
}

impl ElementId {
    pub fn for_type(qualified_path: impl Into<String>) -> Self {
        ElementId {
            qualified_path: qualified_path.into(),
            kind: ElementKind::Type,
            member_signature: None,
        }
    }

    pub fn for_member(
        qualified_path: impl Into<String>,
        kind: ElementKind,
        member_signature: impl Into<String>,
    ) -> Self {
        assert_ne!(kind, ElementKind::Type, "a member ElementId needs a kind other than Type");
        ElementId {
            qualified_path: qualified_path.into(),
            kind,
            member_signature: Some(member_signature.into()),
        }
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.member_signature {
            Some(member) => write!(f, "{}::{} ({})", self.qualified_path, member, self.kind),
            None => write!(f, "{}", self.qualified_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_id_has_no_member_signature() {
        let id = ElementId::for_type("crate::Foo");
        assert_eq!(id.member_signature, None);
        assert_eq!(id.kind, ElementKind::Type);
    }

    #[test]
    fn equal_paths_with_different_kinds_are_distinct() {
        let method = ElementId::for_member("crate::Foo", ElementKind::Method, "bar()");
        let field = ElementId::for_member("crate::Foo", ElementKind::Field, "bar");
        assert_ne!(method, field);
    }

    #[test]
    fn display_includes_member_signature() {
        let id = ElementId::for_member("crate::Foo", ElementKind::Method, "bar(i32)");
        assert_eq!(format!("{}", id), "crate::Foo::bar(i32) (method)");
    }
}
