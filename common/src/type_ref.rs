//! The "type" half of a [`crate::key::Key`].
//!
//! Grounded on the teacher's `TypeData` (`common/src/type_data.rs`): a canonical path plus
//! generic arguments, with primitives boxed per the key-factory contract and a trait-object flag
//! carried alongside rather than folded into the path string.

use std::fmt;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TypeRoot {
    /// Resolved against a crate-local path.
    Crate,
    /// Resolved against a path reachable from anywhere (std, or a re-exported dependency type).
    Global,
    /// A language primitive; boxing is applied when the primitive appears inside a `Key`.
    Primitive,
}

/// A type reference as it appears in a dependency request or a binding's declared type.
///
/// Equality and hashing are structural over `(root, path, args, trait_object)`; this is the
/// "standard type-equivalence of the host type system" referenced by the key model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    pub root: TypeRoot,
    /// Canonical path without generic arguments, e.g. `std::vec::Vec`, `i32`, `crate::foo::Bar`.
    pub path: String,
    pub args: Vec<TypeRef>,
    pub trait_object: bool,
}

impl TypeRef {
    pub fn simple(root: TypeRoot, path: impl Into<String>) -> Self {
        TypeRef {
            root,
            path: path.into(),
            args: Vec::new(),
            trait_object: false,
        }
    }

    pub fn generic(root: TypeRoot, path: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef {
            root,
            path: path.into(),
            args,
            trait_object: false,
        }
    }

    pub fn primitive(path: impl Into<String>) -> Self {
        TypeRef::simple(TypeRoot::Primitive, path)
    }

    /// Boxes a primitive type, per the key-factory contract ("Box primitive types inside the
    /// Key's type"); a no-op for non-primitives.
    pub fn boxed_if_primitive(self) -> Self {
        if self.root != TypeRoot::Primitive {
            return self;
        }
        TypeRef::generic(TypeRoot::Global, "std::boxed::Box", vec![self])
    }

    /// Wraps `self` as `Set<Self>`, used when building the key for an `@IntoSet`/`multibinds`
    /// contribution.
    pub fn wrapped_set(self) -> Self {
        TypeRef::generic(TypeRoot::Global, "std::collections::HashSet", vec![self])
    }

    /// Wraps `self` as `Map<K, V>`, used when building the key for an `@IntoMap`/`multibinds`
    /// contribution.
    pub fn wrapped_map(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::generic(TypeRoot::Global, "std::collections::HashMap", vec![key, value])
    }

    pub fn wrapped(self, wrapper_path: &str) -> Self {
        TypeRef::generic(self.root, wrapper_path, vec![self])
    }

    pub fn canonical_string(&self) -> String {
        let mut s = String::new();
        write!(s, "{}", self.path).unwrap();
        if !self.args.is_empty() {
            s.push('<');
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    s.push_str(", ");
                }
                s.push_str(&arg.canonical_string());
            }
            s.push('>');
        }
        s
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boxing_a_primitive_wraps_it() {
        let i32_ty = TypeRef::primitive("i32");
        let boxed = i32_ty.boxed_if_primitive();
        assert_eq!(boxed.canonical_string(), "std::boxed::Box<i32>");
    }

    #[test]
    fn boxing_a_non_primitive_is_a_no_op() {
        let ty = TypeRef::simple(TypeRoot::Crate, "crate::Foo");
        assert_eq!(ty.clone().boxed_if_primitive(), ty);
    }

    #[test]
    fn canonical_string_renders_generic_args() {
        let ty = TypeRef::generic(
            TypeRoot::Global,
            "std::collections::HashMap",
            vec![
                TypeRef::simple(TypeRoot::Primitive, "String"),
                TypeRef::simple(TypeRoot::Crate, "crate::Plugin"),
            ],
        );
        assert_eq!(ty.canonical_string(), "std::collections::HashMap<String, crate::Plugin>");
    }
}
