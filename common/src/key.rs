//! The `Key` model (C1): canonical identity for "a thing that can be injected".

use crate::type_ref::TypeRef;
use std::fmt;

/// A qualifier annotation instance. Qualifiers distinguish two bindings of the same type (e.g.
/// `@Named("primary") DataSource` vs plain `DataSource`); the literal carried here is whatever
/// the qualifier annotation's value serializes to, or `None` for a marker qualifier with no
/// value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Qualifier {
    pub annotation_type: TypeRef,
    pub literal_value: Option<String>,
}

/// Disambiguates multiple contributions to the same aggregate multibinding Key. Two
/// contributions to `Set<Plugin>` from different `(module, method)` pairs are distinct
/// `Key`s that the resolver later aggregates back together during multibinding resolution; a
/// `Key` with no tag is the *aggregate* Key the component's entry point actually requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContributionTag {
    pub contributing_module: TypeRef,
    pub binding_method_name: String,
}

/// `Key = (qualifier?, type, multibinding-contribution-tag?)`.
///
/// Invariant: two Keys with the same qualifier and type but different contribution tags are
/// distinct and never unify during resolution; a Key without a tag is the aggregate Key for a
/// multibinding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key {
    pub qualifier: Option<Qualifier>,
    pub type_ref: TypeRef,
    pub contribution_tag: Option<ContributionTag>,
}

impl Key {
    pub fn new(type_ref: TypeRef) -> Self {
        Key {
            qualifier: None,
            type_ref,
            contribution_tag: None,
        }
    }

    pub fn qualified(type_ref: TypeRef, qualifier: Qualifier) -> Self {
        Key {
            qualifier: Some(qualifier),
            type_ref,
            contribution_tag: None,
        }
    }

    pub fn with_contribution_tag(mut self, tag: ContributionTag) -> Self {
        self.contribution_tag = Some(tag);
        self
    }

    /// The aggregate Key a multibound contribution rolls up into: same qualifier and type,
    /// tag stripped.
    pub fn without_contribution_tag(&self) -> Key {
        Key {
            qualifier: self.qualifier.clone(),
            type_ref: self.type_ref.clone(),
            contribution_tag: None,
        }
    }

    pub fn is_multibinding_contribution(&self) -> bool {
        self.contribution_tag.is_some()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(qualifier) = &self.qualifier {
            write!(f, "@{} ", qualifier.annotation_type)?;
        }
        write!(f, "{}", self.type_ref)?;
        if let Some(tag) = &self.contribution_tag {
            write!(f, " [{}::{}]", tag.contributing_module, tag.binding_method_name)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::type_ref::TypeRoot;

    fn foo() -> TypeRef {
        TypeRef::simple(TypeRoot::Crate, "crate::Foo")
    }

    #[test]
    fn keys_with_different_qualifiers_are_distinct() {
        let plain = Key::new(foo());
        let named = Key::qualified(
            foo(),
            Qualifier {
                annotation_type: TypeRef::simple(TypeRoot::Global, "Named"),
                literal_value: Some("primary".to_owned()),
            },
        );
        assert_ne!(plain, named);
    }

    #[test]
    fn keys_with_different_contribution_tags_never_unify() {
        let tag_a = ContributionTag {
            contributing_module: TypeRef::simple(TypeRoot::Crate, "crate::ModuleA"),
            binding_method_name: "provide".to_owned(),
        };
        let tag_b = ContributionTag {
            contributing_module: TypeRef::simple(TypeRoot::Crate, "crate::ModuleB"),
            binding_method_name: "provide".to_owned(),
        };
        let a = Key::new(foo()).with_contribution_tag(tag_a);
        let b = Key::new(foo()).with_contribution_tag(tag_b);
        assert_ne!(a, b);
        assert_eq!(a.without_contribution_tag(), b.without_contribution_tag());
    }

    #[test]
    fn key_without_tag_is_the_aggregate_key() {
        let tagged = Key::new(foo()).with_contribution_tag(ContributionTag {
            contributing_module: TypeRef::simple(TypeRoot::Crate, "crate::ModuleA"),
            binding_method_name: "provide".to_owned(),
        });
        assert!(tagged.is_multibinding_contribution());
        assert!(!tagged.without_contribution_tag().is_multibinding_contribution());
    }
}
