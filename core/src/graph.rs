//! The binding graph (C6's data half -- construction lives in [`crate::resolver`]).
//!
//! Grounded on the teacher's `graph::Graph` (`processor/src/graph.rs`, a single `HashMap<Ident,
//! Node>`); generalized into a *tree* of per-component graphs per §3's `BindingGraph`
//! definition, since the teacher's single flat component never modeled subcomponent inheritance
//! in one data structure the way this spec requires.

use keystone_common::binding::Binding;
use keystone_common::component::ComponentDescriptor;
use keystone_common::key::Key;
use keystone_common::type_ref::TypeRef;
use std::collections::HashMap;

/// Stable identity for a component within one resolved graph tree: its fully qualified type path.
pub type ComponentId = String;

pub fn component_id(type_ref: &TypeRef) -> ComponentId {
    type_ref.canonical_string()
}

/// For one Key within one component's scope of visibility: the contributing binding(s), which
/// component owns them, and whether this component merely inherits the binding from an ancestor.
///
/// Invariant (§3): "for a non-multibinding Key in a valid graph, exactly one binding exists and
/// it is owned by exactly one component along the ancestor chain." `contributions` holds more
/// than one entry only for a multibound set/map Key (and transiently, before the duplicate
/// validator has run, for an invalid graph).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedBindings {
    pub key: Key,
    pub contributions: Vec<Binding>,
    pub owner: ComponentId,
    /// True when this component's view of the Key is satisfied entirely by an ancestor: no
    /// local contribution, no local multibinding aggregation (§4.3 "Ownership hoisting").
    pub inherited: bool,
}

impl ResolvedBindings {
    pub fn is_multibinding(&self) -> bool {
        self.contributions.len() > 1
            || self
                .contributions
                .first()
                .is_some_and(|b| matches!(b, Binding::MultiboundSet(_) | Binding::MultiboundMap(_)))
    }

    /// The single binding for a non-multibinding Key. Panics if called on a multibinding or an
    /// empty (missing) resolution -- callers must check [`ResolvedBindings::is_multibinding`]
    /// and validate missing bindings before relying on this.
    pub fn single(&self) -> Option<&Binding> {
        if self.contributions.len() == 1 {
            self.contributions.first()
        } else {
            None
        }
    }
}

/// Per component: every Key this component (or an ancestor, when inherited) can resolve, a
/// subgraph per child, and the set of scopes that need a releasable-reference manager field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingGraph {
    pub component: ComponentDescriptor,
    pub bindings: HashMap<Key, ResolvedBindings>,
    pub subgraphs: Vec<BindingGraph>,
    pub releasable_reference_scopes: Vec<TypeRef>,
}

impl BindingGraph {
    pub fn new(component: ComponentDescriptor) -> Self {
        BindingGraph {
            component,
            bindings: HashMap::new(),
            subgraphs: Vec::new(),
            releasable_reference_scopes: Vec::new(),
        }
    }

    pub fn id(&self) -> ComponentId {
        component_id(&self.component.type_ref)
    }

    /// Bindings this component itself owns (excludes inherited views), in an order stable across
    /// runs: by Key's canonical string, matching the deterministic-iteration requirement in §5.
    pub fn owned_bindings(&self) -> Vec<&ResolvedBindings> {
        let mut owned: Vec<&ResolvedBindings> = self
            .bindings
            .values()
            .filter(|rb| !rb.inherited && rb.owner == self.id())
            .collect();
        owned.sort_by_key(|rb| rb.key.to_string());
        owned
    }

    pub fn find(&self, key: &Key) -> Option<&ResolvedBindings> {
        self.bindings.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_common::component::ComponentKind;
    use keystone_common::element::ElementId;
    use keystone_common::type_ref::TypeRoot;

    #[test]
    fn owned_bindings_excludes_inherited() {
        let component = ComponentDescriptor::new(
            ComponentKind::Root,
            TypeRef::simple(TypeRoot::Crate, "crate::C"),
            ElementId::for_type("crate::C"),
        );
        let mut graph = BindingGraph::new(component);
        let owned_key = Key::new(TypeRef::simple(TypeRoot::Crate, "crate::Foo"));
        let inherited_key = Key::new(TypeRef::simple(TypeRoot::Crate, "crate::Bar"));
        graph.bindings.insert(
            owned_key.clone(),
            ResolvedBindings {
                key: owned_key,
                contributions: Vec::new(),
                owner: "crate::C".to_owned(),
                inherited: false,
            },
        );
        graph.bindings.insert(
            inherited_key.clone(),
            ResolvedBindings {
                key: inherited_key,
                contributions: Vec::new(),
                owner: "crate::Root".to_owned(),
                inherited: true,
            },
        );
        assert_eq!(graph.owned_bindings().len(), 1);
    }
}
