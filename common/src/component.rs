//! Component descriptor (C5).
//!
//! Grounded on the teacher's `components.rs`/`entrypoints.rs`, which parse a `#[component]` trait
//! into provisions plus an (optional) associated builder trait. Generalized per §4.2: a
//! descriptor enumerates entry points (deduplicated by resolved-as-member signature), its
//! transitively-included modules (left to the resolver to expand, per `module::expand_modules`),
//! its dependency components, its creator shape, and its children.

use crate::element::ElementId;
use crate::request::DependencyRequest;
use crate::type_ref::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    Root,
    Production,
    Subcomponent,
    ProductionSubcomponent,
    /// A module-for-validation pseudo-component: used when `moduleBindingValidation` (§6) asks
    /// the resolver to validate a module's bindings in isolation, without a real component.
    ModuleForValidation,
}

impl ComponentKind {
    pub fn is_subcomponent(&self) -> bool {
        matches!(
            self,
            ComponentKind::Subcomponent | ComponentKind::ProductionSubcomponent
        )
    }

    pub fn is_production(&self) -> bool {
        matches!(
            self,
            ComponentKind::Production | ComponentKind::ProductionSubcomponent
        )
    }
}

/// A public method on a component whose return type a caller requests (§GLOSSARY "Entry
/// point"), or a members-injection method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub origin: ElementId,
    pub method_name: String,
    pub request: EntryPointRequest,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryPointRequest {
    /// A provision method: `T foo()`.
    Provision(DependencyRequest),
    /// A members-injection method: takes exactly one parameter of the declared type (§4.4
    /// "Component method validity").
    MembersInjection(TypeRef),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatorKind {
    Builder,
    Factory,
}

/// A single input the creator (builder/factory) requires before it can produce a component
/// instance: either a bound instance of a concrete type, or a dependency component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatorInput {
    pub type_ref: TypeRef,
    pub parameter_name: String,
    pub is_bound_instance: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Creator {
    pub kind: CreatorKind,
    pub origin: ElementId,
    pub required_inputs: Vec<CreatorInput>,
}

/// A subcomponent declared as a child, either via a factory method on the parent component or
/// via a module's `subcomponents` attribute (§4.2: "subcomponents declared via a module's
/// `subcomponents` attribute are also added as children without a factory method").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildDeclaration {
    pub subcomponent: TypeRef,
    pub factory_method_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentDescriptor {
    pub kind: ComponentKind,
    pub type_ref: TypeRef,
    pub origin: ElementId,
    /// The modules declared directly on this component (`#[component(modules = "...")]`);
    /// transitive expansion happens in the resolver via `module::expand_modules`.
    pub modules: Vec<TypeRef>,
    pub dependency_components: Vec<TypeRef>,
    pub entry_points: Vec<EntryPoint>,
    pub creator: Option<Creator>,
    pub children: Vec<ChildDeclaration>,
    /// Scopes declared directly on this component type (§4.2: "Scopes present on the component
    /// type are recorded").
    pub declared_scopes: Vec<TypeRef>,
}

impl ComponentDescriptor {
    pub fn new(kind: ComponentKind, type_ref: TypeRef, origin: ElementId) -> Self {
        ComponentDescriptor {
            kind,
            type_ref,
            origin,
            modules: Vec::new(),
            dependency_components: Vec::new(),
            entry_points: Vec::new(),
            creator: None,
            children: Vec::new(),
            declared_scopes: Vec::new(),
        }
    }

    /// Deduplicates entry points by `method_name`, matching §4.2's "deduplicated by a signature
    /// that uses the resolved-as-member method type" -- inherited methods that resolve to the
    /// same member as one already collected are dropped, first occurrence wins.
    pub fn add_entry_point(&mut self, entry_point: EntryPoint) {
        if self
            .entry_points
            .iter()
            .any(|e| e.method_name == entry_point.method_name)
        {
            return;
        }
        self.entry_points.push(entry_point);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Key;
    use crate::type_ref::TypeRoot;

    fn descriptor() -> ComponentDescriptor {
        ComponentDescriptor::new(
            ComponentKind::Root,
            TypeRef::simple(TypeRoot::Crate, "crate::MyComponent"),
            ElementId::for_type("crate::MyComponent"),
        )
    }

    #[test]
    fn duplicate_entry_point_names_are_deduplicated() {
        let mut d = descriptor();
        let request = DependencyRequest::instance(Key::new(TypeRef::simple(
            TypeRoot::Crate,
            "crate::Foo",
        )));
        d.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::MyComponent", crate::element::ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(request.clone()),
        });
        d.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::MyComponent", crate::element::ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(request.clone().nullable()),
        });
        assert_eq!(d.entry_points.len(), 1);
    }

    #[test]
    fn subcomponent_kinds_report_is_subcomponent() {
        assert!(ComponentKind::Subcomponent.is_subcomponent());
        assert!(ComponentKind::ProductionSubcomponent.is_subcomponent());
        assert!(!ComponentKind::Root.is_subcomponent());
    }

    #[test]
    fn production_kinds_report_is_production() {
        assert!(ComponentKind::Production.is_production());
        assert!(ComponentKind::ProductionSubcomponent.is_production());
        assert!(!ComponentKind::Subcomponent.is_production());
    }
}
