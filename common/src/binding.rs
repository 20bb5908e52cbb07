//! The binding model (C3).
//!
//! The teacher models bindings as a `dyn Node` class hierarchy (`processor/src/nodes/*.rs`), one
//! struct per binding kind behind a trait object. Per the core spec's redesign note this is
//! replaced with a single tagged-variant `Binding` enum carrying a common record plus a
//! per-variant payload; planner and writer pattern-match on the variant instead of dispatching
//! through a vtable.

use crate::element::ElementId;
use crate::key::Key;
use crate::request::DependencyRequest;
use crate::type_ref::TypeRef;
use std::collections::BTreeMap;

/// A scope marker (e.g. `@Singleton`). `Unscoped` is the sentinel "no scope" value; it is
/// distinct from `Reusable`, which is a real (cheap) scope that permits re-computation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Unscoped,
    Reusable,
    Custom(TypeRef),
    ReleasableReference(TypeRef),
}

impl Scope {
    pub fn is_scoped(&self) -> bool {
        !matches!(self, Scope::Unscoped)
    }
}

/// Map-key literal carried by an `@IntoMap` contribution, serialized into source form by the
/// planner when it builds the map-contribution's `(keyLiteral, valueExpression)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MapKeyLiteral {
    String(String),
    Int(i64),
    /// `(enum type, variant name)`.
    Enum(String, String),
}

/// Fields shared by every binding variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingCommon {
    pub key: Key,
    pub dependencies: Vec<DependencyRequest>,
    pub scope: Scope,
    pub requires_module_instance: bool,
    pub nullable: bool,
    pub origin: ElementId,
    /// The `@IntoMap` key literal this binding contributes under, if it is a map-multibinding
    /// contribution. `None` for every other binding, including set contributions (those have no
    /// key to carry).
    pub map_key: Option<MapKeyLiteral>,
}

impl BindingCommon {
    pub fn new(key: Key, origin: ElementId) -> Self {
        BindingCommon {
            key,
            dependencies: Vec::new(),
            scope: Scope::Unscoped,
            requires_module_instance: false,
            nullable: false,
            origin,
            map_key: None,
        }
    }

    pub fn with_dependencies(mut self, dependencies: Vec<DependencyRequest>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_map_key(mut self, map_key: MapKeyLiteral) -> Self {
        self.map_key = Some(map_key);
        self
    }
}

/// A constructor-injected concrete type: `common.origin` is the `#[inject]` constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InjectionBinding {
    pub common: BindingCommon,
    pub constructor_name: String,
}

/// A module method returning a value directly (`#[provides]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionBinding {
    pub common: BindingCommon,
    pub module: TypeRef,
    pub method_name: String,
}

/// A module method returning a future (`#[produces]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductionBinding {
    pub common: BindingCommon,
    pub module: TypeRef,
    pub method_name: String,
}

/// A `#[binds]`-style delegation: rebinds `common.key` to `delegate_to` without adding logic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegateBinding {
    pub common: BindingCommon,
    pub delegate_to: Key,
}

/// Synthetic aggregate binding over a `Set<T>` Key; `common.dependencies` are the contributors
/// (each itself a request against a tagged contribution Key), in declaration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiboundSetBinding {
    pub common: BindingCommon,
    pub element_type: TypeRef,
}

/// Synthetic aggregate binding over a `Map<K, V>` Key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiboundMapBinding {
    pub common: BindingCommon,
    pub key_type: TypeRef,
    pub value_type: TypeRef,
    /// Parallel to `common.dependencies`: the map-key literal for each contributor, in the same
    /// order.
    pub map_keys: BTreeMap<usize, MapKeyLiteral>,
}

/// Synthetic `binds_option_of` binding: present iff `underlying` resolves somewhere in the
/// ancestor chain, in which case `common.dependencies` holds exactly one request for it;
/// otherwise `common.dependencies` is empty and the binding represents "absent".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalBinding {
    pub common: BindingCommon,
    pub underlying: Key,
    pub present: bool,
}

/// Synthetic binding representing a builder/factory for a child component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubcomponentCreatorBinding {
    pub common: BindingCommon,
    pub subcomponent: TypeRef,
}

/// An entry point of a dependency component supplied to this component's builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentProvidedBinding {
    pub common: BindingCommon,
    pub dependency_component: TypeRef,
    pub method_name: String,
}

/// The component instance itself, or a value installed at build time via the creator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentInstanceBinding {
    pub common: BindingCommon,
    pub bound_instance: bool,
}

/// Injects fields/methods of an existing instance; carries no Key value of its own (`common.key`
/// is a synthetic members-injector Key used only to dedupe).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MembersInjectionBinding {
    pub common: BindingCommon,
    pub injection_sites: Vec<ElementId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Binding {
    Injection(InjectionBinding),
    Provision(ProvisionBinding),
    Production(ProductionBinding),
    Delegate(DelegateBinding),
    MultiboundSet(MultiboundSetBinding),
    MultiboundMap(MultiboundMapBinding),
    Optional(OptionalBinding),
    SubcomponentCreator(SubcomponentCreatorBinding),
    ComponentProvided(ComponentProvidedBinding),
    ComponentInstance(ComponentInstanceBinding),
    MembersInjection(MembersInjectionBinding),
}

impl Binding {
    pub fn common(&self) -> &BindingCommon {
        match self {
            Binding::Injection(b) => &b.common,
            Binding::Provision(b) => &b.common,
            Binding::Production(b) => &b.common,
            Binding::Delegate(b) => &b.common,
            Binding::MultiboundSet(b) => &b.common,
            Binding::MultiboundMap(b) => &b.common,
            Binding::Optional(b) => &b.common,
            Binding::SubcomponentCreator(b) => &b.common,
            Binding::ComponentProvided(b) => &b.common,
            Binding::ComponentInstance(b) => &b.common,
            Binding::MembersInjection(b) => &b.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut BindingCommon {
        match self {
            Binding::Injection(b) => &mut b.common,
            Binding::Provision(b) => &mut b.common,
            Binding::Production(b) => &mut b.common,
            Binding::Delegate(b) => &mut b.common,
            Binding::MultiboundSet(b) => &mut b.common,
            Binding::MultiboundMap(b) => &mut b.common,
            Binding::Optional(b) => &mut b.common,
            Binding::SubcomponentCreator(b) => &mut b.common,
            Binding::ComponentProvided(b) => &mut b.common,
            Binding::ComponentInstance(b) => &mut b.common,
            Binding::MembersInjection(b) => &mut b.common,
        }
    }

    pub fn key(&self) -> &Key {
        &self.common().key
    }

    pub fn dependencies(&self) -> &[DependencyRequest] {
        &self.common().dependencies
    }

    pub fn scope(&self) -> &Scope {
        &self.common().scope
    }

    /// Whether this binding is one the resolver can synthesize on demand without an explicit
    /// user declaration (an inject-constructor, or members-injection for an `@Inject`-bearing
    /// type).
    pub fn is_implicit(&self) -> bool {
        matches!(self, Binding::Injection(_) | Binding::MembersInjection(_))
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Binding::Injection(_) => "injection",
            Binding::Provision(_) => "provision",
            Binding::Production(_) => "production",
            Binding::Delegate(_) => "delegate",
            Binding::MultiboundSet(_) => "multibound_set",
            Binding::MultiboundMap(_) => "multibound_map",
            Binding::Optional(_) => "optional",
            Binding::SubcomponentCreator(_) => "subcomponent_creator",
            Binding::ComponentProvided(_) => "component_provided",
            Binding::ComponentInstance(_) => "component_instance",
            Binding::MembersInjection(_) => "members_injection",
        }
    }
}
