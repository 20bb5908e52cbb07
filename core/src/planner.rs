//! Binding-expression planner (C8): for each binding a component owns, chooses how call sites
//! will refer to it, and works out an initialization order that breaks cycles with the
//! delegate-factory pattern.
//!
//! Grounded on the teacher's `generate_provider`/`generate_providers` in `processor/src/graph.rs`
//! (ancestor-stack threading and per-node strategy dispatch) and on the `DelegateFactory` runtime
//! type this crate's root carries (`src/delegate.rs`); per §4.5 the strategy taxonomy is recorded
//! as data (an `ExpressionKind` value per binding) rather than emitted straight to tokens, so the
//! writer (C9) is the only stage that touches `TokenStream`.

use keystone_common::binding::{Binding, MapKeyLiteral, Scope};
use keystone_common::key::Key;
use keystone_common::options::Options;
use keystone_common::request::{DependencyRequest, RequestKind};
use keystone_common::type_ref::TypeRef;
use std::collections::{HashMap, HashSet};

use crate::graph::BindingGraph;

/// Whether a binding expression yields a value the component owns outright or a reference
/// borrowed from the component's own state (§2.2's `Cl` facet).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owned,
    Borrowed,
}

/// How a scoped binding's storage is wrapped (§4.5 "Scope wrapping").
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeWrapper {
    None,
    SingleCheck,
    DoubleCheck,
    ReleasableReference(TypeRef),
}

/// The eight binding-expression strategies (§4.5), in the order the planner tries them.
///
/// `StaticMethod`, `SimpleMethod` and `FrameworkInstance` carry `args`: the ordered dependency
/// requests the writer must thread into the factory/constructor call, each wrapped per its
/// `RequestKind` (a `Provider`/`Lazy` dependency becomes a capturing closure at the call site,
/// not a direct value) -- without this a generated call would invoke `Foo::new()` with no
/// arguments regardless of how many dependencies `Foo` actually declares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpressionKind {
    StaticMethod { factory: String, args: Vec<DependencyRequest> },
    ComponentInstance,
    ComponentDependencyMethod { dependency_component: TypeRef, method_name: String },
    SubcomponentCreator { subcomponent: TypeRef },
    Delegate { target: Key },
    MultiboundSet { contributors: Vec<Key> },
    /// One `(map key literal, contributor Key)` pair per contribution, in declaration order. A
    /// missing literal (a contribution the declaration validator should have already flagged)
    /// falls back to its positional index at the writer so generation still proceeds.
    MultiboundMap { contributors: Vec<(Option<MapKeyLiteral>, Key)> },
    Optional { present: bool, inner: Option<Key> },
    SimpleMethod { factory: String, args: Vec<DependencyRequest> },
    FrameworkInstance { factory: String, args: Vec<DependencyRequest> },
}

/// Monotonic initialization state of a field-backed binding (§4.5). Transitions only move
/// forward: `Uninitialized -> Initializing -> Delegated -> Initialized`, or
/// `Uninitialized -> Initializing -> Initialized` when no cycle forces delegation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum InitState {
    Uninitialized,
    Initializing,
    Delegated,
    Initialized,
}

impl InitState {
    /// Advances to `next`, refusing to move backwards (§4.5: "transitions monotonically
    /// increase").
    pub fn advance(&mut self, next: InitState) {
        if next > *self {
            *self = next;
        }
    }
}

/// One owned binding's plan: its chosen expression, how its field (if any) is named and scoped,
/// and its initialization state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingPlan {
    pub key: Key,
    pub kind_name: &'static str,
    pub expression: ExpressionKind,
    pub field_name: Option<String>,
    pub method_name: Option<String>,
    pub scope_wrapper: ScopeWrapper,
    pub ownership: Ownership,
    pub init_state: InitState,
    /// True when fast-init / private-method wrapping hides this binding's expression behind a
    /// `private T getFoo()` method rather than an inline expression (§4.5 "Private-method
    /// wrapping").
    pub wrapped_in_method: bool,
}

/// One component's full plan, plus its children's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentPlan {
    pub component_id: String,
    pub plans: Vec<BindingPlan>,
    pub subplans: Vec<ComponentPlan>,
}

/// A monotonic unique-name allocator shared by fields and private methods within one component,
/// matching §4.6's "Field names and private-method names use a monotonic unique-name set per
/// class; a name derived from the binding's simple semantic identity is suffixed with an integer
/// if already taken."
#[derive(Debug, Default)]
pub struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub fn new() -> Self {
        UniqueNames { taken: HashSet::new() }
    }

    pub fn allocate(&mut self, base: &str) -> String {
        if self.taken.insert(base.to_owned()) {
            return base.to_owned();
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Plans every owned binding of `graph`, recursing into subgraphs. `options.fast_init` governs
/// whether injection/provision/multibound bindings get wrapped behind a private method (§4.5
/// "Private-method wrapping").
pub fn plan(graph: &BindingGraph, options: &Options) -> ComponentPlan {
    let mut names = UniqueNames::new();
    for entry_point in &graph.component.entry_points {
        names.allocate(&entry_point.method_name);
    }

    let mut plans = Vec::new();
    let mut states: HashMap<Key, InitState> = HashMap::new();
    for resolved in graph.owned_bindings() {
        plan_binding(graph, resolved, options, &mut names, &mut states, &mut plans);
    }

    ComponentPlan {
        component_id: graph.id(),
        plans,
        subplans: graph.subgraphs.iter().map(|sub| plan(sub, options)).collect(),
    }
}

fn plan_binding(
    graph: &BindingGraph,
    resolved: &crate::graph::ResolvedBindings,
    options: &Options,
    names: &mut UniqueNames,
    states: &mut HashMap<Key, InitState>,
    out: &mut Vec<BindingPlan>,
) {
    if states.get(&resolved.key).is_some_and(|s| *s >= InitState::Initialized) {
        return;
    }
    states.insert(resolved.key.clone(), InitState::Initializing);

    let (expression, kind_name, ownership) = if resolved.is_multibinding() {
        multibinding_expression(resolved)
    } else if let Some(binding) = resolved.single() {
        single_expression(graph, binding)
    } else {
        (ExpressionKind::FrameworkInstance { factory: "missing".to_owned() }, "missing", Ownership::Owned)
    };

    // Walk this binding's own dependencies first so a true cycle surfaces as DELEGATED on the
    // first member of the cycle the planner revisits, mirroring §4.5's delegate-factory
    // substitution.
    let mut delegated = false;
    if let Some(binding) = resolved.single() {
        for dependency in binding.dependencies() {
            if dependency.kind.defers_evaluation() {
                continue;
            }
            match states.get(&dependency.key) {
                Some(InitState::Initializing) => {
                    delegated = true;
                }
                Some(_) => {}
                None => {
                    if let Some(dep_resolved) = graph.find(&dependency.key) {
                        plan_binding(graph, dep_resolved, options, names, states, out);
                    }
                }
            }
        }
    }

    let scope_wrapper = resolved
        .single()
        .map(|b| scope_wrapper_for(b.scope()))
        .unwrap_or(ScopeWrapper::None);

    // Only strategy 8 (an allocated framework-instance field) and any scoped binding need a
    // field to memoize into (§4.5 "Scope wrapping" / "Framework-instance expression"); every
    // other strategy (component/bound-instance, subcomponent-creator, delegate, multibound,
    // optional, static/simple-method) is a fresh expression at each call site.
    let wants_field =
        matches!(expression, ExpressionKind::FrameworkInstance { .. }) || scope_wrapper != ScopeWrapper::None;
    let wrapped_in_method = options.fast_init
        && matches!(kind_name, "injection" | "provision" | "multibound_set" | "multibound_map");

    let base_name = field_base_name(&resolved.key);
    let field_name = if wants_field { Some(names.allocate(&format!("{}_field", base_name))) } else { None };
    let method_name = if wrapped_in_method { Some(names.allocate(&format!("get_{}", base_name))) } else { None };

    let final_state = if delegated { InitState::Delegated } else { InitState::Initialized };
    states.insert(resolved.key.clone(), final_state);

    out.push(BindingPlan {
        key: resolved.key.clone(),
        kind_name,
        expression,
        field_name,
        method_name,
        scope_wrapper,
        ownership,
        init_state: final_state,
        wrapped_in_method,
    });
}

fn field_base_name(key: &Key) -> String {
    key.type_ref
        .canonical_string()
        .rsplit("::")
        .next()
        .unwrap_or("value")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '_' })
        .collect()
}

fn scope_wrapper_for(scope: &Scope) -> ScopeWrapper {
    match scope {
        Scope::Unscoped => ScopeWrapper::None,
        Scope::Reusable => ScopeWrapper::SingleCheck,
        Scope::Custom(_) => ScopeWrapper::DoubleCheck,
        Scope::ReleasableReference(scope_type) => ScopeWrapper::ReleasableReference(scope_type.clone()),
    }
}

/// Strategies 1–2, 3–4, 7–8 (§4.5): everything except the two aggregate/optional strategies,
/// which need the resolved contribution list rather than a single binding.
fn single_expression(_graph: &BindingGraph, binding: &Binding) -> (ExpressionKind, &'static str, Ownership) {
    match binding {
        Binding::Injection(b) => {
            let factory = format!("{}::{}", b.common.key.type_ref, b.constructor_name);
            let args = b.common.dependencies.clone();
            if b.common.dependencies.is_empty() && !b.common.scope.is_scoped() {
                (ExpressionKind::StaticMethod { factory, args }, "injection", Ownership::Owned)
            } else {
                (ExpressionKind::SimpleMethod { factory, args }, "injection", Ownership::Owned)
            }
        }
        Binding::Provision(b) => {
            let factory = format!("{}::{}", b.module, b.method_name);
            let args = b.common.dependencies.clone();
            if b.common.dependencies.is_empty() && !b.common.requires_module_instance && !b.common.scope.is_scoped() {
                (ExpressionKind::StaticMethod { factory, args }, "provision", Ownership::Owned)
            } else {
                (ExpressionKind::SimpleMethod { factory, args }, "provision", Ownership::Owned)
            }
        }
        Binding::Production(b) => (
            ExpressionKind::FrameworkInstance {
                factory: format!("{}::{}", b.module, b.method_name),
                args: b.common.dependencies.clone(),
            },
            "production",
            Ownership::Owned,
        ),
        Binding::Delegate(b) => (
            ExpressionKind::Delegate { target: b.delegate_to.clone() },
            "delegate",
            Ownership::Borrowed,
        ),
        Binding::SubcomponentCreator(b) => (
            ExpressionKind::SubcomponentCreator { subcomponent: b.subcomponent.clone() },
            "subcomponent_creator",
            Ownership::Owned,
        ),
        Binding::ComponentProvided(b) => (
            ExpressionKind::ComponentDependencyMethod {
                dependency_component: b.dependency_component.clone(),
                method_name: b.method_name.clone(),
            },
            "component_provided",
            Ownership::Borrowed,
        ),
        Binding::ComponentInstance(_) => (ExpressionKind::ComponentInstance, "component_instance", Ownership::Borrowed),
        Binding::Optional(b) => (
            ExpressionKind::Optional { present: b.present, inner: b.present.then(|| b.underlying.clone()) },
            "optional",
            Ownership::Owned,
        ),
        Binding::MembersInjection(b) => (
            ExpressionKind::FrameworkInstance {
                factory: format!("inject_{}", b.common.key.type_ref),
                args: Vec::new(),
            },
            "members_injection",
            Ownership::Borrowed,
        ),
        Binding::MultiboundSet(_) | Binding::MultiboundMap(_) => {
            unreachable!("aggregate bindings are planned via multibinding_expression")
        }
    }
}

fn multibinding_expression(resolved: &crate::graph::ResolvedBindings) -> (ExpressionKind, &'static str, Ownership) {
    match resolved.contributions.first() {
        Some(Binding::MultiboundMap(map_binding)) => {
            let contributors = map_binding
                .common
                .dependencies
                .iter()
                .enumerate()
                .map(|(position, r)| (map_binding.map_keys.get(&position).cloned(), r.key.clone()))
                .collect();
            (ExpressionKind::MultiboundMap { contributors }, "multibound_map", Ownership::Owned)
        }
        _ => {
            let contributors = resolved
                .contributions
                .iter()
                .flat_map(|b| b.dependencies().iter().map(|r| r.key.clone()))
                .collect();
            (ExpressionKind::MultiboundSet { contributors }, "multibound_set", Ownership::Owned)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_common::binding::{BindingCommon, InjectionBinding};
    use keystone_common::component::{ComponentDescriptor, ComponentKind, EntryPoint, EntryPointRequest};
    use keystone_common::element::ElementId;
    use keystone_common::request::DependencyRequest;
    use keystone_common::type_ref::{TypeRef, TypeRoot};
    use crate::resolver::{build_binding_graph, Universe};

    fn ty(path: &str) -> TypeRef {
        TypeRef::simple(TypeRoot::Crate, path)
    }

    #[test]
    fn zero_dependency_injection_becomes_static_method() {
        let foo_key = Key::new(ty("crate::Foo"));
        let mut component = ComponentDescriptor::new(ComponentKind::Root, ty("crate::C"), ElementId::for_type("crate::C"));
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", keystone_common::element::ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });
        let universe = Universe::new().with_injectable(Binding::Injection(InjectionBinding {
            common: BindingCommon::new(foo_key, ElementId::for_type("crate::Foo")),
            constructor_name: "new".to_owned(),
        }));
        let graph = build_binding_graph(&component, &universe);
        let plan = plan(&graph, &Options::default());
        let foo_plan = plan.plans.iter().find(|p| p.kind_name == "injection").expect("planned");
        assert!(matches!(foo_plan.expression, ExpressionKind::StaticMethod { .. }));
        assert_eq!(foo_plan.field_name, None);
    }

    #[test]
    fn scoped_binding_gets_double_check_wrapper_and_a_field() {
        let foo_key = Key::new(ty("crate::Foo"));
        let mut component = ComponentDescriptor::new(ComponentKind::Root, ty("crate::C"), ElementId::for_type("crate::C"));
        component.declared_scopes.push(ty("crate::MyScope"));
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", keystone_common::element::ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });
        let universe = Universe::new().with_injectable(Binding::Injection(InjectionBinding {
            common: BindingCommon::new(foo_key, ElementId::for_type("crate::Foo"))
                .with_scope(Scope::Custom(ty("crate::MyScope"))),
            constructor_name: "new".to_owned(),
        }));
        let graph = build_binding_graph(&component, &universe);
        let plan = plan(&graph, &Options::default());
        let foo_plan = plan.plans.iter().find(|p| p.kind_name == "injection").expect("planned");
        assert_eq!(foo_plan.scope_wrapper, ScopeWrapper::DoubleCheck);
        assert!(foo_plan.field_name.is_some());
    }

    /// E2 (initialization cycle broken by a deferred `Provider<T>` request): Foo depends on
    /// `Provider<Bar>`, Bar depends on Foo directly. Planning Bar must not re-enter Foo's plan
    /// through the deferred edge, and Foo ends up marked delegated since it is revisited while
    /// still initializing.
    #[test]
    fn e2_cyclic_initialization_is_broken_by_deferred_request() {
        let foo_key = Key::new(ty("crate::Foo"));
        let bar_key = Key::new(ty("crate::Bar"));
        let mut component = ComponentDescriptor::new(ComponentKind::Root, ty("crate::C"), ElementId::for_type("crate::C"));
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", keystone_common::element::ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });
        let universe = Universe::new()
            .with_injectable(Binding::Injection(InjectionBinding {
                common: BindingCommon::new(foo_key.clone(), ElementId::for_type("crate::Foo"))
                    .with_dependencies(vec![DependencyRequest::new(bar_key.clone(), RequestKind::Provider)]),
                constructor_name: "new".to_owned(),
            }))
            .with_injectable(Binding::Injection(InjectionBinding {
                common: BindingCommon::new(bar_key, ElementId::for_type("crate::Bar"))
                    .with_dependencies(vec![DependencyRequest::instance(foo_key)]),
                constructor_name: "new".to_owned(),
            }));
        let graph = build_binding_graph(&component, &universe);
        let plan = plan(&graph, &Options::default());
        assert_eq!(plan.plans.len(), 2);
        assert!(plan.plans.iter().all(|p| p.init_state >= InitState::Initialized || p.init_state == InitState::Delegated));
    }

    #[test]
    fn unique_names_suffix_on_collision() {
        let mut names = UniqueNames::new();
        assert_eq!(names.allocate("foo"), "foo");
        assert_eq!(names.allocate("foo"), "foo_2");
        assert_eq!(names.allocate("foo"), "foo_3");
    }
}
