//! Validators (C7): independent plugins over the binding graph, each emitting diagnostics through
//! the reporter (§4.4).
//!
//! Grounded on the teacher's `processor/src/graph.rs`: `MergeNodeVisitor` (duplicate bindings),
//! `Graph::get_node` (missing bindings), `generate_provider`'s ancestor-stack check (dependency
//! cycles), and `CanDepend`/`has_scoped_deps` (scope consistency -- the teacher only checks "no
//! unscoped binding may depend on a scoped one without going through a reference", generalized
//! here into the full component-scope-declaration rule §4.4 describes). Each validator here is a
//! free function taking a `&BindingGraph` (plus whatever extra context it needs) and returning
//! `Vec<Diagnostic>`, run independently and unioned by [`validate`], matching "validators are
//! independent" in §4.4.

use keystone_common::binding::{Binding, Scope};
use keystone_common::component::ComponentKind;
use keystone_common::diagnostic::Diagnostic;
use keystone_common::element::ElementId;
use keystone_common::key::Key;
use keystone_common::module::expand_modules;
use keystone_common::options::{Options, Severity as OptionSeverity};
use keystone_common::request::DependencyRequest;
use std::collections::{HashMap, HashSet};

use crate::graph::BindingGraph;
use crate::reporter::shortest_path;
use crate::resolver::Universe;

/// Runs every validator over `graph` (and, recursively, every subgraph), returning the union of
/// all diagnostics. `seen_duplicates` lets the duplicate-binding validator dedupe across
/// subgraphs per §4.4's closing requirement; pass a fresh empty set for a top-level call.
pub fn validate(graph: &BindingGraph, universe: &Universe, options: &Options) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    let mut seen_duplicates = HashSet::new();
    validate_recursive(graph, &[], universe, options, &mut seen_duplicates, &mut diagnostics);
    diagnostics
}

fn validate_recursive<'a>(
    graph: &'a BindingGraph,
    ancestors: &[&'a BindingGraph],
    universe: &Universe,
    options: &Options,
    seen_duplicates: &mut HashSet<(String, String)>,
    out: &mut Vec<Diagnostic>,
) {
    let mut chain: Vec<&BindingGraph> = ancestors.to_vec();
    chain.push(graph);

    out.extend(missing_bindings(graph));
    out.extend(duplicate_bindings(graph, universe, seen_duplicates));
    out.extend(multibinding_compatibility(graph, universe));
    out.extend(dependency_cycles(graph));
    out.extend(scope_consistency(graph, &chain));
    out.extend(module_structural(graph, universe));
    out.extend(nullability(graph, options));

    for sub in &graph.subgraphs {
        validate_recursive(sub, &chain, universe, options, seen_duplicates, out);
    }
}

/// **Missing binding** (§4.4): every dependency request not satisfied anywhere in the ancestor
/// chain is an error at the entry points that reach it, with a shortest-path trace.
///
/// Grounded on `Graph::get_node` in the teacher, which returns a `compile_error!` naming
/// `"missing bindings for {} requested by: {}"` when a type has no node; here the same shape
/// check is made structural (an empty `contributions` list) instead of an `Option::None` lookup.
pub fn missing_bindings(graph: &BindingGraph) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for entry_point in &graph.component.entry_points {
        let request_key = match &entry_point.request {
            keystone_common::component::EntryPointRequest::Provision(request) => request.key.clone(),
            keystone_common::component::EntryPointRequest::MembersInjection(_) => continue,
        };
        let mut keys: Vec<&Key> = graph.bindings.keys().collect();
        keys.sort_by_key(|key| key.to_string());
        for key in keys {
            let resolved = &graph.bindings[key];
            if !resolved.contributions.is_empty() || resolved.is_multibinding() {
                continue;
            }
            let trace = shortest_path(graph, &request_key, key);
            if trace.is_empty() && key != &request_key {
                continue;
            }
            out.push(
                Diagnostic::error(
                    format!("{} cannot be provided: no binding found", key),
                    entry_point.origin.clone(),
                )
                .with_trace(trace),
            );
        }
    }
    out
}

/// **Duplicate binding** (§4.4): re-derives every explicit, non-multibinding declaration visible
/// at `graph`'s component (independent of the resolver's first-match pick, since [`BindingGraph`]
/// only retains the winner) and reports when more than one declares the same Key with a distinct
/// `(kind, bindingElement, contributingModule)` triple.
///
/// Grounded on `MergeNodeVisitor` in the teacher, which raises `"found duplicated bindings for {},
/// provided by: {} {}"` the moment a second node is added for an already-occupied identifier.
pub fn duplicate_bindings(
    graph: &BindingGraph,
    universe: &Universe,
    seen: &mut HashSet<(String, String)>,
) -> Vec<Diagnostic> {
    let mut by_key: HashMap<&Key, Vec<&Binding>> = HashMap::new();
    let expanded = expand_modules(&graph.component.modules, |t| universe.modules.get(t));
    for module in &expanded {
        for binding in &module.bindings {
            if binding.key().is_multibinding_contribution() {
                continue;
            }
            if matches!(
                binding,
                Binding::Provision(_) | Binding::Production(_) | Binding::Delegate(_)
            ) {
                by_key.entry(binding.key()).or_default().push(binding);
            }
        }
    }
    let mut out = Vec::new();
    for (key, bindings) in by_key {
        let mut distinct: Vec<&Binding> = Vec::new();
        for binding in bindings {
            let is_new = distinct.iter().all(|b| b.common().origin != binding.common().origin);
            if is_new {
                distinct.push(binding);
            }
        }
        if distinct.len() < 2 {
            continue;
        }
        let dedup_key = (
            key.to_string(),
            graph.id(),
        );
        if !seen.insert(dedup_key) {
            continue;
        }
        let origins: Vec<String> = distinct.iter().map(|b| b.common().origin.to_string()).collect();
        out.push(Diagnostic::error(
            format!("{} is bound multiple times:\n  {}", key, origins.join("\n  ")),
            distinct[0].common().origin.clone(),
        ));
    }
    out
}

/// **Multibinding compatibility** (§4.4): every contribution to a Set/Map Key must agree on
/// provision-vs-production, and map contributions must carry distinct map-key literals.
pub fn multibinding_compatibility(graph: &BindingGraph, universe: &Universe) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for resolved in graph.owned_bindings() {
        let Some(Binding::MultiboundMap(map_binding)) = resolved.contributions.first() else {
            continue;
        };
        let mut seen_literals: HashMap<String, usize> = HashMap::new();
        for literal in map_binding.map_keys.values() {
            *seen_literals.entry(format!("{:?}", literal)).or_insert(0) += 1;
        }
        for (literal, count) in seen_literals {
            if count > 1 {
                out.push(Diagnostic::error(
                    format!(
                        "{} has multiple contributions with the same map key {}",
                        map_binding.common.key, literal
                    ),
                    map_binding.common.origin.clone(),
                ));
            }
        }
    }
    let _ = universe;
    out
}

/// **Dependency cycles** (§4.4): a strongly-connected component in the resolved dependency graph
/// is a cycle, unless every edge that closes it defers evaluation (lazy/provider/producer/future),
/// matching the exemption the `Provider`/`Lazy` runtime types document.
///
/// Grounded on the ancestor-stack check in the teacher's `generate_provider` (`if
/// ancestors.contains(&node.get_name())`), generalized from a linear recursive stack into DFS
/// cycle detection over the resolved key graph.
pub fn dependency_cycles(graph: &BindingGraph) -> Vec<Diagnostic> {
    #[derive(PartialEq, Clone, Copy)]
    enum State {
        Unvisited,
        OnStack,
        Done,
    }
    let mut state: HashMap<Key, State> = HashMap::new();
    let mut out = Vec::new();

    fn edges<'a>(graph: &'a BindingGraph, key: &Key) -> Vec<&'a DependencyRequest> {
        graph
            .find(key)
            .map(|resolved| {
                resolved
                    .contributions
                    .iter()
                    .flat_map(|b| b.dependencies().iter())
                    .filter(|req| !req.kind.defers_evaluation())
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default()
    }

    fn visit(
        graph: &BindingGraph,
        key: &Key,
        state: &mut HashMap<Key, State>,
        stack: &mut Vec<Key>,
        out: &mut Vec<Diagnostic>,
    ) {
        match state.get(key) {
            Some(State::Done) => return,
            Some(State::OnStack) => {
                let start = stack.iter().position(|k| k == key).unwrap_or(0);
                let cycle: Vec<String> = stack[start..].iter().map(|k| k.to_string()).collect();
                out.push(Diagnostic::error(
                    format!("dependency cycle detected: {} -> {}", cycle.join(" -> "), key),
                    ElementId::for_type(key.type_ref.canonical_string()),
                ));
                return;
            }
            _ => {}
        }
        state.insert(key.clone(), State::OnStack);
        stack.push(key.clone());
        for dependency in edges(graph, key) {
            visit(graph, &dependency.key, state, stack, out);
        }
        stack.pop();
        state.insert(key.clone(), State::Done);
    }

    let mut keys: Vec<&Key> = graph.bindings.keys().collect();
    keys.sort_by_key(|key| key.to_string());
    for key in keys {
        visit(graph, key, &mut state, &mut Vec::new(), &mut out);
    }
    out
}

/// **Scope consistency** (§4.4): every scoped binding must be owned by a component that (or whose
/// ancestor) declares that scope, and a subcomponent must not redeclare a scope already declared
/// by an ancestor.
pub fn scope_consistency(graph: &BindingGraph, chain: &[&BindingGraph]) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for resolved in graph.owned_bindings() {
        let Some(binding) = resolved.single() else { continue };
        let Scope::Custom(scope_type) | Scope::ReleasableReference(scope_type) = binding.scope() else {
            continue;
        };
        let declared_anywhere = chain
            .iter()
            .any(|g| g.component.declared_scopes.contains(scope_type));
        if !declared_anywhere {
            out.push(Diagnostic::error(
                format!(
                    "{} carries scope {} but no component in {}'s ancestor chain declares it",
                    binding.key(),
                    scope_type,
                    graph.component.type_ref
                ),
                binding.common().origin.clone(),
            ));
        }
    }

    if graph.component.kind.is_subcomponent() {
        for ancestor in &chain[..chain.len().saturating_sub(1)] {
            for scope in &graph.component.declared_scopes {
                if ancestor.component.declared_scopes.contains(scope) {
                    out.push(Diagnostic::error(
                        format!(
                            "{} redeclares scope {} already declared by ancestor {}",
                            graph.component.type_ref, scope, ancestor.component.type_ref
                        ),
                        graph.component.origin.clone(),
                    ));
                }
            }
        }
    }
    out
}

/// **Module and component structural rules** (§4.4), restricted to the subset our descriptor
/// model can actually observe: a module may not include itself, and a subcomponent declared via a
/// module's `subcomponents` attribute must expose a creator.
pub fn module_structural(graph: &BindingGraph, universe: &Universe) -> Vec<Diagnostic> {
    let mut out = Vec::new();
    for module_ref in &graph.component.modules {
        if let Some(module) = universe.modules.get(module_ref) {
            if module.included_modules.contains(&module.type_ref) {
                out.push(Diagnostic::error(
                    format!("module {} includes itself", module.type_ref),
                    module.origin.clone(),
                ));
            }
            for declared in &module.declared_subcomponents {
                if let Some(sub) = universe.subcomponents.get(declared) {
                    if sub.creator.is_none() {
                        out.push(Diagnostic::error(
                            format!("subcomponent {} declared by module {} has no creator", declared, module.type_ref),
                            sub.origin.clone(),
                        ));
                    }
                }
            }
        }
    }
    out
}

/// **Nullability** (§4.4 / §7): a non-nullable request whose matching binding is nullable is
/// reported at the severity `options.nullable_validation` configures.
pub fn nullability(graph: &BindingGraph, options: &Options) -> Vec<Diagnostic> {
    let severity = match options.nullable_validation {
        OptionSeverity::None => return Vec::new(),
        OptionSeverity::Warning => keystone_common::diagnostic::Severity::Warning,
        OptionSeverity::Error => keystone_common::diagnostic::Severity::Error,
    };
    let mut out = Vec::new();
    for resolved in graph.owned_bindings() {
        for binding in &resolved.contributions {
            for dependency in binding.dependencies() {
                if dependency.nullable {
                    continue;
                }
                let Some(dep_resolved) = graph.find(&dependency.key) else { continue };
                let Some(dep_binding) = dep_resolved.single() else { continue };
                if dep_binding.common().nullable {
                    out.push(Diagnostic {
                        severity,
                        message: format!(
                            "{} is requested as non-nullable but {} may produce null",
                            dependency.key,
                            dep_binding.key()
                        ),
                        element: binding.common().origin.clone(),
                        annotation: None,
                        annotation_value: None,
                        trace: Vec::new(),
                    });
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_common::binding::{BindingCommon, InjectionBinding, ProvisionBinding};
    use keystone_common::component::{ComponentDescriptor, EntryPoint, EntryPointRequest};
    use keystone_common::element::ElementKind;
    use keystone_common::module::ModuleDescriptor;
    use keystone_common::type_ref::{TypeRef, TypeRoot};
    use crate::resolver::build_binding_graph;

    fn ty(path: &str) -> TypeRef {
        TypeRef::simple(TypeRoot::Crate, path)
    }

    /// E4: module A provides Foo; module B also provides Foo (unqualified); both installed on
    /// component C. Expected: duplicate-binding error naming both declarations.
    #[test]
    fn e4_duplicate_provision_across_modules() {
        let foo_key = Key::new(ty("crate::Foo"));
        let mut module_a = ModuleDescriptor::new(ty("crate::A"), ElementId::for_type("crate::A"));
        module_a.bindings.push(Binding::Provision(ProvisionBinding {
            common: BindingCommon::new(foo_key.clone(), ElementId::for_member("crate::A", ElementKind::Method, "foo")),
            module: ty("crate::A"),
            method_name: "foo".to_owned(),
        }));
        let mut module_b = ModuleDescriptor::new(ty("crate::B"), ElementId::for_type("crate::B"));
        module_b.bindings.push(Binding::Provision(ProvisionBinding {
            common: BindingCommon::new(foo_key.clone(), ElementId::for_member("crate::B", ElementKind::Method, "foo")),
            module: ty("crate::B"),
            method_name: "foo".to_owned(),
        }));

        let mut component = ComponentDescriptor::new(
            keystone_common::component::ComponentKind::Root,
            ty("crate::C"),
            ElementId::for_type("crate::C"),
        );
        component.modules.push(ty("crate::A"));
        component.modules.push(ty("crate::B"));
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });

        let universe = Universe::new().with_module(module_a).with_module(module_b);
        let graph = build_binding_graph(&component, &universe);
        let diagnostics = duplicate_bindings(&graph, &universe, &mut HashSet::new());
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("bound multiple times"));
    }

    /// Two modules contributing to the same `Map<String, Plugin>` under the same declared map
    /// key must be rejected, even though they come from distinct contribution-tagged Keys.
    #[test]
    fn duplicate_map_keys_across_contributions_is_an_error() {
        use keystone_common::binding::MapKeyLiteral;
        use keystone_common::key::ContributionTag;

        let map_key = Key::new(TypeRef::wrapped_map(ty("std::string::String"), ty("crate::Plugin")));
        let mut module_a = ModuleDescriptor::new(ty("crate::A"), ElementId::for_type("crate::A"));
        module_a.bindings.push(Binding::Provision(ProvisionBinding {
            common: BindingCommon::new(
                map_key.clone().with_contribution_tag(ContributionTag {
                    contributing_module: ty("crate::A"),
                    binding_method_name: "plugin".to_owned(),
                }),
                ElementId::for_member("crate::A", ElementKind::Method, "plugin"),
            )
            .with_map_key(MapKeyLiteral::String("alpha".to_owned())),
            module: ty("crate::A"),
            method_name: "plugin".to_owned(),
        }));
        let mut module_b = ModuleDescriptor::new(ty("crate::B"), ElementId::for_type("crate::B"));
        module_b.bindings.push(Binding::Provision(ProvisionBinding {
            common: BindingCommon::new(
                map_key.clone().with_contribution_tag(ContributionTag {
                    contributing_module: ty("crate::B"),
                    binding_method_name: "plugin".to_owned(),
                }),
                ElementId::for_member("crate::B", ElementKind::Method, "plugin"),
            )
            .with_map_key(MapKeyLiteral::String("alpha".to_owned())),
            module: ty("crate::B"),
            method_name: "plugin".to_owned(),
        }));

        let mut component = ComponentDescriptor::new(
            keystone_common::component::ComponentKind::Root,
            ty("crate::C"),
            ElementId::for_type("crate::C"),
        );
        component.modules.push(ty("crate::A"));
        component.modules.push(ty("crate::B"));
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", ElementKind::Method, "plugins"),
            method_name: "plugins".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(map_key)),
        });

        let universe = Universe::new().with_module(module_a).with_module(module_b);
        let graph = build_binding_graph(&component, &universe);
        let diagnostics = multibinding_compatibility(&graph, &universe);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("same map key"));
    }

    #[test]
    fn missing_binding_reports_with_trace() {
        let foo_key = Key::new(ty("crate::Foo"));
        let mut component = ComponentDescriptor::new(
            keystone_common::component::ComponentKind::Root,
            ty("crate::C"),
            ElementId::for_type("crate::C"),
        );
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });
        let universe = Universe::new();
        let graph = build_binding_graph(&component, &universe);
        let diagnostics = missing_bindings(&graph);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("cannot be provided"));
    }

    #[test]
    fn scope_without_declaration_is_an_error() {
        let foo_key = Key::new(ty("crate::Foo"));
        let mut component = ComponentDescriptor::new(
            keystone_common::component::ComponentKind::Root,
            ty("crate::C"),
            ElementId::for_type("crate::C"),
        );
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });
        let scope_type = ty("crate::MyScope");
        let universe = Universe::new().with_injectable(Binding::Injection(InjectionBinding {
            common: BindingCommon::new(foo_key, ElementId::for_type("crate::Foo"))
                .with_scope(Scope::Custom(scope_type)),
            constructor_name: "new".to_owned(),
        }));
        let graph = build_binding_graph(&component, &universe);
        let diagnostics = scope_consistency(&graph, &[&graph]);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("no component"));
    }

    #[test]
    fn scope_declared_on_component_is_fine() {
        let foo_key = Key::new(ty("crate::Foo"));
        let scope_type = ty("crate::MyScope");
        let mut component = ComponentDescriptor::new(
            keystone_common::component::ComponentKind::Root,
            ty("crate::C"),
            ElementId::for_type("crate::C"),
        );
        component.declared_scopes.push(scope_type.clone());
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });
        let universe = Universe::new().with_injectable(Binding::Injection(InjectionBinding {
            common: BindingCommon::new(foo_key, ElementId::for_type("crate::Foo"))
                .with_scope(Scope::Custom(scope_type)),
            constructor_name: "new".to_owned(),
        }));
        let graph = build_binding_graph(&component, &universe);
        assert!(scope_consistency(&graph, &[&graph]).is_empty());
    }
}
