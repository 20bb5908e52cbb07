//! The binding-graph resolver (C6): turns descriptors into a tree of [`BindingGraph`]s.
//!
//! Grounded on the teacher's single-component `Graph` construction in `processor/src/graph.rs`
//! (`get_graph`), generalized to a tree per §4.3. The teacher never modeled subcomponents sharing
//! one resolution pass with their parent (lockjaw's subcomponents largely re-run the same
//! machinery per component); this resolver instead threads one arena through the whole tree so
//! ownership hoisting (§4.3 "Ownership hoisting") can walk up from a child to an ancestor inside
//! a single pass, exactly as the algorithm in §4.3 describes.

use keystone_common::binding::{
    Binding, BindingCommon, ComponentInstanceBinding, InjectionBinding, MultiboundMapBinding,
    MultiboundSetBinding, OptionalBinding,
};
use keystone_common::component::{ComponentDescriptor, EntryPointRequest};
use keystone_common::element::ElementId;
use keystone_common::key::Key;
use keystone_common::module::{expand_modules, ModuleDescriptor};
use keystone_common::type_ref::TypeRef;
use std::collections::{HashMap, HashSet};

use crate::graph::{component_id, BindingGraph, ComponentId, ResolvedBindings};

/// Everything the resolver needs that isn't reachable purely by walking
/// [`ComponentDescriptor`]s: the module registry, the table of `#[inject]` constructors, the
/// registry of subcomponent descriptors reachable from a `ChildDeclaration`, and (optionally) the
/// provision methods a dependency component exposes.
///
/// This is the host-facing seam described in §6: a real driver builds this from parsed
/// annotations; this crate's own tests build it by hand.
#[derive(Debug, Default, Clone)]
pub struct Universe {
    pub modules: HashMap<TypeRef, ModuleDescriptor>,
    pub injectables: HashMap<Key, Binding>,
    pub subcomponents: HashMap<TypeRef, ComponentDescriptor>,
    /// `(dependency component type, key) -> provision method name`, used to synthesize
    /// `ComponentProvided` bindings for a component's declared `dependency_components`.
    pub dependency_provisions: HashMap<(TypeRef, Key), String>,
}

impl Universe {
    pub fn new() -> Self {
        Universe::default()
    }

    pub fn with_module(mut self, module: ModuleDescriptor) -> Self {
        self.modules.insert(module.type_ref.clone(), module);
        self
    }

    pub fn with_injectable(mut self, binding: Binding) -> Self {
        self.injectables.insert(binding.key().clone(), binding);
        self
    }

    pub fn with_subcomponent(mut self, descriptor: ComponentDescriptor) -> Self {
        self.subcomponents
            .insert(descriptor.type_ref.clone(), descriptor);
        self
    }
}

struct ArenaNode {
    descriptor: ComponentDescriptor,
    parent: Option<usize>,
    expanded_modules: Vec<ModuleDescriptor>,
    bindings: HashMap<Key, ResolvedBindings>,
}

impl ArenaNode {
    fn id(&self) -> ComponentId {
        component_id(&self.descriptor.type_ref)
    }
}

/// Builds the full binding-graph tree rooted at `root`.
///
/// Grounded on §4.3's algorithm end to end; panics (as a [`keystone_common::error::KeystoneError::Internal`]
/// would elsewhere) are avoided entirely here -- an unsatisfiable binding is represented as a
/// `ResolvedBindings` with zero contributions rather than an error, exactly as §4.3 describes
/// ("the resolver does not forbid cycles... cycle diagnosis is the validator's job"), so
/// validators downstream can attribute a precise diagnostic.
pub fn build_binding_graph(root: &ComponentDescriptor, universe: &Universe) -> BindingGraph {
    let mut arena = build_arena(root, universe);
    for idx in 0..arena.len() {
        resolve_node(&mut arena, idx, universe);
    }
    assemble(&arena, 0)
}

fn build_arena(root: &ComponentDescriptor, universe: &Universe) -> Vec<ArenaNode> {
    let mut arena = Vec::new();
    let mut queue = std::collections::VecDeque::new();
    queue.push_back((root.clone(), None::<usize>));
    while let Some((descriptor, parent)) = queue.pop_front() {
        let expanded_modules = expand_modules(&descriptor.modules, |t| universe.modules.get(t))
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        let idx = arena.len();
        for child in &descriptor.children {
            if let Some(child_descriptor) = universe.subcomponents.get(&child.subcomponent) {
                queue.push_back((child_descriptor.clone(), Some(idx)));
            }
        }
        arena.push(ArenaNode {
            descriptor,
            parent,
            expanded_modules,
            bindings: HashMap::new(),
        });
    }
    arena
}

fn assemble(arena: &[ArenaNode], idx: usize) -> BindingGraph {
    let node = &arena[idx];
    let mut graph = BindingGraph::new(node.descriptor.clone());
    graph.bindings = node.bindings.clone();
    for (child_idx, candidate) in arena.iter().enumerate() {
        if candidate.parent == Some(idx) {
            graph.subgraphs.push(assemble(arena, child_idx));
        }
    }
    graph
}

fn seed_keys(descriptor: &ComponentDescriptor) -> Vec<Key> {
    let mut keys = Vec::new();
    for entry_point in &descriptor.entry_points {
        match &entry_point.request {
            EntryPointRequest::Provision(request) => keys.push(request.key.clone()),
            EntryPointRequest::MembersInjection(type_ref) => {
                keys.push(Key::new(type_ref.clone().wrapped("keystone::MembersInjectorKey")))
            }
        }
    }
    keys
}

fn resolve_node(arena: &mut Vec<ArenaNode>, idx: usize, universe: &Universe) {
    let seeds = seed_keys(&arena[idx].descriptor);
    let mut in_progress: HashSet<(usize, Key)> = HashSet::new();
    for key in seeds {
        resolve(arena, idx, &key, universe, &mut in_progress);
    }
}

/// Resolves `key` as seen from component `idx`, memoizing the result into `arena[idx].bindings`.
/// Mirrors §4.3 step by step; see the module doc comment for the ownership-hoisting strategy.
fn resolve(
    arena: &mut Vec<ArenaNode>,
    idx: usize,
    key: &Key,
    universe: &Universe,
    in_progress: &mut HashSet<(usize, Key)>,
) -> ResolvedBindings {
    if let Some(existing) = arena[idx].bindings.get(key) {
        return existing.clone();
    }
    if !in_progress.insert((idx, key.clone())) {
        // A dependency cycle reached back into a resolution already on the stack (§4.3: "the
        // resolver does not forbid cycles"). Returning an empty, uncached placeholder lets the
        // in-flight call above complete normally; it will overwrite this with the real value.
        return ResolvedBindings {
            key: key.clone(),
            contributions: Vec::new(),
            owner: arena[idx].id(),
            inherited: false,
        };
    }

    let result = compute(arena, idx, key, universe, in_progress);
    in_progress.remove(&(idx, key.clone()));
    arena[idx].bindings.insert(key.clone(), result.clone());
    result
}

fn compute(
    arena: &mut Vec<ArenaNode>,
    idx: usize,
    key: &Key,
    universe: &Universe,
    in_progress: &mut HashSet<(usize, Key)>,
) -> ResolvedBindings {
    let owner = arena[idx].id();

    if key.type_ref == arena[idx].descriptor.type_ref && key.qualifier.is_none() {
        return owned(
            key,
            owner.clone(),
            Binding::ComponentInstance(ComponentInstanceBinding {
                common: BindingCommon::new(key.clone(), ElementId::for_type(key.type_ref.canonical_string())),
                bound_instance: false,
            }),
        );
    }

    if let Some(creator) = &arena[idx].descriptor.creator {
        if let Some(input) = creator.required_inputs.iter().find(|i| i.type_ref == key.type_ref) {
            if input.is_bound_instance {
                return owned(
                    key,
                    owner.clone(),
                    Binding::ComponentInstance(ComponentInstanceBinding {
                        common: BindingCommon::new(key.clone(), creator.origin.clone()),
                        bound_instance: true,
                    }),
                );
            }
        }
    }

    for dependency_component in &arena[idx].descriptor.dependency_components {
        if let Some(method_name) = universe
            .dependency_provisions
            .get(&(dependency_component.clone(), key.clone()))
        {
            return owned(
                key,
                owner.clone(),
                Binding::ComponentProvided(keystone_common::binding::ComponentProvidedBinding {
                    common: BindingCommon::new(
                        key.clone(),
                        ElementId::for_member(
                            dependency_component.canonical_string(),
                            keystone_common::element::ElementKind::Method,
                            method_name.clone(),
                        ),
                    ),
                    dependency_component: dependency_component.clone(),
                    method_name: method_name.clone(),
                }),
            );
        }
    }

    if let Some(binding) = find_singular_explicit(&arena[idx].expanded_modules, key) {
        return owned(key, owner.clone(), binding);
    }

    if is_multibinding_aggregate(key) {
        if let Some(result) = resolve_multibinding(arena, idx, key, universe, in_progress) {
            return result;
        }
    }

    if let Some(result) = resolve_optional(arena, idx, key, universe, in_progress) {
        return result;
    }

    // Ownership hoisting: prefer an ancestor's resolution before attempting local implicit
    // synthesis (§4.3 "Ownership hoisting"); the recursion naturally bottoms out at the
    // rootmost component whose view of the world can satisfy every dependency.
    if let Some(parent_idx) = arena[idx].parent {
        let parent_result = resolve(arena, parent_idx, key, universe, in_progress);
        if !parent_result.contributions.is_empty() {
            return ResolvedBindings {
                key: key.clone(),
                contributions: parent_result.contributions,
                owner: parent_result.owner,
                inherited: true,
            };
        }
    }

    if let Some(template) = universe.injectables.get(key).cloned() {
        let dependencies = template.dependencies().to_vec();
        let mut all_satisfied = true;
        for dependency in &dependencies {
            let resolved = resolve(arena, idx, &dependency.key, universe, in_progress);
            if resolved.contributions.is_empty() {
                all_satisfied = false;
            }
        }
        if all_satisfied {
            return owned(key, owner, template);
        }
    }

    // Missing: no explicit, multibound, optional, inherited, or implicit resolution exists.
    // Left for the missing-binding validator (§4.4) to report against the entry points that
    // reach it.
    ResolvedBindings {
        key: key.clone(),
        contributions: Vec::new(),
        owner,
        inherited: false,
    }
}

fn owned(key: &Key, owner: ComponentId, binding: Binding) -> ResolvedBindings {
    ResolvedBindings {
        key: key.clone(),
        contributions: vec![binding],
        owner,
        inherited: false,
    }
}

/// A non-multibinding explicit declaration local to this node: provision, production, delegate,
/// or subcomponent-creator, found by exact Key match (contribution tag included, so a tagged
/// contributor Key is never mistaken for its own aggregate).
fn find_singular_explicit(modules: &[ModuleDescriptor], key: &Key) -> Option<Binding> {
    for module in modules {
        for binding in &module.bindings {
            if binding.key() != key {
                continue;
            }
            match binding {
                Binding::Provision(_)
                | Binding::Production(_)
                | Binding::Delegate(_)
                | Binding::SubcomponentCreator(_) => return Some(binding.clone()),
                _ => {}
            }
        }
    }
    None
}

fn is_multibinding_aggregate(key: &Key) -> bool {
    key.contribution_tag.is_none()
        && (key.type_ref.path == "std::collections::HashSet" || key.type_ref.path == "std::collections::HashMap")
}

/// Collects every contributor visible to `idx` (its own modules plus every ancestor's), in
/// root-to-leaf order, alongside the arena index that declared each one.
fn collect_contributors(
    arena: &[ArenaNode],
    idx: usize,
    key: &Key,
) -> Vec<(usize, Key)> {
    let mut chain = Vec::new();
    let mut cursor = Some(idx);
    while let Some(i) = cursor {
        chain.push(i);
        cursor = arena[i].parent;
    }
    chain.reverse();

    let mut contributors = Vec::new();
    for node_idx in chain {
        for module in &arena[node_idx].expanded_modules {
            for binding in &module.bindings {
                if binding.key().is_multibinding_contribution()
                    && &binding.key().without_contribution_tag() == key
                {
                    contributors.push((node_idx, binding.key().clone()));
                }
            }
        }
    }
    contributors
}

fn local_multibinding_declaration(modules: &[ModuleDescriptor], key: &Key) -> bool {
    modules.iter().any(|m| {
        m.bindings.iter().any(|b| {
            b.key() == key
                && matches!(b, Binding::MultiboundSet(_) | Binding::MultiboundMap(_))
        })
    })
}

fn resolve_multibinding(
    arena: &mut Vec<ArenaNode>,
    idx: usize,
    key: &Key,
    universe: &Universe,
    in_progress: &mut HashSet<(usize, Key)>,
) -> Option<ResolvedBindings> {
    let contributors = collect_contributors(arena, idx, key);
    let local_has_contribution = contributors.iter().any(|(node_idx, _)| *node_idx == idx);
    let local_has_declaration = local_multibinding_declaration(&arena[idx].expanded_modules, key);

    if contributors.is_empty() && !local_has_declaration {
        // No contributors anywhere and nothing declares the aggregate explicitly: not a
        // multibinding after all from this node's point of view; let the normal missing-binding
        // path handle it (it might still resolve via an ancestor's own declaration without any
        // contributor, e.g. a module that declares `multibinds` but nothing ever contributes).
        if !local_multibinding_declaration_anywhere(arena, idx, key) {
            return None;
        }
    }

    if !local_has_contribution && !local_has_declaration {
        if let Some(parent_idx) = arena[idx].parent {
            let parent_result = resolve(arena, parent_idx, key, universe, in_progress);
            if !parent_result.contributions.is_empty() || local_multibinding_declaration(&arena[parent_idx].expanded_modules, key) {
                return Some(ResolvedBindings {
                    key: key.clone(),
                    contributions: parent_result.contributions,
                    owner: parent_result.owner,
                    inherited: true,
                });
            }
        }
        return None;
    }

    let owner = arena[idx].id();
    let mut dependencies = Vec::with_capacity(contributors.len());
    let mut map_keys = std::collections::BTreeMap::new();
    for (position, (node_idx, contributor_key)) in contributors.iter().enumerate() {
        let resolved = resolve(arena, *node_idx, contributor_key, universe, in_progress);
        if let Some(map_key) = resolved.single().and_then(|b| b.common().map_key.clone()) {
            map_keys.insert(position, map_key);
        }
        dependencies.push(keystone_common::request::DependencyRequest::instance(
            resolved.key.clone(),
        ));
    }

    let element_type = key
        .type_ref
        .args
        .first()
        .cloned()
        .unwrap_or_else(|| key.type_ref.clone());
    let origin = ElementId::for_type(key.type_ref.canonical_string());
    let common = BindingCommon::new(key.clone(), origin).with_dependencies(dependencies);

    let binding = if key.type_ref.path == "std::collections::HashMap" {
        let value_type = key.type_ref.args.get(1).cloned().unwrap_or(element_type.clone());
        Binding::MultiboundMap(MultiboundMapBinding {
            common,
            key_type: element_type,
            value_type,
            map_keys,
        })
    } else {
        Binding::MultiboundSet(MultiboundSetBinding { common, element_type })
    };

    Some(ResolvedBindings {
        key: key.clone(),
        contributions: vec![binding],
        owner,
        inherited: false,
    })
}

fn local_multibinding_declaration_anywhere(arena: &[ArenaNode], idx: usize, key: &Key) -> bool {
    let mut cursor = Some(idx);
    while let Some(i) = cursor {
        if local_multibinding_declaration(&arena[i].expanded_modules, key) {
            return true;
        }
        cursor = arena[i].parent;
    }
    false
}

/// Finds a `binds_optional_of` declaration local to `idx` whose declared Key is `key`, and
/// computes its present/absent value dynamically against this node's own visibility (§4.3 step
/// 4: "if the underlying Key resolves in this component or any ancestor, the optional binding
/// has a dependency on it; otherwise... represents absent").
fn resolve_optional(
    arena: &mut Vec<ArenaNode>,
    idx: usize,
    key: &Key,
    universe: &Universe,
    in_progress: &mut HashSet<(usize, Key)>,
) -> Option<ResolvedBindings> {
    let template = arena[idx].expanded_modules.iter().find_map(|m| {
        m.bindings.iter().find_map(|b| match b {
            Binding::Optional(opt) if &opt.common.key == key => Some(opt.clone()),
            _ => None,
        })
    })?;

    let owner = arena[idx].id();
    let underlying_resolved = resolve(arena, idx, &template.underlying, universe, in_progress);
    let present = !underlying_resolved.contributions.is_empty();
    let dependencies = if present {
        vec![keystone_common::request::DependencyRequest::instance(template.underlying.clone())]
    } else {
        Vec::new()
    };
    let common = BindingCommon::new(key.clone(), template.common.origin.clone()).with_dependencies(dependencies);
    Some(owned(
        key,
        owner,
        Binding::Optional(OptionalBinding {
            common,
            underlying: template.underlying,
            present,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_common::component::{ComponentDescriptor, ComponentKind, EntryPoint};
    use keystone_common::element::ElementKind;
    use keystone_common::request::{DependencyRequest, RequestKind};
    use keystone_common::type_ref::TypeRoot;

    fn ty(path: &str) -> TypeRef {
        TypeRef::simple(TypeRoot::Crate, path)
    }

    fn inject(ty_path: &str, deps: Vec<Key>) -> Binding {
        Binding::Injection(InjectionBinding {
            common: BindingCommon::new(Key::new(ty(ty_path)), ElementId::for_type(ty_path))
                .with_dependencies(deps.into_iter().map(DependencyRequest::instance).collect()),
            constructor_name: "new".to_owned(),
        })
    }

    fn root_component(entry_key: Key) -> ComponentDescriptor {
        let mut c = ComponentDescriptor::new(ComponentKind::Root, ty("crate::C"), ElementId::for_type("crate::C"));
        c.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(entry_key)),
        });
        c
    }

    /// E1: Module M provides Foo(Bar), Bar is `#[inject]`. Expect Foo owned by C with Bar as a
    /// dependency, both resolved (non-missing).
    #[test]
    fn e1_provision_depending_on_injection() {
        let foo_key = Key::new(ty("crate::Foo"));
        let bar_key = Key::new(ty("crate::Bar"));

        let mut module = ModuleDescriptor::new(ty("crate::M"), ElementId::for_type("crate::M"));
        module.bindings.push(Binding::Provision(keystone_common::binding::ProvisionBinding {
            common: BindingCommon::new(foo_key.clone(), ElementId::for_member("crate::M", ElementKind::Method, "foo_from_m"))
                .with_dependencies(vec![DependencyRequest::instance(bar_key.clone())]),
            module: ty("crate::M"),
            method_name: "foo_from_m".to_owned(),
        }));

        let mut component = root_component(foo_key.clone());
        component.modules.push(ty("crate::M"));

        let universe = Universe::new()
            .with_module(module)
            .with_injectable(inject("crate::Bar", vec![]));

        let graph = build_binding_graph(&component, &universe);
        let foo = graph.find(&foo_key).unwrap();
        assert!(!foo.contributions.is_empty());
        assert!(!foo.inherited);
        let bar = graph.find(&bar_key).unwrap();
        assert!(!bar.contributions.is_empty());
    }

    /// E6: subcomponent S requests Foo, an inject-constructor whose dependencies are all
    /// available at root R; expect the binding hoisted to R, S merely inherits.
    #[test]
    fn e6_ownership_hoisting_to_root() {
        let foo_key = Key::new(ty("crate::Foo"));
        let bar_key = Key::new(ty("crate::Bar"));

        let mut root = ComponentDescriptor::new(ComponentKind::Root, ty("crate::R"), ElementId::for_type("crate::R"));
        let mut sub = ComponentDescriptor::new(
            ComponentKind::Subcomponent,
            ty("crate::S"),
            ElementId::for_type("crate::S"),
        );
        sub.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::S", ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key.clone())),
        });
        root.children.push(keystone_common::component::ChildDeclaration {
            subcomponent: ty("crate::S"),
            factory_method_name: Some("s".to_owned()),
        });

        let universe = Universe::new()
            .with_injectable(inject("crate::Foo", vec![bar_key.clone()]))
            .with_injectable(inject("crate::Bar", vec![]))
            .with_subcomponent(sub);

        let graph = build_binding_graph(&root, &universe);
        assert_eq!(graph.subgraphs.len(), 1);
        let sub_graph = &graph.subgraphs[0];
        let foo_in_sub = sub_graph.find(&foo_key).unwrap();
        assert!(foo_in_sub.inherited);
        assert_eq!(foo_in_sub.owner, graph.id());
        assert!(graph.find(&foo_key).is_some());
    }

    /// E5: two modules each contribute `@IntoSet Plugin`; component requests `Set<Plugin>`.
    #[test]
    fn e5_multibinding_aggregation() {
        let plugin = ty("crate::Plugin");
        let set_key = Key::new(plugin.clone().wrapped_set());
        let tag_a = keystone_common::key::ContributionTag {
            contributing_module: ty("crate::M1"),
            binding_method_name: "plugin_a".to_owned(),
        };
        let tag_b = keystone_common::key::ContributionTag {
            contributing_module: ty("crate::M2"),
            binding_method_name: "plugin_b".to_owned(),
        };
        let contributor_a = Key::new(plugin.clone().wrapped_set()).with_contribution_tag(tag_a);
        let contributor_b = Key::new(plugin.clone().wrapped_set()).with_contribution_tag(tag_b);

        let mut m1 = ModuleDescriptor::new(ty("crate::M1"), ElementId::for_type("crate::M1"));
        m1.bindings.push(Binding::Provision(keystone_common::binding::ProvisionBinding {
            common: BindingCommon::new(contributor_a, ElementId::for_member("crate::M1", ElementKind::Method, "plugin_a")),
            module: ty("crate::M1"),
            method_name: "plugin_a".to_owned(),
        }));
        let mut m2 = ModuleDescriptor::new(ty("crate::M2"), ElementId::for_type("crate::M2"));
        m2.bindings.push(Binding::Provision(keystone_common::binding::ProvisionBinding {
            common: BindingCommon::new(contributor_b, ElementId::for_member("crate::M2", ElementKind::Method, "plugin_b")),
            module: ty("crate::M2"),
            method_name: "plugin_b".to_owned(),
        }));

        let mut component = root_component(set_key.clone());
        component.modules.push(ty("crate::M1"));
        component.modules.push(ty("crate::M2"));

        let universe = Universe::new().with_module(m1).with_module(m2);
        let graph = build_binding_graph(&component, &universe);
        let resolved = graph.find(&set_key).unwrap();
        assert!(resolved.is_multibinding());
        let binding = resolved.single().expect("one aggregate binding");
        assert_eq!(binding.dependencies().len(), 2);
    }

    /// E3 structural shape: a dependency cycle broken by a deferred request kind must not hang
    /// the resolver.
    #[test]
    fn cyclic_dependencies_resolve_without_hanging() {
        let foo_key = Key::new(ty("crate::Foo"));
        let bar_key = Key::new(ty("crate::Bar"));
        let foo_binding = Binding::Injection(InjectionBinding {
            common: BindingCommon::new(foo_key.clone(), ElementId::for_type("crate::Foo"))
                .with_dependencies(vec![DependencyRequest::instance(bar_key.clone())]),
            constructor_name: "new".to_owned(),
        });
        let bar_binding = Binding::Injection(InjectionBinding {
            common: BindingCommon::new(bar_key.clone(), ElementId::for_type("crate::Bar"))
                .with_dependencies(vec![DependencyRequest::new(foo_key.clone(), RequestKind::Provider)]),
            constructor_name: "new".to_owned(),
        });
        let universe = Universe::new()
            .with_injectable(foo_binding)
            .with_injectable(bar_binding);
        let component = root_component(foo_key.clone());
        let graph = build_binding_graph(&component, &universe);
        assert!(graph.find(&foo_key).unwrap().single().is_some());
        assert!(graph.find(&bar_key).unwrap().single().is_some());
    }
}
