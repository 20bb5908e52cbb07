//! Module descriptor (C4).

use crate::binding::Binding;
use crate::element::ElementId;
use crate::type_ref::TypeRef;

/// An immutable descriptor for a `#[module]`-annotated type.
///
/// `bindings` holds every binding method declared directly on this module (provision,
/// production, delegate, binds-optional-of, multibinds); it does not include bindings
/// transitively reachable through `included_modules` — module expansion (flattening the
/// `included_modules` fixed point) is the resolver's job (§4.3), not the descriptor's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleDescriptor {
    pub type_ref: TypeRef,
    pub origin: ElementId,
    pub bindings: Vec<Binding>,
    pub included_modules: Vec<TypeRef>,
    pub declared_subcomponents: Vec<TypeRef>,
    pub is_production: bool,
}

impl ModuleDescriptor {
    pub fn new(type_ref: TypeRef, origin: ElementId) -> Self {
        ModuleDescriptor {
            type_ref,
            origin,
            bindings: Vec::new(),
            included_modules: Vec::new(),
            declared_subcomponents: Vec::new(),
            is_production: false,
        }
    }
}

/// Flattens `seed` plus every transitively included module into one deduplicated, insertion-order
/// list, resolving each `TypeRef` via `lookup`. A cycle in `included_modules` is benign: modules
/// already visited are skipped rather than re-descended into.
///
/// Grounded on the teacher's module-set expansion in `processor/src/graph.rs`
/// (`get_module_manifest`), which performs the same already-seen-guarded traversal over
/// `Module.includes`.
pub fn expand_modules<'a, F>(seeds: &[TypeRef], mut lookup: F) -> Vec<&'a ModuleDescriptor>
where
    F: FnMut(&TypeRef) -> Option<&'a ModuleDescriptor>,
{
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    let mut worklist: Vec<TypeRef> = seeds.to_vec();
    let mut cursor = 0;
    while cursor < worklist.len() {
        let type_ref = worklist[cursor].clone();
        cursor += 1;
        if !seen.insert(type_ref.clone()) {
            continue;
        }
        let Some(module) = lookup(&type_ref) else {
            continue;
        };
        ordered.push(module);
        for included in &module.included_modules {
            if !seen.contains(included) {
                worklist.push(included.clone());
            }
        }
    }
    ordered
}
