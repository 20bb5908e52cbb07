//! `keystone_core`: the resolver, validators, planner, writer, and diagnostic reporter (C6-C10).
//!
//! `keystone_common` (C1-C5) is inert data; everything in this crate operates over it. The
//! top-level entry point a host driver calls is [`process`]: it builds the binding graph, runs
//! every validator, and -- for each component with no error anywhere in its own subtree -- plans
//! and writes its generated code, matching §7's propagation policy ("any validator emitting an
//! error suppresses the writing phase for the affected component but does not prevent sibling
//! components from completing").

pub mod graph;
pub mod planner;
pub mod reporter;
pub mod resolver;
pub mod validator;
pub mod writer;

use keystone_common::component::ComponentDescriptor;
use keystone_common::diagnostic::Diagnostic;
use keystone_common::error::KeystoneError;
use keystone_common::options::Options;
use proc_macro2::TokenStream;
use std::collections::HashSet;

pub use graph::{BindingGraph, ComponentId, ResolvedBindings};
pub use planner::{BindingPlan, ComponentPlan};
pub use resolver::Universe;
pub use writer::ComponentWriter;

/// One generated source unit addressed to the host writer (§6: "Generated output... Source files
/// addressed to the host writer in the same package as the component"). Writing it to disk,
/// pretty-printing it, and feeding it back to the host compiler are a driver's job, not this
/// crate's (§1).
#[derive(Debug, Clone)]
pub struct GeneratedFile {
    pub suggested_path: String,
    pub tokens: TokenStream,
}

/// Everything one call to [`process`] produces: every diagnostic raised anywhere in the graph,
/// plus one [`GeneratedFile`] per component that validated clean.
#[derive(Debug, Default)]
pub struct ProcessingResult {
    pub diagnostics: Vec<Diagnostic>,
    pub files: Vec<GeneratedFile>,
}

impl ProcessingResult {
    pub fn has_error(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }
}

/// Runs the full C6-C10 pipeline for one processing round rooted at `root`.
///
/// Internal-consistency failures propagate as `Err` per §7.1; every other problem (declaration,
/// resolution, scope, structural, nullability) is collected as `Diagnostic` data in the returned
/// [`ProcessingResult`] instead, and a component anywhere under an erroring node is left out of
/// `files`.
pub fn process(
    root: &ComponentDescriptor,
    universe: &Universe,
    options: &Options,
) -> Result<ProcessingResult, KeystoneError> {
    let graph = resolver::build_binding_graph(root, universe);
    let diagnostics = validator::validate(&graph, universe, options);

    let mut result = ProcessingResult {
        diagnostics,
        files: Vec::new(),
    };

    write_clean_subtree(&graph, universe, options, &mut result)?;
    Ok(result)
}

fn write_clean_subtree(
    graph: &BindingGraph,
    universe: &Universe,
    options: &Options,
    result: &mut ProcessingResult,
) -> Result<(), KeystoneError> {
    let own_errors = {
        let mut seen = HashSet::new();
        validator::missing_bindings(graph)
            .into_iter()
            .chain(validator::duplicate_bindings(graph, universe, &mut seen))
            .chain(validator::multibinding_compatibility(graph, universe))
            .chain(validator::dependency_cycles(graph))
            .chain(validator::scope_consistency(graph, &[graph]))
            .chain(validator::module_structural(graph, universe))
            .chain(validator::nullability(graph, options))
            .any(|d| d.is_error())
    };

    if !own_errors {
        let component_plan = planner::plan(graph, options);
        let mut writer = ComponentWriter::new();
        let tokens = writer.write(graph, &component_plan)?;
        result.files.push(GeneratedFile {
            suggested_path: format!("{}.rs", graph.id().replace("::", "_")),
            tokens,
        });
    }

    for subgraph in &graph.subgraphs {
        write_clean_subtree(subgraph, universe, options, result)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use keystone_common::binding::{Binding, BindingCommon, InjectionBinding};
    use keystone_common::component::{ComponentDescriptor, ComponentKind, EntryPoint, EntryPointRequest};
    use keystone_common::element::ElementId;
    use keystone_common::key::Key;
    use keystone_common::request::DependencyRequest;
    use keystone_common::type_ref::{TypeRef, TypeRoot};

    fn ty(path: &str) -> TypeRef {
        TypeRef::simple(TypeRoot::Crate, path)
    }

    #[test]
    fn clean_component_produces_one_generated_file() {
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
        let result = process(&component, &universe, &Options::default()).expect("internal failures are not expected here");
        assert!(!result.has_error());
        assert_eq!(result.files.len(), 1);
    }

    #[test]
    fn missing_binding_suppresses_writing_but_still_reports() {
        let foo_key = Key::new(ty("crate::Foo"));
        let mut component = ComponentDescriptor::new(ComponentKind::Root, ty("crate::C"), ElementId::for_type("crate::C"));
        component.add_entry_point(EntryPoint {
            origin: ElementId::for_member("crate::C", keystone_common::element::ElementKind::Method, "foo"),
            method_name: "foo".to_owned(),
            request: EntryPointRequest::Provision(DependencyRequest::instance(foo_key)),
        });
        let universe = Universe::new();
        let result = process(&component, &universe, &Options::default()).expect("internal failures are not expected here");
        assert!(result.has_error());
        assert!(result.files.is_empty());
    }
}
