//! Shared data model for keystone: keys, requests, bindings, module/component descriptors,
//! diagnostics, and the compiler-options record.
//!
//! This crate holds only inert data (C1-C5 of the core spec) plus the error and options types
//! that the rest of the workspace builds on; the resolver, validators, planner and writer that
//! operate over this data live in `keystone_core`.

pub mod binding;
pub mod component;
pub mod diagnostic;
pub mod element;
pub mod error;
pub mod key;
pub mod module;
pub mod options;
pub mod request;
pub mod type_ref;

pub use binding::{Binding, BindingCommon, Scope};
pub use component::{ComponentDescriptor, ComponentKind, CreatorKind, EntryPoint};
pub use diagnostic::{Diagnostic, Severity};
pub use element::{ElementId, ElementKind};
pub use error::KeystoneError;
pub use key::{ContributionTag, Key, Qualifier};
pub use module::ModuleDescriptor;
pub use options::Options;
pub use request::{DependencyRequest, RequestKind};
pub use type_ref::{TypeRef, TypeRoot};
