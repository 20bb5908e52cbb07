/*
Copyright 2020 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Runtime support for code generated by a keystone driver, plus the compiler core that builds
//! and validates the binding graph and plans/writes that generated code.
//!
//! The annotation-processor driver that discovers annotated types, hands them to
//! [`keystone_core::process`] and writes its [`keystone_core::GeneratedFile`]s back to the host
//! build lives outside this crate; this crate is the runtime the generated code calls into
//! (`Cl`, `Lazy`, `Provider`, the scope-memoization wrappers, the multibinding builders) plus the
//! compiler library itself, re-exported under [`core`].

mod component_lifetime;
pub use component_lifetime::Cl;

mod delegate;
pub use delegate::DelegateFactory;

mod lazy;
pub use lazy::Lazy;

mod multibinding;
pub use multibinding::{MapFactory, SetFactory};

mod once;
pub use once::Once;

mod provider;
pub use provider::Provider;

mod single_check;
pub use single_check::SingleCheck;

/// The binding-graph resolver, validators, planner, writer, and diagnostic reporter. Re-exported
/// under its own name so a driver depends on one crate (`keystone`) for both the runtime types
/// its generated code references and the compiler that generates that code.
pub use keystone_core as core;
pub use keystone_common as common;
