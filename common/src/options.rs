//! Compiler options (AC3 / §6 / §9's "configurable, per-option severity" redesign note).
//!
//! The teacher threads individual `bool`/enum fields through `Environment` (see
//! `processor/src/environment.rs`) and branches on each by name at its use site. Per §9 this is
//! replaced with one `Options` record plus a table of `(name, default, accepted values, apply)`
//! entries; parsing a raw `(name, value)` pair (the shape a host's attribute-parsing layer is
//! likely to hand over, per §6.1) and reporting on an unknown name are both table-driven instead
//! of a chain of `if name == "..."`.

use crate::error::KeystoneError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    None,
    Warning,
    Error,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Error
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::None => "none",
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Severity::None),
            "warning" => Ok(Severity::Warning),
            "error" => Ok(Severity::Error),
            other => Err(format!("expected none|warning|error, got {:?}", other)),
        }
    }
}

/// The full set of recognized compiler options (§6's table), round-trippable through
/// `serde_json` (§8 property 7: "Round-trip of serialized options").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub fast_init: bool,
    pub format_generated_source: bool,
    pub write_producer_name_in_token: bool,
    pub nullable_validation: Severity,
    pub private_member_validation: Severity,
    pub static_member_validation: Severity,
    pub ignore_private_and_static_injection_for_component: bool,
    pub scope_cycle_validation: Severity,
    pub warn_if_injection_factory_not_generated_upstream: bool,
    pub header_compilation: bool,
    pub ahead_of_time_subcomponents: bool,
    pub use_gradle_incremental_processing: bool,
    pub module_binding_validation: Severity,
    pub module_has_different_scopes_diagnostic_kind: Severity,
    pub explicit_binding_conflicts_with_inject_validation_type: Severity,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            fast_init: false,
            format_generated_source: true,
            write_producer_name_in_token: false,
            nullable_validation: Severity::Error,
            private_member_validation: Severity::Error,
            static_member_validation: Severity::Error,
            ignore_private_and_static_injection_for_component: false,
            scope_cycle_validation: Severity::Error,
            warn_if_injection_factory_not_generated_upstream: false,
            header_compilation: false,
            ahead_of_time_subcomponents: false,
            use_gradle_incremental_processing: false,
            module_binding_validation: Severity::Error,
            module_has_different_scopes_diagnostic_kind: Severity::Warning,
            explicit_binding_conflicts_with_inject_validation_type: Severity::Error,
        }
    }
}

/// One entry of the table-driven option registry: a name as it appears in a manifest/attribute,
/// how to apply a raw string value to an `Options` record, and whether the name is recognized at
/// all.
struct OptionEntry {
    name: &'static str,
    apply: fn(&mut Options, &str) -> Result<(), KeystoneError>,
}

fn bool_value(option: &str, value: &str) -> Result<bool, KeystoneError> {
    match value {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(KeystoneError::InvalidOption {
            option: option.to_owned(),
            value: other.to_owned(),
            reason: "expected true|false".to_owned(),
        }),
    }
}

fn severity_value(option: &str, value: &str) -> Result<Severity, KeystoneError> {
    value.parse().map_err(|reason| KeystoneError::InvalidOption {
        option: option.to_owned(),
        value: value.to_owned(),
        reason,
    })
}

fn registry() -> &'static [OptionEntry] {
    &[
        OptionEntry {
            name: "fastInit",
            apply: |o, v| Ok(o.fast_init = bool_value("fastInit", v)?),
        },
        OptionEntry {
            name: "formatGeneratedSource",
            apply: |o, v| Ok(o.format_generated_source = bool_value("formatGeneratedSource", v)?),
        },
        OptionEntry {
            name: "writeProducerNameInToken",
            apply: |o, v| {
                Ok(o.write_producer_name_in_token = bool_value("writeProducerNameInToken", v)?)
            },
        },
        OptionEntry {
            name: "nullableValidation",
            apply: |o, v| Ok(o.nullable_validation = severity_value("nullableValidation", v)?),
        },
        OptionEntry {
            name: "privateMemberValidation",
            apply: |o, v| {
                Ok(o.private_member_validation = severity_value("privateMemberValidation", v)?)
            },
        },
        OptionEntry {
            name: "staticMemberValidation",
            apply: |o, v| {
                Ok(o.static_member_validation = severity_value("staticMemberValidation", v)?)
            },
        },
        OptionEntry {
            name: "ignorePrivateAndStaticInjectionForComponent",
            apply: |o, v| {
                Ok(o.ignore_private_and_static_injection_for_component =
                    bool_value("ignorePrivateAndStaticInjectionForComponent", v)?)
            },
        },
        OptionEntry {
            name: "scopeCycleValidation",
            apply: |o, v| Ok(o.scope_cycle_validation = severity_value("scopeCycleValidation", v)?),
        },
        OptionEntry {
            name: "warnIfInjectionFactoryNotGeneratedUpstream",
            apply: |o, v| {
                Ok(o.warn_if_injection_factory_not_generated_upstream =
                    bool_value("warnIfInjectionFactoryNotGeneratedUpstream", v)?)
            },
        },
        OptionEntry {
            name: "headerCompilation",
            apply: |o, v| Ok(o.header_compilation = bool_value("headerCompilation", v)?),
        },
        OptionEntry {
            name: "aheadOfTimeSubcomponents",
            apply: |o, v| {
                Ok(o.ahead_of_time_subcomponents = bool_value("aheadOfTimeSubcomponents", v)?)
            },
        },
        OptionEntry {
            name: "useGradleIncrementalProcessing",
            apply: |o, v| {
                Ok(o.use_gradle_incremental_processing =
                    bool_value("useGradleIncrementalProcessing", v)?)
            },
        },
        OptionEntry {
            name: "moduleBindingValidation",
            apply: |o, v| {
                Ok(o.module_binding_validation = severity_value("moduleBindingValidation", v)?)
            },
        },
        OptionEntry {
            name: "moduleHasDifferentScopesDiagnosticKind",
            apply: |o, v| {
                Ok(o.module_has_different_scopes_diagnostic_kind =
                    severity_value("moduleHasDifferentScopesDiagnosticKind", v)?)
            },
        },
        OptionEntry {
            name: "explicitBindingConflictsWithInjectValidationType",
            apply: |o, v| {
                Ok(o.explicit_binding_conflicts_with_inject_validation_type =
                    severity_value("explicitBindingConflictsWithInjectValidationType", v)?)
            },
        },
    ]
}

impl Options {
    /// Applies a flat `(name, value)` table to a fresh default `Options`. Per §6, "unknown
    /// options must emit a warning but not fail" -- the caller gets those names back so it can
    /// log them through AC1 without this crate depending on `log` for a return value's shape.
    pub fn from_table(entries: &[(&str, &str)]) -> Result<(Options, Vec<String>), KeystoneError> {
        let mut options = Options::default();
        let mut unknown = Vec::new();
        for (name, value) in entries {
            match registry().iter().find(|e| e.name == *name) {
                Some(entry) => (entry.apply)(&mut options, value)?,
                None => unknown.push((*name).to_owned()),
            }
        }
        Ok((options, unknown))
    }

    pub fn is_recognized_option(name: &str) -> bool {
        registry().iter().any(|e| e.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_option_is_reported_but_does_not_fail() {
        let (options, unknown) =
            Options::from_table(&[("fastInit", "true"), ("notARealOption", "x")]).unwrap();
        assert!(options.fast_init);
        assert_eq!(unknown, vec!["notARealOption".to_owned()]);
    }

    #[test]
    fn invalid_severity_value_is_an_error() {
        let result = Options::from_table(&[("nullableValidation", "maybe")]);
        assert!(result.is_err());
    }

    #[test]
    fn default_matches_documented_severities() {
        let options = Options::default();
        assert_eq!(options.nullable_validation, Severity::Error);
        assert!(!options.fast_init);
    }

    #[test]
    fn round_trips_through_json() {
        let (options, _) = Options::from_table(&[
            ("fastInit", "true"),
            ("moduleBindingValidation", "warning"),
        ])
        .unwrap();
        let json = serde_json::to_string(&options).unwrap();
        let back: Options = serde_json::from_str(&json).unwrap();
        assert_eq!(options, back);
    }
}
