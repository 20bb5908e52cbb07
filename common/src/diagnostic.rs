//! Diagnostic wire format (C10's data half; the reporter that builds and formats these lives in
//! `keystone_core`).
//!
//! Grounded on §6: "each diagnostic is `(severity, message, element, annotation?,
//! annotation-value?)` tuples delivered to the host messager." The teacher instead turns
//! everything straight into a `compile_error!` `TokenStream` (`processor/src/error.rs`); since
//! this crate's driver boundary sits one layer further out (§1), diagnostics are kept as plain
//! data here so a host can format, sort, or deduplicate them before handing them to whatever
//! messager it has.

use crate::element::ElementId;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Severity::Warning => "warning",
            Severity::Error => "error",
        })
    }
}

/// One reported problem, attributed to the nearest user element.
///
/// `trace` holds the shortest dependency path from an entry point to the offending binding
/// (§4.3, "the resolver also records the shortest dependency path... for diagnostic use"),
/// rendered as a sequence of human-readable hop descriptions; empty for diagnostics that are not
/// resolution failures (e.g. a structural module-shape problem has no meaningful trace).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub element: ElementId,
    pub annotation: Option<String>,
    pub annotation_value: Option<String>,
    pub trace: Vec<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>, element: ElementId) -> Self {
        Diagnostic {
            severity: Severity::Error,
            message: message.into(),
            element,
            annotation: None,
            annotation_value: None,
            trace: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, element: ElementId) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            message: message.into(),
            element,
            annotation: None,
            annotation_value: None,
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_annotation(mut self, annotation: impl Into<String>, value: Option<String>) -> Self {
        self.annotation = Some(annotation.into());
        self.annotation_value = value;
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Formats the diagnostic the way §6 describes: "prefixed with the plugin/source identifier
    /// in square brackets", followed by the message, element, and (if present) the trace.
    pub fn format(&self, source_identifier: &str) -> String {
        let mut out = format!("[{}] {}: {}", source_identifier, self.severity, self.message);
        out.push_str(&format!("\n    at {}", self.element));
        if let Some(annotation) = &self.annotation {
            out.push_str(&format!(" (annotation: {})", annotation));
            if let Some(value) = &self.annotation_value {
                out.push_str(&format!(" = {:?}", value));
            }
        }
        for (i, hop) in self.trace.iter().enumerate() {
            out.push_str(&format!("\n    {}{}", "  ".repeat(i), hop));
        }
        out
    }
}
