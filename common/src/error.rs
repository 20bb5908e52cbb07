//! Typed error hierarchy (AC2).
//!
//! Grounded on the teacher's `error.rs` (`CompileError`/`handle_error`): the teacher turns every
//! failure into a `compile_error!` token stream because it talks directly to `rustc`. This crate
//! is one layer further from the compiler (per §1, the proc-macro driver is out of scope), so the
//! same distinction the teacher draws between "a bug in the processor itself" and "a malformed
//! but recoverable user input" becomes two different Rust types instead of two code paths through
//! the same `TokenStream` result: [`KeystoneError::Internal`] for the former (§7's
//! "internal-consistency failures", still fatal), and `Diagnostic`s (data, not `Err` values) for
//! the latter, flowing through the reporter as §7.1 describes.

use thiserror::Error;

/// Errors a caller of this crate's public entry points can receive.
///
/// Ordinary declaration/resolution/scope/structural/nullability problems are *not* represented
/// here: per §7 they are diagnostics attached to user elements, collected while processing
/// continues, not early-return `Err`s. This type is reserved for the cases §7 calls
/// "internal-consistency failures" plus the few fallible-construction seams AC2 describes
/// (malformed options, a key factory input so broken a `Key` truly cannot be built).
#[derive(Debug, Error)]
pub enum KeystoneError {
    /// An asserted invariant of the resolver, planner, or writer did not hold. Per §7 these are
    /// "treated as fatal bugs; surfaced with diagnostic and abort" -- the caller should propagate
    /// this with `?` rather than attempt to recover.
    #[error("internal consistency failure: {0}")]
    Internal(String),

    /// A compiler option failed to parse (unknown accepted-value for a known option, or a value
    /// of the wrong shape). Unknown *option names* are not an error per §6 (they warn); this is
    /// for a recognized option given a value outside its accepted set.
    #[error("invalid value {value:?} for option {option}: {reason}")]
    InvalidOption {
        option: String,
        value: String,
        reason: String,
    },

    /// The writer was asked to emit a second time from the same, already-consumed writer object
    /// (§4.6: "Emission is one-shot").
    #[error("component writer for {0} has already emitted its output")]
    AlreadyEmitted(String),
}

impl KeystoneError {
    pub fn internal(message: impl Into<String>) -> Self {
        KeystoneError::Internal(message.into())
    }
}

/// Shorthand used throughout the workspace for the internal-consistency-failure case.
pub type Result<T> = std::result::Result<T, KeystoneError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_error_carries_its_message() {
        let err = KeystoneError::internal("ResolvedBindings had no owner");
        assert_eq!(
            err.to_string(),
            "internal consistency failure: ResolvedBindings had no owner"
        );
    }

    #[test]
    fn invalid_option_message_names_the_option() {
        let err = KeystoneError::InvalidOption {
            option: "nullableValidation".to_owned(),
            value: "maybe".to_owned(),
            reason: "expected error|warning".to_owned(),
        };
        assert!(err.to_string().contains("nullableValidation"));
        assert!(err.to_string().contains("maybe"));
    }
}
