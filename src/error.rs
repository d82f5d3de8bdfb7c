//! Error taxonomy: parse errors, finalize errors, runtime warnings, and the
//! top-level `Error` a caller of this crate actually sees.
//!
//! Mirrors the shape of the teacher crate's `Error` enum (one
//! `thiserror`-derived variant per failure family, `#[error("...")]`
//! messages) but follows spec section 7's three-way split instead of the
//! teacher's GGUF-shaped one.

use serde::Serialize;

/// Malformed mode/charset file. Parsing stops at the first error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("parse error at line {line}, column {column}: expected {expected}, found {found}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub expected: String,
    pub found: String,
}

impl ParseError {
    pub fn new(line: usize, column: usize, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self {
            line,
            column,
            expected: expected.into(),
            found: found.into(),
        }
    }
}

/// Errors raised while finalizing a `Mode`/`RuleGroup`/`Rule`/`Fragment`.
/// Finalization never stops at the first one: every error found is
/// accumulated (spec 4.3, "errors are accumulated, not thrown") and
/// `finalize` fails only once the accumulated list is non-empty.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
pub enum FinalizeError {
    #[error("unresolved variable '{0}' (not a regular variable and not a UNI_ literal)")]
    UnresolvedVariable(String),

    #[error("arity mismatch in fragment: combinations have lengths {lengths:?}")]
    ArityMismatch { lengths: Vec<usize> },

    #[error("rule has {src_count} source combination(s) and {dst_count} destination combination(s); neither side broadcasts")]
    SideCountMismatch { src_count: usize, dst_count: usize },

    #[error("cross rule schema index {index} out of range for {src_len} source token(s)")]
    CrossIndexOutOfRange { index: usize, src_len: usize },

    #[error("macro '{name}' deployed with missing option '{option}'")]
    MissingOption { name: String, option: String },

    #[error("macro '{name}' deployed with {given} argument(s), expected {expected}")]
    MacroArityMismatch {
        name: String,
        given: usize,
        expected: usize,
    },

    #[error("variable substitution exceeded max depth ({max_depth}) while expanding '{name}'")]
    VariableLoop { name: String, max_depth: usize },

    #[error("macro deployment exceeded max depth ({max_depth}) while deploying '{name}'")]
    MacroLoop { name: String, max_depth: usize },

    #[error("unknown macro '{0}' deployed")]
    UnknownMacro(String),

    #[error("unknown variable '{0}' referenced")]
    UnknownVariable(String),

    #[error("invalid unicode literal '{0}'")]
    InvalidUnicodeLiteral(String),
}

/// Runtime diagnostics produced while running the pipeline. These never
/// fail `transcribe` (spec 4.7/7): they only ever ride inside a
/// `DebugRecord`, so this type intentionally does not implement
/// `std::error::Error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum RuntimeWarning {
    UnresolvedToken(String),
    VirtualUnresolved(String),
    UnknownCharsetName(String),
}

impl std::fmt::Display for RuntimeWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuntimeWarning::UnresolvedToken(name) => {
                write!(f, "token '{name}' did not resolve against any charset")
            }
            RuntimeWarning::VirtualUnresolved(name) => {
                write!(f, "virtual character '{name}' remained after both resolution passes")
            }
            RuntimeWarning::UnknownCharsetName(name) => {
                write!(f, "charset has no entry named '{name}'")
            }
        }
    }
}

/// The top-level error surfaced to callers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("finalize failed with {} error(s): {}", .0.len(), format_finalize_errors(.0))]
    Finalize(Vec<FinalizeError>),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Fatal(String),
}

fn format_finalize_errors(errors: &[FinalizeError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
