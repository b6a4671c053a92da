//! Error taxonomy
//!
//! Three disjoint families cross the public API:
//! - [`CompileError`]: source could not become a program. Never partial.
//! - [`UsageError`]: misuse of the start/resume/snapshot surface. Always
//!   synchronous, never retried, never leaves a handle half-mutated.
//! - [`FormatError`]: corrupt or incompatible serialized bytes.
//!
//! Exceptions raised by running programs are *values*, not errors; see
//! [`crate::value::ExceptionValue`].

use std::fmt;

use thiserror::Error;

use crate::value::CallId;

/* ===================== Compile Errors ===================== */

/// Where in the source a compile error was detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    /// The source does not parse, or a construct is structurally invalid
    /// where it appears (`break` outside a loop, `try` without handlers).
    Syntax,
    /// A name does not resolve to anything visible at that point.
    Name,
    /// The construct parses but is not supported by this runtime.
    Unsupported,
}

impl CompileErrorKind {
    fn label(self) -> &'static str {
        match self {
            CompileErrorKind::Syntax => "syntax error",
            CompileErrorKind::Name => "name error",
            CompileErrorKind::Unsupported => "unsupported",
        }
    }
}

/// Source text could not be turned into a program.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileError {
    pub kind: CompileErrorKind,
    pub message: String,
    pub location: Option<Location>,
}

impl CompileError {
    pub(crate) fn new(
        kind: CompileErrorKind,
        message: impl Into<String>,
        location: Option<Location>,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            location,
        }
    }

    pub(crate) fn syntax(message: impl Into<String>, location: Option<Location>) -> Self {
        Self::new(CompileErrorKind::Syntax, message, location)
    }

    pub(crate) fn name(message: impl Into<String>, location: Option<Location>) -> Self {
        Self::new(CompileErrorKind::Name, message, location)
    }

    pub(crate) fn unsupported(message: impl Into<String>, location: Option<Location>) -> Self {
        Self::new(CompileErrorKind::Unsupported, message, location)
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} at {}: {}", self.kind.label(), loc, self.message),
            None => write!(f, "{}: {}", self.kind.label(), self.message),
        }
    }
}

impl std::error::Error for CompileError {}

/* ===================== Usage Errors ===================== */

/// Misuse of the execution API. The operation that failed performed no
/// state transition: the program or snapshot is exactly as it was.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("call id {provided} does not match pending call id {expected}")]
    CallIdMismatch { expected: CallId, provided: CallId },

    #[error("unknown call id {provided}, expected one of {pending:?}")]
    UnknownCallId {
        provided: CallId,
        pending: Vec<CallId>,
    },

    #[error("snapshot already consumed")]
    AlreadyConsumed,

    #[error("expected {expected} input values, got {provided}")]
    InputArity { expected: usize, provided: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/* ===================== Format Errors ===================== */

/// Serialized bytes could not be decoded. A failed load never produces a
/// usable handle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("not a cadence artifact (bad or truncated header)")]
    Header,

    #[error("expected serialized {expected}, found {found}")]
    Kind {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unsupported format version {0}")]
    Version(u8),

    #[error("corrupt payload: {0}")]
    Corrupt(String),
}
