//! Specific error types for code generation operations
//!
//! Every variant here signals a compiler bug: resolution has already
//! rejected all user errors before generation starts.

use thiserror::Error;

use crate::common::error::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodeGenError {
    #[error("out of registers ({available} available)")]
    OutOfRegisters { available: u16 },
    #[error("{count} register(s) still live at end of {method}")]
    RegisterLeak { method: String, count: u32 },
    #[error("label L{0} placed twice")]
    LabelPlacedTwice(u32),
    #[error("label L{0} referenced but never placed")]
    UnplacedLabel(u32),
    #[error("{stmt} has no {which} destination")]
    MissingDestination { stmt: &'static str, which: &'static str },
    #[error("{what} reached generation unresolved")]
    Unresolved { what: String },
    #[error("unexpected {what} during generation")]
    Unexpected { what: String },
}

impl CodeGenError {
    pub fn unresolved(what: impl Into<String>) -> Self {
        Self::Unresolved { what: what.into() }
    }

    pub fn unexpected(what: impl Into<String>) -> Self {
        Self::Unexpected { what: what.into() }
    }
}

/// Result type for generation
pub type CodeGenResult<T> = std::result::Result<T, CodeGenError>;

impl From<CodeGenError> for Error {
    fn from(err: CodeGenError) -> Self {
        Error::internal(err.to_string())
    }
}
