//! Error types for LayerDB
//!
//! This module defines all error types used throughout the database engine.
//! Errors are grouped by the layer that raises them; callers of
//! [`ExecutionEngine::execute`](crate::executor::ExecutionEngine::execute)
//! only ever observe [`Error::ExecutionError`].

use thiserror::Error;

/// The main error type for LayerDB
#[derive(Error, Debug)]
pub enum Error {
    // ========== Lexer Errors ==========
    #[error("Parse error: unexpected character '{0}' at position {1}")]
    UnexpectedCharacter(char, usize),

    #[error("Parse error: unterminated string literal starting at position {0}")]
    UnterminatedString(usize),

    #[error("Parse error: invalid number format at position {0}")]
    InvalidNumber(usize),

    // ========== Parser Errors ==========
    #[error("Parse error: unexpected token '{found}', expected {expected}")]
    UnexpectedToken { expected: String, found: String },

    #[error("Parse error: {0}")]
    ParseError(String),

    // ========== Storage Errors ==========
    #[error("Storage error: table '{0}' already exists")]
    TableAlreadyExists(String),

    #[error("Storage error: expected {expected} values, got {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("Storage error: snapshot {0}")]
    Snapshot(String),

    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    // ========== Execution Errors ==========
    #[error("Execution error: table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Execution error: cannot compare {left} with {right} using '{op}'")]
    TypeMismatch {
        left: &'static str,
        right: &'static str,
        op: String,
    },

    #[error("Execution error: {0}")]
    ExecutionError(String),
}

/// The layer an error originates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Parse,
    Storage,
    Execution,
}

impl Error {
    /// Classify this error by the layer that raised it
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnexpectedCharacter(..)
            | Error::UnterminatedString(_)
            | Error::InvalidNumber(_)
            | Error::UnexpectedToken { .. }
            | Error::ParseError(_) => ErrorKind::Parse,
            Error::TableAlreadyExists(_)
            | Error::ArityMismatch { .. }
            | Error::Snapshot(_)
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::Storage,
            Error::TableNotFound(_) | Error::TypeMismatch { .. } | Error::ExecutionError(_) => {
                ErrorKind::Execution
            }
        }
    }

    /// Normalize into the single error kind visible at the `execute` boundary.
    ///
    /// The original message is kept verbatim inside the new one.
    pub fn into_execution(self) -> Error {
        match self {
            Error::ExecutionError(_) => self,
            other => Error::ExecutionError(other.to_string()),
        }
    }
}

/// Result type alias for LayerDB operations
pub type Result<T> = std::result::Result<T, Error>;
