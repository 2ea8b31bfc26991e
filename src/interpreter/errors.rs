//! # Interpreter Errors
//!
//! Request-time error taxonomy for the command interpreter.
//!
//! Every variant is recovered locally and mapped into a `Fail` envelope;
//! none of these may crash the process. Registry misconfiguration is the
//! one programming-time invariant and is checked at startup instead
//! (see `registry::OperationRegistry::new`).

use thiserror::Error;

use crate::store::StoreError;

/// Result type for interpreter operations
pub type InterpreterResult<T> = Result<T, InterpreterError>;

/// Errors produced while interpreting a command
#[derive(Debug, Clone, Error)]
pub enum InterpreterError {
    // ==================
    // Parse stage
    // ==================
    /// Structural parse failure: missing prefix, unbalanced delimiters,
    /// missing operation
    #[error("Malformed command: {0}")]
    MalformedCommand(String),

    /// Argument literal cannot be normalized into strict form, or an
    /// argument has the wrong shape for the resolved operation
    #[error("Invalid literal{}: {reason}", .position.map(|p| format!(" at offset {}", p)).unwrap_or_default())]
    InvalidLiteral {
        /// Byte offset into the argument literal, when known
        position: Option<usize>,
        reason: String,
    },

    // ==================
    // Resolution stage
    // ==================
    /// Operation is not in the whitelist
    #[error("Operation not supported: {0}")]
    OperationNotSupported(String),

    /// Policy veto, including the identity-collection restriction
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Wrong argument count for the resolved operation
    #[error("{operation} expects {expected} argument(s), got {actual}")]
    ArityMismatch {
        operation: &'static str,
        expected: String,
        actual: usize,
    },

    // ==================
    // Dispatch stage
    // ==================
    /// The underlying store call failed
    #[error("Store failure: {0}")]
    StoreFailure(String),
}

impl InterpreterError {
    /// Name of the pipeline stage this error belongs to.
    ///
    /// Used in envelopes and log events so diagnostics always identify
    /// where a request died without exposing internals.
    pub fn stage(&self) -> &'static str {
        match self {
            InterpreterError::MalformedCommand(_) => "parse",
            InterpreterError::InvalidLiteral { .. } => "normalize",
            InterpreterError::OperationNotSupported(_) => "resolve",
            InterpreterError::AccessDenied(_) => "access",
            InterpreterError::ArityMismatch { .. } => "arity",
            InterpreterError::StoreFailure(_) => "dispatch",
        }
    }

    /// Short machine-readable kind tag carried in the envelope text
    pub fn kind(&self) -> &'static str {
        match self {
            InterpreterError::MalformedCommand(_) => "MalformedCommand",
            InterpreterError::InvalidLiteral { .. } => "InvalidLiteral",
            InterpreterError::OperationNotSupported(_) => "OperationNotSupported",
            InterpreterError::AccessDenied(_) => "AccessDenied",
            InterpreterError::ArityMismatch { .. } => "ArityMismatch",
            InterpreterError::StoreFailure(_) => "StoreFailure",
        }
    }
}

impl From<StoreError> for InterpreterError {
    fn from(err: StoreError) -> Self {
        // Only the message string crosses the boundary; store internals stay put
        InterpreterError::StoreFailure(err.to_string())
    }
}
