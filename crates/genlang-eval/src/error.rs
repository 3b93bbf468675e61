//! Runtime error types for the GenLang evaluator.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The budget dimension that ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Evaluation steps.
    Instructions,
    /// Wall-clock time, in milliseconds.
    Time,
    /// Nested function calls.
    CallDepth,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Instructions => "instruction",
            Resource::Time => "time",
            Resource::CallDepth => "call depth",
        })
    }
}

/// Evaluation error. Aborts the current top-level call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    /// Unknown variable, function or parameter binding.
    #[error("name not found: {0}")]
    NameNotFound(String),
    /// Operand or argument of the wrong kind, or a wrong argument count.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// The execution budget ran out. Time is measured in milliseconds.
    #[error("{resource} limit of {limit} exceeded ({used} used)")]
    ResourceExceeded {
        resource: Resource,
        limit: u64,
        used: u64,
    },
    #[error("index {index} out of bounds for list of length {len}")]
    IndexOutOfBounds { index: f64, len: usize },
    #[error("key not found: {0}")]
    KeyNotFound(String),
    /// A host builtin reported a failure.
    #[error("builtin '{name}' failed: {message}")]
    Builtin { name: String, message: String },
}

impl EvalError {
    /// Shorthand for [`EvalError::Builtin`].
    pub fn builtin(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Builtin {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let err = EvalError::ResourceExceeded {
            resource: Resource::Instructions,
            limit: 10,
            used: 11,
        };
        assert_eq!(err.to_string(), "instruction limit of 10 exceeded (11 used)");
        assert_eq!(
            EvalError::builtin("sqrt", "negative input").to_string(),
            "builtin 'sqrt' failed: negative input"
        );
    }
}
