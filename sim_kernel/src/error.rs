//! Task script and task runtime errors

use kernel_api::KernelError;
use thiserror::Error;

/// A task body that failed to parse
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    /// 1-based source line
    pub line: usize,
    pub message: String,
}

impl ScriptError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl From<ScriptError> for KernelError {
    fn from(err: ScriptError) -> Self {
        KernelError::Script(err.to_string())
    }
}

/// Unrecoverable fault raised while resuming a task
///
/// A fault terminates only the task that raised it.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TaskFault {
    #[error("line {line}: undefined variable `{name}`")]
    UndefinedVariable { line: usize, name: String },

    #[error("line {line}: cannot apply `{op}` to {operands}")]
    TypeMismatch {
        line: usize,
        op: &'static str,
        operands: String,
    },

    #[error("line {line}: division by zero")]
    DivisionByZero { line: usize },

    #[error("line {line}: invalid work duration {value}")]
    InvalidWork { line: usize, value: String },

    /// The body executed `fail`
    #[error("line {line}: {message}")]
    Failed { line: usize, message: String },

    /// The body issued a syscall but no kernel is attached
    #[error("line {line}: no syscall sink bound")]
    Unbound { line: usize },
}
