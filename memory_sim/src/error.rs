//! Memory simulator errors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Trace line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0} is not a valid strategy")]
    UnknownStrategy(String),
}
