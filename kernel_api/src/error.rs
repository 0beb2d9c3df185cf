//! Kernel error types

use core_types::Pid;
use thiserror::Error;

/// Errors that can occur when interacting with the kernel
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KernelError {
    /// No scheduler policy is registered under this name
    #[error("{0} is not a valid scheduler")]
    UnknownScheduler(String),

    /// Configuration could not be read or is inconsistent
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No queue holds a process with this pid
    #[error("Task not found: {0}")]
    TaskNotFound(Pid),

    /// A task body failed to parse
    #[error("Invalid task script: {0}")]
    Script(String),

    /// A kernel background loop could not be started
    #[error("Failed to start {0}")]
    Spawn(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_scheduler_message() {
        let err = KernelError::UnknownScheduler("Lottery".to_string());
        assert_eq!(err.to_string(), "Lottery is not a valid scheduler");
    }

    #[test]
    fn test_task_not_found_message() {
        let err = KernelError::TaskNotFound(Pid::from_raw(9));
        assert_eq!(err.to_string(), "Task not found: 9");
    }
}
