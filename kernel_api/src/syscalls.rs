//! Syscall boundary between running tasks and the kernel.
//!
//! A task never touches the scheduling queues itself. Blocking requests go
//! through a [`SysCallSink`] (implemented by the kernel), and completed
//! output leaves the kernel through an [`OutputSink`].

use core_types::Pid;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of blocking request a task made
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SysCallKind {
    /// Write to the output device
    Output,
}

impl SysCallKind {
    /// Returns the symbolic name of the syscall
    pub fn as_str(&self) -> &'static str {
        match self {
            SysCallKind::Output => "output",
        }
    }
}

/// Record of a task's last blocking request
///
/// Transient: each new request overwrites the previous one and no history
/// is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SysCall {
    pub kind: SysCallKind,
    pub payload: String,
}

impl SysCall {
    /// Creates an output request carrying `payload`
    pub fn output(payload: impl Into<String>) -> Self {
        Self {
            kind: SysCallKind::Output,
            payload: payload.into(),
        }
    }
}

impl fmt::Display for SysCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind.as_str(), self.payload)
    }
}

/// Receiver of syscalls issued by a running task
pub trait SysCallSink: Send + Sync {
    /// Blocking output request: the caller leaves the CPU until the output
    /// device has written `payload`.
    fn out(&self, payload: String);
}

/// External device that receives completed output
pub trait OutputSink: Send + Sync {
    fn emit(&self, pid: Pid, payload: &str);
}
