//! # Kernel API
//!
//! This crate defines the interface between simulated tasks, the kernel and
//! the devices around it.
//!
//! ## Philosophy
//!
//! The kernel provides **mechanisms**, not policies:
//! - Blocking requests are explicit syscall records, not side effects
//! - Time quotas are typed (a number of milliseconds, or none at all)
//! - Output leaves through a sink the host chooses
//!
//! ## Non-Goals
//!
//! This is NOT:
//! - POSIX (no fork, exec, signals, files)
//! - Real memory protection or real system calls

pub mod error;
pub mod syscalls;
pub mod time;

pub use error::KernelError;
pub use syscalls::{OutputSink, SysCall, SysCallKind, SysCallSink};
pub use time::{Quota, QuotaParseError};
