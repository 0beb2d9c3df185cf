//! # Quanta Host
//!
//! This crate provides the host process for the Quanta scheduling simulator.
//!
//! ## Responsibilities
//!
//! The host:
//! - Turns command-line flags and an optional JSON file into a kernel
//!   configuration
//! - Installs the console logger
//! - Runs either the interactive console against a live manager, or a
//!   one-shot memory-allocation simulation
//! - Shuts the manager's background loops down before exiting
//!
//! ## Non-Responsibilities
//!
//! The host does NOT interpret commands or task scripts itself; the console
//! and the kernel do.

pub mod args;
pub mod runtime;

pub use args::{parse_args, usage, ParsedArgs};
pub use runtime::{HostConfig, HostError, HostMode, HostRuntime, MemoryRun};
