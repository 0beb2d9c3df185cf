//! # CLI Console
//!
//! A line-oriented command console for a running Quanta [`Manager`].
//!
//! It is NOT a shell: there are no pipes, variables or scripts. Each line is
//! one command that loads, inspects or steps processes, or changes a
//! setting of the manager.
//!
//! [`Manager`]: sim_kernel::Manager

pub mod commands;
pub mod session;

pub use commands::{CommandParser, ConsoleCommand, ConsoleError, HELP_TEXT};
pub use session::{Console, Flow, PROMPT};
