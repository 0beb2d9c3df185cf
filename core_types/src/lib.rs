//! # Core Types
//!
//! This crate defines the fundamental types shared by every Quanta crate.
//!
//! ## Key Types
//!
//! - [`Pid`]: Unique, sequential identifier for a simulated process
//! - [`Timestamp`]: Wall-clock time used in diagnostics

pub mod ids;
pub mod timestamp;

pub use ids::Pid;
pub use timestamp::Timestamp;
