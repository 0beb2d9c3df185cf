//! # Memory Allocation Simulator
//!
//! Replays a trace of processes requesting contiguous memory and records
//! which of them a placement strategy could fit.
//!
//! ## Philosophy
//!
//! - **Traces are data**: a trace file is parsed once into plain values, and
//!   a run never mutates the trace it was given.
//! - **Strategies only choose**: a strategy picks a free space by index; the
//!   simulator does the carving.
//!
//! ## Example
//!
//! ```
//! use memory_sim::{Simulator, StrategyRegistry, Trace};
//!
//! let trace = Trace::parse("100\n1\n0,100\n2\n1,0,5,60\n2,1,5,60\n").unwrap();
//! let strategy = StrategyRegistry::new().create("first_fit").unwrap();
//! let report = Simulator::new(strategy).run(&trace).report();
//!
//! assert_eq!(report.blocked, vec![2]);
//! ```

pub mod error;
pub mod report;
pub mod simulator;
pub mod strategy;
pub mod trace;

pub use error::MemoryError;
pub use report::Report;
pub use simulator::{Allocation, Simulation, Simulator};
pub use strategy::{BestFit, FirstFit, FitStrategy, StrategyRegistry, WorstFit};
pub use trace::{MemoryTask, Space, Trace};
