//! # Simulated Kernel
//!
//! This crate implements the Quanta process-scheduling kernel.
//!
//! ## Purpose
//!
//! Simulated processes move between waiting, ready and running queues under
//! a pluggable scheduler policy, with time-sliced preemption and an output
//! device that completes blocking I/O after a delay:
//! - Runs under `cargo test`
//! - Real concurrency (a dispatcher loop and a device loop on their own threads)
//! - Inspectable (queue snapshots, per-process stats, an event audit)
//!
//! ## Philosophy
//!
//! **Preemption is cooperative but not optional.**
//!
//! Task bodies are interpreted by the kernel itself. Every statement is
//! followed by a suspension point, so a dispatcher can hand a task the CPU
//! for one quota window and always get it back within one statement.
//!
//! ## Example
//!
//! ```
//! use sim_kernel::test_utils::{manual_config, CollectingSink};
//! use sim_kernel::{ExecuteOutcome, Manager, PcbAttributes};
//! use std::sync::Arc;
//!
//! let sink = Arc::new(CollectingSink::new());
//! let manager = Manager::new(manual_config(), sink.clone()).unwrap();
//! let pid = manager.load_task(&PcbAttributes::new("out 6 * 7")).unwrap();
//!
//! assert_eq!(manager.execute(), ExecuteOutcome::Blocked(pid));
//! assert_eq!(manager.complete_io(), Some(pid));
//! assert_eq!(sink.payloads(), vec!["42"]);
//! ```

pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod instrumentation;
pub mod list;
pub mod manager;
pub mod pcb;
pub mod scheduler;
pub mod script;
pub mod snapshot;
mod sync;
pub mod task;
pub mod test_utils;

pub use config::KernelConfig;
pub use device::StdoutSink;
pub use error::{ScriptError, TaskFault};
pub use events::{KernelEvent, KernelEventKind};
pub use list::List;
pub use manager::{ExecuteOutcome, Manager};
pub use pcb::{Pcb, PcbAttributes, PcbStats, DEFAULT_PRIORITY};
pub use scheduler::{
    PriorityFirst, RoundRobin, SchedulerPolicy, SchedulerRegistry, ShortestJobFirst,
};
pub use snapshot::{PcbSummary, QueueSnapshot, QUEUE_HEADER};
pub use task::Task;
