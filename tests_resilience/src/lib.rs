//! Resilience Test Utilities
//!
//! This crate provides shared utilities for resilience and integration tests.
//!
//! ## Test Philosophy
//!
//! - **Isolation under faults**: a task that fails takes nothing else down
//! - **Exact queue discipline**: every process sits in exactly one queue
//! - **Real concurrency**: background loops and foreground callers race for
//!   the same queues, and the tests let them
//! - **Bounded waits**: timing assertions poll with a deadline instead of
//!   sleeping a fixed amount

use core_types::Pid;
use kernel_api::Quota;
use sim_kernel::test_utils::{manual_config, CollectingSink};
use sim_kernel::{KernelConfig, Manager, PcbAttributes};
use std::sync::Arc;
use std::time::Duration;

/// Generous deadline for anything driven by a background loop
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts a manager that only moves when the test asks it to
pub fn test_manager(quantum: Quota) -> (Manager, Arc<CollectingSink>) {
    test_manager_with(manual_config().with_quantum(quantum))
}

/// Starts a manager with `config`, collecting its output
pub fn test_manager_with(config: KernelConfig) -> (Manager, Arc<CollectingSink>) {
    let sink = Arc::new(CollectingSink::new());
    let manager = Manager::new(config, sink.clone()).expect("failed to start manager");
    (manager, sink)
}

/// Admits a task with the given body and priority
pub fn spawn(manager: &Manager, source: &str, priority: i64) -> Pid {
    manager
        .load_task(&PcbAttributes::new(source).with_priority(priority))
        .expect("task body should parse")
}

/// A body that runs for `steps` statements of `millis` each
pub fn busy_body(steps: usize, millis: u64) -> String {
    (0..steps).map(|_| format!("work {}\n", millis)).collect()
}
