//! Queue snapshots for display

use core_types::{Pid, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Header printed above a queue listing
pub const QUEUE_HEADER: &str = "(pid | priority | cpu | created_at)";

/// One queue entry as shown to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcbSummary {
    pub pid: Pid,
    pub priority: i64,
    pub cpu_time_ms: u64,
    pub created_at: Timestamp,
}

impl fmt::Display for PcbSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({} | {} | {} | {})",
            self.pid, self.priority, self.cpu_time_ms, self.created_at
        )
    }
}

/// Contents of the three scheduling queues, head first
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    pub waiting: Vec<PcbSummary>,
    pub ready: Vec<PcbSummary>,
    pub running: Vec<PcbSummary>,
}

impl QueueSnapshot {
    pub fn waiting_pids(&self) -> Vec<Pid> {
        self.waiting.iter().map(|pcb| pcb.pid).collect()
    }

    pub fn ready_pids(&self) -> Vec<Pid> {
        self.ready.iter().map(|pcb| pcb.pid).collect()
    }

    pub fn running_pids(&self) -> Vec<Pid> {
        self.running.iter().map(|pcb| pcb.pid).collect()
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.waiting
            .iter()
            .chain(&self.ready)
            .chain(&self.running)
            .any(|pcb| pcb.pid == pid)
    }
}

fn write_queue(f: &mut fmt::Formatter<'_>, name: &str, queue: &[PcbSummary]) -> fmt::Result {
    write!(f, "{}: ", name)?;
    for pcb in queue {
        write!(f, "{}", pcb)?;
    }
    writeln!(f)
}

impl fmt::Display for QueueSnapshot {
    /// Renders `\nWaiting: ...\nReady: ...\nRunning: ...\n`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f)?;
        write_queue(f, "Waiting", &self.waiting)?;
        write_queue(f, "Ready", &self.ready)?;
        write_queue(f, "Running", &self.running)
    }
}
