//! Simulation reports
//!
//! ```text
//! Algorithm: first_fit
//! Assigned processes: 1, 0, 300; 3, 500, 200
//! Blocked processes: 2
//! Memory utilization: 500 / 1000 = 50.00%
//! Blocking probability: 2 / 1 = 33.33%
//! ```

use crate::error::MemoryError;
use crate::simulator::Simulation;
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub algorithm: String,
    /// `(pid, address, size)` per placed process
    pub assigned: Vec<(u64, u64, u64)>,
    pub blocked: Vec<u64>,
    pub used: u64,
    pub total: u64,
}

fn percentage(part: u64, whole: u64) -> String {
    if whole == 0 {
        return "0.00%".to_string();
    }
    format!("{:.2}%", part as f64 / whole as f64 * 100.0)
}

impl Report {
    pub fn from_simulation(run: &Simulation) -> Self {
        Self {
            algorithm: run.strategy.to_string(),
            assigned: run
                .assigned
                .iter()
                .map(|a| (a.task.pid, a.space.address, a.space.size))
                .collect(),
            blocked: run.blocked.iter().map(|task| task.pid).collect(),
            used: run.used_memory(),
            total: run.mem_size,
        }
    }

    /// Share of all processes that were blocked
    pub fn blocking_probability(&self) -> f64 {
        let all = self.assigned.len() + self.blocked.len();
        if all == 0 {
            0.0
        } else {
            self.blocked.len() as f64 / all as f64
        }
    }

    pub fn write_to(&self, path: impl AsRef<Path>) -> Result<(), MemoryError> {
        let path = path.as_ref();
        fs::write(path, self.to_string()).map_err(|e| MemoryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assigned: Vec<String> = self
            .assigned
            .iter()
            .map(|(pid, address, size)| format!("{}, {}, {}", pid, address, size))
            .collect();
        let blocked: Vec<String> = self.blocked.iter().map(u64::to_string).collect();
        let assigned_count = self.assigned.len() as u64;
        let blocked_count = self.blocked.len() as u64;

        writeln!(f, "Algorithm: {}", self.algorithm)?;
        writeln!(f, "Assigned processes: {}", assigned.join("; "))?;
        writeln!(f, "Blocked processes: {}", blocked.join(", "))?;
        writeln!(
            f,
            "Memory utilization: {} / {} = {}",
            self.used,
            self.total,
            percentage(self.used, self.total)
        )?;
        writeln!(
            f,
            "Blocking probability: {} / {} = {}",
            assigned_count,
            blocked_count,
            percentage(blocked_count, assigned_count + blocked_count)
        )
    }
}
