//! # Process Control Block
//!
//! Per-process metadata: identity, priority, burst statistics, the last
//! syscall, and the owned [`Task`].
//!
//! A PCB is shared between the queues as `Arc<Pcb>`. Identity and priority
//! are immutable; statistics and the syscall record sit behind their own
//! locks because they are updated while the PCB is in flight between
//! queues.

use crate::error::ScriptError;
use crate::snapshot::PcbSummary;
use crate::sync::lock;
use crate::task::Task;
use core_types::{Pid, Timestamp};
use kernel_api::{Quota, SysCall};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Mutex;
use std::time::Duration;

/// Weight of the previous estimate in the burst moving average
pub const AVERAGING_FACTOR: f64 = 0.5;

/// Priority given to a process when none is supplied
pub const DEFAULT_PRIORITY: i64 = 1;

/// Attribute set a PCB is built from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcbAttributes {
    /// Lower value means more urgent
    #[serde(default)]
    pub priority: Option<i64>,
    /// Task body source
    pub source: String,
}

impl PcbAttributes {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            priority: None,
            source: source.into(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Some(priority);
        self
    }
}

/// CPU accounting of one process
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BurstStats {
    /// Total time spent running
    pub cpu_time: Duration,
    /// Moving average of burst length, in milliseconds
    pub burst_estimate: f64,
}

impl BurstStats {
    /// Folds one completed quota window into the statistics
    pub fn add_last_burst(&mut self, burst: Duration) {
        let millis = burst.as_secs_f64() * 1000.0;
        self.cpu_time += burst;
        self.burst_estimate =
            self.burst_estimate * AVERAGING_FACTOR + millis * (1.0 - AVERAGING_FACTOR);
    }
}

/// Process control block
pub struct Pcb {
    pid: Pid,
    created_at: Timestamp,
    priority: i64,
    stats: Mutex<BurstStats>,
    sys_call: Mutex<Option<SysCall>>,
    task: Task,
}

impl Pcb {
    /// Creates a PCB around `task`, assigning the next pid
    pub fn new(priority: i64, task: Task) -> Self {
        Self {
            pid: Pid::next(),
            created_at: Timestamp::now(),
            priority,
            stats: Mutex::new(BurstStats::default()),
            sys_call: Mutex::new(None),
            task,
        }
    }

    /// Compiles the attribute set's source and builds a PCB from it
    ///
    /// No pid is consumed when the source fails to compile.
    pub fn from_attributes(attributes: &PcbAttributes) -> Result<Self, ScriptError> {
        let task = Task::from_source(&attributes.source)?;
        Ok(Self::new(
            attributes.priority.unwrap_or(DEFAULT_PRIORITY),
            task,
        ))
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn priority(&self) -> i64 {
        self.priority
    }

    pub fn task(&self) -> &Task {
        &self.task
    }

    pub fn cpu_time(&self) -> Duration {
        lock(&self.stats).cpu_time
    }

    pub fn burst_estimate(&self) -> f64 {
        lock(&self.stats).burst_estimate
    }

    pub fn burst_stats(&self) -> BurstStats {
        *lock(&self.stats)
    }

    /// Records one completed quota window
    pub fn add_last_burst(&self, burst: Duration) {
        lock(&self.stats).add_last_burst(burst);
    }

    pub fn sys_call(&self) -> Option<SysCall> {
        lock(&self.sys_call).clone()
    }

    /// Replaces the last syscall record
    pub fn set_sys_call(&self, sys_call: SysCall) {
        *lock(&self.sys_call) = Some(sys_call);
    }

    /// Returns every reportable attribute
    pub fn stats(&self) -> PcbStats {
        let stats = self.burst_stats();
        PcbStats {
            pid: self.pid,
            priority: self.priority,
            created_at: self.created_at,
            cpu_time_ms: stats.cpu_time.as_secs_f64() * 1000.0,
            burst_estimate_ms: stats.burst_estimate,
            quantum: self.task.quota(),
            can_exec: self.task.can_exec(),
            sys_call: self.sys_call(),
        }
    }

    /// Returns the one-line queue listing entry
    pub fn summary(&self) -> PcbSummary {
        PcbSummary {
            pid: self.pid,
            priority: self.priority,
            cpu_time_ms: self.cpu_time().as_millis() as u64,
            created_at: self.created_at,
        }
    }
}

impl fmt::Debug for Pcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pcb")
            .field("pid", &self.pid)
            .field("priority", &self.priority)
            .field("stats", &self.burst_stats())
            .field("task", &self.task)
            .finish()
    }
}

impl fmt::Display for Pcb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

/// Diagnostic dump of a PCB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcbStats {
    pub pid: Pid,
    pub priority: i64,
    pub created_at: Timestamp,
    pub cpu_time_ms: f64,
    pub burst_estimate_ms: f64,
    pub quantum: Quota,
    pub can_exec: bool,
    pub sys_call: Option<SysCall>,
}

impl fmt::Display for PcbStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pid {}", self.pid)?;
        writeln!(f, "priority {}", self.priority)?;
        writeln!(f, "created_at {}", self.created_at)?;
        writeln!(f, "cpu_time {:.3}", self.cpu_time_ms)?;
        writeln!(f, "burst_estimate {:.3}", self.burst_estimate_ms)?;
        writeln!(f, "quantum {}", self.quantum)?;
        writeln!(f, "can_exec {}", self.can_exec)?;
        match &self.sys_call {
            Some(call) => writeln!(f, "sys_call {}", call),
            None => writeln!(f, "sys_call none"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn pcb() -> Pcb {
        Pcb::from_attributes(&PcbAttributes::new("x = 1")).unwrap()
    }

    #[test]
    fn test_defaults() {
        let pcb = pcb();
        assert_eq!(pcb.priority(), DEFAULT_PRIORITY);
        assert_eq!(pcb.cpu_time(), Duration::ZERO);
        assert_eq!(pcb.burst_estimate(), 0.0);
        assert!(pcb.sys_call().is_none());
        assert!(pcb.task().can_exec());
    }

    #[test]
    fn test_priority_from_attributes() {
        let attrs = PcbAttributes::new("x = 1").with_priority(5);
        assert_eq!(Pcb::from_attributes(&attrs).unwrap().priority(), 5);
    }

    #[test]
    fn test_sequential_pids() {
        let a = pcb();
        let b = pcb();
        assert!(b.pid() > a.pid());
    }

    #[test]
    fn test_bad_source_is_rejected() {
        let err = Pcb::from_attributes(&PcbAttributes::new("x = 1\nwhile x")).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn test_concurrent_construction_unique_pids() {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                thread::spawn(|| {
                    let pids: Vec<Pid> = (0..50).map(|_| pcb().pid()).collect();
                    assert!(pids.windows(2).all(|w| w[0] < w[1]));
                    pids
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for pid in handle.join().unwrap() {
                assert!(all.insert(pid));
            }
        }
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn test_burst_recurrence_matches_closed_form() {
        let bursts = [10.0, 20.0, 40.0, 5.0, 80.0];
        let pcb = pcb();
        for (n, burst) in bursts.iter().enumerate() {
            pcb.add_last_burst(Duration::from_millis(*burst as u64));

            // estimate_n = sum_k b_k * 0.5^(n - k + 1)
            let expected: f64 = bursts[..=n]
                .iter()
                .enumerate()
                .map(|(k, b)| b * 0.5f64.powi((n - k + 1) as i32))
                .sum();
            assert!((pcb.burst_estimate() - expected).abs() < 1e-6);
        }
        assert_eq!(pcb.cpu_time(), Duration::from_millis(155));
    }

    #[test]
    fn test_sys_call_overwritten() {
        let pcb = pcb();
        pcb.set_sys_call(SysCall::output("1"));
        pcb.set_sys_call(SysCall::output("2"));
        assert_eq!(pcb.sys_call(), Some(SysCall::output("2")));
    }

    #[test]
    fn test_stats_display_lists_every_field() {
        let pcb = pcb();
        pcb.set_sys_call(SysCall::output("42"));
        let text = pcb.stats().to_string();
        for field in [
            "pid ",
            "priority 1",
            "created_at ",
            "cpu_time 0.000",
            "burst_estimate 0.000",
            "quantum 100",
            "can_exec true",
            "sys_call output(42)",
        ] {
            assert!(text.contains(field), "missing {field} in {text}");
        }
        assert_eq!(text.lines().count(), 8);
    }

    #[test]
    fn test_stats_serialize() {
        let pcb = Arc::new(pcb());
        let json = serde_json::to_value(pcb.stats()).unwrap();
        assert_eq!(json["priority"], 1);
        assert_eq!(json["quantum"], 100);
        assert_eq!(json["sys_call"], serde_json::Value::Null);
    }

    #[test]
    fn test_summary_display() {
        let pcb = pcb();
        let text = pcb.to_string();
        assert!(text.starts_with(&format!("({} | 1 | 0 | ", pcb.pid())));
        assert!(text.ends_with(')'));
    }
}
