//! Test utilities for kernel and resilience testing
//!
//! Sinks that record what reaches them, a configuration that keeps the
//! background loops out of the way, and a polling helper for assertions on
//! concurrent state.

use crate::config::KernelConfig;
use crate::sync::lock;
use core_types::Pid;
use kernel_api::{OutputSink, Quota, SysCallSink};
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Output device that records every emitted payload
#[derive(Debug, Default)]
pub struct CollectingSink {
    emitted: Mutex<Vec<(Pid, String)>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every emission in order
    pub fn emitted(&self) -> Vec<(Pid, String)> {
        lock(&self.emitted).clone()
    }

    pub fn payloads(&self) -> Vec<String> {
        lock(&self.emitted)
            .iter()
            .map(|(_, payload)| payload.clone())
            .collect()
    }

    pub fn payloads_for(&self, pid: Pid) -> Vec<String> {
        lock(&self.emitted)
            .iter()
            .filter(|(source, _)| *source == pid)
            .map(|(_, payload)| payload.clone())
            .collect()
    }
}

impl OutputSink for CollectingSink {
    fn emit(&self, pid: Pid, payload: &str) {
        lock(&self.emitted).push((pid, payload.to_string()));
    }
}

/// Syscall sink that records output requests without blocking anyone
///
/// Lets a lone [`Task`](crate::Task) run outside a manager.
#[derive(Debug, Default)]
pub struct RecordingSysCalls {
    payloads: Mutex<Vec<String>>,
}

impl RecordingSysCalls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn payloads(&self) -> Vec<String> {
        lock(&self.payloads).clone()
    }
}

impl SysCallSink for RecordingSysCalls {
    fn out(&self, payload: String) {
        lock(&self.payloads).push(payload);
    }
}

/// Configuration for step-by-step tests
///
/// Auto-scheduling is off and the output device ticks once a minute, so
/// only explicit `execute` and `complete_io` calls move processes.
pub fn manual_config() -> KernelConfig {
    KernelConfig::default()
        .with_auto_scheduling(false)
        .with_output_delay_ms(60_000)
        .with_dispatch_tick_ms(10)
        .with_quantum(Quota::default())
}

/// Polls `condition` every few milliseconds until it holds or `timeout`
/// passes; returns the last result
pub fn wait_until<F>(timeout: Duration, mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingSink::new();
        sink.emit(Pid::from_raw(1), "a");
        sink.emit(Pid::from_raw(2), "b");
        sink.emit(Pid::from_raw(1), "c");
        assert_eq!(sink.payloads(), vec!["a", "b", "c"]);
        assert_eq!(sink.payloads_for(Pid::from_raw(1)), vec!["a", "c"]);
        assert_eq!(sink.emitted().len(), 3);
    }

    #[test]
    fn test_recording_sys_calls() {
        let sys = RecordingSysCalls::new();
        sys.out("x".to_string());
        assert_eq!(sys.payloads(), vec!["x"]);
    }

    #[test]
    fn test_manual_config() {
        let config = manual_config();
        assert!(!config.auto_scheduling);
        assert_eq!(config.output_delay_ms, 60_000);
    }

    #[test]
    fn test_wait_until() {
        let calls = AtomicUsize::new(0);
        assert!(wait_until(Duration::from_secs(1), || {
            calls.fetch_add(1, Ordering::SeqCst) >= 2
        }));
        assert!(!wait_until(Duration::from_millis(10), || false));
    }
}
