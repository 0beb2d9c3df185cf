//! Kernel Event Audit
//!
//! A bounded, chronological record of every process state transition.
//!
//! ## Philosophy
//!
//! - Queryable: tests assert on the trail instead of scraping log output
//! - Bounded: the oldest events are dropped once the ring is full
//! - Ordered: events are recorded under the queue lock, in transition order

use core_types::{Pid, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Events kept before the oldest are dropped
pub const DEFAULT_EVENT_CAPACITY: usize = 4096;

/// Process state transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum KernelEventKind {
    /// Added to ready
    Admitted,
    /// Withdrawn from ready before dispatch
    Removed,
    /// Moved ready -> running
    Dispatched,
    /// Moved running -> ready after a quota window
    Requeued,
    /// Moved running -> waiting by an output syscall
    Blocked,
    /// Moved waiting -> ready by the output device
    Unblocked,
    /// Body finished; dropped from running
    Completed,
    /// Unrecoverable fault; dropped from running
    Faulted { reason: String },
}

/// A single audit event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelEvent {
    pub pid: Pid,
    pub kind: KernelEventKind,
    pub at: Timestamp,
}

/// Ring of recent kernel events
#[derive(Debug)]
pub struct EventLog {
    events: VecDeque<KernelEvent>,
    capacity: usize,
}

impl EventLog {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Records an event for `pid` at the current time
    pub fn record(&mut self, pid: Pid, kind: KernelEventKind) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(KernelEvent {
            pid,
            kind,
            at: Timestamp::now(),
        });
    }

    /// Returns all recorded events, oldest first
    pub fn events(&self) -> Vec<KernelEvent> {
        self.events.iter().cloned().collect()
    }

    /// Returns the transitions of one process, oldest first
    pub fn kinds_for(&self, pid: Pid) -> Vec<KernelEventKind> {
        self.events
            .iter()
            .filter(|event| event.pid == pid)
            .map(|event| event.kind.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_query() {
        let mut log = EventLog::new();
        let a = Pid::from_raw(1);
        let b = Pid::from_raw(2);
        log.record(a, KernelEventKind::Admitted);
        log.record(b, KernelEventKind::Admitted);
        log.record(a, KernelEventKind::Dispatched);

        assert_eq!(log.len(), 3);
        assert_eq!(
            log.kinds_for(a),
            vec![KernelEventKind::Admitted, KernelEventKind::Dispatched]
        );
        assert_eq!(log.events()[1].pid, b);
    }

    #[test]
    fn test_ring_drops_oldest() {
        let mut log = EventLog::with_capacity(2);
        for raw in 0..5 {
            log.record(Pid::from_raw(raw), KernelEventKind::Admitted);
        }
        let pids: Vec<u64> = log.events().iter().map(|e| e.pid.as_u64()).collect();
        assert_eq!(pids, vec![3, 4]);
    }

    #[test]
    fn test_clear() {
        let mut log = EventLog::new();
        log.record(Pid::from_raw(1), KernelEventKind::Removed);
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn test_event_serializes() {
        let kind = KernelEventKind::Faulted {
            reason: "line 1: boom".to_string(),
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert_eq!(json, r#"{"Faulted":{"reason":"line 1: boom"}}"#);
    }
}
