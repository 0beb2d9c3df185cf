//! Unique identifiers for system entities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of process identifiers.
///
/// Initialized once when the process starts and never reset. Every
/// [`Pid::next`] call takes a distinct value, so concurrent constructions
/// cannot collide.
static NEXT_PID: AtomicU64 = AtomicU64::new(0);

/// Unique identifier for a process
///
/// Pids are handed out sequentially from a single process-wide counter.
/// A pid is never reused for the lifetime of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pid(u64);

impl Pid {
    /// Allocates the next pid from the process-wide counter
    pub fn next() -> Self {
        Self(NEXT_PID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a raw pid value
    ///
    /// Used for lookups by number (e.g. a pid typed at the console); it does
    /// not allocate from the counter.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw pid value
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Pid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Pid {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_pid_creation() {
        let id1 = Pid::next();
        let id2 = Pid::next();
        assert_ne!(id1, id2);
        assert!(id2 > id1);
    }

    #[test]
    fn test_pid_from_raw() {
        let pid = Pid::from_raw(42);
        assert_eq!(pid.as_u64(), 42);
        assert_eq!(format!("{}", pid), "42");
    }

    #[test]
    fn test_pid_parse() {
        assert_eq!(" 7 ".parse::<Pid>().unwrap(), Pid::from_raw(7));
        assert!("seven".parse::<Pid>().is_err());
    }

    #[test]
    fn test_concurrent_pids_are_unique_and_ordered_per_thread() {
        const THREADS: usize = 8;
        const PER_THREAD: usize = 250;

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                thread::spawn(|| {
                    let pids: Vec<Pid> = (0..PER_THREAD).map(|_| Pid::next()).collect();
                    assert!(pids.windows(2).all(|w| w[0] < w[1]));
                    pids
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for pid in handle.join().unwrap() {
                assert!(all.insert(pid), "duplicate pid {}", pid);
            }
        }
        assert_eq!(all.len(), THREADS * PER_THREAD);
    }

    #[test]
    fn test_pid_serde_is_transparent_number() {
        let json = serde_json::to_string(&Pid::from_raw(3)).unwrap();
        assert_eq!(json, "3");
    }
}
