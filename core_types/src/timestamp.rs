//! Wall-clock timestamps for reporting

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A point in wall-clock time, kept as milliseconds since the Unix epoch
///
/// Only used for display and diagnostics. Scheduling decisions measure
/// elapsed time with `std::time::Instant`, which is monotonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp {
    millis: u64,
}

impl Timestamp {
    /// Captures the current wall-clock time
    pub fn now() -> Self {
        Self::from(SystemTime::now())
    }

    /// Creates a timestamp from milliseconds since the Unix epoch
    pub const fn from_millis(millis: u64) -> Self {
        Self { millis }
    }

    /// Returns milliseconds since the Unix epoch
    pub const fn as_millis(&self) -> u64 {
        self.millis
    }
}

impl From<SystemTime> for Timestamp {
    fn from(time: SystemTime) -> Self {
        // Clocks set before 1970 collapse to the epoch.
        let millis = time
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self { millis }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:03}", self.millis / 1000, self.millis % 1000)
    }
}
