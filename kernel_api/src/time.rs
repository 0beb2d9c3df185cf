//! Time abstractions

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Maximum wall-clock time a task may run during one dispatch
///
/// `Infinite` disables time-based preemption entirely: only completion or a
/// blocking syscall ends the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "QuotaRepr", into = "QuotaRepr")]
pub enum Quota {
    /// Quota in milliseconds
    Millis(u64),
    /// No quota
    Infinite,
}

impl Quota {
    /// Creates a quota from milliseconds
    pub const fn from_millis(millis: u64) -> Self {
        Quota::Millis(millis)
    }

    /// Returns true while a run of `elapsed` is still inside the quota
    pub fn allows(&self, elapsed: Duration) -> bool {
        match self {
            Quota::Millis(millis) => elapsed < Duration::from_millis(*millis),
            Quota::Infinite => true,
        }
    }

    /// Returns true if this quota never expires
    pub fn is_infinite(&self) -> bool {
        matches!(self, Quota::Infinite)
    }
}

impl Default for Quota {
    fn default() -> Self {
        Quota::Millis(100)
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quota::Millis(millis) => write!(f, "{}", millis),
            Quota::Infinite => write!(f, "infinity"),
        }
    }
}

/// Error returned when a quota string is neither a number nor `infinity`
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Invalid quota: {0} (expected milliseconds or \"infinity\")")]
pub struct QuotaParseError(pub String);

impl FromStr for Quota {
    type Err = QuotaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("infinity") || s.eq_ignore_ascii_case("inf") {
            return Ok(Quota::Infinite);
        }
        s.parse::<u64>()
            .map(Quota::Millis)
            .map_err(|_| QuotaParseError(s.to_string()))
    }
}

/// Wire form of a quota: a JSON number of milliseconds or a word
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum QuotaRepr {
    Millis(u64),
    Text(String),
}

impl TryFrom<QuotaRepr> for Quota {
    type Error = QuotaParseError;

    fn try_from(repr: QuotaRepr) -> Result<Self, Self::Error> {
        match repr {
            QuotaRepr::Millis(millis) => Ok(Quota::Millis(millis)),
            QuotaRepr::Text(text) => text.parse(),
        }
    }
}

impl From<Quota> for QuotaRepr {
    fn from(quota: Quota) -> Self {
        match quota {
            Quota::Millis(millis) => QuotaRepr::Millis(millis),
            Quota::Infinite => QuotaRepr::Text("infinity".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_quota_expires() {
        let quota = Quota::from_millis(50);
        assert!(quota.allows(Duration::from_millis(49)));
        assert!(!quota.allows(Duration::from_millis(50)));
        assert!(!quota.allows(Duration::from_secs(1)));
    }

    #[test]
    fn test_infinite_quota_never_expires() {
        let quota = Quota::Infinite;
        assert!(quota.is_infinite());
        assert!(quota.allows(Duration::from_secs(u32::MAX as u64)));
    }

    #[test]
    fn test_zero_quota_allows_nothing() {
        assert!(!Quota::from_millis(0).allows(Duration::ZERO));
    }

    #[test]
    fn test_parse() {
        assert_eq!("250".parse::<Quota>().unwrap(), Quota::Millis(250));
        assert_eq!("infinity".parse::<Quota>().unwrap(), Quota::Infinite);
        assert_eq!(" INF ".parse::<Quota>().unwrap(), Quota::Infinite);
        assert!("soon".parse::<Quota>().is_err());
        assert!("-5".parse::<Quota>().is_err());
    }

    #[test]
    fn test_serde_accepts_number_or_word() {
        let q: Quota = serde_json::from_str("75").unwrap();
        assert_eq!(q, Quota::Millis(75));
        let q: Quota = serde_json::from_str("\"infinity\"").unwrap();
        assert_eq!(q, Quota::Infinite);
        assert!(serde_json::from_str::<Quota>("\"later\"").is_err());

        assert_eq!(serde_json::to_string(&Quota::Infinite).unwrap(), "\"infinity\"");
        assert_eq!(serde_json::to_string(&Quota::Millis(5)).unwrap(), "5");
    }

    #[test]
    fn test_display() {
        assert_eq!(Quota::Millis(100).to_string(), "100");
        assert_eq!(Quota::Infinite.to_string(), "infinity");
    }
}
