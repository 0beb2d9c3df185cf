//! Kernel configuration

use kernel_api::{KernelError, Quota};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Manager configuration
///
/// Every field has a default, so a JSON file only needs the fields it
/// changes:
///
/// ```
/// use sim_kernel::KernelConfig;
///
/// let config = KernelConfig::from_json_str(r#"{"quantum": "infinity"}"#).unwrap();
/// assert!(config.quantum.is_infinite());
/// assert_eq!(config.scheduler, "round_robin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KernelConfig {
    /// Registry name of the scheduler policy
    pub scheduler: String,
    /// Time a task may run per dispatch
    pub quantum: Quota,
    /// Latency of the output device, in milliseconds
    pub output_delay_ms: u64,
    /// Dispatch automatically whenever nothing is running
    pub auto_scheduling: bool,
    /// Tick of the auto-dispatch loop, in milliseconds
    pub dispatch_tick_ms: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            scheduler: "round_robin".to_string(),
            quantum: Quota::default(),
            output_delay_ms: 1000,
            auto_scheduling: true,
            dispatch_tick_ms: 100,
        }
    }
}

impl KernelConfig {
    /// Parses a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, KernelError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| KernelError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, KernelError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .map_err(|e| KernelError::InvalidConfig(format!("{}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    /// Rejects values the background loops cannot run with
    pub fn validate(&self) -> Result<(), KernelError> {
        if self.dispatch_tick_ms == 0 {
            return Err(KernelError::InvalidConfig(
                "dispatch_tick_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_scheduler(mut self, scheduler: impl Into<String>) -> Self {
        self.scheduler = scheduler.into();
        self
    }

    pub fn with_quantum(mut self, quantum: Quota) -> Self {
        self.quantum = quantum;
        self
    }

    pub fn with_output_delay_ms(mut self, output_delay_ms: u64) -> Self {
        self.output_delay_ms = output_delay_ms;
        self
    }

    pub fn with_auto_scheduling(mut self, auto_scheduling: bool) -> Self {
        self.auto_scheduling = auto_scheduling;
        self
    }

    pub fn with_dispatch_tick_ms(mut self, dispatch_tick_ms: u64) -> Self {
        self.dispatch_tick_ms = dispatch_tick_ms;
        self
    }

    pub fn dispatch_tick(&self) -> Duration {
        Duration::from_millis(self.dispatch_tick_ms.max(1))
    }
}
