//! # Host Runtime
//!
//! Builds the kernel configuration and runs the selected mode.

use cli_console::{Console, ConsoleError};
use kernel_api::{KernelError, OutputSink, Quota};
use memory_sim::{MemoryError, Report, Simulator, StrategyRegistry, Trace};
use services_logger::LogLevel;
use sim_kernel::{KernelConfig, Manager, StdoutSink};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Host runtime error types
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Console(#[from] ConsoleError),

    #[error("Output failed: {0}")]
    Io(#[from] io::Error),
}

/// One memory simulation run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryRun {
    pub trace: PathBuf,
    pub strategy: String,
    /// Report file; the report is printed when absent
    pub report: Option<PathBuf>,
}

/// Host mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostMode {
    /// Command console over a live manager
    Console,
    /// One-shot memory-allocation simulation
    Memory(MemoryRun),
}

/// Host configuration
///
/// Flags override values from the configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostConfig {
    pub mode: HostMode,
    pub config_file: Option<PathBuf>,
    pub scheduler: Option<String>,
    pub quantum: Option<Quota>,
    pub output_delay_ms: Option<u64>,
    /// Turns automatic scheduling off
    pub manual: bool,
    pub log_level: LogLevel,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            mode: HostMode::Console,
            config_file: None,
            scheduler: None,
            quantum: None,
            output_delay_ms: None,
            manual: false,
            log_level: LogLevel::Warn,
        }
    }
}

impl HostConfig {
    /// Resolves the kernel configuration: defaults, then the file, then flags
    pub fn kernel_config(&self) -> Result<KernelConfig, HostError> {
        let mut config = match &self.config_file {
            Some(path) => KernelConfig::from_file(path)?,
            None => KernelConfig::default(),
        };
        if let Some(scheduler) = &self.scheduler {
            config.scheduler = scheduler.clone();
        }
        if let Some(quantum) = self.quantum {
            config.quantum = quantum;
        }
        if let Some(delay) = self.output_delay_ms {
            config.output_delay_ms = delay;
        }
        if self.manual {
            config.auto_scheduling = false;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Host runtime
pub struct HostRuntime {
    config: HostConfig,
}

impl HostRuntime {
    pub fn new(config: HostConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Runs the configured mode on the process's stdin and stdout
    pub fn run(&self) -> Result<(), HostError> {
        let stdout = io::stdout();
        match &self.config.mode {
            HostMode::Console => {
                let stdin = io::stdin();
                self.run_console(Arc::new(StdoutSink), stdin.lock(), stdout)
            }
            HostMode::Memory(run) => Self::run_memory(run, stdout.lock()).map(|_| ()),
        }
    }

    /// Runs the console until `quit` or end of input, then shuts the
    /// manager down
    pub fn run_console<R, W>(
        &self,
        sink: Arc<dyn OutputSink>,
        input: R,
        output: W,
    ) -> Result<(), HostError>
    where
        R: BufRead,
        W: Write,
    {
        let config = self.config.kernel_config()?;
        log::info!(
            "starting manager: scheduler={} quantum={} output_delay_ms={} auto_scheduling={}",
            config.scheduler,
            config.quantum,
            config.output_delay_ms,
            config.auto_scheduling
        );
        let manager = Manager::new(config, sink)?;
        let result = Console::new(&manager, input, output).run();
        manager.shutdown();
        result.map_err(HostError::from)
    }

    /// Replays a memory trace and prints or writes its report
    pub fn run_memory<W: Write>(run: &MemoryRun, mut output: W) -> Result<Report, HostError> {
        let trace = Trace::from_file(&run.trace)?;
        let strategy = StrategyRegistry::new().create(&run.strategy)?;
        let report = Simulator::new(strategy).run(&trace).report();

        match &run.report {
            Some(path) => {
                report.write_to(path)?;
                writeln!(output, "Report written to {}", path.display())?;
            }
            None => write!(output, "{}", report)?,
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_kernel::test_utils::CollectingSink;
    use std::fs;
    use std::io::Cursor;

    #[test]
    fn test_flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quanta.json");
        fs::write(&path, r#"{"scheduler": "priority", "quantum": 40, "output_delay_ms": 300}"#)
            .unwrap();

        let config = HostConfig {
            config_file: Some(path),
            quantum: Some(Quota::Infinite),
            manual: true,
            ..HostConfig::default()
        };
        let kernel = config.kernel_config().unwrap();
        assert_eq!(kernel.scheduler, "priority");
        assert_eq!(kernel.quantum, Quota::Infinite);
        assert_eq!(kernel.output_delay_ms, 300);
        assert!(!kernel.auto_scheduling);
    }

    #[test]
    fn test_unknown_scheduler_fails_startup() {
        let runtime = HostRuntime::new(HostConfig {
            scheduler: Some("Lottery".to_string()),
            ..HostConfig::default()
        });
        let result = runtime.run_console(
            Arc::new(CollectingSink::new()),
            Cursor::new("quit\n"),
            Vec::new(),
        );
        assert!(matches!(
            result,
            Err(HostError::Kernel(KernelError::UnknownScheduler(_)))
        ));
    }

    #[test]
    fn test_console_runs_to_quit() {
        let runtime = HostRuntime::new(HostConfig {
            manual: true,
            ..HostConfig::default()
        });
        let mut output = Vec::new();
        runtime
            .run_console(
                Arc::new(CollectingSink::new()),
                Cursor::new("set_scheduler sjf\nquit\n"),
                &mut output,
            )
            .unwrap();
        let text = String::from_utf8(output).unwrap();
        assert!(text.contains("Scheduler: shortest_job_first"));
    }

    #[test]
    fn test_memory_mode() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.txt");
        fs::write(&trace, "100\n1\n0,100\n2\n1,0,5,60\n2,1,5,60\n").unwrap();

        let mut output = Vec::new();
        let run = MemoryRun {
            trace: trace.clone(),
            strategy: "best_fit".to_string(),
            report: None,
        };
        let report = HostRuntime::run_memory(&run, &mut output).unwrap();
        assert_eq!(report.blocked, vec![2]);
        assert!(String::from_utf8(output).unwrap().starts_with("Algorithm: best_fit"));

        let report_path = dir.path().join("report.txt");
        let run = MemoryRun {
            report: Some(report_path.clone()),
            ..run
        };
        HostRuntime::run_memory(&run, io::sink()).unwrap();
        assert!(fs::read_to_string(report_path)
            .unwrap()
            .contains("Blocked processes: 2"));
    }

    #[test]
    fn test_memory_mode_rejects_unknown_strategy() {
        let dir = tempfile::tempdir().unwrap();
        let trace = dir.path().join("trace.txt");
        fs::write(&trace, "100\n0\n0\n").unwrap();
        let run = MemoryRun {
            trace,
            strategy: "next_fit".to_string(),
            report: None,
        };
        assert!(matches!(
            HostRuntime::run_memory(&run, io::sink()),
            Err(HostError::Memory(MemoryError::UnknownStrategy(_)))
        ));
    }
}
