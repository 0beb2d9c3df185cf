//! Command-line parsing

use crate::runtime::{HostConfig, HostError, HostMode, MemoryRun};
use std::path::PathBuf;

/// Result of parsing the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedArgs {
    Run(HostConfig),
    Help,
}

fn value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str, HostError> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| HostError::Usage(format!("Missing value for {}", flag)))
}

/// Parses `args` (program name first)
pub fn parse_args(args: &[String]) -> Result<ParsedArgs, HostError> {
    let mut config = HostConfig::default();
    let mut trace: Option<PathBuf> = None;
    let mut strategy: Option<String> = None;
    let mut report: Option<PathBuf> = None;
    let mut i = 1;

    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                config.config_file = Some(PathBuf::from(value(args, &mut i, "--config")?));
            }
            "--scheduler" | "-s" => {
                config.scheduler = Some(value(args, &mut i, "--scheduler")?.to_string());
            }
            "--quantum" | "-q" => {
                let raw = value(args, &mut i, "--quantum")?;
                config.quantum = Some(
                    raw.parse()
                        .map_err(|_| HostError::Usage(format!("Invalid quantum: {}", raw)))?,
                );
            }
            "--output-delay" => {
                let raw = value(args, &mut i, "--output-delay")?;
                config.output_delay_ms = Some(
                    raw.parse()
                        .map_err(|_| HostError::Usage(format!("Invalid output delay: {}", raw)))?,
                );
            }
            "--manual" => {
                config.manual = true;
            }
            "--log-level" => {
                let raw = value(args, &mut i, "--log-level")?;
                config.log_level = raw.parse().map_err(|e| HostError::Usage(format!("{}", e)))?;
            }
            "--memory" | "-m" => {
                trace = Some(PathBuf::from(value(args, &mut i, "--memory")?));
            }
            "--strategy" => {
                strategy = Some(value(args, &mut i, "--strategy")?.to_string());
            }
            "--report" => {
                report = Some(PathBuf::from(value(args, &mut i, "--report")?));
            }
            "--help" | "-h" => return Ok(ParsedArgs::Help),
            other => {
                return Err(HostError::Usage(format!("Unknown option: {}", other)));
            }
        }
        i += 1;
    }

    match (trace, strategy) {
        (Some(trace), strategy) => {
            config.mode = HostMode::Memory(MemoryRun {
                trace,
                strategy: strategy.unwrap_or_else(|| "first_fit".to_string()),
                report,
            });
        }
        (None, Some(_)) => {
            return Err(HostError::Usage("--strategy requires --memory".to_string()));
        }
        (None, None) if report.is_some() => {
            return Err(HostError::Usage("--report requires --memory".to_string()));
        }
        (None, None) => {}
    }

    Ok(ParsedArgs::Run(config))
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {program} [OPTIONS]

Options:
  -c, --config <FILE>        Kernel configuration (JSON)
  -s, --scheduler <NAME>     Scheduler: round_robin (default), shortest_job_first, priority
  -q, --quantum <MS>         Time per dispatch in milliseconds, or infinity
  --output-delay <MS>        Output device latency in milliseconds
  --manual                   Disable automatic scheduling
  --log-level <LEVEL>        trace, debug, info, warn (default) or error
  -m, --memory <TRACE>       Run a memory-allocation simulation instead
  --strategy <NAME>          Memory strategy: first_fit (default), best_fit, worst_fit
  --report <FILE>            Write the memory report to a file
  -h, --help                 Show this help message

Examples:
  {program} --scheduler sjf --quantum 50
  {program} --memory trace.txt --strategy best_fit --report report.txt
"
    )
}
