//! # Console Commands
//!
//! One command per line, arguments separated by whitespace.
//!
//! ## Command Set
//!
//! - `help` - Show the command list
//! - `load_task_from_file <manifest>` - Load a task from a JSON manifest
//! - `load_task_from_std_in` - Prompt for a task
//! - `remove_task <pid>` - Remove a task from the ready queue
//! - `get_task_stats <pid>` - Show everything known about a task
//! - `set_scheduler <name>` - Swap the scheduling policy
//! - `set_running_time <ms|infinity>` - Set the per-dispatch quota
//! - `set_output_delay <ms>` - Set the output device latency
//! - `set_automatic_scheduling <true|false>` - Toggle the auto-dispatcher
//! - `step` - Dispatch once
//! - `steps <n>` - Dispatch `n` times
//! - `queues` - Print all queues
//! - `quit` / `exit` - Leave the console

use core_types::Pid;
use kernel_api::{KernelError, Quota};
use task_loader::LoaderError;
use thiserror::Error;

/// Console error types
#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Empty command")]
    EmptyCommand,

    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    #[error("Missing argument for {command}: {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },

    #[error("Invalid {argument} for {command}: {value}")]
    InvalidArgument {
        command: &'static str,
        argument: &'static str,
        value: String,
    },

    #[error(transparent)]
    Kernel(#[from] KernelError),

    #[error(transparent)]
    Loader(#[from] LoaderError),

    #[error("Console I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Console commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Help,
    LoadTaskFromFile { manifest: String },
    LoadTaskFromStdIn,
    RemoveTask { pid: Pid },
    GetTaskStats { pid: Pid },
    SetScheduler { name: String },
    SetRunningTime { quantum: Quota },
    SetOutputDelay { millis: u64 },
    SetAutomaticScheduling { enabled: bool },
    Step,
    Steps { count: u32 },
    Queues,
    Quit,
}

pub const HELP_TEXT: &str = "\
Usage: command argument1 argument2 ...
Options:
  help                                   Display this message
  load_task_from_file [manifest]         Load a task from a JSON manifest
  load_task_from_std_in                  Load a task from standard input
  remove_task [pid]                      Remove a task from the ready queue
  get_task_stats [pid]                   List all information of a task
  set_scheduler [name]                   Set the scheduling policy
  set_running_time [ms|infinity]         Set the quota of each dispatch
  set_output_delay [ms]                  Set the delay of the output device
  set_automatic_scheduling [true|false]  Schedule tasks automatically
  step                                   Run the scheduler and dispatcher once
  steps [times]                          Run the scheduler and dispatcher n times
  queues                                 Print the contents of all queues
  quit                                   Leave the console
";

/// Console command parser
pub struct CommandParser;

impl CommandParser {
    /// Parses a command line
    pub fn parse(input: &str) -> Result<ConsoleCommand, ConsoleError> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((&cmd, args)) = parts.split_first() else {
            return Err(ConsoleError::EmptyCommand);
        };

        match cmd {
            "help" => Ok(ConsoleCommand::Help),
            "load_task_from_file" => Ok(ConsoleCommand::LoadTaskFromFile {
                manifest: Self::rest("load_task_from_file", "manifest path", args)?,
            }),
            "load_task_from_std_in" => Ok(ConsoleCommand::LoadTaskFromStdIn),
            "remove_task" => Ok(ConsoleCommand::RemoveTask {
                pid: Self::value("remove_task", "pid", args)?,
            }),
            "get_task_stats" => Ok(ConsoleCommand::GetTaskStats {
                pid: Self::value("get_task_stats", "pid", args)?,
            }),
            "set_scheduler" => Ok(ConsoleCommand::SetScheduler {
                name: Self::rest("set_scheduler", "scheduler name", args)?,
            }),
            "set_running_time" => Ok(ConsoleCommand::SetRunningTime {
                quantum: Self::value("set_running_time", "time", args)?,
            }),
            "set_output_delay" => Ok(ConsoleCommand::SetOutputDelay {
                millis: Self::value("set_output_delay", "delay", args)?,
            }),
            "set_automatic_scheduling" => Ok(ConsoleCommand::SetAutomaticScheduling {
                enabled: Self::value("set_automatic_scheduling", "flag", args)?,
            }),
            "step" => Ok(ConsoleCommand::Step),
            "steps" => Ok(ConsoleCommand::Steps {
                count: Self::value("steps", "count", args)?,
            }),
            "queues" => Ok(ConsoleCommand::Queues),
            "quit" | "exit" => Ok(ConsoleCommand::Quit),
            other => Err(ConsoleError::UnknownCommand(other.to_string())),
        }
    }

    fn first<'a>(
        command: &'static str,
        argument: &'static str,
        args: &[&'a str],
    ) -> Result<&'a str, ConsoleError> {
        args.first()
            .copied()
            .ok_or(ConsoleError::MissingArgument { command, argument })
    }

    fn value<T: std::str::FromStr>(
        command: &'static str,
        argument: &'static str,
        args: &[&str],
    ) -> Result<T, ConsoleError> {
        let raw = Self::first(command, argument, args)?;
        raw.parse().map_err(|_| ConsoleError::InvalidArgument {
            command,
            argument,
            value: raw.to_string(),
        })
    }

    /// All remaining arguments, so paths may contain spaces
    fn rest(
        command: &'static str,
        argument: &'static str,
        args: &[&str],
    ) -> Result<String, ConsoleError> {
        Self::first(command, argument, args)?;
        Ok(args.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(CommandParser::parse("help").unwrap(), ConsoleCommand::Help);
        assert_eq!(CommandParser::parse("  step ").unwrap(), ConsoleCommand::Step);
        assert_eq!(CommandParser::parse("queues").unwrap(), ConsoleCommand::Queues);
        assert_eq!(CommandParser::parse("exit").unwrap(), ConsoleCommand::Quit);
        assert_eq!(
            CommandParser::parse("load_task_from_std_in").unwrap(),
            ConsoleCommand::LoadTaskFromStdIn
        );
    }

    #[test]
    fn test_parse_arguments() {
        assert_eq!(
            CommandParser::parse("remove_task 7").unwrap(),
            ConsoleCommand::RemoveTask {
                pid: Pid::from_raw(7)
            }
        );
        assert_eq!(
            CommandParser::parse("set_running_time infinity").unwrap(),
            ConsoleCommand::SetRunningTime {
                quantum: Quota::Infinite
            }
        );
        assert_eq!(
            CommandParser::parse("set_running_time 250").unwrap(),
            ConsoleCommand::SetRunningTime {
                quantum: Quota::Millis(250)
            }
        );
        assert_eq!(
            CommandParser::parse("set_automatic_scheduling false").unwrap(),
            ConsoleCommand::SetAutomaticScheduling { enabled: false }
        );
        assert_eq!(
            CommandParser::parse("steps 3").unwrap(),
            ConsoleCommand::Steps { count: 3 }
        );
        assert_eq!(
            CommandParser::parse("load_task_from_file my tasks/pi.json").unwrap(),
            ConsoleCommand::LoadTaskFromFile {
                manifest: "my tasks/pi.json".to_string()
            }
        );
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            CommandParser::parse("   "),
            Err(ConsoleError::EmptyCommand)
        ));
        assert!(matches!(
            CommandParser::parse("fork"),
            Err(ConsoleError::UnknownCommand(c)) if c == "fork"
        ));
        assert!(matches!(
            CommandParser::parse("remove_task"),
            Err(ConsoleError::MissingArgument {
                command: "remove_task",
                ..
            })
        ));
        assert!(matches!(
            CommandParser::parse("steps many"),
            Err(ConsoleError::InvalidArgument { value, .. }) if value == "many"
        ));
        assert!(CommandParser::parse("set_automatic_scheduling yes").is_err());
        assert!(CommandParser::parse("set_running_time soon").is_err());
    }

    #[test]
    fn test_error_messages() {
        let err = CommandParser::parse("get_task_stats").unwrap_err();
        assert_eq!(err.to_string(), "Missing argument for get_task_stats: pid");
    }
}
