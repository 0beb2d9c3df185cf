//! Console session
//!
//! Reads commands from an input stream and drives a [`Manager`] with them.
//! A failing command prints its error and the session carries on; only
//! `quit`, end of input or a broken output stream end it.

use crate::commands::{CommandParser, ConsoleCommand, ConsoleError, HELP_TEXT};
use sim_kernel::{Manager, QueueSnapshot, QUEUE_HEADER};
use std::io::{BufRead, Write};
use task_loader::{FileLoader, Loader, StdInLoader};

pub const PROMPT: &str = "\nquanta >> ";

/// What the session does after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Console<'m, R, W> {
    manager: &'m Manager,
    input: R,
    output: W,
}

impl<'m, R: BufRead, W: Write> Console<'m, R, W> {
    pub fn new(manager: &'m Manager, input: R, output: W) -> Self {
        Self {
            manager,
            input,
            output,
        }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Runs commands until `quit` or end of input
    pub fn run(&mut self) -> Result<(), ConsoleError> {
        loop {
            write!(self.output, "{}", PROMPT)?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(());
            }
            if line.trim().is_empty() {
                continue;
            }

            if self.run_line(&line)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    /// Parses and executes one line, printing any command error
    ///
    /// Only output failures are returned.
    pub fn run_line(&mut self, line: &str) -> Result<Flow, ConsoleError> {
        let result = CommandParser::parse(line).and_then(|command| self.execute(command));
        match result {
            Ok(flow) => Ok(flow),
            Err(ConsoleError::Io(err)) => Err(ConsoleError::Io(err)),
            Err(err) => {
                log::debug!("command {:?} failed: {}", line.trim(), err);
                writeln!(self.output, "{}", err)?;
                Ok(Flow::Continue)
            }
        }
    }

    pub fn execute(&mut self, command: ConsoleCommand) -> Result<Flow, ConsoleError> {
        match command {
            ConsoleCommand::Help => write!(self.output, "{}", HELP_TEXT)?,
            ConsoleCommand::LoadTaskFromFile { manifest } => {
                let attributes = FileLoader::new(manifest).load()?;
                let pid = self.manager.load_task(&attributes)?;
                writeln!(self.output, "Loaded task {}", pid)?;
            }
            ConsoleCommand::LoadTaskFromStdIn => {
                let attributes = StdInLoader::new(&mut self.input, &mut self.output).load()?;
                let pid = self.manager.load_task(&attributes)?;
                writeln!(self.output, "Loaded task {}", pid)?;
            }
            ConsoleCommand::RemoveTask { pid } => {
                if self.manager.remove_task(pid) {
                    writeln!(self.output, "Removed task {}", pid)?;
                } else {
                    writeln!(self.output, "Task {} is not in the ready queue", pid)?;
                }
            }
            ConsoleCommand::GetTaskStats { pid } => {
                let stats = self.manager.task_stats(pid)?;
                writeln!(self.output, "{}", stats)?;
            }
            ConsoleCommand::SetScheduler { name } => {
                self.manager.set_scheduler(&name)?;
                writeln!(self.output, "Scheduler: {}", self.manager.scheduler_name())?;
            }
            ConsoleCommand::SetRunningTime { quantum } => {
                self.manager.set_quantum(quantum);
                writeln!(self.output, "Running time: {}", quantum)?;
            }
            ConsoleCommand::SetOutputDelay { millis } => {
                self.manager.set_output_delay(millis);
                writeln!(self.output, "Output delay: {}", millis)?;
            }
            ConsoleCommand::SetAutomaticScheduling { enabled } => {
                self.manager.set_auto_scheduling(enabled);
                writeln!(self.output, "Automatic scheduling: {}", enabled)?;
            }
            ConsoleCommand::Step => self.step()?,
            ConsoleCommand::Steps { count } => {
                for _ in 0..count {
                    self.step()?;
                }
            }
            ConsoleCommand::Queues => {
                let snapshot = self.manager.snapshot();
                write_queues(&mut self.output, &snapshot)?;
            }
            ConsoleCommand::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    /// Dispatches once, printing the queues as the dispatcher sees them
    fn step(&mut self) -> Result<(), ConsoleError> {
        let output = &mut self.output;
        let mut printed = Ok(());
        let outcome = self
            .manager
            .execute_with(|snapshot| printed = write_queues(output, snapshot));
        log::debug!("step: {:?}", outcome);
        printed.map_err(ConsoleError::from)
    }
}

fn write_queues<W: Write>(output: &mut W, snapshot: &QueueSnapshot) -> std::io::Result<()> {
    writeln!(output, "{}", QUEUE_HEADER)?;
    writeln!(output, "{}", snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_kernel::test_utils::{manual_config, CollectingSink};
    use std::fs;
    use std::io::Cursor;
    use std::sync::Arc;

    fn manager() -> Manager {
        Manager::new(manual_config(), Arc::new(CollectingSink::new())).unwrap()
    }

    fn run(manager: &Manager, script: &str) -> String {
        let mut console = Console::new(manager, Cursor::new(script.to_string()), Vec::new());
        console.run().unwrap();
        String::from_utf8(console.into_output()).unwrap()
    }

    #[test]
    fn test_help_and_quit() {
        let manager = manager();
        let output = run(&manager, "help\nquit\nqueues\n");
        assert!(output.contains("load_task_from_file"));
        assert!(output.starts_with(PROMPT));
        // Nothing after quit runs.
        assert!(!output.contains(QUEUE_HEADER));
    }

    #[test]
    fn test_errors_do_not_end_session() {
        let manager = manager();
        let output = run(&manager, "fork\nset_scheduler Lottery\nqueues\n");
        assert!(output.contains("Unknown command: fork"));
        assert!(output.contains("Lottery is not a valid scheduler"));
        assert!(output.contains(QUEUE_HEADER));
        assert_eq!(manager.scheduler_name(), "round_robin");
    }

    #[test]
    fn test_load_from_file_and_step() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("job.qs"), "x = 1\nx = 2\n").unwrap();
        let manifest = dir.path().join("job.json");
        fs::write(&manifest, r#"{"priority": 4, "task": "job.qs"}"#).unwrap();

        let manager = manager();
        let script = format!(
            "load_task_from_file {}\nset_running_time infinity\nstep\nqueues\n",
            manifest.display()
        );
        let output = run(&manager, &script);

        assert!(output.contains("Loaded task"));
        assert!(output.contains("Running time: infinity"));
        assert!(output.contains("Running: (")); // printed from inside the step
        assert!(manager.snapshot().ready.is_empty());
    }

    #[test]
    fn test_load_from_std_in_uses_session_input() {
        let dir = tempfile::tempdir().unwrap();
        let script_path = dir.path().join("job.qs");
        fs::write(&script_path, "x = 1\n").unwrap();

        let manager = manager();
        let output = run(
            &manager,
            &format!("load_task_from_std_in\n2\n{}\nqueues\n", script_path.display()),
        );
        assert!(output.contains("priority: task: Loaded task"));
        let ready = manager.snapshot().ready;
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].priority, 2);
    }

    #[test]
    fn test_settings_and_stats() {
        let manager = manager();
        let pid = manager
            .load_task(&sim_kernel::PcbAttributes::new("x = 1"))
            .unwrap();
        let output = run(
            &manager,
            &format!(
                "set_scheduler sjf\nset_output_delay 25\nset_automatic_scheduling false\n\
                 get_task_stats {}\nremove_task {}\nremove_task {}\n",
                pid, pid, pid
            ),
        );
        assert!(output.contains("Scheduler: shortest_job_first"));
        assert_eq!(manager.output_delay().as_millis(), 25);
        assert!(output.contains(&format!("pid {}", pid)));
        assert!(output.contains(&format!("Removed task {}", pid)));
        assert!(output.contains(&format!("Task {} is not in the ready queue", pid)));
    }

    #[test]
    fn test_steps_prints_each_dispatch() {
        let manager = manager();
        let output = run(&manager, "steps 3\n");
        assert_eq!(output.matches(QUEUE_HEADER).count(), 3);
    }
}
