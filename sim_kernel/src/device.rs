//! Background loops and output devices
//!
//! The manager runs two loops for its whole lifetime: the auto-dispatcher
//! and the output device. Each loop is a named thread that waits on a
//! channel with a timeout; a timeout is a tick, and a disconnected channel
//! is the stop signal.

use core_types::Pid;
use kernel_api::{KernelError, OutputSink};
use std::io::Write;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// A periodic worker thread with a stop signal
pub(crate) struct BackgroundLoop {
    name: String,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl BackgroundLoop {
    /// Spawns `tick_body` to run every `period()`
    ///
    /// `period` is re-read before every wait, so a changed delay applies
    /// from the next tick on.
    pub(crate) fn spawn<P, F>(name: &str, period: P, mut tick_body: F) -> Result<Self, KernelError>
    where
        P: Fn() -> Duration + Send + 'static,
        F: FnMut() + Send + 'static,
    {
        let (stop, signal) = mpsc::channel::<()>();
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || loop {
                match signal.recv_timeout(period()) {
                    Err(RecvTimeoutError::Timeout) => tick_body(),
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|e| KernelError::Spawn(format!("{}: {}", name, e)))?;

        log::debug!("started {}", name);
        Ok(Self {
            name: name.to_string(),
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Signals the loop and waits for it to exit
    ///
    /// A tick already in progress runs to completion first.
    pub(crate) fn stop(&mut self) {
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("{} panicked", self.name);
            } else {
                log::debug!("stopped {}", self.name);
            }
        }
    }
}

impl Drop for BackgroundLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Output device that prints to stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn format(pid: Pid, payload: &str) -> String {
        format!("[Output ({})]: {}", pid, payload)
    }
}

impl OutputSink for StdoutSink {
    fn emit(&self, pid: Pid, payload: &str) {
        let mut stdout = std::io::stdout().lock();
        // A closed stdout has no one left to tell.
        let _ = writeln!(stdout, "\n{}", Self::format(pid, payload));
        let _ = stdout.flush();
    }
}
