//! # Logger Service
//!
//! This crate implements structured logging on top of the `log` facade.
//!
//! ## Philosophy
//!
//! Kernel diagnostics are explicit and structured: a message plus the process
//! it concerns plus `key=value` fields. Entries are handed to the `log`
//! facade, so any `log::Log` implementation can consume them. The host
//! installs [`ConsoleLogger`], which writes to stderr.

use core_types::Pid;
use log::{Level, Log, Metadata, Record, SetLoggerError};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// Log level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    /// Per-statement and per-dispatch detail
    Trace,
    /// Debug information
    Debug,
    /// Informational messages
    Info,
    /// Warnings
    Warn,
    /// Errors
    Error,
}

impl LogLevel {
    /// Returns the `log` facade level for this level
    pub fn as_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::Trace,
            LogLevel::Debug => Level::Debug,
            LogLevel::Info => Level::Info,
            LogLevel::Warn => Level::Warn,
            LogLevel::Error => Level::Error,
        }
    }
}

/// Error returned for an unrecognised level name
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown log level: {0}")]
pub struct UnknownLogLevel(pub String);

impl FromStr for LogLevel {
    type Err = UnknownLogLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(UnknownLogLevel(other.to_string())),
        }
    }
}

/// A structured log entry
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Source process (if known)
    pub source: Option<Pid>,
    /// Log message
    pub message: String,
    /// Structured fields
    pub fields: Vec<(String, String)>,
}

impl LogEntry {
    /// Creates a new log entry
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            source: None,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Sets the source process
    pub fn with_source(mut self, source: Pid) -> Self {
        self.source = Some(source);
        self
    }

    /// Adds a field to the log entry
    pub fn with_field(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.fields.push((key.into(), value.to_string()));
        self
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(pid) = self.source {
            write!(f, " pid={}", pid)?;
        }
        for (key, value) in &self.fields {
            write!(f, " {}={}", key, value)?;
        }
        Ok(())
    }
}

/// Hands a structured entry to the `log` facade under `target`
pub fn emit(target: &str, entry: &LogEntry) {
    log::log!(target: target, entry.level.as_level(), "{}", entry);
}

/// Logger that writes `[LEVEL] target: message` lines to stderr
pub struct ConsoleLogger {
    max_level: Level,
}

impl ConsoleLogger {
    pub const fn new(max_level: Level) -> Self {
        Self { max_level }
    }

    /// Renders a record the way it is written to stderr
    pub fn format(record: &Record) -> String {
        format!("[{}] {}: {}", record.level(), record.target(), record.args())
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let mut stderr = std::io::stderr().lock();
            // Nowhere left to report a failed diagnostic write.
            let _ = writeln!(stderr, "{}", Self::format(record));
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Installs [`ConsoleLogger`] as the process logger
///
/// Fails if a logger is already installed.
pub fn init(level: LogLevel) -> Result<(), SetLoggerError> {
    let max_level = level.as_level();
    log::set_boxed_logger(Box::new(ConsoleLogger::new(max_level)))?;
    log::set_max_level(max_level.to_level_filter());
    Ok(())
}
