//! Quanta task manifests and loaders.
//!
//! A loader produces the attributes a PCB is built from: a priority and the
//! source of the task body. Tasks can be described declaratively in a JSON
//! manifest next to their script, or entered interactively.

pub use sim_kernel::PcbAttributes;

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, BufRead, Stdin, Stdout, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Task manifest format.
///
/// ```json
/// { "priority": 2, "task": "calculate_pi.qs" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct TaskManifest {
    #[serde(default)]
    pub priority: Option<i64>,
    /// Script path, relative to the manifest's directory
    pub task: PathBuf,
}

impl TaskManifest {
    pub fn validate(&self) -> Result<(), LoaderError> {
        if self.task.as_os_str().is_empty() {
            return Err(LoaderError::InvalidManifest(
                "Task path cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Errors related to loading task attributes.
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("Task manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse manifest: {0}")]
    Parse(String),

    #[error("Invalid manifest: {0}")]
    InvalidManifest(String),

    #[error("Invalid priority: {0:?}")]
    InvalidPriority(String),

    #[error("Input closed before {0} was given")]
    UnexpectedEof(&'static str),
}

/// Source of PCB attributes.
pub trait Loader {
    fn load(&mut self) -> Result<PcbAttributes, LoaderError>;
}

fn read_source(path: &Path) -> Result<String, LoaderError> {
    fs::read_to_string(path).map_err(|err| LoaderError::Io {
        path: path.display().to_string(),
        message: err.to_string(),
    })
}

/// Loads tasks from JSON manifests on disk.
#[derive(Debug, Clone)]
pub struct FileLoader {
    manifest_path: PathBuf,
}

impl FileLoader {
    pub fn new(manifest_path: impl Into<PathBuf>) -> Self {
        Self {
            manifest_path: manifest_path.into(),
        }
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn load_manifest(&self) -> Result<TaskManifest, LoaderError> {
        if !self.manifest_path.exists() {
            return Err(LoaderError::ManifestNotFound(
                self.manifest_path.display().to_string(),
            ));
        }
        let data = read_source(&self.manifest_path)?;
        let manifest: TaskManifest =
            serde_json::from_str(&data).map_err(|err| LoaderError::Parse(err.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Script path of `manifest`, resolved against the manifest's directory.
    pub fn resolve_task(&self, manifest: &TaskManifest) -> PathBuf {
        match self.manifest_path.parent() {
            Some(dir) => dir.join(&manifest.task),
            None => manifest.task.clone(),
        }
    }
}

impl Loader for FileLoader {
    fn load(&mut self) -> Result<PcbAttributes, LoaderError> {
        let manifest = self.load_manifest()?;
        let script = self.resolve_task(&manifest);
        let source = read_source(&script)?;
        log::debug!(
            "loaded task {} from {}",
            script.display(),
            self.manifest_path.display()
        );
        Ok(PcbAttributes {
            priority: manifest.priority,
            source,
        })
    }
}

/// Asks for each attribute on an interactive stream.
///
/// Prompts `priority: ` and then `task: `, the path of a task script.
pub struct StdInLoader<R, W> {
    input: R,
    output: W,
    base_dir: Option<PathBuf>,
}

impl StdInLoader<io::StdinLock<'static>, Stdout> {
    /// Loader bound to the process's stdin and stdout
    pub fn stdio() -> Self {
        let stdin: Stdin = io::stdin();
        Self::new(stdin.lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> StdInLoader<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            base_dir: None,
        }
    }

    /// Resolves relative script paths against `dir`
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    fn prompt(&mut self, key: &'static str) -> Result<String, LoaderError> {
        let io_error = |err: io::Error| LoaderError::Io {
            path: "<stdin>".to_string(),
            message: err.to_string(),
        };
        write!(self.output, "{}: ", key).map_err(io_error)?;
        self.output.flush().map_err(io_error)?;

        let mut line = String::new();
        if self.input.read_line(&mut line).map_err(io_error)? == 0 {
            return Err(LoaderError::UnexpectedEof(key));
        }
        Ok(line.trim().to_string())
    }
}

impl<R: BufRead, W: Write> Loader for StdInLoader<R, W> {
    fn load(&mut self) -> Result<PcbAttributes, LoaderError> {
        let priority = self.prompt("priority")?;
        let priority: i64 = priority
            .parse()
            .map_err(|_| LoaderError::InvalidPriority(priority.clone()))?;

        let task = PathBuf::from(self.prompt("task")?);
        let script = match &self.base_dir {
            Some(dir) => dir.join(task),
            None => task,
        };
        let source = read_source(&script)?;

        Ok(PcbAttributes {
            priority: Some(priority),
            source,
        })
    }
}
