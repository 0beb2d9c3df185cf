//! Memory traces
//!
//! A trace file is line based, blank lines ignored:
//!
//! ```text
//! 1000            total memory size
//! 2               number of free spaces
//! 0,400           address,size
//! 500,500
//! 3               number of processes
//! 1,0,10,300      pid,arrival,duration,mem_size
//! 2,1,5,450
//! 3,2,8,200
//! ```

use crate::error::MemoryError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// A contiguous range of free memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Space {
    pub address: u64,
    pub size: u64,
}

impl Space {
    pub fn new(address: u64, size: u64) -> Self {
        Self { address, size }
    }

    pub fn fits(&self, size: u64) -> bool {
        self.size >= size
    }
}

/// A process requesting memory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryTask {
    pub pid: u64,
    pub arrival: u64,
    pub duration: u64,
    pub mem_size: u64,
}

/// Memory size, free spaces and processes of one simulation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trace {
    pub mem_size: u64,
    pub spaces: Vec<Space>,
    pub tasks: Vec<MemoryTask>,
}

impl Trace {
    pub fn parse(text: &str) -> Result<Self, MemoryError> {
        let mut lines = TraceLines::new(text);

        let mem_size = lines.number("memory size")?;

        let space_count = lines.number("space count")?;
        let mut spaces = Vec::new();
        for _ in 0..space_count {
            let [address, size] = lines.fields::<2>("space")?;
            spaces.push(Space::new(address, size));
        }

        let task_count = lines.number("process count")?;
        let mut tasks = Vec::new();
        for _ in 0..task_count {
            let [pid, arrival, duration, mem_size] = lines.fields::<4>("process")?;
            tasks.push(MemoryTask {
                pid,
                arrival,
                duration,
                mem_size,
            });
        }

        lines.finish()?;
        Ok(Self {
            mem_size,
            spaces,
            tasks,
        })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, MemoryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MemoryError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::parse(&text)
    }
}

/// Non-blank lines of a trace with their 1-based line numbers
struct TraceLines<'a> {
    lines: Box<dyn Iterator<Item = (usize, &'a str)> + 'a>,
    last_line: usize,
}

impl<'a> TraceLines<'a> {
    fn new(text: &'a str) -> Self {
        let lines = text
            .lines()
            .enumerate()
            .map(|(index, line)| (index + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty());
        Self {
            lines: Box::new(lines),
            last_line: 0,
        }
    }

    fn next(&mut self, what: &str) -> Result<(usize, &'a str), MemoryError> {
        match self.lines.next() {
            Some((number, line)) => {
                self.last_line = number;
                Ok((number, line))
            }
            None => Err(MemoryError::Parse {
                line: self.last_line + 1,
                message: format!("expected {}, found end of trace", what),
            }),
        }
    }

    fn parse_field(line: usize, what: &str, field: &str) -> Result<u64, MemoryError> {
        field.trim().parse().map_err(|_| MemoryError::Parse {
            line,
            message: format!("invalid {} value {:?}", what, field.trim()),
        })
    }

    fn number(&mut self, what: &str) -> Result<u64, MemoryError> {
        let (line, text) = self.next(what)?;
        Self::parse_field(line, what, text)
    }

    fn fields<const N: usize>(&mut self, what: &str) -> Result<[u64; N], MemoryError> {
        let (line, text) = self.next(what)?;
        let parts: Vec<&str> = text.split(',').collect();
        if parts.len() != N {
            return Err(MemoryError::Parse {
                line,
                message: format!("{} needs {} fields, found {}", what, N, parts.len()),
            });
        }
        let mut values = [0; N];
        for (value, part) in values.iter_mut().zip(parts) {
            *value = Self::parse_field(line, what, part)?;
        }
        Ok(values)
    }

    fn finish(&mut self) -> Result<(), MemoryError> {
        match self.lines.next() {
            Some((line, _)) => Err(MemoryError::Parse {
                line,
                message: "unexpected data after last process".to_string(),
            }),
            None => Ok(()),
        }
    }
}
